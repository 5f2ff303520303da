//! Candidate port resolution
//!
//! Builds the ordered list of ports to probe on every connect attempt: the
//! configured hints first, then whatever the OS enumerates, newest first.

use std::collections::HashSet;
use tracing::warn;

use crate::transport::PortOpener;

/// Naming convention used to filter OS-enumerated ports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortNaming {
    /// `COM<n>`
    Windows,
    /// `/dev/tty*`, `/dev/cu.*`, `/dev/rfcomm*`
    Unix,
    /// Accept every enumerated name
    Any,
}

impl PortNaming {
    /// Convention of the platform we are running on
    pub fn native() -> Self {
        if cfg!(windows) {
            PortNaming::Windows
        } else {
            PortNaming::Unix
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            PortNaming::Windows => name
                .get(..3)
                .is_some_and(|head| head.eq_ignore_ascii_case("COM")),
            PortNaming::Unix => ["/dev/tty", "/dev/cu.", "/dev/rfcomm"]
                .iter()
                .any(|prefix| name.starts_with(prefix)),
            PortNaming::Any => true,
        }
    }
}

/// A port considered for connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortCandidate {
    pub name: String,
    /// Trailing port number, `None` when the name has none
    pub rank: Option<u32>,
}

impl PortCandidate {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let rank = numeric_suffix(&name);
        Self { name, rank }
    }
}

/// Trailing run of ASCII digits: `COM15` → 15, `/dev/ttyUSB0` → 0.
pub fn numeric_suffix(name: &str) -> Option<u32> {
    let digits = name.len() - name.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    name[name.len() - digits..].parse().ok()
}

/// Resolve the ordered candidate list.
///
/// A non-empty override is the only candidate. Otherwise the hints come
/// first, followed by the OS ports matching `naming` sorted by descending
/// port number (unnumbered last). Duplicates are removed case-insensitively,
/// keeping the first occurrence.
pub fn resolve_candidates(
    port_override: Option<&str>,
    hints: &[String],
    os_ports: &[String],
    naming: PortNaming,
) -> Vec<PortCandidate> {
    if let Some(port) = port_override.map(str::trim).filter(|p| !p.is_empty()) {
        return vec![PortCandidate::new(port)];
    }

    let mut enumerated: Vec<PortCandidate> = os_ports
        .iter()
        .filter(|p| naming.matches(p))
        .map(|p| PortCandidate::new(p.as_str()))
        .collect();
    // Stable: equal ranks keep enumeration order; None sorts below Some
    enumerated.sort_by(|a, b| b.rank.cmp(&a.rank));

    let mut seen = HashSet::new();
    hints
        .iter()
        .map(|h| PortCandidate::new(h.trim()))
        .chain(enumerated)
        .filter(|c| !c.name.is_empty())
        .filter(|c| seen.insert(c.name.to_ascii_lowercase()))
        .collect()
}

/// List OS ports, treating an enumeration failure as "no ports".
pub fn enumerate_ports<O: PortOpener + ?Sized>(opener: &O) -> Vec<String> {
    match opener.available_ports() {
        Ok(ports) => ports,
        Err(e) => {
            warn!("Port enumeration failed, probing hints only: {}", e);
            Vec::new()
        }
    }
}
