//! Connection prober
//!
//! Opens each candidate with every handshake combination and listens for a
//! line that only a TiltLink device would send. The first link that produces
//! one is handed back still open; everything else is closed on the way.

use std::time::Duration;
use tiltlink_core::protocol::is_recognized;
use tiltlink_core::{Result, TiltLinkError};
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::ports::PortCandidate;
use crate::transport::{
    HandshakeCombo, LinkSettings, PortOpener, ReadOutcome, SerialLink, HANDSHAKE_COMBOS,
};

/// Probes candidates for a live device
pub struct Prober<'a, O: PortOpener + ?Sized> {
    opener: &'a O,
    settings: LinkSettings,
    probe_window: Duration,
    log_probe: bool,
}

impl<'a, O: PortOpener + ?Sized> Prober<'a, O> {
    /// # Arguments
    /// * `settings` - Link settings; the handshake field is overridden per attempt
    /// * `probe_window` - How long each attempt may wait for a recognizable line
    /// * `log_probe` - Log every attempt and every line seen while probing
    pub fn new(
        opener: &'a O,
        settings: LinkSettings,
        probe_window: Duration,
        log_probe: bool,
    ) -> Self {
        Self {
            opener,
            settings,
            probe_window,
            log_probe,
        }
    }

    /// Try every candidate and handshake combination in order.
    ///
    /// Returns the first link that produced a recognized line, or
    /// [`TiltLinkError::DeviceNotFound`] once the list is exhausted.
    pub async fn connect(&self, candidates: &[PortCandidate]) -> Result<SerialLink> {
        if self.log_probe {
            let list: Vec<&str> = candidates.iter().map(|c| c.name.as_str()).collect();
            info!("Probe list: {}", list.join(", "));
        }

        for candidate in candidates {
            for combo in HANDSHAKE_COMBOS {
                if self.log_probe {
                    info!(
                        "Trying {} (DTR={}, RTS={})",
                        candidate.name, combo.dtr, combo.rts
                    );
                }

                match self.probe_port(&candidate.name, combo).await {
                    Ok(link) => {
                        if self.log_probe {
                            info!("Connected: {}", candidate.name);
                        }
                        return Ok(link);
                    }
                    Err(e) => {
                        if self.log_probe {
                            warn!("Probe {} failed: {}", candidate.name, e);
                        }
                    }
                }
            }
        }

        error!("No working serial port found (is another program holding the port?)");
        Err(TiltLinkError::DeviceNotFound)
    }

    /// Open one port with one handshake combination and wait for a
    /// recognized line.
    ///
    /// The recognized line itself is discarded. On any failure the link is
    /// dropped, which closes the port.
    pub async fn probe_port(&self, port: &str, combo: HandshakeCombo) -> Result<SerialLink> {
        let settings = self.settings.with_handshake(combo);
        let mut link = self.opener.open(port, &settings)?;

        let started = Instant::now();
        while started.elapsed() < self.probe_window {
            match link.reader.read_line().await? {
                ReadOutcome::Timeout => continue,
                ReadOutcome::Line(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    if self.log_probe {
                        info!("Probe {}: '{}'", port, line);
                    }
                    if is_recognized(line) {
                        return Ok(link);
                    }
                }
            }
        }

        Err(TiltLinkError::Timeout(format!(
            "no recognizable line from {} within {:?}",
            port, self.probe_window
        )))
    }
}
