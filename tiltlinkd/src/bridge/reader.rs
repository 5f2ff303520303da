//! Background reader
//!
//! One task per promoted connection. It is the only code that reads from
//! the port and the only writer of the telemetry slots.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tiltlink_core::TelemetryLine;
use tiltlink_hardware::{LineReader, ReadOutcome};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::link::LinkShared;
use super::supervisor::ReconnectSupervisor;

/// Why a reader loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderExit {
    /// The running flag was cleared
    Stopped,
    /// A read failed with something other than a timeout
    Fault,
}

pub(crate) struct ReaderContext {
    pub shared: Arc<LinkShared>,
    pub generation: u64,
    pub running: Arc<AtomicBool>,
    pub read_half_dropped: oneshot::Sender<()>,
    pub supervisor: ReconnectSupervisor,
    pub auto_reconnect: bool,
}

pub(crate) async fn run_reader(mut reader: Box<dyn LineReader>, ctx: ReaderContext) -> ReaderExit {
    debug!("Reader started (generation {})", ctx.generation);

    let mut exit = ReaderExit::Stopped;
    while ctx.running.load(Ordering::Acquire) {
        match reader.read_line().await {
            Ok(ReadOutcome::Timeout) => continue,
            Ok(ReadOutcome::Line(line)) => handle_line(&ctx.shared, &line),
            Err(e) => {
                warn!("Read error: {}", e);
                exit = ReaderExit::Fault;
                break;
            }
        }
    }
    drop(reader);
    let _ = ctx.read_half_dropped.send(());

    let released = {
        let _lifecycle = ctx.shared.lifecycle.lock().await;
        ctx.shared.release_locked(ctx.generation).await
    };

    if released {
        info!("Serial connection closed");
        if ctx.auto_reconnect {
            ctx.supervisor.schedule();
        }
    }

    debug!("Reader exited (generation {}): {:?}", ctx.generation, exit);
    exit
}

fn handle_line(shared: &LinkShared, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    if shared.debug.inbound {
        info!("RX: {}", line);
    }
    if let Some(parsed) = TelemetryLine::parse(line) {
        shared.fields.apply(parsed);
    }
}
