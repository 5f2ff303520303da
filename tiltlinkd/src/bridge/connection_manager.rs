//! Serial bridge with automatic reconnection support
//!
//! [`SerialBridge`] owns the connection lifecycle and the consumer side of
//! the telemetry handoff. It is driven from one task: `connect`, `tick` and
//! `shutdown` all take `&mut self`. Reads happen on a spawned reader task;
//! writes go through [`LineSender`] handles from anywhere.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tiltlink_core::{
    BridgeConfig, InputEvent, Result, SteeringFilter, SteeringOutputs, TiltLinkError,
};
use tiltlink_hardware::{
    enumerate_ports, resolve_candidates, LinkSettings, PortCandidate, PortNaming, PortOpener,
    Prober, SerialDriver, SerialLink,
};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::link::{ConnectionState, LinkShared};
use super::mailbox::PendingAction;
use super::reader::{run_reader, ReaderContext, ReaderExit};
use super::sender::{LineSender, LineSink};
use super::supervisor::ReconnectSupervisor;

/// Callback invoked synchronously for every change event of a tick
pub type EventHandler = Box<dyn FnMut(&InputEvent) + Send>;

/// How [`SerialBridge::shutdown`] ended the reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// No reader was running
    Idle,
    /// The reader exited within the grace period
    Joined,
    /// The reader overran the grace period and was aborted
    Aborted,
}

struct ReaderHandle {
    running: Arc<AtomicBool>,
    /// Fires once the reader has dropped its read half
    read_half_dropped: oneshot::Receiver<()>,
    task: JoinHandle<ReaderExit>,
}

/// Bridges one TiltLink device into the host tick loop
pub struct SerialBridge<O: PortOpener = SerialDriver> {
    opener: O,
    config: BridgeConfig,
    naming: PortNaming,
    shared: Arc<LinkShared>,
    supervisor: ReconnectSupervisor,
    filter: SteeringFilter,
    handlers: Vec<EventHandler>,
    reader: Option<ReaderHandle>,
}

impl SerialBridge<SerialDriver> {
    /// Bridge over the operating system's serial ports
    pub fn with_serial_ports(config: BridgeConfig) -> Self {
        Self::new(SerialDriver::new(), config)
    }
}

impl<O: PortOpener> SerialBridge<O> {
    pub fn new(opener: O, config: BridgeConfig) -> Self {
        let shared = Arc::new(LinkShared::new(config.debug.clone()));
        let supervisor = ReconnectSupervisor::new(shared.clone(), config.reconnect.delay());
        let filter = SteeringFilter::new(config.steering.clone());

        Self {
            opener,
            config,
            naming: PortNaming::native(),
            shared,
            supervisor,
            filter,
            handlers: Vec::new(),
            reader: None,
        }
    }

    /// Override the naming convention used to filter enumerated ports
    pub fn with_port_naming(mut self, naming: PortNaming) -> Self {
        self.naming = naming;
        self
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn opener(&self) -> &O {
        &self.opener
    }

    /// Register a change handler; handlers run in registration order.
    pub fn on_event<F>(&mut self, handler: F)
    where
        F: FnMut(&InputEvent) + Send + 'static,
    {
        self.handlers.push(Box::new(handler));
    }

    /// Ports that the next connect attempt would probe, in order
    pub fn candidates(&self) -> Vec<PortCandidate> {
        let os_ports = enumerate_ports(&self.opener);
        resolve_candidates(
            self.config.serial.port_override(),
            &self.config.serial.candidate_ports,
            &os_ports,
            self.naming,
        )
    }

    /// Close any current connection, then resolve and probe candidates.
    ///
    /// On [`TiltLinkError::DeviceNotFound`] a delayed retry is scheduled
    /// when auto-reconnect is enabled.
    pub async fn connect(&mut self) -> Result<()> {
        if self.shared.is_stopped() {
            return Err(TiltLinkError::NotConnected);
        }

        let shared = self.shared.clone();
        let _lifecycle = shared.lifecycle.lock().await;

        // The previous port must be fully released before it can be reopened
        if let Some(old) = self.close_locked().await {
            self.await_read_half(old).await;
        }
        shared.status().state = ConnectionState::Probing;

        let candidates = self.candidates();
        let settings = LinkSettings::from_config(&self.config.serial);
        let prober = Prober::new(
            &self.opener,
            settings,
            self.config.serial.probe_window(),
            self.config.debug.probe,
        );
        let result = prober.connect(&candidates).await;

        match result {
            Ok(link) => {
                self.promote(link).await;
                Ok(())
            }
            Err(e) => {
                shared.status().state = ConnectionState::Closed;
                if self.config.reconnect.enabled {
                    self.supervisor.schedule();
                }
                Err(e)
            }
        }
    }

    /// Close the connection without scheduling a reconnect.
    pub async fn close(&mut self) {
        let shared = self.shared.clone();
        let _lifecycle = shared.lifecycle.lock().await;
        if let Some(old) = self.close_locked().await {
            self.await_read_half(old).await;
        }
    }

    /// Ask the next tick to re-probe, e.g. when auto-reconnect is disabled.
    pub fn request_reconnect(&self) {
        self.shared.mailbox.post(PendingAction::Reconnect);
    }

    /// Run one consumer step and return the events it raised.
    ///
    /// Drains at most one pending action first, then updates the outputs
    /// from the current telemetry and notifies handlers in event order.
    pub async fn tick(&mut self) -> Vec<InputEvent> {
        self.drain_pending().await;

        let events = self.filter.update(self.shared.fields.sample());
        for event in &events {
            for handler in self.handlers.iter_mut() {
                handler(event);
            }
        }
        events
    }

    /// Stop the reader and close the port.
    ///
    /// Waits up to the configured grace period for the reader task and
    /// aborts it past that. Nothing is rescheduled afterwards.
    pub async fn shutdown(&mut self) -> ShutdownOutcome {
        self.shared.stopped.store(true, Ordering::Release);
        self.shared.mailbox.clear();

        let handle = {
            let shared = self.shared.clone();
            let _lifecycle = shared.lifecycle.lock().await;
            let handle = self.close_locked().await;
            // An interrupted probe leaves the state at Probing
            shared.status().state = ConnectionState::Closed;
            handle
        };

        let Some(mut handle) = handle else {
            return ShutdownOutcome::Idle;
        };

        let grace = self.config.reconnect.shutdown_grace();
        match timeout(grace, &mut handle.task).await {
            Ok(_) => {
                debug!("Reader stopped");
                ShutdownOutcome::Joined
            }
            Err(_) => {
                warn!("Reader did not stop within {:?}, aborting", grace);
                handle.task.abort();
                ShutdownOutcome::Aborted
            }
        }
    }

    pub fn outputs(&self) -> &SteeringOutputs {
        self.filter.outputs()
    }

    /// Steer before output smoothing
    pub fn steer_normalized(&self) -> f32 {
        self.filter.steer_normalized()
    }

    /// Handle for sending lines from other tasks
    pub fn sender(&self) -> LineSender {
        LineSender::new(self.shared.clone())
    }

    pub async fn send_line(&self, text: &str) -> bool {
        self.sender().send_line(text).await
    }

    pub async fn set_speed(&self, kmh: i32) -> bool {
        self.sender().set_speed(kmh).await
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    pub fn is_connection_open(&self) -> bool {
        self.shared.is_open()
    }

    /// Name of the open port, empty when closed
    pub fn current_port(&self) -> String {
        self.shared.status().port_name.clone()
    }

    /// Whether a reconnect is scheduled and not yet picked up
    pub fn reconnect_pending(&self) -> bool {
        self.supervisor.is_pending()
    }

    async fn drain_pending(&mut self) {
        let Some(action) = self.shared.mailbox.take() else {
            return;
        };

        match action {
            PendingAction::Reconnect => {
                self.supervisor.disarm();
                if self.shared.is_stopped() || self.is_connection_open() {
                    debug!("Reconnect skipped: already connected");
                    return;
                }
                if let Err(e) = self.connect().await {
                    debug!("Reconnect attempt failed: {}", e);
                }
            }
        }
    }

    /// Install the link and start its reader. Caller holds the lifecycle lock.
    async fn promote(&mut self, link: SerialLink) {
        let SerialLink {
            port_name,
            reader,
            writer,
        } = link;

        *self.shared.writer.lock().await = Some(writer);
        let generation = {
            let mut status = self.shared.status();
            status.generation += 1;
            status.state = ConnectionState::Open;
            status.port_name = port_name.clone();
            status.generation
        };
        info!("Serial connected on {}", port_name);

        let running = Arc::new(AtomicBool::new(true));
        let (read_half_tx, read_half_dropped) = oneshot::channel();
        let ctx = ReaderContext {
            shared: self.shared.clone(),
            generation,
            running: running.clone(),
            read_half_dropped: read_half_tx,
            supervisor: self.supervisor.clone(),
            auto_reconnect: self.config.reconnect.enabled,
        };
        let task = tokio::spawn(run_reader(reader, ctx));
        self.reader = Some(ReaderHandle {
            running,
            read_half_dropped,
            task,
        });
    }

    /// Wait until a stopped reader has let go of its read half, aborting it
    /// past the shutdown grace period.
    ///
    /// Safe under the lifecycle lock: the reader signals before it takes
    /// that lock on exit.
    async fn await_read_half(&self, mut handle: ReaderHandle) {
        let grace = self.config.reconnect.shutdown_grace();
        // A dropped sender means the task is gone, which also releases the port
        if timeout(grace, &mut handle.read_half_dropped).await.is_ok() {
            return;
        }

        warn!("Reader did not release the port within {:?}, aborting", grace);
        handle.task.abort();
        let _ = handle.task.await;
    }

    /// Stop the current reader and release the link. Caller holds the
    /// lifecycle lock.
    async fn close_locked(&mut self) -> Option<ReaderHandle> {
        let handle = self.reader.take();
        if let Some(handle) = &handle {
            handle.running.store(false, Ordering::Release);
        }

        let generation = self.shared.status().generation;
        if self.shared.release_locked(generation).await {
            info!("Serial connection closed");
        }
        handle
    }
}

impl<O: PortOpener> Drop for SerialBridge<O> {
    fn drop(&mut self) {
        self.shared.stopped.store(true, Ordering::Release);
        if let Some(handle) = &self.reader {
            handle.running.store(false, Ordering::Release);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoPorts;

    impl PortOpener for NoPorts {
        fn available_ports(&self) -> Result<Vec<String>> {
            Err(TiltLinkError::Serial("enumeration unsupported".into()))
        }

        fn open(&self, _port: &str, _settings: &LinkSettings) -> Result<SerialLink> {
            Err(TiltLinkError::Serial("Access is denied".into()))
        }
    }

    #[test]
    fn test_connection_state_as_str() {
        assert_eq!(ConnectionState::Closed.as_str(), "closed");
        assert_eq!(ConnectionState::Probing.as_str(), "probing");
        assert_eq!(ConnectionState::Open.as_str(), "open");
    }

    #[test]
    fn test_candidates_fall_back_to_hints() {
        let bridge = SerialBridge::new(NoPorts, BridgeConfig::default());
        let names: Vec<String> = bridge.candidates().into_iter().map(|c| c.name).collect();
        assert_eq!(names, BridgeConfig::default().serial.candidate_ports);
    }

    #[test]
    fn test_port_override_wins() {
        let mut config = BridgeConfig::default();
        config.serial.port = " COM7 ".to_string();
        let bridge = SerialBridge::new(NoPorts, config);

        let names: Vec<String> = bridge.candidates().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["COM7".to_string()]);
    }

    #[tokio::test]
    async fn test_new_bridge_is_closed() {
        let bridge = SerialBridge::new(NoPorts, BridgeConfig::default());
        assert_eq!(bridge.state(), ConnectionState::Closed);
        assert!(!bridge.is_connection_open());
        assert_eq!(bridge.current_port(), "");
        assert!(!bridge.send_line("SPD:1").await);
    }

    #[tokio::test]
    async fn test_shutdown_without_connection_is_idle() {
        let mut bridge = SerialBridge::new(NoPorts, BridgeConfig::default());
        assert_eq!(bridge.shutdown().await, ShutdownOutcome::Idle);
        assert!(matches!(
            bridge.connect().await,
            Err(TiltLinkError::NotConnected)
        ));
    }
}
