use crate::{
    config::PanelConfig,
    telemetry::{parse_line, LineKind},
    transport::{self, Link, TransportError},
    types::{AngleState, SendOutcome, TelemetryReading},
};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("command {input:?} is not in the allow-list")]
    Rejected { input: String },
    #[error(transparent)]
    Link(#[from] TransportError),
    #[error("serial worker has stopped")]
    Stopped,
}

/// What the status displays show.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanelState {
    pub angle: AngleState,
    pub telemetry: Option<TelemetryReading>,
    pub last_ack: Option<String>,
}

type Reply = oneshot::Sender<Result<Option<String>, TransportError>>;

enum Request {
    Send {
        payload: String,
        await_ack: bool,
        reply: Reply,
    },
    Shutdown,
}

struct Shared {
    state: Mutex<PanelState>,
    telemetry: watch::Sender<Option<TelemetryReading>>,
}

impl Shared {
    fn publish(&self, reading: TelemetryReading) {
        debug!("Telemetry: {}", reading);
        self.state.lock().telemetry = Some(reading);
        self.telemetry.send_replace(Some(reading));
    }

    fn handle_unsolicited(&self, line: &str) {
        match parse_line(line) {
            Ok(LineKind::Telemetry(reading)) => self.publish(reading),
            Ok(LineKind::Other(other)) => debug!("Ignoring line from controller: {}", other),
            Ok(LineKind::Empty) => {}
            Err(e) => warn!("{}", e),
        }
    }
}

/// Sole owner of the link. Serves write requests in arrival order and reads
/// unsolicited lines between them.
struct Worker {
    link: Box<dyn Link>,
    requests: mpsc::Receiver<Request>,
    running: Arc<AtomicBool>,
    shared: Arc<Shared>,
    timeout: Duration,
    poll_interval: Duration,
}

impl Worker {
    fn run(mut self) {
        debug!("Serial worker started");

        while self.running.load(Ordering::Acquire) {
            let request = match self.requests.try_recv() {
                Ok(request) => request,
                Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => {
                    if self.poll_once() {
                        continue;
                    }
                    match self.requests.recv_timeout(self.poll_interval) {
                        Ok(request) => request,
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            };

            match request {
                Request::Send { payload, await_ack, reply } => {
                    let result = self.exchange(&payload, await_ack);
                    if reply.send(result).is_err() {
                        debug!("Caller went away before {:?} completed", payload);
                    }
                }
                Request::Shutdown => break,
            }
        }

        if let Err(e) = self.link.close() {
            warn!("Failed to close serial port: {}", e);
        }
        debug!("Serial worker stopped");
    }

    /// Read one pending line if there is one. Returns whether a line was read.
    fn poll_once(&mut self) -> bool {
        match self.link.bytes_available() {
            Ok(0) => false,
            Ok(_) => match self.link.read_line(self.timeout) {
                Ok(line) => {
                    self.shared.handle_unsolicited(&line);
                    true
                }
                Err(e) => {
                    warn!("Telemetry read failed: {}", e);
                    false
                }
            },
            Err(e) => {
                warn!("Failed to query serial input: {}", e);
                false
            }
        }
    }

    fn exchange(&mut self, payload: &str, await_ack: bool) -> Result<Option<String>, TransportError> {
        self.link.write(payload.as_bytes())?;
        debug!("Sent {:?}", payload);

        if !await_ack {
            return Ok(None);
        }

        // Telemetry arriving inside the window is not the acknowledgement.
        let deadline = Instant::now() + self.timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            let line = self.link.read_line(remaining)?;
            match parse_line(&line) {
                Ok(LineKind::Other(reply)) => return Ok(Some(reply)),
                Ok(LineKind::Telemetry(reading)) => self.shared.publish(reading),
                Ok(LineKind::Empty) => {}
                Err(e) => warn!("{}", e),
            }
        }
    }
}

/// Command/telemetry front for one fan-plate controller.
pub struct Controller {
    config: PanelConfig,
    requests: mpsc::Sender<Request>,
    running: Arc<AtomicBool>,
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl Controller {
    /// Open the configured serial device and start the worker.
    pub fn connect(config: PanelConfig) -> Result<Self, TransportError> {
        let link = transport::open(&config.device, config.baud_rate, config.timeout)?;
        Ok(Self::with_link(Box::new(link), config))
    }

    /// Start the worker on an already-open link. Must be called from within
    /// a Tokio runtime.
    pub fn with_link(link: Box<dyn Link>, config: PanelConfig) -> Self {
        let (requests, receiver) = mpsc::channel();
        let running = Arc::new(AtomicBool::new(true));
        let (telemetry, _) = watch::channel(None);
        let shared = Arc::new(Shared {
            state: Mutex::new(PanelState::default()),
            telemetry,
        });

        let worker = Worker {
            link,
            requests: receiver,
            running: Arc::clone(&running),
            shared: Arc::clone(&shared),
            timeout: config.timeout,
            poll_interval: config.poll_interval,
        };
        let handle = tokio::task::spawn_blocking(move || worker.run());

        Controller {
            config,
            requests,
            running,
            shared,
            worker: Some(handle),
        }
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    pub fn state(&self) -> PanelState {
        self.shared.state.lock().clone()
    }

    pub fn subscribe_telemetry(&self) -> watch::Receiver<Option<TelemetryReading>> {
        self.shared.telemetry.subscribe()
    }

    /// Validate, send, and wait up to the read timeout for a reply.
    ///
    /// The angle display is updated from the sent value whether or not a
    /// reply arrives. Nothing is written for a rejected input.
    pub async fn submit(&self, input: &str) -> Result<SendOutcome, ControllerError> {
        if !self.config.is_allowed(input) {
            warn!("Rejected command {:?}", input);
            return Err(ControllerError::Rejected {
                input: input.to_string(),
            });
        }

        let ack = self.request(input, true).await.map_err(|e| {
            error!("Failed to send {:?}: {}", input, e);
            e
        })?;

        let outcome = match ack {
            Some(reply) => {
                info!("Response received: {}", reply);
                SendOutcome::Acknowledged {
                    value: input.to_string(),
                    reply,
                }
            }
            None => {
                info!("No response to {:?}", input);
                SendOutcome::NoResponse {
                    value: input.to_string(),
                }
            }
        };

        let mut state = self.shared.state.lock();
        state.angle = AngleState::from_sent(input, &self.config.displayable);
        if let SendOutcome::Acknowledged { reply, .. } = &outcome {
            state.last_ack = Some(reply.clone());
        }
        Ok(outcome)
    }

    /// Send the power-off token. Success is assumed once the write lands.
    pub async fn power_off(&self) -> Result<(), ControllerError> {
        let token = self.config.power_off_token.as_str();
        self.request(token, false).await.map_err(|e| {
            error!("Failed to send power-off: {}", e);
            e
        })?;
        info!("Power-off sent");
        Ok(())
    }

    async fn request(&self, payload: &str, await_ack: bool) -> Result<Option<String>, ControllerError> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(Request::Send {
                payload: payload.to_string(),
                await_ack,
                reply,
            })
            .map_err(|_| ControllerError::Stopped)?;

        Ok(response.await.map_err(|_| ControllerError::Stopped)??)
    }

    /// Stop the worker and close the link. Never fails.
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(handle) = self.worker.take() {
            if let Err(e) = handle.await {
                error!("Serial worker panicked: {}", e);
            }
        }
        info!("Disconnected");
    }

    fn stop(&self) {
        self.running.store(false, Ordering::Release);
        // Receiver already gone means the worker has exited.
        let _ = self.requests.send(Request::Shutdown);
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.stop();
    }
}
