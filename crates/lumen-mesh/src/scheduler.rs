use std::time::Instant;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use lumen_core::{MacAddress, MeshCredentials, MeshId, StatusFrame};
use lumen_session::{Session, SessionError};
use lumen_transport::GattConnector;

use crate::command::{Command, CommandKind, CommandOutcome};
use crate::config::MeshConfig;
use crate::directory::{DeviceDirectory, StatusCallback};
use crate::error::MeshError;
use crate::scan::RssiScanner;

enum Request {
    Register {
        mesh_id: MeshId,
        mac: MacAddress,
        name: String,
        callback: StatusCallback,
        done: oneshot::Sender<()>,
    },
    Submit {
        command: Command,
        /// Absent for detached best-effort traffic (poll-issued requests).
        done: Option<oneshot::Sender<Result<CommandOutcome, MeshError>>>,
    },
    Shutdown {
        done: oneshot::Sender<()>,
    },
}

/// Clonable front end to the scheduler worker.
///
/// Submission is synchronous from the caller's point of view: it suspends
/// until the worker signals completion for that specific command, while
/// other submitters' commands queue behind it in order.
#[derive(Clone)]
pub struct MeshHandle {
    requests: mpsc::Sender<Request>,
}

impl MeshHandle {
    /// Registers a physical node with the directory and primes it with a
    /// best-effort status request.
    pub async fn register_device(
        &self,
        mesh_id: MeshId,
        mac: MacAddress,
        name: impl Into<String>,
        callback: StatusCallback,
    ) -> Result<(), MeshError> {
        let (done, ack) = oneshot::channel();
        self.requests
            .send(Request::Register {
                mesh_id,
                mac,
                name: name.into(),
                callback,
                done,
            })
            .await
            .map_err(|_| MeshError::WorkerGone)?;
        ack.await.map_err(|_| MeshError::WorkerGone)
    }

    /// Queues a command and waits for its final outcome.
    pub async fn submit(&self, command: Command) -> Result<CommandOutcome, MeshError> {
        let (done, outcome) = oneshot::channel();
        self.requests
            .send(Request::Submit {
                command,
                done: Some(done),
            })
            .await
            .map_err(|_| MeshError::WorkerGone)?;
        outcome.await.map_err(|_| MeshError::WorkerGone)?
    }

    /// Turns a node on or off.
    pub async fn power(&self, mesh_id: MeshId, on: bool) -> Result<CommandOutcome, MeshError> {
        self.submit(Command::new(mesh_id, &CommandKind::Power(on))).await
    }

    /// Sets the RGB color of a node.
    pub async fn set_color(
        &self,
        mesh_id: MeshId,
        red: u8,
        green: u8,
        blue: u8,
    ) -> Result<CommandOutcome, MeshError> {
        self.submit(Command::new(mesh_id, &CommandKind::Color { red, green, blue }))
            .await
    }

    pub async fn set_color_brightness(
        &self,
        mesh_id: MeshId,
        brightness: u8,
    ) -> Result<CommandOutcome, MeshError> {
        self.submit(Command::new(mesh_id, &CommandKind::ColorBrightness(brightness)))
            .await
    }

    pub async fn set_white_temperature(
        &self,
        mesh_id: MeshId,
        temperature: u8,
    ) -> Result<CommandOutcome, MeshError> {
        self.submit(Command::new(mesh_id, &CommandKind::WhiteTemperature(temperature)))
            .await
    }

    pub async fn set_white_brightness(
        &self,
        mesh_id: MeshId,
        brightness: u8,
    ) -> Result<CommandOutcome, MeshError> {
        self.submit(Command::new(mesh_id, &CommandKind::WhiteBrightness(brightness)))
            .await
    }

    /// Asks a node for a fresh status report, best effort.
    pub async fn request_status(&self, mesh_id: MeshId) -> Result<CommandOutcome, MeshError> {
        self.submit(Command::best_effort(mesh_id, &CommandKind::RequestStatus))
            .await
    }

    /// Stops the worker: abandons queued commands, force-disconnects the
    /// active session, and waits for the worker to exit. Idempotent.
    pub async fn shutdown(&self) {
        let (done, stopped) = oneshot::channel();
        if self.requests.send(Request::Shutdown { done }).await.is_ok() {
            let _ = stopped.await;
        }
    }
}

/// Spawns the scheduler worker and returns its handle.
pub fn spawn<C, S>(
    credentials: MeshCredentials,
    connector: C,
    scanner: S,
    config: MeshConfig,
) -> MeshHandle
where
    C: GattConnector + 'static,
    S: RssiScanner + 'static,
{
    let (requests_tx, requests_rx) = mpsc::channel(config.request_queue_capacity.max(1));
    let (status_tx, status_rx) = mpsc::unbounded_channel();
    let worker = Worker {
        credentials,
        connector,
        scanner,
        config,
        directory: DeviceDirectory::default(),
        session: None,
        session_opened_at: None,
        status_tx,
        status_rx,
        poll_requests: requests_tx.clone(),
        last_scan: None,
        failed_poll_cycles: 0,
    };
    tokio::spawn(worker.run(requests_rx));
    MeshHandle {
        requests: requests_tx,
    }
}

/// Single writer over the directory and the (at most one) active session.
struct Worker<C: GattConnector, S> {
    credentials: MeshCredentials,
    connector: C,
    scanner: S,
    config: MeshConfig,
    directory: DeviceDirectory,
    session: Option<Session<C::Link>>,
    session_opened_at: Option<Instant>,
    status_tx: mpsc::UnboundedSender<StatusFrame>,
    status_rx: mpsc::UnboundedReceiver<StatusFrame>,
    poll_requests: mpsc::Sender<Request>,
    last_scan: Option<Instant>,
    failed_poll_cycles: u32,
}

impl<C, S> Worker<C, S>
where
    C: GattConnector,
    S: RssiScanner,
{
    async fn run(mut self, mut requests: mpsc::Receiver<Request>) {
        let mut poll = tokio::time::interval(self.config.poll_interval);
        poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                request = requests.recv() => match request {
                    Some(Request::Register { mesh_id, mac, name, callback, done }) => {
                        info!("registered [{}] {}", mac, mesh_id);
                        self.directory.register(mesh_id, mac, name, callback);
                        self.enqueue_poll(Command::best_effort(mesh_id, &CommandKind::RequestStatus));
                        let _ = done.send(());
                    }
                    Some(Request::Submit { command, done }) => {
                        let outcome = self.execute(command).await;
                        if let Some(done) = done {
                            let _ = done.send(outcome);
                        }
                    }
                    Some(Request::Shutdown { done }) => {
                        requests.close();
                        self.abandon_queue(&mut requests);
                        self.drop_session().await;
                        info!("scheduler worker stopped");
                        let _ = done.send(());
                        break;
                    }
                    None => {
                        self.drop_session().await;
                        debug!("all handles dropped, scheduler worker stopping");
                        break;
                    }
                },
                Some(frame) = self.status_rx.recv() => self.handle_status(frame),
                _ = poll.tick() => self.poll_cycle().await,
            }
        }
    }

    /// Fails queued submitters after a shutdown request; the queue is
    /// abandoned, not drained through the radio.
    fn abandon_queue(&mut self, requests: &mut mpsc::Receiver<Request>) {
        while let Ok(request) = requests.try_recv() {
            match request {
                Request::Submit { done: Some(done), .. } => {
                    let _ = done.send(Err(MeshError::WorkerGone));
                }
                Request::Shutdown { done } => {
                    let _ = done.send(());
                }
                _ => {}
            }
        }
    }

    fn handle_status(&mut self, frame: StatusFrame) {
        if self.directory.record_status(&frame, Instant::now()) {
            debug!("updated device status for mesh id {}", frame.mesh_id);
        } else {
            debug!("status feedback of unknown device {}", frame.mesh_id);
        }
    }

    /// Executes one dequeued command: connect if needed, send, and retry
    /// with a fresh gateway on failure (bounded attempts). Best-effort
    /// commands get one attempt and never fail the caller.
    async fn execute(&mut self, command: Command) -> Result<CommandOutcome, MeshError> {
        let attempts = if command.allow_to_fail {
            1
        } else {
            self.config.command_attempts.max(1)
        };
        let mut attempt = 0;
        loop {
            attempt += 1;
            if let Err(err) = self.ensure_connected().await {
                if command.allow_to_fail {
                    debug!("dropping best-effort command without a gateway: {}", err);
                    return Ok(CommandOutcome::Ignored);
                }
                return Err(err);
            }
            let Some(session) = self.session.as_mut() else {
                return Err(MeshError::NoGatewayAvailable { candidates: 0 });
            };
            match session
                .send_command(
                    command.opcode,
                    &command.data,
                    Some(command.destination),
                    command.with_response,
                )
                .await
            {
                Ok(()) => return Ok(CommandOutcome::Delivered),
                Err(err) => {
                    warn!(
                        "[{}] command 0x{:02X} failed on attempt {}/{}: {}",
                        command.destination, command.opcode, attempt, attempts, err
                    );
                    self.drop_session().await;
                    if attempt >= attempts {
                        if command.allow_to_fail {
                            return Ok(CommandOutcome::Ignored);
                        }
                        return Err(MeshError::CommandFailed {
                            attempts,
                            source: err,
                        });
                    }
                }
            }
        }
    }

    /// Makes sure an authenticated session exists, iterating the ranked
    /// candidates once. An empty candidate set triggers one immediate
    /// signal refresh before giving up.
    async fn ensure_connected(&mut self) -> Result<(), MeshError> {
        if self
            .session
            .as_ref()
            .is_some_and(Session::is_authenticated)
        {
            return Ok(());
        }
        if self.session.is_some() {
            self.drop_session().await;
        }

        // A cleared `last_scan` (never scanned, or the previous attempt
        // exhausted every candidate) makes this refresh immediately.
        self.maybe_refresh_rssi(false).await;
        let mut candidates = self.directory.ranked_candidates(self.config.rssi_floor);
        if candidates.is_empty() {
            self.maybe_refresh_rssi(true).await;
            candidates = self.directory.ranked_candidates(self.config.rssi_floor);
        }

        let total = candidates.len();
        for (mesh_id, mac) in candidates {
            info!("[{}] trying to connect", mac);
            match lumen_session::connect(
                &self.connector,
                mac,
                mesh_id,
                &self.credentials,
                self.status_tx.clone(),
                self.config.connect_timeout,
            )
            .await
            {
                Ok(session) => {
                    info!("[{}] connected", mac);
                    self.session = Some(session);
                    self.session_opened_at = Some(Instant::now());
                    return Ok(());
                }
                Err(SessionError::PairingRejected) => {
                    warn!("[{}] pairing rejected, trying next device", mac);
                }
                Err(err) if err.is_timeout() => {
                    warn!("[{}] connect timed out, trying next device", mac);
                }
                Err(err) => {
                    warn!("[{}] failed to connect, trying next device: {}", mac, err);
                }
            }
        }

        // Every candidate failed: allow the next cycle to rescan right away.
        self.last_scan = None;
        Err(MeshError::NoGatewayAvailable { candidates: total })
    }

    async fn drop_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.disconnect().await;
        }
        self.session_opened_at = None;
    }

    /// Refreshes candidate signal strengths, best effort. The worker is the
    /// single writer, so scans can never overlap.
    async fn maybe_refresh_rssi(&mut self, force: bool) {
        let due = force
            || self
                .last_scan
                .map_or(true, |at| at.elapsed() >= self.config.rssi_scan_interval);
        if !due || self.directory.is_empty() {
            return;
        }
        match self.scanner.scan().await {
            Ok(readings) => {
                self.last_scan = Some(Instant::now());
                let updated = self.directory.apply_rssi(&readings);
                debug!("rssi scan refreshed {} device(s)", updated);
            }
            Err(err) => warn!("{}", err),
        }
    }

    /// Periodic maintenance: forced reconnect past the session-age ceiling,
    /// signal refresh, broadcast poll, directed re-polls for quiet devices,
    /// and the staleness sweeps.
    async fn poll_cycle(&mut self) {
        if let Some(opened) = self.session_opened_at {
            if self.session.is_some() && opened.elapsed() >= self.config.session_max_age {
                info!(
                    "session held for more than {:?}, forcing reconnect",
                    self.config.session_max_age
                );
                self.drop_session().await;
            }
        }

        self.maybe_refresh_rssi(false).await;

        if self.directory.is_empty() {
            return;
        }

        match self.ensure_connected().await {
            Ok(()) => {
                self.failed_poll_cycles = 0;
                self.enqueue_poll(Command::best_effort(
                    MeshId::BROADCAST,
                    &CommandKind::RequestStatus,
                ));
                let now = Instant::now();
                for mesh_id in self
                    .directory
                    .quiet_devices(self.config.freshness_window, now)
                {
                    self.directory.note_status_request(mesh_id);
                    self.enqueue_poll(Command::best_effort(mesh_id, &CommandKind::RequestStatus));
                }
            }
            Err(err) => {
                self.failed_poll_cycles += 1;
                warn!(
                    "poll cycle {} without a gateway: {}",
                    self.failed_poll_cycles, err
                );
                if self.failed_poll_cycles >= self.config.offline_sweep_after_cycles {
                    let swept = self.directory.mark_all_unavailable();
                    if swept > 0 {
                        info!("marked {} device(s) unavailable during outage", swept);
                    }
                }
            }
        }

        let swept = self
            .directory
            .sweep_stale(self.config.staleness_window, Instant::now());
        if swept > 0 {
            debug!("swept {} stale device(s)", swept);
        }
    }

    /// Queues poll traffic behind whatever is already waiting; poll-issued
    /// requests are ordinary queue entries and never reorder user commands.
    fn enqueue_poll(&mut self, command: Command) {
        if self
            .poll_requests
            .try_send(Request::Submit {
                command,
                done: None,
            })
            .is_err()
        {
            debug!("request queue full, dropping best-effort poll");
        }
    }
}
