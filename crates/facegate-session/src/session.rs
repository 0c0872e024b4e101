use crate::config::Config;
use facegate_core::{
    AnalyzerError, CameraError, CameraSource, DetectedFace, Descriptor, FaceAnalyzer, ModelError,
    ModelProvider, Notice, Poller, Severity, Verdict,
};
use serde::Serialize;
use std::future::pending;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("session task exited")]
    ChannelClosed,
}

/// Receives everything a session reports. Called from the session task.
pub trait SessionListener: Send + 'static {
    fn on_progress(&mut self, percent: u8);
    fn on_notice(&mut self, notice: &Notice);
    /// A sample was accepted; the session stops sampling.
    fn on_ok(&mut self, descriptor: Descriptor);
    /// The session gave up; the caller should dismiss it.
    fn on_cancel(&mut self);
}

/// Listener callbacks as a serializable event stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    Progress {
        percent: u8,
    },
    Notice {
        severity: Severity,
        message: String,
        notice: Notice,
    },
    Accepted {
        descriptor: Vec<f32>,
    },
    Cancelled,
}

/// Forwards callbacks over an unbounded channel.
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl ChannelListener {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: SessionEvent) {
        // Receiver gone means nobody is watching any more.
        let _ = self.tx.send(event);
    }
}

impl SessionListener for ChannelListener {
    fn on_progress(&mut self, percent: u8) {
        self.send(SessionEvent::Progress { percent });
    }

    fn on_notice(&mut self, notice: &Notice) {
        self.send(SessionEvent::Notice {
            severity: notice.severity(),
            message: notice.to_string(),
            notice: notice.clone(),
        });
    }

    fn on_ok(&mut self, descriptor: Descriptor) {
        self.send(SessionEvent::Accepted {
            descriptor: descriptor.into_vec(),
        });
    }

    fn on_cancel(&mut self) {
        self.send(SessionEvent::Cancelled);
    }
}

/// Messages sent from handles to the session task.
enum SessionCommand {
    Show,
    Hide,
    CameraReady,
    CameraFailed(CameraError),
    Close,
}

/// Clone-safe handle to a running session. Dropping every handle closes it.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    /// Make the session visible; counters restart from zero.
    pub async fn show(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Show).await
    }

    /// Hide the session; sampling stops until shown again.
    pub async fn hide(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Hide).await
    }

    /// The camera stream is live.
    pub async fn camera_ready(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::CameraReady).await
    }

    /// The camera stream failed or could not be opened.
    pub async fn camera_failed(&self, error: CameraError) -> Result<(), SessionError> {
        self.send(SessionCommand::CameraFailed(error)).await
    }

    /// Stop the session task.
    pub async fn close(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Close).await
    }

    async fn send(&self, cmd: SessionCommand) -> Result<(), SessionError> {
        self.tx
            .send(cmd)
            .await
            .map_err(|_| SessionError::ChannelClosed)
    }
}

/// Spawn a session on the current tokio runtime.
///
/// Model loading starts immediately. Sampling begins once the session is
/// shown, the models are loaded, and the camera has been reported ready.
pub fn spawn_session<P, C, L>(
    config: &Config,
    provider: P,
    camera: C,
    listener: L,
) -> (SessionHandle, JoinHandle<()>)
where
    P: ModelProvider,
    C: CameraSource,
    L: SessionListener,
{
    let (tx, rx) = mpsc::channel::<SessionCommand>(16);
    let session = Session {
        period: config.tick_period(),
        poller: Poller::new(config.policy.clone()),
        camera,
        listener,
        models: Models::Loading,
        visible: false,
        camera_active: false,
        ticker: None,
        in_flight: None,
        stale: None,
        dropped_ticks: 0,
    };
    let task = tokio::spawn(session.run(provider, rx));
    (SessionHandle { tx }, task)
}

type Detection = Result<Vec<DetectedFace>, AnalyzerError>;

enum Models<A> {
    Loading,
    Ready(Arc<A>),
    Failed,
}

struct Session<A, C, L> {
    period: Duration,
    poller: Poller,
    camera: C,
    listener: L,
    models: Models<A>,
    visible: bool,
    camera_active: bool,
    /// Present only while sampling.
    ticker: Option<Interval>,
    /// The one detection allowed to be unresolved.
    in_flight: Option<JoinHandle<Detection>>,
    /// A detection left running when sampling stopped. It still occupies the
    /// analyzer, so no new detection starts until it resolves; its result is
    /// thrown away.
    stale: Option<JoinHandle<Detection>>,
    dropped_ticks: u64,
}

impl<A, C, L> Session<A, C, L>
where
    A: FaceAnalyzer,
    C: CameraSource,
    L: SessionListener,
{
    async fn run<P>(mut self, provider: P, mut rx: mpsc::Receiver<SessionCommand>)
    where
        P: ModelProvider<Analyzer = A>,
    {
        tracing::info!(period_ms = self.period.as_millis() as u64, "session started");

        let load = provider.load();
        tokio::pin!(load);
        let mut loading = true;

        loop {
            tokio::select! {
                result = &mut load, if loading => {
                    loading = false;
                    self.on_models(result);
                }
                cmd = rx.recv() => match cmd {
                    Some(SessionCommand::Close) | None => break,
                    Some(cmd) => self.on_command(cmd),
                },
                () = next_tick(&mut self.ticker) => self.on_tick(),
                result = join_detection(&mut self.in_flight) => {
                    self.in_flight = None;
                    self.on_detection(result);
                }
                _ = join_detection(&mut self.stale) => {
                    self.stale = None;
                    tracing::debug!("stale detection resolved; result discarded");
                }
            }
        }

        self.stop_sampling("closed");
        tracing::info!(dropped_ticks = self.dropped_ticks, "session closed");
    }

    fn on_models(&mut self, result: Result<A, ModelError>) {
        match result {
            Ok(analyzer) => {
                tracing::info!("models loaded");
                self.models = Models::Ready(Arc::new(analyzer));
                self.reconcile();
            }
            Err(e) => {
                tracing::error!(error = %e, "model loading failed");
                self.models = Models::Failed;
                self.listener.on_notice(&Notice::ModelLoadFailed);
                self.listener.on_cancel();
            }
        }
    }

    fn on_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::Show => {
                if !self.visible {
                    self.visible = true;
                    self.poller.reset();
                    self.listener.on_progress(0);
                }
                self.reconcile();
            }
            SessionCommand::Hide => {
                self.visible = false;
                self.reconcile();
            }
            SessionCommand::CameraReady => {
                self.camera_active = true;
                self.reconcile();
            }
            SessionCommand::CameraFailed(err) => {
                tracing::warn!(error = %err, "camera failed");
                self.camera_active = false;
                self.reconcile();
                let notice = err.notice();
                self.listener.on_notice(&notice);
                if notice.is_terminal() {
                    self.listener.on_cancel();
                }
            }
            SessionCommand::Close => {}
        }
    }

    /// Start or stop sampling so it runs exactly when every precondition holds.
    fn reconcile(&mut self) {
        let ready =
            self.visible && self.camera_active && matches!(self.models, Models::Ready(_));

        if ready {
            if self.ticker.is_none() && self.poller.start() {
                let mut ticker = time::interval_at(Instant::now() + self.period, self.period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                self.ticker = Some(ticker);
                tracing::info!("sampling started");
            }
        } else if self.poller.is_sampling() {
            self.stop_sampling("precondition lost");
        }
    }

    fn stop_sampling(&mut self, reason: &'static str) {
        if self.ticker.take().is_some() {
            tracing::info!(reason, attempts = self.poller.state().attempts, "sampling stopped");
        }
        if let Some(handle) = self.in_flight.take() {
            tracing::debug!("detection still running; its result will be discarded");
            self.stale = Some(handle);
        }
        self.poller.stop();
    }

    fn on_tick(&mut self) {
        if self.in_flight.is_some() || self.stale.is_some() {
            self.dropped_ticks += 1;
            tracing::debug!(dropped = self.dropped_ticks, "detection still running; tick dropped");
            return;
        }
        let Models::Ready(analyzer) = &self.models else {
            return;
        };
        let Some(frame) = self.camera.current_frame() else {
            tracing::trace!("camera has no frame yet");
            return;
        };
        tracing::trace!(seq = frame.sequence, "sampling frame");

        let analyzer = Arc::clone(analyzer);
        self.in_flight = Some(tokio::spawn(async move { analyzer.detect_all(frame).await }));
    }

    fn on_detection(&mut self, result: Result<Detection, JoinError>) {
        let faces = match result {
            Ok(Ok(faces)) => faces,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "detection failed; counting as empty sample");
                Vec::new()
            }
            Err(e) => {
                tracing::error!(error = %e, "detection task aborted; counting as empty sample");
                Vec::new()
            }
        };
        let face_count = faces.len();

        let outcome = self.poller.observe(faces);
        let state = self.poller.state();
        tracing::debug!(
            attempt = state.attempts,
            faces = face_count,
            percent = outcome.percent,
            good = state.good_samples,
            "sample observed"
        );

        self.listener.on_progress(outcome.percent);
        if outcome.warn {
            tracing::warn!(attempts = state.attempts, "no acceptable face yet");
            self.listener.on_notice(&Notice::ImproveConditions);
        }

        match outcome.verdict {
            Verdict::Continue => {}
            Verdict::Accept(descriptor) => {
                self.stop_sampling("accepted");
                tracing::info!(
                    attempts = state.attempts,
                    len = descriptor.len(),
                    "face accepted"
                );
                self.listener.on_ok(descriptor);
            }
            Verdict::Abandon => {
                self.stop_sampling("attempt ceiling exceeded");
                tracing::warn!(attempts = state.attempts, "face recognition failed");
                self.listener.on_notice(&Notice::RecognitionFailed);
                self.listener.on_cancel();
            }
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(t) => {
            t.tick().await;
        }
        None => pending().await,
    }
}

async fn join_detection(
    in_flight: &mut Option<JoinHandle<Detection>>,
) -> Result<Detection, JoinError> {
    match in_flight {
        Some(handle) => handle.await,
        None => pending().await,
    }
}
