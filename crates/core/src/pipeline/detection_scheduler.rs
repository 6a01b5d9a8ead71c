use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::aggregate::domain::session_aggregate::{GenderCount, SessionAggregate};
use crate::capture::domain::frame_source::{CaptureError, FrameSource};
use crate::capture::infrastructure::still_image_loader::{StillImageLoader, UploadError};
use crate::detection::domain::inference_gateway::{check_faces, InferenceGateway, ModelLoadError};
use crate::pipeline::cycle_logger::{CycleLogger, CycleOutcome, NullCycleLogger};
use crate::pipeline::detection_cycle::{apply, CycleReport, CycleSink};
use crate::rendering::domain::overlay_renderer::OverlayRenderer;
use crate::rendering::domain::overlay_surface::OverlaySurface;
use crate::shared::config::DetectorConfig;
use crate::shared::frame::Frame;
use crate::state::domain::app_state::AppAction;
use crate::state::domain::state_store::StateStore;
use crate::status::domain::detection_status::DetectionOutcome;
use crate::status::domain::status_reporter::StatusReporter;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    /// A cadence is (or was, until its source ran dry) driving cycles.
    Live,
    /// A single still-image cycle is in flight.
    OneShot,
}

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("live detection is already running")]
    AlreadyRunning,
    #[error("face detection models are not loaded")]
    ModelsNotLoaded,
    #[error("live detection needs a Tokio runtime")]
    NoRuntime,
    #[error("failed to load face detection models: {0}")]
    ModelLoad(#[from] ModelLoadError),
    #[error("frame capture failed: {0}")]
    Capture(#[from] CaptureError),
    #[error("image upload rejected: {0}")]
    Upload(#[from] UploadError),
}

/// Outcome of [`DetectionScheduler::analyze_image`].
#[derive(Debug)]
pub struct ImageAnalysis {
    pub frame: Frame,
    pub report: CycleReport,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CycleMode {
    Live,
    OneShot,
}

/// Everything guarded by the session lock.
struct Session {
    state: SchedulerState,
    aggregate: SessionAggregate,
    surface: Box<dyn OverlaySurface>,
    reporter: StatusReporter,
    logger: Box<dyn CycleLogger>,
    cadence: Option<JoinHandle<()>>,
}

struct Shared {
    gateway: Arc<dyn InferenceGateway>,
    store: Arc<dyn StateStore>,
    renderer: OverlayRenderer,
    /// Bumped whenever a session starts or ends. Only compared or changed
    /// while `session` is locked.
    epoch: AtomicU64,
    session: Mutex<Session>,
    /// Latest epoch whose cadence is no longer producing cycles.
    cadence_ended: watch::Sender<u64>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    fn next_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn mark_cadence_ended(&self, epoch: u64) {
        self.cadence_ended.send_modify(|ended| *ended = (*ended).max(epoch));
    }
}

/// Drives detection cycles: a fixed cadence over a live feed, or a single
/// pass over a still image.
///
/// Every cycle captures the session epoch before awaiting inference and
/// re-checks it under the session lock before touching the aggregate, the
/// overlay or the store. `stop` bumps the epoch under the same lock, so a
/// cycle that resumes after `stop` is discarded.
pub struct DetectionScheduler {
    shared: Arc<Shared>,
    interval: Duration,
    models_loaded: AtomicBool,
    load_gate: tokio::sync::Mutex<()>,
}

impl DetectionScheduler {
    pub fn new(
        gateway: Arc<dyn InferenceGateway>,
        surface: Box<dyn OverlaySurface>,
        store: Arc<dyn StateStore>,
        config: &DetectorConfig,
    ) -> Self {
        let (cadence_ended, _) = watch::channel(0);
        let session = Session {
            state: SchedulerState::Idle,
            aggregate: SessionAggregate::new(),
            surface,
            reporter: StatusReporter::new(store.clone()),
            logger: Box::new(NullCycleLogger),
            cadence: None,
        };
        Self {
            shared: Arc::new(Shared {
                gateway,
                store,
                renderer: OverlayRenderer::new(config.min_expression_probability),
                epoch: AtomicU64::new(0),
                session: Mutex::new(session),
                cadence_ended,
            }),
            interval: config.interval(),
            models_loaded: AtomicBool::new(false),
            load_gate: tokio::sync::Mutex::new(()),
        }
    }

    pub fn with_logger(self, logger: Box<dyn CycleLogger>) -> Self {
        self.shared.lock().logger = logger;
        self
    }

    pub fn state(&self) -> SchedulerState {
        self.shared.lock().state
    }

    pub fn models_loaded(&self) -> bool {
        self.models_loaded.load(Ordering::SeqCst)
    }

    /// The working count of the current live session.
    pub fn gender_count(&self) -> GenderCount {
        self.shared.lock().aggregate.current()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Makes the models ready. Once this has succeeded, later calls return
    /// immediately without publishing anything; after a failure the next call
    /// tries again.
    pub async fn load_models(&self) -> Result<(), SchedulerError> {
        let _gate = self.load_gate.lock().await;
        if self.models_loaded() {
            return Ok(());
        }

        self.shared
            .lock()
            .reporter
            .report(DetectionOutcome::ModelLoading);

        match self.shared.gateway.load().await {
            Ok(()) => {
                self.models_loaded.store(true, Ordering::SeqCst);
                self.shared
                    .lock()
                    .reporter
                    .report(DetectionOutcome::ModelLoaded);
                log::info!("Face detection models loaded");
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to load face detection models: {e}");
                self.shared
                    .lock()
                    .reporter
                    .report(DetectionOutcome::ModelLoadFailed);
                Err(e.into())
            }
        }
    }

    /// Idle → Live. Sizes the overlay to the feed, seeds the session count
    /// from the store, and starts the cadence. The first cycle fires one
    /// interval after this returns.
    ///
    /// Supersedes an in-flight one-shot cycle. Must be called from within a
    /// Tokio runtime.
    pub fn start_live(&self, source: Box<dyn FrameSource>) -> Result<(), SchedulerError> {
        if !self.models_loaded() {
            return Err(SchedulerError::ModelsNotLoaded);
        }
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| SchedulerError::NoRuntime)?;

        let mut guard = self.shared.lock();
        if guard.state == SchedulerState::Live {
            return Err(SchedulerError::AlreadyRunning);
        }
        let epoch = self.shared.next_epoch();
        let session = &mut *guard;

        let dimensions = source.dimensions();
        session.surface.resize(dimensions);

        let carry_over = self.shared.store.snapshot().gender_count;
        session.aggregate.start_session(carry_over);

        self.shared.store.dispatch(AppAction::SetImageSource(None));
        self.shared.store.dispatch(AppAction::StartWebcam);
        session.reporter.report(DetectionOutcome::DetectionStarted);
        session.logger.info(&format!(
            "Live detection started ({}x{}, every {}ms, carry-over {} female / {} male)",
            dimensions.width,
            dimensions.height,
            self.interval.as_millis(),
            carry_over.female,
            carry_over.male
        ));

        session.state = SchedulerState::Live;
        session.cadence = Some(runtime.spawn(run_cadence(
            self.shared.clone(),
            source,
            epoch,
            self.interval,
        )));
        Ok(())
    }

    /// Live → Idle. Cancels the cadence, discards any in-flight cycle, resets
    /// the working count and clears the overlay and the status.
    ///
    /// The last published gender count is left in the store so a later
    /// session can carry it over.
    pub fn stop(&self) {
        let mut guard = self.shared.lock();
        self.stop_locked(&mut guard);
    }

    fn stop_locked(&self, session: &mut Session) {
        let epoch = self.shared.next_epoch();
        if let Some(cadence) = session.cadence.take() {
            cadence.abort();
        }
        let was_live = session.state == SchedulerState::Live;
        session.state = SchedulerState::Idle;
        session.aggregate.reset();
        self.shared.renderer.clear(session.surface.as_mut());
        self.shared.store.dispatch(AppAction::StopWebcam);
        session.reporter.clear();
        self.shared.mark_cadence_ended(epoch);

        if was_live {
            session.logger.info("Live detection stopped");
            session.logger.summary();
        }
    }

    /// Idle → OneShot → Idle around a single cycle on `frame`.
    ///
    /// A running live session is stopped first. Faces are counted from zero;
    /// the resulting count is published but never merged into a live session.
    pub async fn run_once(&self, frame: &Frame) -> Result<CycleReport, SchedulerError> {
        if !self.models_loaded() {
            return Err(SchedulerError::ModelsNotLoaded);
        }

        let epoch = {
            let mut guard = self.shared.lock();
            if guard.state == SchedulerState::Live {
                log::info!("Stopping live detection for still image");
                self.stop_locked(&mut guard);
            }
            let epoch = self.shared.next_epoch();
            guard.state = SchedulerState::OneShot;
            guard.surface.resize(frame.dimensions());
            epoch
        };

        let report = run_cycle(self.shared.clone(), frame, epoch, CycleMode::OneShot).await;

        let mut guard = self.shared.lock();
        if guard.state == SchedulerState::OneShot && self.shared.current_epoch() == epoch {
            guard.state = SchedulerState::Idle;
        }
        Ok(report)
    }

    /// Validates and decodes an uploaded still image, then runs one cycle on
    /// it. A rejected upload publishes a failure status.
    ///
    /// The decoded frame is handed back so callers can composite the overlay
    /// over it without decoding the file again.
    pub async fn analyze_image(
        &self,
        loader: &StillImageLoader,
        path: &Path,
    ) -> Result<ImageAnalysis, SchedulerError> {
        let frame = match loader.load(path) {
            Ok(frame) => frame,
            Err(e) => {
                log::error!("Error uploading image {}: {e}", path.display());
                self.shared
                    .lock()
                    .reporter
                    .report(DetectionOutcome::ImageLoadFailed);
                return Err(e.into());
            }
        };
        self.shared
            .store
            .dispatch(AppAction::SetImageSource(Some(path.display().to_string())));
        let report = self.run_once(&frame).await?;
        Ok(ImageAnalysis { frame, report })
    }

    /// Drops the current still image: its pending cycle, overlay and status.
    pub fn clear_image(&self) {
        let mut guard = self.shared.lock();
        if guard.state == SchedulerState::OneShot {
            self.shared.next_epoch();
            guard.state = SchedulerState::Idle;
        }
        self.shared.store.dispatch(AppAction::SetImageSource(None));
        self.shared.renderer.clear(guard.surface.as_mut());
        guard.reporter.clear();
    }

    /// Zeroes the working count, publishes {0, 0} and clears the status.
    pub fn reset_counts(&self) {
        let mut guard = self.shared.lock();
        guard.aggregate.reset();
        self.shared
            .store
            .dispatch(AppAction::SetGenderCount(GenderCount::default()));
        guard.reporter.clear();
    }

    /// Resolves once the current live cadence has stopped producing cycles,
    /// either because its source is exhausted (after the last in-flight cycle
    /// finished) or because the session was stopped. Returns immediately when
    /// not live.
    pub async fn wait_until_exhausted(&self) {
        let mut ended = self.shared.cadence_ended.subscribe();
        let epoch = {
            let guard = self.shared.lock();
            if guard.state != SchedulerState::Live {
                return;
            }
            self.shared.current_epoch()
        };
        // The sender lives in `shared`, so the channel cannot close here.
        let _ = ended.wait_for(|last| *last >= epoch).await;
    }

    pub fn log_summary(&self) {
        self.shared.lock().logger.summary();
    }
}

impl Drop for DetectionScheduler {
    fn drop(&mut self) {
        let mut guard = self.shared.lock();
        if let Some(cadence) = guard.cadence.take() {
            cadence.abort();
        }
    }
}

async fn run_cadence(
    shared: Arc<Shared>,
    mut source: Box<dyn FrameSource>,
    epoch: u64,
    period: Duration,
) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut in_flight: Vec<JoinHandle<CycleReport>> = Vec::new();

    loop {
        ticker.tick().await;
        if shared.current_epoch() != epoch {
            return;
        }
        in_flight.retain(|cycle| !cycle.is_finished());

        match source.grab() {
            Ok(Some(frame)) => {
                let shared = shared.clone();
                in_flight.push(tokio::spawn(async move {
                    run_cycle(shared, &frame, epoch, CycleMode::Live).await
                }));
            }
            Ok(None) => break,
            Err(e) => log::warn!("Frame capture failed, skipping tick: {e}"),
        }
    }

    log::info!(
        "Frame source exhausted; waiting for {} in-flight cycle(s)",
        in_flight.len()
    );
    for cycle in in_flight {
        let _ = cycle.await;
    }
    shared.mark_cadence_ended(epoch);
}

async fn run_cycle(shared: Arc<Shared>, frame: &Frame, epoch: u64, mode: CycleMode) -> CycleReport {
    let started = Instant::now();
    let result = shared.gateway.detect(frame).await.and_then(check_faces);
    let inference_ms = started.elapsed().as_secs_f64() * 1000.0;

    let mut guard = shared.lock();
    if shared.current_epoch() != epoch {
        log::debug!(
            "Discarding results for frame {}: session {epoch} has ended",
            frame.index()
        );
        guard.logger.cycle(CycleOutcome::Discarded);
        return CycleReport::discarded();
    }

    let session = &mut *guard;
    session.logger.timing("inference", inference_ms);

    let mut one_shot = SessionAggregate::new();
    let aggregate = match mode {
        CycleMode::Live => &mut session.aggregate,
        CycleMode::OneShot => &mut one_shot,
    };

    let apply_started = Instant::now();
    let report = apply(
        CycleSink {
            aggregate,
            surface: session.surface.as_mut(),
            reporter: &mut session.reporter,
            renderer: &shared.renderer,
            logger: session.logger.as_mut(),
            store: shared.store.as_ref(),
        },
        frame.dimensions(),
        result,
    );
    session
        .logger
        .timing("apply", apply_started.elapsed().as_secs_f64() * 1000.0);
    report
}
