//! Session phase state machine and the driver that feeds it analysis results.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::acquisition::AcquisitionEvent;
use crate::analysis::AnalysisClient;
use crate::encoded::EncodedImage;
use crate::errors::AnalysisError;
use crate::plant::PlantInfo;

/// Which screen is active. Exactly one holds at a time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// Introduction shown, nothing selected
    #[default]
    Idle,
    Analyzing,
    Result(Box<PlantInfo>),
    /// Last analysis failed; ready for another attempt
    Empty,
}

/// Identifies one analysis request. Only the latest one may change state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisTicket {
    generation: u64,
    issued_at: DateTime<Utc>,
}

impl AnalysisTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Outcome of handing a result back to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Applied,
    /// A newer request or a clear superseded this one
    Stale,
}

#[derive(Debug, Default)]
pub struct SessionController {
    phase: SessionPhase,
    generation: u64,
}

impl SessionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn plant_info(&self) -> Option<&PlantInfo> {
        match &self.phase {
            SessionPhase::Result(info) => Some(&**info),
            _ => None,
        }
    }

    pub fn show_hero(&self) -> bool {
        self.phase == SessionPhase::Idle
    }

    pub fn is_analyzing(&self) -> bool {
        self.phase == SessionPhase::Analyzing
    }

    /// Enter `Analyzing`, dropping any earlier result.
    pub fn begin_analysis(&mut self) -> AnalysisTicket {
        self.generation += 1;
        self.phase = SessionPhase::Analyzing;
        debug!(generation = self.generation, "Analysis started");
        AnalysisTicket {
            generation: self.generation,
            issued_at: Utc::now(),
        }
    }

    pub fn resolve(
        &mut self,
        ticket: AnalysisTicket,
        result: Result<PlantInfo, AnalysisError>,
    ) -> Resolution {
        if ticket.generation != self.generation {
            debug!(
                generation = ticket.generation,
                latest = self.generation,
                "Discarding stale analysis result"
            );
            return Resolution::Stale;
        }

        let elapsed_ms = (Utc::now() - ticket.issued_at).num_milliseconds();
        self.phase = match result {
            Ok(info) => {
                info!(plant = %info.name, elapsed_ms, "Analysis complete");
                SessionPhase::Result(Box::new(info))
            }
            Err(e) => {
                error!(error = %e, elapsed_ms, "Error processing image");
                SessionPhase::Empty
            }
        };
        Resolution::Applied
    }

    /// Back to `Idle`. Any in-flight analysis becomes stale.
    pub fn clear(&mut self) {
        self.generation += 1;
        self.phase = SessionPhase::Idle;
        debug!("Session cleared");
    }
}

/// Connects acquisition events to the analysis client and the controller.
#[derive(Debug, Clone)]
pub struct Session {
    controller: Arc<Mutex<SessionController>>,
    analyzer: Arc<AnalysisClient>,
}

impl Session {
    pub fn new(analyzer: AnalysisClient) -> Self {
        Self {
            controller: Arc::new(Mutex::new(SessionController::new())),
            analyzer: Arc::new(analyzer),
        }
    }

    /// Current phase, cloned for rendering
    pub fn snapshot(&self) -> SessionPhase {
        self.lock().phase().clone()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// React to one acquisition event. Analysis runs on a spawned task; the
    /// handle resolves once the controller has applied or discarded its result.
    pub fn dispatch(&self, event: AcquisitionEvent) -> Option<JoinHandle<Resolution>> {
        match event {
            AcquisitionEvent::Cleared => {
                self.clear();
                None
            }
            AcquisitionEvent::PhotoCaptured(image) => Some(self.submit(async move { Ok(image) })),
            AcquisitionEvent::FileSelected(file) => Some(self.submit(async move {
                EncodedImage::from_file(&file.path)
                    .await
                    .map_err(AnalysisError::from)
            })),
        }
    }

    /// Analyze an already encoded image and wait for the outcome.
    pub async fn analyze(&self, image: EncodedImage) -> Resolution {
        match self.submit(async move { Ok(image) }).await {
            Ok(resolution) => resolution,
            Err(e) => {
                error!(error = %e, "Analysis task failed");
                Resolution::Stale
            }
        }
    }

    fn submit<F>(&self, image: F) -> JoinHandle<Resolution>
    where
        F: std::future::Future<Output = Result<EncodedImage, AnalysisError>> + Send + 'static,
    {
        let ticket = self.lock().begin_analysis();
        let controller = self.controller.clone();
        let analyzer = self.analyzer.clone();

        tokio::spawn(async move {
            let result = match image.await {
                Ok(image) => analyzer.analyze(&image).await,
                Err(e) => Err(e),
            };
            controller
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .resolve(ticket, result)
        })
    }

    fn lock(&self) -> MutexGuard<'_, SessionController> {
        self.controller
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::SelectedFile;
    use crate::analysis::testing::ScriptedModel;
    use crate::analysis::{AnalysisRequest, GenerativeModel};
    use crate::errors::{GeminiError, GeminiResult};
    use crate::plant::fixtures::{monstera, MONSTERA_JSON};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::{oneshot, Mutex as AsyncMutex};

    fn image() -> EncodedImage {
        EncodedImage::from_bytes("image/jpeg", b"\xff\xd8").unwrap()
    }

    #[test]
    fn test_starts_idle_with_hero() {
        let controller = SessionController::new();
        assert_eq!(controller.phase(), &SessionPhase::Idle);
        assert!(controller.show_hero());
        assert!(controller.plant_info().is_none());
    }

    #[test]
    fn test_success_moves_to_result() {
        let mut controller = SessionController::new();
        let ticket = controller.begin_analysis();
        assert!(controller.is_analyzing());
        assert!(!controller.show_hero());

        assert_eq!(controller.resolve(ticket, Ok(monstera())), Resolution::Applied);
        assert_eq!(controller.plant_info(), Some(&monstera()));
    }

    #[test]
    fn test_failure_moves_to_empty() {
        let mut controller = SessionController::new();
        let ticket = controller.begin_analysis();

        controller.resolve(ticket, Err(AnalysisError::NoStructuredData));
        assert_eq!(controller.phase(), &SessionPhase::Empty);
        assert!(!controller.show_hero());
    }

    #[test]
    fn test_new_analysis_drops_previous_result() {
        let mut controller = SessionController::new();
        let first = controller.begin_analysis();
        controller.resolve(first, Ok(monstera()));

        controller.begin_analysis();
        assert_eq!(controller.phase(), &SessionPhase::Analyzing);
        assert!(controller.plant_info().is_none());
    }

    #[test]
    fn test_clear_from_every_phase_returns_to_idle() {
        let mut controller = SessionController::new();
        controller.clear();
        assert_eq!(controller.phase(), &SessionPhase::Idle);

        controller.begin_analysis();
        controller.clear();
        assert_eq!(controller.phase(), &SessionPhase::Idle);

        let ticket = controller.begin_analysis();
        controller.resolve(ticket, Ok(monstera()));
        controller.clear();
        assert_eq!(controller.phase(), &SessionPhase::Idle);
        assert!(controller.plant_info().is_none());

        let ticket = controller.begin_analysis();
        controller.resolve(ticket, Err(AnalysisError::NoStructuredData));
        controller.clear();
        assert!(controller.show_hero());
    }

    #[test]
    fn test_stale_ticket_is_discarded() {
        let mut controller = SessionController::new();
        let older = controller.begin_analysis();
        let newer = controller.begin_analysis();
        assert!(newer.generation() > older.generation());

        assert_eq!(controller.resolve(older, Ok(monstera())), Resolution::Stale);
        assert_eq!(controller.phase(), &SessionPhase::Analyzing);

        assert_eq!(
            controller.resolve(newer, Err(AnalysisError::NoStructuredData)),
            Resolution::Applied
        );
        assert_eq!(controller.phase(), &SessionPhase::Empty);
    }

    #[test]
    fn test_result_after_clear_is_discarded() {
        let mut controller = SessionController::new();
        let ticket = controller.begin_analysis();
        controller.clear();

        assert_eq!(controller.resolve(ticket, Ok(monstera())), Resolution::Stale);
        assert_eq!(controller.phase(), &SessionPhase::Idle);
    }

    #[tokio::test]
    async fn test_session_analyze_success_and_failure() {
        let model = ScriptedModel::replying(vec![
            Ok(MONSTERA_JSON.to_string()),
            Ok("no idea".to_string()),
        ]);
        let session = Session::new(AnalysisClient::new(model));

        assert_eq!(session.analyze(image()).await, Resolution::Applied);
        assert_eq!(session.snapshot(), SessionPhase::Result(Box::new(monstera())));

        assert_eq!(session.analyze(image()).await, Resolution::Applied);
        assert_eq!(session.snapshot(), SessionPhase::Empty);
    }

    #[tokio::test]
    async fn test_dispatch_file_reencodes_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leaf.png");
        image::DynamicImage::new_rgb8(2, 2).save(&path).unwrap();

        let model = ScriptedModel::replying(vec![Ok(MONSTERA_JSON.to_string())]);
        let session = Session::new(AnalysisClient::new(model.clone()));

        let handle = session
            .dispatch(AcquisitionEvent::FileSelected(SelectedFile {
                path,
                media_type: "image/png".to_string(),
            }))
            .unwrap();
        assert_eq!(session.snapshot(), SessionPhase::Analyzing);
        assert_eq!(handle.await.unwrap(), Resolution::Applied);

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen[0].image.media_type(), "image/png");
    }

    #[tokio::test]
    async fn test_dispatch_unreadable_file_ends_empty() {
        let model = ScriptedModel::replying(vec![]);
        let session = Session::new(AnalysisClient::new(model.clone()));

        let handle = session
            .dispatch(AcquisitionEvent::FileSelected(SelectedFile {
                path: "/nonexistent/leaf.png".into(),
                media_type: "image/png".to_string(),
            }))
            .unwrap();

        assert_eq!(handle.await.unwrap(), Resolution::Applied);
        assert_eq!(session.snapshot(), SessionPhase::Empty);
        assert!(model.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_clear_returns_idle() {
        let model = ScriptedModel::replying(vec![Ok(MONSTERA_JSON.to_string())]);
        let session = Session::new(AnalysisClient::new(model));
        session.analyze(image()).await;

        assert!(session.dispatch(AcquisitionEvent::Cleared).is_none());
        assert_eq!(session.snapshot(), SessionPhase::Idle);
    }

    /// Holds each reply until the test releases it.
    #[derive(Debug, Default)]
    struct GatedModel {
        gates: AsyncMutex<Vec<oneshot::Receiver<GeminiResult<String>>>>,
        claimed: AtomicUsize,
    }

    #[async_trait]
    impl GenerativeModel for GatedModel {
        async fn generate(&self, _request: &AnalysisRequest) -> GeminiResult<String> {
            let gate = self.gates.lock().await.remove(0);
            self.claimed.fetch_add(1, Ordering::SeqCst);
            gate.await
                .unwrap_or_else(|_| Err(GeminiError::ApiError("gate dropped".to_string())))
        }
    }

    #[tokio::test]
    async fn test_overlapping_analyses_keep_only_latest() {
        let (first_tx, first_rx) = oneshot::channel();
        let (second_tx, second_rx) = oneshot::channel();
        let model = Arc::new(GatedModel {
            gates: AsyncMutex::new(vec![first_rx, second_rx]),
            claimed: AtomicUsize::new(0),
        });
        let session = Session::new(AnalysisClient::new(model.clone()));

        let first = session
            .dispatch(AcquisitionEvent::PhotoCaptured(image()))
            .unwrap();
        // The first task must hold the first gate before the second starts.
        while model.claimed.load(Ordering::SeqCst) < 1 {
            tokio::task::yield_now().await;
        }
        let second = session
            .dispatch(AcquisitionEvent::PhotoCaptured(image()))
            .unwrap();

        second_tx.send(Ok(MONSTERA_JSON.to_string())).unwrap();
        assert_eq!(second.await.unwrap(), Resolution::Applied);

        first_tx.send(Ok("{ invalid json".to_string())).unwrap();
        assert_eq!(first.await.unwrap(), Resolution::Stale);

        assert_eq!(session.snapshot(), SessionPhase::Result(Box::new(monstera())));
    }
}
