use crate::aggregate::domain::session_aggregate::{GenderCount, SessionAggregate};
use crate::detection::domain::expression_resolver::resolve;
use crate::detection::domain::face_result::RawFaceResult;
use crate::detection::domain::inference_gateway::InferenceError;
use crate::pipeline::cycle_logger::{CycleLogger, CycleOutcome};
use crate::rendering::domain::overlay_renderer::{FaceAnnotation, OverlayRenderer, RenderOutcome};
use crate::rendering::domain::overlay_surface::OverlaySurface;
use crate::shared::frame::Dimensions;
use crate::state::domain::app_state::AppAction;
use crate::state::domain::state_store::StateStore;
use crate::status::domain::detection_status::{DetectionOutcome, DetectionStatus};
use crate::status::domain::status_reporter::StatusReporter;

/// What one detection cycle did.
#[derive(Clone, Debug, PartialEq)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    /// `None` when the cycle was discarded before drawing.
    pub render: Option<RenderOutcome>,
    pub status: Option<DetectionStatus>,
    /// Gender count after the cycle, `None` when discarded.
    pub gender_count: Option<GenderCount>,
}

impl CycleReport {
    pub fn discarded() -> Self {
        Self {
            outcome: CycleOutcome::Discarded,
            render: None,
            status: None,
            gender_count: None,
        }
    }

    pub fn faces(&self) -> usize {
        match self.outcome {
            CycleOutcome::Applied(n) => n,
            _ => 0,
        }
    }
}

/// Everything a cycle may touch once it has been confirmed current.
pub(crate) struct CycleSink<'a> {
    pub aggregate: &'a mut SessionAggregate,
    pub surface: &'a mut dyn OverlaySurface,
    pub reporter: &'a mut StatusReporter,
    pub renderer: &'a OverlayRenderer,
    pub logger: &'a mut dyn CycleLogger,
    pub store: &'a dyn StateStore,
}

/// Resolves each face's expression and counts it, in result order.
///
/// Each annotation carries the count as of its own face, so later faces in
/// the same cycle see the earlier ones.
pub fn annotate(faces: Vec<RawFaceResult>, aggregate: &mut SessionAggregate) -> Vec<FaceAnnotation> {
    faces
        .into_iter()
        .map(|face| {
            let expression = resolve(&face.expressions);
            let count = aggregate.record_face(face.gender);
            FaceAnnotation {
                face,
                expression,
                count,
            }
        })
        .collect()
}

/// Applies an inference response: count, draw, publish.
///
/// An inference failure clears the overlay and publishes an error status;
/// the aggregate is left untouched.
pub(crate) fn apply(
    sink: CycleSink<'_>,
    source: Dimensions,
    result: Result<Vec<RawFaceResult>, InferenceError>,
) -> CycleReport {
    match result {
        Ok(faces) => {
            let annotations = annotate(faces, sink.aggregate);
            let n = annotations.len();
            let render = sink.renderer.render(sink.surface, source, &annotations);
            if render == RenderOutcome::Unavailable {
                log::debug!("Overlay unavailable; {n} face(s) counted but not drawn");
            }

            let outcome = if n == 0 {
                DetectionOutcome::NoFacesDetected
            } else {
                DetectionOutcome::FacesDetected(n)
            };
            let status = sink.reporter.report(outcome);
            let count = sink.aggregate.current();
            sink.store.dispatch(AppAction::SetGenderCount(count));
            sink.logger.cycle(CycleOutcome::Applied(n));

            CycleReport {
                outcome: CycleOutcome::Applied(n),
                render: Some(render),
                status: Some(status),
                gender_count: Some(count),
            }
        }
        Err(e) => {
            log::warn!("Face detection error: {e}");
            let render = sink.renderer.clear(sink.surface);
            let status = sink.reporter.report(DetectionOutcome::DetectionError);
            sink.logger.cycle(CycleOutcome::Failed);

            CycleReport {
                outcome: CycleOutcome::Failed,
                render: Some(render),
                status: Some(status),
                gender_count: Some(sink.aggregate.current()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::expression::{Expression, ExpressionProbabilities};
    use crate::detection::domain::face_result::Gender;
    use crate::pipeline::cycle_logger::NullCycleLogger;
    use crate::rendering::infrastructure::recording_surface::{DrawCall, RecordingSurface};
    use crate::shared::bounding_box::BoundingBox;
    use crate::state::infrastructure::in_memory_store::InMemoryStore;
    use std::sync::Arc;

    fn face(gender: Gender, values: [f64; 7]) -> RawFaceResult {
        RawFaceResult {
            bounding_box: BoundingBox::new(10.0, 10.0, 40.0, 50.0),
            expressions: ExpressionProbabilities::new(values).unwrap(),
            age: 28.0,
            gender,
            gender_probability: 0.9,
        }
    }

    const SURPRISED: [f64; 7] = [0.1, 0.0, 0.0, 0.0, 0.0, 0.0, 0.9];

    struct Harness {
        aggregate: SessionAggregate,
        surface: RecordingSurface,
        reporter: StatusReporter,
        renderer: OverlayRenderer,
        logger: NullCycleLogger,
        store: Arc<InMemoryStore>,
    }

    impl Harness {
        fn new() -> Self {
            let store = Arc::new(InMemoryStore::new());
            Self {
                aggregate: SessionAggregate::new(),
                surface: RecordingSurface::new(Dimensions::new(100, 100)),
                reporter: StatusReporter::new(store.clone()),
                renderer: OverlayRenderer::default(),
                logger: NullCycleLogger,
                store,
            }
        }

        fn apply(&mut self, result: Result<Vec<RawFaceResult>, InferenceError>) -> CycleReport {
            let sink = CycleSink {
                aggregate: &mut self.aggregate,
                surface: &mut self.surface,
                reporter: &mut self.reporter,
                renderer: &self.renderer,
                logger: &mut self.logger,
                store: self.store.as_ref(),
            };
            apply(sink, Dimensions::new(100, 100), result)
        }
    }

    #[test]
    fn test_annotate_running_counts_in_order() {
        let mut aggregate = SessionAggregate::new();
        let annotations = annotate(
            vec![
                face(Gender::Female, SURPRISED),
                face(Gender::Male, SURPRISED),
                face(Gender::Female, SURPRISED),
            ],
            &mut aggregate,
        );
        let counts: Vec<_> = annotations.iter().map(|a| a.count).collect();
        assert_eq!(
            counts,
            vec![
                GenderCount::new(1, 0),
                GenderCount::new(1, 1),
                GenderCount::new(2, 1)
            ]
        );
        assert_eq!(annotations[0].expression.label, Expression::Surprised);
    }

    #[test]
    fn test_apply_faces_draws_counts_and_publishes() {
        let mut harness = Harness::new();
        let journal = harness.surface.journal();

        let report = harness.apply(Ok(vec![face(Gender::Male, SURPRISED)]));

        assert_eq!(report.outcome, CycleOutcome::Applied(1));
        assert_eq!(report.render, Some(RenderOutcome::Drawn(1)));
        assert_eq!(journal.texts(), vec!["male_1 (age 28, surprised 0.90)"]);
        let state = harness.store.snapshot();
        assert_eq!(state.gender_count, GenderCount::new(0, 1));
        assert_eq!(state.detection_status.unwrap().message, "Detected 1 face(s)");
    }

    #[test]
    fn test_apply_no_faces_clears_only() {
        let mut harness = Harness::new();
        let journal = harness.surface.journal();

        let report = harness.apply(Ok(vec![]));

        assert_eq!(report.outcome, CycleOutcome::Applied(0));
        assert_eq!(journal.calls(), vec![DrawCall::Clear]);
        let status = report.status.unwrap();
        assert!(!status.success);
        assert_eq!(status.message, "No faces detected in the image");
    }

    #[test]
    fn test_apply_error_leaves_aggregate_and_clears() {
        let mut harness = Harness::new();
        harness.aggregate.start_session(GenderCount::new(2, 2));
        let journal = harness.surface.journal();

        let report = harness.apply(Err(InferenceError::Backend("boom".into())));

        assert_eq!(report.outcome, CycleOutcome::Failed);
        assert_eq!(report.gender_count, Some(GenderCount::new(2, 2)));
        assert_eq!(journal.calls(), vec![DrawCall::Clear]);
        assert_eq!(
            report.status.unwrap().message,
            "Error during face detection"
        );
        assert!(harness
            .store
            .journal()
            .iter()
            .all(|a| !matches!(a, AppAction::SetGenderCount(_))));
    }

    #[test]
    fn test_unavailable_surface_still_counts() {
        let mut harness = Harness::new();
        harness.surface = RecordingSurface::unavailable();

        let report = harness.apply(Ok(vec![face(Gender::Female, SURPRISED)]));

        assert_eq!(report.render, Some(RenderOutcome::Unavailable));
        assert_eq!(report.gender_count, Some(GenderCount::new(1, 0)));
        assert_eq!(report.faces(), 1);
    }
}
