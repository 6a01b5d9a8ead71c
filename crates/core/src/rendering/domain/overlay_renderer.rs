use crate::aggregate::domain::session_aggregate::GenderCount;
use crate::detection::domain::expression_resolver::DominantExpression;
use crate::detection::domain::face_result::RawFaceResult;
use crate::shared::constants::MIN_EXPRESSION_PROBABILITY;
use crate::shared::frame::Dimensions;

use super::overlay_surface::{OverlaySurface, TextAnchor};

/// Everything needed to annotate one face: the raw result, its resolved
/// expression, and the gender count as of the moment it was recorded.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceAnnotation {
    pub face: RawFaceResult,
    pub expression: DominantExpression,
    pub count: GenderCount,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Surface cleared and this many faces drawn.
    Drawn(usize),
    /// No drawing context; nothing happened.
    Unavailable,
}

/// Clears and redraws the overlay for one cycle.
pub struct OverlayRenderer {
    min_expression_probability: f64,
}

impl OverlayRenderer {
    pub fn new(min_expression_probability: f64) -> Self {
        Self {
            min_expression_probability,
        }
    }

    /// Draws one box and one label per annotation, in order.
    ///
    /// `source` is the size of the frame the results were computed on; boxes
    /// are scaled from it onto the surface's current dimensions.
    pub fn render(
        &self,
        surface: &mut dyn OverlaySurface,
        source: Dimensions,
        annotations: &[FaceAnnotation],
    ) -> RenderOutcome {
        let display = surface.dimensions();
        let Some(ctx) = surface.context() else {
            log::debug!("Overlay drawing context unavailable; skipping render");
            return RenderOutcome::Unavailable;
        };

        ctx.clear();
        for annotation in annotations {
            let bbox = annotation.face.bounding_box.scale(source, display);
            ctx.draw_box(&bbox);
            ctx.draw_text(&self.label(annotation), TextAnchor::below(&bbox));
        }
        RenderOutcome::Drawn(annotations.len())
    }

    pub fn clear(&self, surface: &mut dyn OverlaySurface) -> RenderOutcome {
        match surface.context() {
            Some(ctx) => {
                ctx.clear();
                RenderOutcome::Drawn(0)
            }
            None => RenderOutcome::Unavailable,
        }
    }

    /// `male_2 (age 31, happy 0.93)`; the expression part is omitted below
    /// the minimum probability.
    pub fn label(&self, annotation: &FaceAnnotation) -> String {
        let gender = annotation.face.gender;
        let running = annotation.count.get(gender);
        let age = annotation.face.age.round() as i64;
        let expression = &annotation.expression;

        if expression.probability < self.min_expression_probability {
            format!("{gender}_{running} (age {age})")
        } else {
            format!(
                "{gender}_{running} (age {age}, {} {:.2})",
                expression.label, expression.probability
            )
        }
    }
}

impl Default for OverlayRenderer {
    fn default() -> Self {
        Self::new(MIN_EXPRESSION_PROBABILITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::expression::ExpressionProbabilities;
    use crate::detection::domain::expression_resolver::resolve;
    use crate::detection::domain::face_result::Gender;
    use crate::rendering::infrastructure::recording_surface::{DrawCall, RecordingSurface};
    use crate::shared::bounding_box::BoundingBox;
    use approx::assert_relative_eq;

    fn annotation(gender: Gender, age: f64, values: [f64; 7], count: GenderCount) -> FaceAnnotation {
        let expressions = ExpressionProbabilities::new(values).unwrap();
        FaceAnnotation {
            face: RawFaceResult {
                bounding_box: BoundingBox::new(100.0, 50.0, 80.0, 100.0),
                expressions,
                age,
                gender,
                gender_probability: 0.95,
            },
            expression: resolve(&expressions),
            count,
        }
    }

    const HAPPY: [f64; 7] = [0.02, 0.93, 0.01, 0.01, 0.01, 0.01, 0.01];

    #[test]
    fn test_label_format() {
        let renderer = OverlayRenderer::default();
        let a = annotation(Gender::Male, 31.4, HAPPY, GenderCount::new(4, 2));
        assert_eq!(renderer.label(&a), "male_2 (age 31, happy 0.93)");
    }

    #[test]
    fn test_label_rounds_age_half_up() {
        let renderer = OverlayRenderer::default();
        let a = annotation(Gender::Female, 24.5, HAPPY, GenderCount::new(1, 0));
        assert_eq!(renderer.label(&a), "female_1 (age 25, happy 0.93)");
    }

    #[test]
    fn test_label_omits_weak_expression() {
        let renderer = OverlayRenderer::new(0.5);
        let a = annotation(
            Gender::Female,
            40.0,
            [0.3, 0.2, 0.1, 0.1, 0.1, 0.1, 0.1],
            GenderCount::new(1, 0),
        );
        assert_eq!(renderer.label(&a), "female_1 (age 40)");
    }

    #[test]
    fn test_render_clears_then_draws_each_face() {
        let renderer = OverlayRenderer::default();
        let mut surface = RecordingSurface::new(Dimensions::new(640, 480));
        let journal = surface.journal();
        let faces = vec![
            annotation(Gender::Male, 30.0, HAPPY, GenderCount::new(0, 1)),
            annotation(Gender::Female, 22.0, HAPPY, GenderCount::new(1, 1)),
        ];

        let outcome = renderer.render(&mut surface, Dimensions::new(640, 480), &faces);

        assert_eq!(outcome, RenderOutcome::Drawn(2));
        let calls = journal.calls();
        assert_eq!(calls[0], DrawCall::Clear);
        assert_eq!(journal.boxes().len(), 2);
        let texts = journal.texts();
        assert!(texts[0].starts_with("male_1 ("));
        assert!(texts[1].starts_with("female_1 ("));
    }

    #[test]
    fn test_render_anchors_label_below_box() {
        let renderer = OverlayRenderer::default();
        let mut surface = RecordingSurface::new(Dimensions::new(640, 480));
        let journal = surface.journal();
        let faces = vec![annotation(Gender::Male, 30.0, HAPPY, GenderCount::new(0, 1))];

        renderer.render(&mut surface, Dimensions::new(640, 480), &faces);

        match &journal.calls()[2] {
            DrawCall::Text(_, anchor) => {
                assert_relative_eq!(anchor.x, 100.0);
                assert_relative_eq!(anchor.y, 150.0);
                assert_relative_eq!(anchor.box_top, 50.0);
            }
            other => panic!("expected text call, got {other:?}"),
        }
    }

    #[test]
    fn test_render_scales_boxes_to_surface() {
        let renderer = OverlayRenderer::default();
        let mut surface = RecordingSurface::new(Dimensions::new(320, 240));
        let journal = surface.journal();
        let faces = vec![annotation(Gender::Male, 30.0, HAPPY, GenderCount::new(0, 1))];

        renderer.render(&mut surface, Dimensions::new(640, 480), &faces);

        let b = journal.boxes()[0];
        assert_relative_eq!(b.x, 50.0);
        assert_relative_eq!(b.y, 25.0);
        assert_relative_eq!(b.width, 40.0);
        assert_relative_eq!(b.height, 50.0);
    }

    #[test]
    fn test_no_faces_only_clears() {
        let renderer = OverlayRenderer::default();
        let mut surface = RecordingSurface::new(Dimensions::new(640, 480));
        let journal = surface.journal();

        let outcome = renderer.render(&mut surface, Dimensions::new(640, 480), &[]);

        assert_eq!(outcome, RenderOutcome::Drawn(0));
        assert_eq!(journal.calls(), vec![DrawCall::Clear]);
    }

    #[test]
    fn test_unavailable_context_is_noop() {
        let renderer = OverlayRenderer::default();
        let mut surface = RecordingSurface::unavailable();
        let journal = surface.journal();
        let faces = vec![annotation(Gender::Male, 30.0, HAPPY, GenderCount::new(0, 1))];

        let outcome = renderer.render(&mut surface, Dimensions::new(640, 480), &faces);

        assert_eq!(outcome, RenderOutcome::Unavailable);
        assert!(journal.calls().is_empty());
        assert_eq!(renderer.clear(&mut surface), RenderOutcome::Unavailable);
    }
}
