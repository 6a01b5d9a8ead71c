use async_trait::async_trait;
use thiserror::Error;

use super::face_result::RawFaceResult;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error("failed to read model data: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse model data: {0}")]
    Parse(String),
    #[error("model unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("models are not loaded")]
    NotLoaded,
    #[error("inference backend failed: {0}")]
    Backend(String),
    #[error("inference produced an invalid face result: {0}")]
    InvalidResult(String),
}

/// Call boundary to the face/age/gender/expression model.
///
/// `load` must be idempotent: once it has succeeded, further calls return
/// `Ok(())` without doing any work. `detect` may suspend; an empty vector
/// means no faces, not failure.
#[async_trait]
pub trait InferenceGateway: Send + Sync {
    async fn load(&self) -> Result<(), ModelLoadError>;

    async fn detect(&self, frame: &Frame) -> Result<Vec<RawFaceResult>, InferenceError>;
}

/// Rejects a gateway response containing a face with out-of-range
/// attributes. Expression probabilities are already checked when built.
pub fn check_faces(faces: Vec<RawFaceResult>) -> Result<Vec<RawFaceResult>, InferenceError> {
    for (index, face) in faces.iter().enumerate() {
        face.validate()
            .map_err(|e| InferenceError::InvalidResult(format!("face {index}: {e}")))?;
    }
    Ok(faces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::expression::ExpressionProbabilities;
    use crate::detection::domain::face_result::Gender;
    use crate::shared::bounding_box::BoundingBox;

    fn face(age: f64, gender_probability: f64) -> RawFaceResult {
        RawFaceResult {
            bounding_box: BoundingBox::new(0.0, 0.0, 20.0, 20.0),
            expressions: ExpressionProbabilities::new([0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0])
                .unwrap(),
            age,
            gender: Gender::Male,
            gender_probability,
        }
    }

    #[test]
    fn test_check_faces_passes_valid_response_through() {
        let faces = vec![face(30.0, 0.9), face(12.0, 0.6)];
        assert_eq!(check_faces(faces.clone()).unwrap(), faces);
        assert!(check_faces(Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn test_check_faces_names_offending_face() {
        let result = check_faces(vec![face(30.0, 0.9), face(30.0, 1.7)]);
        match result {
            Err(InferenceError::InvalidResult(message)) => assert!(message.starts_with("face 1:")),
            other => panic!("expected InvalidResult, got {other:?}"),
        }
    }
}
