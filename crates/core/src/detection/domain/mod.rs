pub mod expression;
pub mod expression_resolver;
pub mod face_result;
pub mod inference_gateway;
