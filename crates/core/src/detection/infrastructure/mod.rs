pub mod replay_inference_gateway;
