// Inference: trait-based abstraction over the classifier.
//
// InferenceAdapter defines the interface. OnnxInferenceAdapter runs the
// model locally; StaticInference returns fixtures for tests and debugging.

pub mod download;
pub mod onnx;
pub mod traits;
