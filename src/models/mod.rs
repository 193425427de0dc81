//! Model backends

pub mod classifier;
pub mod loader;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod tree_ensemble;

pub use classifier::Classifier;
pub use loader::ModelLoader;
pub use tree_ensemble::TreeEnsemble;
