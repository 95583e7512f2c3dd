//! Architecture-dispatch layer for model construction
//!
//! Concrete architectures are tagged strategy values (a [`Backbone`]
//! family paired with a task [`Head`]), not an inheritance chain. The
//! [`ModelWrapper`] fixes an architecture name and exposes
//! model-agnostic construction: wrap a fresh backbone, chain from a
//! prior model, or restore from a stored checkpoint. The actual forward
//! pass lives in the surrounding model-definition collaborator — this
//! layer only assembles parameter state and applies the final
//! activation.

pub mod backbone;
mod init;
pub mod wrapper;

pub use backbone::Backbone;
pub use wrapper::{Head, ModelWrapper};
