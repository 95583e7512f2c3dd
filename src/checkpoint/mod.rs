//! Versioned checkpoint persistence
//!
//! A checkpoint is identified by `(architecture, version, seed)` and
//! stores two logical payloads: an opaque parameter-name → tensor
//! mapping ([`ModelState`]) and a [`Metadata`] record carrying the best
//! achieved score and resumable epoch. The [`CheckpointManager`] is an
//! explicitly constructed service bound to a storage root — callers
//! receive it by reference, there is no process-wide singleton.

pub mod key;
pub mod manager;
pub mod metadata;
pub mod state;

pub use key::Checkpoint;
pub use manager::CheckpointManager;
pub use metadata::Metadata;
pub use state::{ModelState, ShapeSpec};
