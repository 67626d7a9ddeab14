//! Parser, validator, and playback evaluator for GrimE engine KEY
//! keyframe animation files.
//!
//! A KEY resource stores per-joint pose samples in either a binary layout
//! (magic tag `FYEK`) or an equivalent line-oriented text form. This crate
//! loads both into one [`KeyframeAnim`] shape, answers time-synchronized
//! pose queries against it, and blends the result additively into caller
//! owned [`ModelNode`]s.

// Re-export main components
pub mod anim;
pub mod cache;
pub mod error;
pub mod io_ext;
pub mod keyframe;
pub mod math;
pub mod node;
pub mod textsplit;

mod binary;
mod builder;
mod text;

// Re-export common types
pub use anim::{KEY_FPS, KEY_MAGIC, KeyAnimFlags, KeyframeAnim, Marker};
pub use cache::KeyframeCache;
pub use error::{KeyframeError, Result};
pub use keyframe::{Keyframe, KeyframeTrack, Pose};
pub use math::Angle;
pub use node::ModelNode;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
