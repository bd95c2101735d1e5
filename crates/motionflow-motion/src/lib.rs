#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// combine frames and motion fields into per frame tensors.
pub mod combiner;

/// configuration of the motion vector extractor.
pub mod config;

/// Error types for the motion module.
pub mod error;

/// dense motion vector extraction between consecutive frames.
pub mod extractor;

/// frame sequence representation.
pub mod frames;

pub use crate::combiner::{combine_frames_and_motion_vectors, CombinedTensor, FrameMotionCombiner};
pub use crate::config::ExtractorConfig;
pub use crate::error::MotionError;
pub use crate::extractor::{calculate_motion_vectors, MotionField, MotionVectorExtractor};
pub use crate::frames::{ByteFrame, FloatFrame, FrameSequence};
