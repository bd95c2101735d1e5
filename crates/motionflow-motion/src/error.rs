use motionflow_image::{ImageError, ImageSize};
use motionflow_imgproc::{flow::FlowError, parallel::ParallelError};

/// An error type for the motion module.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum MotionError {
    /// Error coming from an image operation.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// Error coming from the optical flow solver.
    #[error(transparent)]
    Flow(#[from] FlowError),

    /// Error coming from the parallel executor.
    #[error(transparent)]
    Parallel(#[from] ParallelError),

    /// Error when a frame or motion field does not have the size of the run.
    #[error("Element {0} has size {2}, expected {1}")]
    FrameSizeMismatch(usize, ImageSize, ImageSize),

    /// Error when there are not enough frames for the given motion fields.
    #[error("{0} frames cannot be combined with {1} motion fields")]
    SequenceLengthMismatch(usize, usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_mismatch_message_fits_frames_and_fields() {
        let err = MotionError::FrameSizeMismatch(
            1,
            ImageSize {
                width: 4,
                height: 4,
            },
            ImageSize {
                width: 2,
                height: 3,
            },
        );
        assert_eq!(
            err.to_string(),
            "Element 1 has size ImageSize { width: 2, height: 3 }, \
             expected ImageSize { width: 4, height: 4 }"
        );
    }
}
