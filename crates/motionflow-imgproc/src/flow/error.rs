use motionflow_image::{ImageError, ImageSize};

/// An error type for the optical flow module.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum FlowError {
    /// Error coming from the image containers.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// The two frames or the flow buffer have different sizes.
    #[error("Frame size mismatch: expected {0}, got {1}")]
    SizeMismatch(ImageSize, ImageSize),

    /// The frames have no pixels.
    #[error("Cannot compute optical flow on an empty image")]
    EmptyImage,

    /// A flow parameter is out of its valid range.
    #[error("Invalid parameter `{0}`: {1}")]
    InvalidParameter(&'static str, String),
}
