use std::borrow::Cow;

use motionflow_image::{Image, ImageError, ImageSize};
use motionflow_imgproc::parallel;

use crate::MotionError;

/// A color frame with values in `[0, 1]`.
pub type FloatFrame = Image<f32, 3>;

/// A color frame with values in `[0, 255]`.
pub type ByteFrame = Image<u8, 3>;

/// An ordered sequence of RGB frames sharing one pixel representation.
///
/// The representation is fixed for the whole sequence, so the normalization
/// to bytes is decided once instead of per frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameSequence {
    /// Frames with floating point values in `[0, 1]`.
    Float(Vec<FloatFrame>),
    /// Frames with 8-bit values in `[0, 255]`.
    Byte(Vec<ByteFrame>),
}

impl From<Vec<FloatFrame>> for FrameSequence {
    fn from(frames: Vec<FloatFrame>) -> Self {
        FrameSequence::Float(frames)
    }
}

impl From<Vec<ByteFrame>> for FrameSequence {
    fn from(frames: Vec<ByteFrame>) -> Self {
        FrameSequence::Byte(frames)
    }
}

impl FrameSequence {
    /// Number of frames in the sequence.
    pub fn len(&self) -> usize {
        match self {
            FrameSequence::Float(frames) => frames.len(),
            FrameSequence::Byte(frames) => frames.len(),
        }
    }

    /// Whether the sequence holds no frame.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the frame at `index`, if any.
    pub fn frame_size(&self, index: usize) -> Option<ImageSize> {
        match self {
            FrameSequence::Float(frames) => frames.get(index).map(|f| f.size()),
            FrameSequence::Byte(frames) => frames.get(index).map(|f| f.size()),
        }
    }

    /// Check that every frame has the size of the first one.
    ///
    /// # Errors
    ///
    /// Returns [`MotionError::FrameSizeMismatch`] with the index of the first
    /// offending frame.
    pub fn validate(&self) -> Result<(), MotionError> {
        let Some(expected) = self.frame_size(0) else {
            return Ok(());
        };

        for index in 1..self.len() {
            match self.frame_size(index) {
                Some(found) if found != expected => {
                    return Err(MotionError::FrameSizeMismatch(index, expected, found));
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// The frames as 8-bit images.
    ///
    /// Byte frames are borrowed as they are, float frames are converted with
    /// [`normalize_frame`].
    pub fn to_bytes(&self) -> Result<Cow<'_, [ByteFrame]>, ImageError> {
        match self {
            FrameSequence::Byte(frames) => Ok(Cow::Borrowed(frames.as_slice())),
            FrameSequence::Float(frames) => {
                let bytes = frames
                    .iter()
                    .map(normalize_frame)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Cow::Owned(bytes))
            }
        }
    }
}

/// Convert a float frame in `[0, 1]` to an 8-bit frame.
///
/// Values are multiplied by 255 and truncated. Out of range values saturate
/// to `0` or `255` and NaN maps to `0`.
///
/// # Examples
///
/// ```
/// use motionflow_image::{Image, ImageSize};
/// use motionflow_motion::frames::normalize_frame;
///
/// let frame = Image::<f32, 3>::new(
///     ImageSize { width: 1, height: 1 },
///     vec![0.0, 0.5, 1.0],
/// ).unwrap();
///
/// let bytes = normalize_frame(&frame).unwrap();
/// assert_eq!(bytes.as_slice(), &[0, 127, 255]);
/// ```
pub fn normalize_frame(frame: &FloatFrame) -> Result<ByteFrame, ImageError> {
    let mut dst = ByteFrame::from_size_val(frame.size(), 0)?;

    // float to int `as` casts saturate and truncate towards zero
    parallel::par_iter_slice(frame.as_slice(), dst.as_slice_mut(), |&src, dst| {
        *dst = (src * 255.0) as u8;
    });

    Ok(dst)
}
