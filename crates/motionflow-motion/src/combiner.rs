use motionflow_image::{ops, Image};

use crate::{FrameSequence, MotionError, MotionField};

/// A frame stacked with its motion field, channels `[r, g, b, dx, dy]`.
pub type CombinedTensor = Image<f32, 5>;

/// Stacks every motion field onto the frame the motion ends at.
///
/// Field `i` is paired with frame `i + 1`. The color channels are copied as
/// they are, so byte frames keep their `[0, 255]` range and float frames
/// their `[0, 1]` range.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameMotionCombiner;

impl FrameMotionCombiner {
    /// Create a new combiner.
    pub fn new() -> Self {
        Self
    }

    /// Build one combined tensor per motion field.
    ///
    /// Frames after the last one a field points to are ignored.
    ///
    /// # Errors
    ///
    /// Fails with [`MotionError::SequenceLengthMismatch`] when there are fewer
    /// than `fields.len() + 1` frames and with [`MotionError::FrameSizeMismatch`]
    /// when a field and its frame differ in size.
    pub fn combine(
        &self,
        frames: &FrameSequence,
        fields: &[MotionField],
    ) -> Result<Vec<CombinedTensor>, MotionError> {
        if fields.is_empty() {
            return Ok(Vec::new());
        }

        if frames.len() < fields.len() + 1 {
            return Err(MotionError::SequenceLengthMismatch(frames.len(), fields.len()));
        }

        let combined = fields
            .iter()
            .enumerate()
            .map(|(i, field)| match frames {
                FrameSequence::Float(frames) => stack(&frames[i + 1], field, i),
                FrameSequence::Byte(frames) => stack(&frames[i + 1], field, i),
            })
            .collect::<Result<Vec<_>, _>>()?;

        log::info!("combined {} frames with their motion fields", combined.len());

        Ok(combined)
    }
}

/// Combine frames and motion fields with a default [`FrameMotionCombiner`].
///
/// # Examples
///
/// ```
/// use motionflow_image::ImageSize;
/// use motionflow_motion::{
///     combine_frames_and_motion_vectors, ByteFrame, FrameSequence, MotionField,
/// };
///
/// let size = ImageSize { width: 2, height: 2 };
/// let frames = FrameSequence::Byte(vec![
///     ByteFrame::from_size_val(size, 1).unwrap(),
///     ByteFrame::from_size_val(size, 2).unwrap(),
/// ]);
/// let fields = vec![MotionField::from_size_val(size, 0.5).unwrap()];
///
/// let combined = combine_frames_and_motion_vectors(&frames, &fields).unwrap();
/// assert_eq!(combined.len(), 1);
/// assert_eq!(&combined[0].as_slice()[..5], &[2.0, 2.0, 2.0, 0.5, 0.5]);
/// ```
pub fn combine_frames_and_motion_vectors(
    frames: &FrameSequence,
    fields: &[MotionField],
) -> Result<Vec<CombinedTensor>, MotionError> {
    FrameMotionCombiner::new().combine(frames, fields)
}

fn stack<T>(
    frame: &Image<T, 3>,
    field: &MotionField,
    index: usize,
) -> Result<CombinedTensor, MotionError>
where
    T: Copy + num_traits::NumCast,
{
    if frame.size() != field.size() {
        return Err(MotionError::FrameSizeMismatch(index, frame.size(), field.size()));
    }

    let mut tensor = CombinedTensor::from_size_val(frame.size(), 0.0)?;
    ops::concat_channels(frame, field, &mut tensor)?;

    Ok(tensor)
}
