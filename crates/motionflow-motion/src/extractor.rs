use motionflow_image::Image;
use motionflow_imgproc::{color, flow, parallel};

use crate::{ByteFrame, ExtractorConfig, FrameSequence, MotionError};

/// A dense displacement field, channel 0 holds `dx` and channel 1 holds `dy`.
pub type MotionField = Image<f32, 2>;

/// Computes a dense motion field between every pair of consecutive frames.
///
/// Frames are brought to 8 bits, converted to grayscale and fed to the
/// Farnebäck optical flow. Field `i` describes the motion from frame `i` to
/// frame `i + 1`.
///
/// # Examples
///
/// ```
/// use motionflow_image::ImageSize;
/// use motionflow_motion::{ByteFrame, FrameSequence, MotionVectorExtractor};
///
/// let size = ImageSize { width: 8, height: 8 };
/// let frames = FrameSequence::Byte(vec![
///     ByteFrame::from_size_val(size, 10).unwrap(),
///     ByteFrame::from_size_val(size, 10).unwrap(),
///     ByteFrame::from_size_val(size, 10).unwrap(),
/// ]);
///
/// let fields = MotionVectorExtractor::default().extract(&frames).unwrap();
/// assert_eq!(fields.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MotionVectorExtractor {
    config: ExtractorConfig,
}

impl MotionVectorExtractor {
    /// Create an extractor with the given configuration.
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    /// The configuration of the extractor.
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Compute the motion fields of a frame sequence.
    ///
    /// A sequence of `F` frames yields `F - 1` fields, an empty vector when
    /// `F < 2`.
    ///
    /// # Errors
    ///
    /// Fails when the frames do not share one size or the flow parameters are
    /// invalid.
    pub fn extract(&self, frames: &FrameSequence) -> Result<Vec<MotionField>, MotionError> {
        if frames.len() < 2 {
            log::debug!("{} frame(s), no motion to extract", frames.len());
            return Ok(Vec::new());
        }

        frames.validate()?;
        self.config.flow.validate()?;

        let bytes = frames.to_bytes()?;

        // each conversion is already row parallel
        let gray = bytes
            .iter()
            .map(grayscale)
            .collect::<Result<Vec<_>, _>>()?;

        let fields = parallel::execute_indexed(self.config.strategy, gray.len() - 1, |i| {
            log::debug!("computing motion field {} -> {}", i, i + 1);
            flow::farneback_flow(&gray[i], &gray[i + 1], &self.config.flow)
        })?
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;

        log::info!(
            "extracted {} motion fields of {} from {} frames",
            fields.len(),
            gray[0].size(),
            frames.len()
        );

        Ok(fields)
    }
}

/// Compute the motion fields of a frame sequence with the default settings.
///
/// Shorthand for [`MotionVectorExtractor::default().extract(frames)`](MotionVectorExtractor::extract).
pub fn calculate_motion_vectors(frames: &FrameSequence) -> Result<Vec<MotionField>, MotionError> {
    MotionVectorExtractor::default().extract(frames)
}

/// Luminance of an RGB frame as floats in `[0, 255]`.
fn grayscale(frame: &ByteFrame) -> Result<Image<f32, 1>, MotionError> {
    let mut gray = Image::<u8, 1>::from_size_val(frame.size(), 0)?;
    color::gray_from_rgb_u8(frame, &mut gray)?;
    Ok(gray.cast_and_scale(1.0f32)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use motionflow_image::ImageSize;
    use motionflow_imgproc::flow::{FarnebackParams, FlowError};
    use motionflow_imgproc::parallel::{ExecutionStrategy, ParallelError};

    fn solid(size: ImageSize, rgb: [u8; 3]) -> Result<ByteFrame, MotionError> {
        Ok(ByteFrame::from_size_fn(size, |_, _| rgb)?)
    }

    #[test]
    fn degenerate_sequences_are_empty() -> Result<(), MotionError> {
        let size = ImageSize {
            width: 4,
            height: 4,
        };
        let extractor = MotionVectorExtractor::default();

        assert!(extractor.extract(&FrameSequence::Byte(vec![]))?.is_empty());
        assert!(extractor
            .extract(&FrameSequence::Byte(vec![solid(size, [1, 2, 3])?]))?
            .is_empty());
        assert!(extractor
            .extract(&FrameSequence::Float(vec![Image::from_size_val(size, 0.5)?]))?
            .is_empty());
        Ok(())
    }

    #[test]
    fn identical_frames_have_zero_motion() -> Result<(), MotionError> {
        let size = ImageSize {
            width: 4,
            height: 4,
        };
        let frame = solid(size, [200, 30, 90])?;
        let frames = FrameSequence::Byte(vec![frame.clone(), frame.clone(), frame]);

        let fields = calculate_motion_vectors(&frames)?;
        assert_eq!(fields.len(), 2);
        for field in &fields {
            assert_eq!(field.size(), size);
            assert!(field.as_slice().iter().all(|&v| v == 0.0));
        }
        Ok(())
    }

    #[test]
    fn mismatched_frames_are_rejected() -> Result<(), MotionError> {
        let a = ImageSize {
            width: 4,
            height: 4,
        };
        let b = ImageSize {
            width: 5,
            height: 4,
        };
        let frames = FrameSequence::Byte(vec![solid(a, [0, 0, 0])?, solid(b, [0, 0, 0])?]);

        let res = calculate_motion_vectors(&frames);
        assert_eq!(res, Err(MotionError::FrameSizeMismatch(1, a, b)));
        Ok(())
    }

    #[test]
    fn invalid_parameters_are_rejected() -> Result<(), MotionError> {
        let size = ImageSize {
            width: 4,
            height: 4,
        };
        let frames = FrameSequence::Byte(vec![solid(size, [0, 0, 0])?, solid(size, [0, 0, 0])?]);

        let extractor = MotionVectorExtractor::new(ExtractorConfig {
            flow: FarnebackParams {
                win_size: 4,
                ..Default::default()
            },
            ..Default::default()
        });
        assert!(matches!(
            extractor.extract(&frames),
            Err(MotionError::Flow(FlowError::InvalidParameter("win_size", _)))
        ));

        let extractor = MotionVectorExtractor::new(ExtractorConfig {
            strategy: ExecutionStrategy::Fixed(0),
            ..Default::default()
        });
        assert_eq!(
            extractor.extract(&frames),
            Err(MotionError::Parallel(ParallelError::InvalidThreadCount(0)))
        );
        Ok(())
    }

    #[test]
    fn fixed_pool_matches_serial() -> Result<(), MotionError> {
        let size = ImageSize {
            width: 40,
            height: 40,
        };
        let frames = FrameSequence::Byte(
            (0..4u8)
                .map(|k| {
                    ByteFrame::from_size_fn(size, |x, y| {
                        let v = ((x + 2 * k as usize) * 7 + y * 5) as u8;
                        [v, v, v]
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
        );

        let serial = MotionVectorExtractor::default().extract(&frames)?;
        for threads in [1, 2] {
            let fixed = MotionVectorExtractor::new(ExtractorConfig {
                strategy: ExecutionStrategy::Fixed(threads),
                ..Default::default()
            })
            .extract(&frames)?;
            assert_eq!(fixed, serial);
        }
        Ok(())
    }

    #[test]
    fn grayscale_of_gray_pixels_is_exact() -> Result<(), MotionError> {
        let frame = solid(
            ImageSize {
                width: 2,
                height: 2,
            },
            [77, 77, 77],
        )?;
        let gray = grayscale(&frame)?;
        assert!(gray.as_slice().iter().all(|&v| v == 77.0));
        Ok(())
    }
}
