use motionflow_image::ImageSize;

use super::FlowError;

/// Pyramid levels stop before either side drops below this many pixels.
const MIN_LEVEL_SIZE: f64 = 32.0;

/// Optional behaviours of the Farnebäck solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FarnebackFlags {
    /// Use the content of the flow buffer as the initial estimate.
    pub use_initial_flow: bool,
    /// Average the motion matrices with a gaussian window instead of a box.
    pub gaussian_window: bool,
}

/// Parameters of the Farnebäck dense optical flow.
///
/// The defaults are pyramid scale 0.5, 3 levels, a 15 pixel averaging window,
/// 3 iterations per level, polynomial neighbourhood 5 with sigma 1.2, no flags.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FarnebackParams {
    /// Scale between two consecutive pyramid levels, in (0, 1).
    pub pyr_scale: f64,
    /// Number of pyramid levels on top of the full resolution image.
    pub levels: usize,
    /// Size of the averaging window, must be odd.
    pub win_size: usize,
    /// Solver iterations per pyramid level.
    pub iterations: usize,
    /// Half size of the pixel neighbourhood used for the polynomial expansion.
    pub poly_n: usize,
    /// Gaussian sigma weighting the polynomial expansion.
    pub poly_sigma: f64,
    /// Optional behaviours.
    pub flags: FarnebackFlags,
}

impl Default for FarnebackParams {
    fn default() -> Self {
        Self {
            pyr_scale: 0.5,
            levels: 3,
            win_size: 15,
            iterations: 3,
            poly_n: 5,
            poly_sigma: 1.2,
            flags: FarnebackFlags::default(),
        }
    }
}

impl FarnebackParams {
    /// Check that every parameter is inside its valid range.
    pub fn validate(&self) -> Result<(), FlowError> {
        if !(self.pyr_scale > 0.0 && self.pyr_scale < 1.0) {
            return Err(FlowError::InvalidParameter(
                "pyr_scale",
                format!("must be in (0, 1), got {}", self.pyr_scale),
            ));
        }
        if self.win_size == 0 || self.win_size % 2 == 0 {
            return Err(FlowError::InvalidParameter(
                "win_size",
                format!("must be odd and positive, got {}", self.win_size),
            ));
        }
        if self.iterations == 0 {
            return Err(FlowError::InvalidParameter(
                "iterations",
                "must be at least 1".to_string(),
            ));
        }
        if self.poly_n == 0 {
            return Err(FlowError::InvalidParameter(
                "poly_n",
                "must be at least 1".to_string(),
            ));
        }
        if !(self.poly_sigma >= 0.0) {
            return Err(FlowError::InvalidParameter(
                "poly_sigma",
                format!("must be non-negative, got {}", self.poly_sigma),
            ));
        }
        Ok(())
    }

    /// Number of coarse levels actually used for an image of the given size.
    ///
    /// Levels whose smaller side would fall under 32 pixels are dropped.
    pub fn pyramid_levels(&self, size: ImageSize) -> usize {
        let mut scale = 1.0;
        for k in 0..self.levels {
            scale *= self.pyr_scale;
            if (size.width as f64) * scale < MIN_LEVEL_SIZE
                || (size.height as f64) * scale < MIN_LEVEL_SIZE
            {
                return k;
            }
        }
        self.levels
    }
}
