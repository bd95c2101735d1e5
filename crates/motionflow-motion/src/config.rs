use motionflow_imgproc::{flow::FarnebackParams, parallel::ExecutionStrategy};

/// Configuration of the [`MotionVectorExtractor`](crate::MotionVectorExtractor).
///
/// The default computes the frame pairs one after the other with the
/// default Farnebäck parameters.
///
/// # Examples
///
/// ```
/// use motionflow_imgproc::parallel::ExecutionStrategy;
/// use motionflow_motion::ExtractorConfig;
///
/// let config = ExtractorConfig {
///     strategy: ExecutionStrategy::ParallelElements,
///     ..Default::default()
/// };
///
/// assert_eq!(config.flow.win_size, 15);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExtractorConfig {
    /// Parameters of the dense optical flow.
    pub flow: FarnebackParams,
    /// How the independent frame pairs are scheduled.
    pub strategy: ExecutionStrategy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ExtractorConfig::default();
        assert_eq!(config.flow, FarnebackParams::default());
        assert_eq!(config.strategy, ExecutionStrategy::Serial);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn config_from_json() -> Result<(), serde_json::Error> {
        let json = r#"{
            "flow": {
                "pyr_scale": 0.5,
                "levels": 3,
                "win_size": 15,
                "iterations": 3,
                "poly_n": 5,
                "poly_sigma": 1.2,
                "flags": { "use_initial_flow": false, "gaussian_window": false }
            },
            "strategy": { "Fixed": 4 }
        }"#;
        let config: ExtractorConfig = serde_json::from_str(json)?;
        assert_eq!(config.flow, FarnebackParams::default());
        assert_eq!(config.strategy, ExecutionStrategy::Fixed(4));
        Ok(())
    }
}
