use rayon::prelude::*;
use thiserror::Error;

use motionflow_image::Image;

/// Errors that can occur during parallel execution.
#[derive(Error, Debug, PartialEq)]
pub enum ParallelError {
    /// The thread pool failed to build.
    #[error("failed to build thread pool: {0}")]
    BuildError(String),

    /// The requested thread count is invalid.
    #[error("thread count must be > 0, got {0}")]
    InvalidThreadCount(usize),
}

/// Controls how independent work items are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExecutionStrategy {
    /// Run sequentially on the current thread.
    #[default]
    Serial,

    /// Use the global Rayon thread pool to process every item in parallel.
    ParallelElements,

    /// Run on a local thread pool with `n` threads.
    ///
    /// # Warning
    /// Creates a new thread pool on every call, which has significant overhead.
    Fixed(usize),
}

/// Apply a function to each pixel in the image in parallel.
pub fn par_iter_rows<T1, const C1: usize, T2, const C2: usize>(
    src: &Image<T1, C1>,
    dst: &mut Image<T2, C2>,
    f: impl Fn(&[T1], &mut [T2]) + Send + Sync,
) where
    T1: Send + Sync,
    T2: Send + Sync,
{
    let cols = src.cols();
    if cols == 0 {
        return;
    }

    src.as_slice()
        .par_chunks_exact(C1 * cols)
        .zip(dst.as_slice_mut().par_chunks_exact_mut(C2 * cols))
        .for_each(|(src_chunk, dst_chunk)| {
            src_chunk
                .chunks_exact(C1)
                .zip(dst_chunk.chunks_exact_mut(C2))
                .for_each(|(src_pixel, dst_pixel)| {
                    f(src_pixel, dst_pixel);
                });
        });
}

/// Apply a function to each element of a flat slice pair in parallel.
pub fn par_iter_slice<T1, T2>(src: &[T1], dst: &mut [T2], f: impl Fn(&T1, &mut T2) + Send + Sync)
where
    T1: Send + Sync,
    T2: Send + Sync,
{
    src.par_iter()
        .zip(dst.par_iter_mut())
        .for_each(|(s, d)| f(s, d));
}

/// Evaluate `op` for every index in `0..len` with the given strategy.
///
/// The output keeps index order regardless of the strategy.
///
/// # Arguments
///
/// * `strategy` - The execution strategy.
/// * `len` - The number of work items.
/// * `op` - The operation producing the value for one index.
///
/// # Examples
///
/// ```
/// use motionflow_imgproc::parallel::{execute_indexed, ExecutionStrategy};
///
/// let squares = execute_indexed(ExecutionStrategy::ParallelElements, 4, |i| i * i).unwrap();
/// assert_eq!(squares, vec![0, 1, 4, 9]);
/// ```
pub fn execute_indexed<T, F>(
    strategy: ExecutionStrategy,
    len: usize,
    op: F,
) -> Result<Vec<T>, ParallelError>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    let out: Vec<T> = match strategy {
        ExecutionStrategy::Serial => (0..len).map(op).collect(),
        ExecutionStrategy::ParallelElements => (0..len).into_par_iter().map(op).collect(),
        ExecutionStrategy::Fixed(n) => {
            if n == 0 {
                return Err(ParallelError::InvalidThreadCount(n));
            }
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map_err(|e| ParallelError::BuildError(e.to_string()))?;

            pool.install(|| (0..len).into_par_iter().map(op).collect())
        }
    };
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use motionflow_image::ImageSize;

    #[test]
    fn test_par_iter_rows() -> Result<(), Box<dyn std::error::Error>> {
        let src = Image::<u8, 2>::new(
            ImageSize {
                width: 2,
                height: 2,
            },
            vec![1, 2, 3, 4, 5, 6, 7, 8],
        )?;
        let mut dst = Image::<u8, 1>::from_size_val(src.size(), 0)?;

        par_iter_rows(&src, &mut dst, |s, d| d[0] = s[0] + s[1]);

        assert_eq!(dst.as_slice(), &[3, 7, 11, 15]);
        Ok(())
    }

    #[test]
    fn test_execute_serial() {
        let out = execute_indexed(ExecutionStrategy::Serial, 4, |i| i * 2).unwrap();
        assert_eq!(out, vec![0, 2, 4, 6]);
    }

    #[test]
    fn test_execute_parallel_keeps_order() {
        let out = execute_indexed(ExecutionStrategy::ParallelElements, 100, |i| i).unwrap();
        assert_eq!(out, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_execute_fixed_success() {
        let out = execute_indexed(ExecutionStrategy::Fixed(2), 4, |i| i + 1).unwrap();
        assert_eq!(out, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_execute_fixed_error() {
        let res = execute_indexed(ExecutionStrategy::Fixed(0), 1, |i| i);
        assert!(matches!(res, Err(ParallelError::InvalidThreadCount(0))));
    }

    #[test]
    fn test_execute_empty() {
        let out = execute_indexed(ExecutionStrategy::ParallelElements, 0, |i| i).unwrap();
        assert!(out.is_empty());
    }
}
