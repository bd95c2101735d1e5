use motionflow_image::{Image, ImageError};
use rayon::prelude::*;

/// How pixels outside the image are extrapolated by the filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BorderType {
    /// Repeat the edge pixel: `aaa|abcd|ddd`.
    Replicate,
    /// Mirror without repeating the edge pixel: `dcb|abcd|cba`.
    #[default]
    Reflect101,
}

impl BorderType {
    /// Map a possibly out of range coordinate into `0..len`.
    #[inline]
    pub fn map_index(self, p: isize, len: usize) -> usize {
        let last = len as isize - 1;
        if (0..=last).contains(&p) {
            return p as usize;
        }
        match self {
            BorderType::Replicate => p.clamp(0, last) as usize,
            BorderType::Reflect101 => {
                if last == 0 {
                    return 0;
                }
                let mut p = p;
                while p < 0 || p > last {
                    if p < 0 {
                        p = -p;
                    }
                    if p > last {
                        p = 2 * last - p;
                    }
                }
                p as usize
            }
        }
    }
}

/// A separable 2D filter that applies horizontal and vertical 1D convolutions sequentially.
///
/// Caches the kernel data and precomputed offsets for the two passes.
struct SeparableFilter<'a> {
    kernel_x: &'a [f32],
    kernel_y: &'a [f32],
    offsets_x: Vec<isize>,
    offsets_y: Vec<isize>,
    border: BorderType,
}

impl<'a> SeparableFilter<'a> {
    fn new(kernel_x: &'a [f32], kernel_y: &'a [f32], border: BorderType) -> Self {
        let half_x = (kernel_x.len() / 2) as isize;
        let half_y = (kernel_y.len() / 2) as isize;

        Self {
            kernel_x,
            kernel_y,
            offsets_x: (0..kernel_x.len() as isize).map(|i| i - half_x).collect(),
            offsets_y: (0..kernel_y.len() as isize).map(|i| i - half_y).collect(),
            border,
        }
    }

    fn apply<const C: usize>(&self, src: &[f32], dst: &mut [f32], rows: usize, cols: usize) {
        let stride = cols * C;
        let mut temp = vec![0.0f32; src.len()];

        // Horizontal
        temp.par_chunks_mut(stride)
            .zip(src.par_chunks(stride))
            .for_each(|(row_temp, row_src)| {
                for c in 0..cols {
                    let mut acc = [0.0f32; C];
                    for (&k, &off) in self.kernel_x.iter().zip(self.offsets_x.iter()) {
                        let x = self.border.map_index(c as isize + off, cols);
                        let px = &row_src[x * C..x * C + C];
                        for (a, &v) in acc.iter_mut().zip(px) {
                            *a += v * k;
                        }
                    }
                    row_temp[c * C..c * C + C].copy_from_slice(&acc);
                }
            });

        // Vertical
        dst.par_chunks_mut(stride)
            .enumerate()
            .for_each(|(r, row_dst)| {
                row_dst.iter_mut().for_each(|v| *v = 0.0);
                for (&k, &off) in self.kernel_y.iter().zip(self.offsets_y.iter()) {
                    let y = self.border.map_index(r as isize + off, rows);
                    let row_temp = &temp[y * stride..(y + 1) * stride];
                    for (d, &t) in row_dst.iter_mut().zip(row_temp) {
                        *d += t * k;
                    }
                }
            });
    }
}

/// Apply a separable filter to an image.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `kernel_x` - The horizontal kernel.
/// * `kernel_y` - The vertical kernel.
/// * `border` - How to extrapolate pixels outside the image.
///
/// # Example
///
/// ```
/// use motionflow_image::{Image, ImageSize};
/// use motionflow_imgproc::filter::{separable_filter, BorderType};
///
/// let image = Image::<f32, 1>::new(
///     ImageSize { width: 3, height: 1 },
///     vec![0.0, 3.0, 0.0],
/// ).unwrap();
/// let mut out = Image::<f32, 1>::from_size_val(image.size(), 0.0).unwrap();
///
/// let k = [1.0 / 3.0; 3];
/// separable_filter(&image, &mut out, &k, &[1.0], BorderType::Replicate).unwrap();
///
/// assert!((out.as_slice()[1] - 1.0).abs() < 1e-6);
/// ```
pub fn separable_filter<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    kernel_x: &[f32],
    kernel_y: &[f32],
    border: BorderType,
) -> Result<(), ImageError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    if src.as_slice().is_empty() {
        return Ok(());
    }

    let filter = SeparableFilter::new(kernel_x, kernel_y, border);
    filter.apply::<C>(src.as_slice(), dst.as_slice_mut(), src.rows(), src.cols());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use motionflow_image::ImageSize;

    #[test]
    fn test_border_map_index() {
        assert_eq!(BorderType::Replicate.map_index(-2, 4), 0);
        assert_eq!(BorderType::Replicate.map_index(5, 4), 3);
        assert_eq!(BorderType::Reflect101.map_index(-1, 4), 1);
        assert_eq!(BorderType::Reflect101.map_index(-2, 4), 2);
        assert_eq!(BorderType::Reflect101.map_index(4, 4), 2);
        assert_eq!(BorderType::Reflect101.map_index(-3, 1), 0);
        assert_eq!(BorderType::Reflect101.map_index(2, 4), 2);
    }

    #[test]
    fn test_separable_filter_impulse() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 5,
            height: 5,
        };

        let mut img = Image::<f32, 1>::from_size_val(size, 0.0)?;
        img.as_slice_mut()[2 * 5 + 2] = 9.0;

        let mut dst = Image::<f32, 1>::from_size_val(size, 0.0)?;
        let kernel = [1.0, 1.0, 1.0];
        separable_filter(&img, &mut dst, &kernel, &kernel, BorderType::Reflect101)?;

        #[rustfmt::skip]
        assert_eq!(
            dst.as_slice(),
            &[
                0.0, 0.0, 0.0, 0.0, 0.0,
                0.0, 9.0, 9.0, 9.0, 0.0,
                0.0, 9.0, 9.0, 9.0, 0.0,
                0.0, 9.0, 9.0, 9.0, 0.0,
                0.0, 0.0, 0.0, 0.0, 0.0,
            ]
        );

        Ok(())
    }

    #[test]
    fn test_separable_filter_constant_is_preserved() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 6,
            height: 4,
        };

        let img = Image::<f32, 2>::from_size_val(size, 0.5)?;
        let mut dst = Image::<f32, 2>::from_size_val(size, 0.0)?;
        let kernel = [0.25, 0.5, 0.25];

        for border in [BorderType::Replicate, BorderType::Reflect101] {
            separable_filter(&img, &mut dst, &kernel, &kernel, border)?;
            for &v in dst.as_slice() {
                approx::assert_relative_eq!(v, 0.5, epsilon = 1e-6);
            }
        }

        Ok(())
    }
}
