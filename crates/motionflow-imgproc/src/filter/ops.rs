use motionflow_image::{Image, ImageError};

use super::{kernels, separable_filter, BorderType};

/// Blur an image using a box blur filter
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `kernel_size` - The size of the kernel (kernel_x, kernel_y).
/// * `border` - How to extrapolate pixels outside the image.
pub fn box_blur<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    kernel_size: (usize, usize),
    border: BorderType,
) -> Result<(), ImageError> {
    let kernel_x = kernels::box_blur_kernel_1d(kernel_size.0);
    let kernel_y = kernels::box_blur_kernel_1d(kernel_size.1);
    separable_filter(src, dst, &kernel_x, &kernel_y, border)
}

/// Blur an image using a gaussian blur filter
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `kernel_size` - The size of the kernel (kernel_x, kernel_y).
/// * `sigma` - The sigma of the gaussian kernel, (sigma_x, sigma_y). A non-positive
///   value is derived from the kernel size.
/// * `border` - How to extrapolate pixels outside the image.
///
/// # Example
///
/// ```
/// use motionflow_image::{Image, ImageSize};
/// use motionflow_imgproc::filter::{gaussian_blur, BorderType};
///
/// let image = Image::<f32, 1>::from_size_val(ImageSize { width: 8, height: 8 }, 1.0).unwrap();
/// let mut blurred = Image::<f32, 1>::from_size_val(image.size(), 0.0).unwrap();
///
/// gaussian_blur(&image, &mut blurred, (5, 5), (1.0, 1.0), BorderType::Reflect101).unwrap();
/// assert!((blurred.as_slice()[0] - 1.0).abs() < 1e-5);
/// ```
pub fn gaussian_blur<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    kernel_size: (usize, usize),
    sigma: (f32, f32),
    border: BorderType,
) -> Result<(), ImageError> {
    let kernel_x = kernels::gaussian_kernel_1d(kernel_size.0, sigma.0);
    let kernel_y = kernels::gaussian_kernel_1d(kernel_size.1, sigma.1);
    separable_filter(src, dst, &kernel_x, &kernel_y, border)
}
