use crate::parallel;
use motionflow_image::{Image, ImageError};

/// BT.601 luma weights in 14-bit fixed point, they add up to `1 << 14`.
const RW: u32 = 4899;
const GW: u32 = 9617;
const BW: u32 = 1868;
const SHIFT: u32 = 14;

/// Convert an RGB8 image to its 8-bit luminance.
///
/// Computes `Y = 0.299 R + 0.587 G + 0.114 B` with rounding, so a pixel with
/// equal channels keeps its value. The channels must be in red, green, blue
/// order.
///
/// # Arguments
///
/// * `src` - The input RGB8 image.
/// * `dst` - The output grayscale image, same size as `src`.
///
/// # Example
///
/// ```
/// use motionflow_image::{Image, ImageSize};
/// use motionflow_imgproc::color::gray_from_rgb_u8;
///
/// let rgb = Image::<u8, 3>::new(
///     ImageSize { width: 2, height: 1 },
///     vec![255, 0, 0, 90, 90, 90],
/// )
/// .unwrap();
///
/// let mut gray = Image::<u8, 1>::from_size_val(rgb.size(), 0).unwrap();
/// gray_from_rgb_u8(&rgb, &mut gray).unwrap();
///
/// assert_eq!(gray.as_slice(), &[76, 90]);
/// ```
pub fn gray_from_rgb_u8(src: &Image<u8, 3>, dst: &mut Image<u8, 1>) -> Result<(), ImageError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.width(),
            src.height(),
            dst.width(),
            dst.height(),
        ));
    }

    parallel::par_iter_rows(src, dst, |rgb, y| {
        let (r, g, b) = (rgb[0] as u32, rgb[1] as u32, rgb[2] as u32);
        y[0] = ((r * RW + g * GW + b * BW + (1 << (SHIFT - 1))) >> SHIFT) as u8;
    });

    Ok(())
}
