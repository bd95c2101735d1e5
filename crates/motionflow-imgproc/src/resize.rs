use motionflow_image::{Image, ImageError};
use rayon::prelude::*;

/// Source index and interpolation weight for one destination coordinate.
#[derive(Clone, Copy, Debug)]
struct LinearTap {
    index: usize,
    next: usize,
    frac: f32,
}

/// Precompute the taps mapping `dst_len` samples onto `src_len` with pixel centers aligned.
fn linear_taps(src_len: usize, dst_len: usize) -> Vec<LinearTap> {
    let scale = src_len as f64 / dst_len as f64;
    (0..dst_len)
        .map(|d| {
            let f = (d as f64 + 0.5) * scale - 0.5;
            let mut s = f.floor();
            let mut frac = (f - s) as f32;
            if s < 0.0 {
                s = 0.0;
                frac = 0.0;
            }
            let mut index = s as usize;
            if index >= src_len - 1 {
                index = src_len - 1;
                frac = 0.0;
            }
            LinearTap {
                index,
                next: (index + 1).min(src_len - 1),
                frac,
            }
        })
        .collect()
}

/// Resize an image with bilinear interpolation.
///
/// Pixel centers of source and destination are aligned, so sample `d` reads
/// from `(d + 0.5) * src / dst - 0.5`, clamped to the image. The destination
/// size selects the output resolution.
///
/// # Arguments
///
/// * `src` - The input image container.
/// * `dst` - The output image container.
///
/// # Example
///
/// ```
/// use motionflow_image::{Image, ImageSize};
/// use motionflow_imgproc::resize::resize_linear;
///
/// let image = Image::<f32, 3>::from_size_val(ImageSize { width: 4, height: 5 }, 1.0).unwrap();
///
/// let mut resized = Image::<f32, 3>::from_size_val(ImageSize { width: 2, height: 3 }, 0.0).unwrap();
/// resize_linear(&image, &mut resized).unwrap();
///
/// assert_eq!(resized.size().width, 2);
/// assert_eq!(resized.size().height, 3);
/// ```
pub fn resize_linear<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
) -> Result<(), ImageError> {
    if src.as_slice().is_empty() || dst.as_slice().is_empty() {
        return Err(ImageError::InvalidImageSize(
            src.width(),
            src.height(),
            dst.width(),
            dst.height(),
        ));
    }

    if src.size() == dst.size() {
        dst.as_slice_mut().copy_from_slice(src.as_slice());
        return Ok(());
    }

    let taps_x = linear_taps(src.width(), dst.width());
    let taps_y = linear_taps(src.height(), dst.height());

    let src_stride = src.width() * C;
    let src_data = src.as_slice();
    let dst_stride = dst.width() * C;

    dst.as_slice_mut()
        .par_chunks_exact_mut(dst_stride)
        .zip(taps_y.par_iter())
        .for_each(|(dst_row, ty)| {
            let row0 = &src_data[ty.index * src_stride..(ty.index + 1) * src_stride];
            let row1 = &src_data[ty.next * src_stride..(ty.next + 1) * src_stride];
            let wy1 = ty.frac;
            let wy0 = 1.0 - wy1;

            for (dst_pixel, tx) in dst_row.chunks_exact_mut(C).zip(taps_x.iter()) {
                let wx1 = tx.frac;
                let wx0 = 1.0 - wx1;
                let (i0, i1) = (tx.index * C, tx.next * C);
                for (ch, d) in dst_pixel.iter_mut().enumerate() {
                    let top = row0[i0 + ch] * wx0 + row0[i1 + ch] * wx1;
                    let bottom = row1[i0 + ch] * wx0 + row1[i1 + ch] * wx1;
                    *d = top * wy0 + bottom * wy1;
                }
            }
        });

    Ok(())
}
