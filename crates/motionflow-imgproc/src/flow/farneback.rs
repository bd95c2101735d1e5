use motionflow_image::{Image, ImageSize};
use rayon::prelude::*;

use super::polynomial::{poly_expansion_with_kernel, PolyExpansionKernel};
use super::{FarnebackParams, FlowError};
use crate::filter::{self, kernels, BorderType};
use crate::resize::resize_linear;

/// Number of border pixels whose equations are down-weighted.
const BORDER: usize = 5;
const BORDER_WEIGHTS: [f32; BORDER] = [0.14, 0.14, 0.4472, 0.8169, 0.9261];

/// Regularizer added to the 2x2 determinant when solving for the flow.
const DET_EPSILON: f64 = 1e-3;

/// Compute a dense optical flow between two grayscale images.
///
/// For every pixel of `prev` the displacement `(dx, dy)` such that
/// `prev(x, y) ~ next(x + dx, y + dy)` is written to `flow`. The estimate is
/// refined coarse to fine over `params.levels` pyramid levels.
///
/// # Arguments
///
/// * `prev` - The first grayscale image.
/// * `next` - The second grayscale image, same size as `prev`.
/// * `flow` - The output flow, same size as `prev`. Read as the initial
///   estimate when `params.flags.use_initial_flow` is set.
/// * `params` - The algorithm parameters.
///
/// # Errors
///
/// Fails on mismatched sizes, empty images or invalid parameters.
pub fn calc_optical_flow_farneback(
    prev: &Image<f32, 1>,
    next: &Image<f32, 1>,
    flow: &mut Image<f32, 2>,
    params: &FarnebackParams,
) -> Result<(), FlowError> {
    params.validate()?;

    for other in [next.size(), flow.size()] {
        if prev.size() != other {
            return Err(FlowError::SizeMismatch(prev.size(), other));
        }
    }

    if prev.as_slice().is_empty() {
        return Err(FlowError::EmptyImage);
    }

    let levels = params.pyramid_levels(prev.size());
    let poly_kernel = PolyExpansionKernel::new(params.poly_n, params.poly_sigma);

    let mut coarse_flow: Option<Image<f32, 2>> = None;

    for k in (0..=levels).rev() {
        let scale = params.pyr_scale.powi(k as i32);
        let sigma = (1.0 / scale - 1.0) * 0.5;
        let smooth_size = (((sigma * 5.0).round() as usize) | 1).max(3);

        let level_size = ImageSize {
            width: (prev.width() as f64 * scale).round() as usize,
            height: (prev.height() as f64 * scale).round() as usize,
        };

        log::debug!("farneback level {k}/{levels}");
        log::trace!("level {k}: {level_size}, smoothing {smooth_size}px sigma {sigma:.3}");

        let mut level_flow = Image::<f32, 2>::from_size_val(level_size, 0.0)?;
        match &coarse_flow {
            Some(coarse) => {
                resize_linear(coarse, &mut level_flow)?;
                let up = (1.0 / params.pyr_scale) as f32;
                level_flow.as_slice_mut().iter_mut().for_each(|v| *v *= up);
            }
            None if params.flags.use_initial_flow => {
                resize_linear(flow, &mut level_flow)?;
                let down = scale as f32;
                level_flow.as_slice_mut().iter_mut().for_each(|v| *v *= down);
            }
            None => {}
        }

        let r0 = expand_level(prev, level_size, sigma as f32, smooth_size, &poly_kernel)?;
        let r1 = expand_level(next, level_size, sigma as f32, smooth_size, &poly_kernel)?;

        let mut matrices = Image::<f32, 5>::from_size_val(level_size, 0.0)?;
        update_matrices(&r0, &r1, &level_flow, &mut matrices);

        for i in 0..params.iterations {
            let last = i + 1 == params.iterations;
            update_flow(&matrices, &mut level_flow, params)?;
            if !last {
                update_matrices(&r0, &r1, &level_flow, &mut matrices);
            }
        }

        coarse_flow = Some(level_flow);
    }

    if let Some(level_flow) = coarse_flow {
        flow.as_slice_mut().copy_from_slice(level_flow.as_slice());
    }

    Ok(())
}

/// Allocate a flow buffer and compute the Farnebäck flow into it.
///
/// # Example
///
/// ```
/// use motionflow_image::{Image, ImageSize};
/// use motionflow_imgproc::flow::{farneback_flow, FarnebackParams};
///
/// let size = ImageSize { width: 8, height: 8 };
/// let prev = Image::<f32, 1>::from_size_val(size, 10.0).unwrap();
/// let next = prev.clone();
///
/// let flow = farneback_flow(&prev, &next, &FarnebackParams::default()).unwrap();
/// assert!(flow.as_slice().iter().all(|&v| v == 0.0));
/// ```
pub fn farneback_flow(
    prev: &Image<f32, 1>,
    next: &Image<f32, 1>,
    params: &FarnebackParams,
) -> Result<Image<f32, 2>, FlowError> {
    let mut flow = Image::<f32, 2>::from_size_val(prev.size(), 0.0)?;
    calc_optical_flow_farneback(prev, next, &mut flow, params)?;
    Ok(flow)
}

/// Smooth, resample to the level size and expand one image of the pyramid.
fn expand_level(
    src: &Image<f32, 1>,
    level_size: ImageSize,
    sigma: f32,
    smooth_size: usize,
    poly_kernel: &PolyExpansionKernel,
) -> Result<Image<f32, 5>, FlowError> {
    let mut blurred = Image::<f32, 1>::from_size_val(src.size(), 0.0)?;
    filter::gaussian_blur(
        src,
        &mut blurred,
        (smooth_size, smooth_size),
        (sigma, sigma),
        BorderType::Reflect101,
    )?;

    let level = if level_size == src.size() {
        blurred
    } else {
        let mut resized = Image::<f32, 1>::from_size_val(level_size, 0.0)?;
        resize_linear(&blurred, &mut resized)?;
        resized
    };

    let mut expansion = Image::<f32, 5>::from_size_val(level_size, 0.0)?;
    poly_expansion_with_kernel(&level, &mut expansion, poly_kernel);

    Ok(expansion)
}

/// Build the per pixel normal equations `G d = h` from both expansions.
///
/// Stores `[g11, g12, g22, h1, h2]` where index 1 is the vertical and index 2
/// the horizontal component.
fn update_matrices(
    r0: &Image<f32, 5>,
    r1: &Image<f32, 5>,
    flow: &Image<f32, 2>,
    matrices: &mut Image<f32, 5>,
) {
    let (width, height) = (flow.width(), flow.height());
    let r0_data = r0.as_slice();
    let r1_data = r1.as_slice();
    let flow_data = flow.as_slice();

    matrices
        .as_slice_mut()
        .par_chunks_exact_mut(width * 5)
        .enumerate()
        .for_each(|(y, mrow)| {
            for (x, m) in mrow.chunks_exact_mut(5).enumerate() {
                let dx = flow_data[(y * width + x) * 2];
                let dy = flow_data[(y * width + x) * 2 + 1];
                let p0 = &r0_data[(y * width + x) * 5..(y * width + x) * 5 + 5];

                let fx = x as f32 + dx;
                let fy = y as f32 + dy;
                let (x1, y1) = (fx.floor(), fy.floor());
                let (ax, ay) = (fx - x1, fy - y1);

                let inside = x1 >= 0.0
                    && y1 >= 0.0
                    && (x1 as usize) + 1 < width
                    && (y1 as usize) + 1 < height;

                let (r2, r3, r4, r5, r6) = if inside {
                    let i00 = ((y1 as usize) * width + x1 as usize) * 5;
                    let i01 = i00 + 5;
                    let i10 = i00 + width * 5;
                    let i11 = i10 + 5;

                    let a00 = (1.0 - ax) * (1.0 - ay);
                    let a01 = ax * (1.0 - ay);
                    let a10 = (1.0 - ax) * ay;
                    let a11 = ax * ay;

                    let warped = |c: usize| {
                        a00 * r1_data[i00 + c]
                            + a01 * r1_data[i01 + c]
                            + a10 * r1_data[i10 + c]
                            + a11 * r1_data[i11 + c]
                    };

                    (
                        warped(0),
                        warped(1),
                        (p0[2] + warped(2)) * 0.5,
                        (p0[3] + warped(3)) * 0.5,
                        (p0[4] + warped(4)) * 0.25,
                    )
                } else {
                    (0.0, 0.0, p0[2], p0[3], p0[4] * 0.5)
                };

                let r2 = (p0[0] - r2) * 0.5 + r4 * dy + r6 * dx;
                let r3 = (p0[1] - r3) * 0.5 + r6 * dy + r5 * dx;

                let weight = border_weight(x, width) * border_weight(y, height);
                let (r2, r3, r4, r5, r6) = (
                    r2 * weight,
                    r3 * weight,
                    r4 * weight,
                    r5 * weight,
                    r6 * weight,
                );

                m[0] = r4 * r4 + r6 * r6;
                m[1] = (r4 + r5) * r6;
                m[2] = r5 * r5 + r6 * r6;
                m[3] = r4 * r2 + r6 * r3;
                m[4] = r6 * r2 + r5 * r3;
            }
        });
}

/// Confidence of the equations `i` pixels away from either end of an axis.
fn border_weight(i: usize, len: usize) -> f32 {
    let mut weight = 1.0;
    if i < BORDER {
        weight *= BORDER_WEIGHTS[i];
    }
    if i + BORDER >= len {
        weight *= BORDER_WEIGHTS[len - i - 1];
    }
    weight
}

/// Sigma of the gaussian averaging window, 0.3 of its half size.
fn gaussian_window_sigma(win_size: usize) -> f32 {
    0.3 * (win_size / 2) as f32
}

/// Average the normal equations over the window and solve them per pixel.
fn update_flow(
    matrices: &Image<f32, 5>,
    flow: &mut Image<f32, 2>,
    params: &FarnebackParams,
) -> Result<(), FlowError> {
    let mut averaged = Image::<f32, 5>::from_size_val(matrices.size(), 0.0)?;
    let win = params.win_size;

    if params.flags.gaussian_window {
        let kernel = kernels::gaussian_kernel_1d(win, gaussian_window_sigma(win));
        filter::separable_filter(
            matrices,
            &mut averaged,
            &kernel,
            &kernel,
            BorderType::Replicate,
        )?;
    } else {
        filter::box_blur(matrices, &mut averaged, (win, win), BorderType::Replicate)?;
    }

    flow.as_slice_mut()
        .par_chunks_exact_mut(2)
        .zip(averaged.as_slice().par_chunks_exact(5))
        .for_each(|(d, m)| {
            let (g11, g12, g22) = (m[0] as f64, m[1] as f64, m[2] as f64);
            let (h1, h2) = (m[3] as f64, m[4] as f64);

            let idet = 1.0 / (g11 * g22 - g12 * g12 + DET_EPSILON);
            d[0] = ((g11 * h2 - g12 * h1) * idet) as f32;
            d[1] = ((g22 * h1 - g12 * h2) * idet) as f32;
        });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::FarnebackFlags;
    use std::f32::consts::PI;

    fn pattern(x: f32, y: f32) -> f32 {
        128.0 + 40.0 * (2.0 * PI * x / 20.0).sin() + 40.0 * (2.0 * PI * y / 18.0).cos()
    }

    fn shifted_pair(
        size: ImageSize,
        shift: (f32, f32),
    ) -> Result<(Image<f32, 1>, Image<f32, 1>), FlowError> {
        let prev = Image::from_size_fn(size, |x, y| [pattern(x as f32, y as f32)])?;
        let next = Image::from_size_fn(size, |x, y| {
            [pattern(x as f32 - shift.0, y as f32 - shift.1)]
        })?;
        Ok((prev, next))
    }

    fn mean_flow_in_center(flow: &Image<f32, 2>, margin: usize) -> (f32, f32) {
        let (mut sx, mut sy, mut count) = (0.0, 0.0, 0.0);
        for y in margin..flow.height() - margin {
            for x in margin..flow.width() - margin {
                let i = (y * flow.width() + x) * 2;
                sx += flow.as_slice()[i];
                sy += flow.as_slice()[i + 1];
                count += 1.0;
            }
        }
        (sx / count, sy / count)
    }

    #[test]
    fn identical_constant_frames_have_zero_flow() -> Result<(), FlowError> {
        let size = ImageSize {
            width: 40,
            height: 36,
        };
        let frame = Image::<f32, 1>::from_size_val(size, 77.0)?;
        let flow = farneback_flow(&frame, &frame, &FarnebackParams::default())?;

        assert_eq!(flow.size(), size);
        assert!(flow.as_slice().iter().all(|&v| v == 0.0));
        Ok(())
    }

    #[test]
    fn recovers_constant_translation() -> Result<(), FlowError> {
        let size = ImageSize {
            width: 64,
            height: 64,
        };
        let (prev, next) = shifted_pair(size, (2.0, 1.0))?;

        let flow = farneback_flow(&prev, &next, &FarnebackParams::default())?;
        let (dx, dy) = mean_flow_in_center(&flow, 16);

        assert!((dx - 2.0).abs() < 0.5, "dx = {dx}");
        assert!((dy - 1.0).abs() < 0.5, "dy = {dy}");
        Ok(())
    }

    #[test]
    fn gaussian_window_recovers_translation() -> Result<(), FlowError> {
        let size = ImageSize {
            width: 64,
            height: 48,
        };
        let (prev, next) = shifted_pair(size, (-1.0, 1.5))?;

        let params = FarnebackParams {
            flags: FarnebackFlags {
                gaussian_window: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let flow = farneback_flow(&prev, &next, &params)?;
        let (dx, dy) = mean_flow_in_center(&flow, 14);

        assert!((dx + 1.0).abs() < 0.5, "dx = {dx}");
        assert!((dy - 1.5).abs() < 0.5, "dy = {dy}");
        Ok(())
    }

    #[test]
    fn initial_flow_is_used_as_starting_point() -> Result<(), FlowError> {
        let size = ImageSize {
            width: 48,
            height: 48,
        };
        let (prev, next) = shifted_pair(size, (1.0, 0.0))?;

        let mut flow = Image::<f32, 2>::from_size_fn(size, |_, _| [1.0, 0.0])?;
        let params = FarnebackParams {
            flags: FarnebackFlags {
                use_initial_flow: true,
                ..Default::default()
            },
            ..Default::default()
        };
        calc_optical_flow_farneback(&prev, &next, &mut flow, &params)?;

        let (dx, dy) = mean_flow_in_center(&flow, 12);
        assert!((dx - 1.0).abs() < 0.5, "dx = {dx}");
        assert!(dy.abs() < 0.5, "dy = {dy}");
        Ok(())
    }

    #[test]
    fn deterministic_output() -> Result<(), FlowError> {
        let size = ImageSize {
            width: 40,
            height: 40,
        };
        let (prev, next) = shifted_pair(size, (0.5, -0.5))?;
        let params = FarnebackParams::default();

        let a = farneback_flow(&prev, &next, &params)?;
        let b = farneback_flow(&prev, &next, &params)?;
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn size_mismatch() -> Result<(), FlowError> {
        let prev = Image::<f32, 1>::from_size_val(
            ImageSize {
                width: 8,
                height: 8,
            },
            0.0,
        )?;
        let next = Image::<f32, 1>::from_size_val(
            ImageSize {
                width: 8,
                height: 9,
            },
            0.0,
        )?;

        let res = farneback_flow(&prev, &next, &FarnebackParams::default());
        assert_eq!(
            res,
            Err(FlowError::SizeMismatch(prev.size(), next.size()))
        );
        Ok(())
    }

    #[test]
    fn empty_image() -> Result<(), FlowError> {
        let empty = Image::<f32, 1>::new(
            ImageSize {
                width: 0,
                height: 0,
            },
            vec![],
        )?;
        let res = farneback_flow(&empty, &empty, &FarnebackParams::default());
        assert_eq!(res, Err(FlowError::EmptyImage));
        Ok(())
    }

    #[test]
    fn gaussian_window_sigma_uses_half_size() {
        assert_eq!(gaussian_window_sigma(15), 0.3 * 7.0);
        assert_eq!(gaussian_window_sigma(21), 0.3 * 10.0);
        assert_eq!(gaussian_window_sigma(1), 0.0);

        let kernel = kernels::gaussian_kernel_1d(15, gaussian_window_sigma(15));
        approx::assert_relative_eq!(kernel.iter().sum::<f32>(), 1.0, epsilon = 1e-5);
        // sigma 2.1 over a half size of 7 leaves little weight on the ends
        assert!(kernel[0] < 0.01 * kernel[7]);
    }

    #[test]
    fn border_weights() {
        assert_eq!(border_weight(0, 100), 0.14);
        assert_eq!(border_weight(50, 100), 1.0);
        assert_eq!(border_weight(99, 100), 0.14);
        assert_eq!(border_weight(0, 1), 0.14 * 0.14);
    }
}
