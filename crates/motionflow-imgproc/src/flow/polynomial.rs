use glam::{DMat3, DVec3};
use motionflow_image::{Image, ImageError};
use rayon::prelude::*;

/// Separable gaussian weights and the inverse normal-equation terms of the
/// quadratic fit `r0 + r1 x + r2 y + r3 x^2 + r4 y^2 + r5 xy`.
pub(crate) struct PolyExpansionKernel {
    /// `g[k]` for `|x| = k`.
    g: Vec<f32>,
    /// `k * g[k]`.
    xg: Vec<f32>,
    /// `k^2 * g[k]`.
    xxg: Vec<f32>,
    ig11: f64,
    ig03: f64,
    ig33: f64,
    ig55: f64,
}

impl PolyExpansionKernel {
    pub(crate) fn new(n: usize, sigma: f64) -> Self {
        let sigma = if sigma < f64::from(f32::EPSILON) {
            n as f64 * 0.3
        } else {
            sigma
        };

        let mut g: Vec<f32> = (0..=n)
            .map(|k| (-((k * k) as f64) / (2.0 * sigma * sigma)).exp() as f32)
            .collect();
        let norm = 1.0 / (g[0] as f64 + 2.0 * g[1..].iter().map(|&v| v as f64).sum::<f64>());
        g.iter_mut().for_each(|v| *v = (*v as f64 * norm) as f32);

        let xg = g.iter().enumerate().map(|(k, &v)| k as f32 * v).collect();
        let xxg = g
            .iter()
            .enumerate()
            .map(|(k, &v)| (k * k) as f32 * v)
            .collect();

        // moments of the 2D weight over the (2n+1)^2 neighbourhood
        let (mut m00, mut m11, mut m33, mut m55) = (0.0f64, 0.0f64, 0.0f64, 0.0f64);
        let n = n as isize;
        for y in -n..=n {
            for x in -n..=n {
                let w = g[y.unsigned_abs()] as f64 * g[x.unsigned_abs()] as f64;
                let (x2, y2) = ((x * x) as f64, (y * y) as f64);
                m00 += w;
                m11 += w * x2;
                m33 += w * x2 * x2;
                m55 += w * x2 * y2;
            }
        }

        // the constant and both square terms form the only coupled block
        let block = DMat3::from_cols(
            DVec3::new(m00, m11, m11),
            DVec3::new(m11, m33, m55),
            DVec3::new(m11, m55, m33),
        );
        let inv = block.inverse();

        Self {
            g,
            xg,
            xxg,
            ig11: 1.0 / m11,
            ig03: inv.y_axis.x,
            ig33: inv.y_axis.y,
            ig55: 1.0 / m55,
        }
    }

    fn n(&self) -> usize {
        self.g.len() - 1
    }
}

/// Approximate every pixel neighbourhood with a quadratic polynomial.
///
/// The output stores five coefficients per pixel in the order
/// `[y, x, y^2, x^2, xy]`; the constant term is not kept. Pixels outside the
/// image are replicated from the border.
///
/// # Arguments
///
/// * `src` - The single channel input image.
/// * `dst` - The five channel coefficient image, same size as `src`.
/// * `poly_n` - Half size of the neighbourhood, the window spans `2 * poly_n + 1` pixels.
/// * `poly_sigma` - Sigma of the gaussian weighting the fit.
///
/// # Example
///
/// ```
/// use motionflow_image::{Image, ImageSize};
/// use motionflow_imgproc::flow::poly_expansion;
///
/// // f(x, y) = 2x
/// let image = Image::<f32, 1>::from_size_fn(
///     ImageSize { width: 16, height: 16 },
///     |x, _| [2.0 * x as f32],
/// ).unwrap();
///
/// let mut coeffs = Image::<f32, 5>::from_size_val(image.size(), 0.0).unwrap();
/// poly_expansion(&image, &mut coeffs, 5, 1.2).unwrap();
///
/// let center = coeffs.get([8, 8, 1]).unwrap();
/// assert!((center - 2.0).abs() < 1e-3);
/// ```
pub fn poly_expansion(
    src: &Image<f32, 1>,
    dst: &mut Image<f32, 5>,
    poly_n: usize,
    poly_sigma: f64,
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

    let kernel = PolyExpansionKernel::new(poly_n, poly_sigma);
    poly_expansion_with_kernel(src, dst, &kernel);

    Ok(())
}

pub(crate) fn poly_expansion_with_kernel(
    src: &Image<f32, 1>,
    dst: &mut Image<f32, 5>,
    kernel: &PolyExpansionKernel,
) {
    let (width, height) = (src.width(), src.height());
    let n = kernel.n();
    let data = src.as_slice();
    let src_row = |y: usize| &data[y * width..(y + 1) * width];

    dst.as_slice_mut()
        .par_chunks_exact_mut(width * 5)
        .enumerate()
        .for_each(|(y, drow)| {
            // vertical part of the convolution, three sums per column
            let mut row = vec![0.0f32; width * 3];
            let g0 = kernel.g[0];
            for (acc, &v) in row.chunks_exact_mut(3).zip(src_row(y)) {
                acc[0] = v * g0;
            }

            for k in 1..=n {
                let (g, xg, xxg) = (kernel.g[k], kernel.xg[k], kernel.xxg[k]);
                let above = src_row(y.saturating_sub(k));
                let below = src_row((y + k).min(height - 1));
                for ((acc, &a), &b) in row.chunks_exact_mut(3).zip(above).zip(below) {
                    let p = a + b;
                    acc[0] += g * p;
                    acc[1] += xg * (b - a);
                    acc[2] += xxg * p;
                }
            }

            // horizontal part of the convolution
            for (x, out) in drow.chunks_exact_mut(5).enumerate() {
                let g0 = kernel.g[0] as f64;
                let mut b1 = row[x * 3] as f64 * g0;
                let mut b2 = 0.0f64;
                let mut b3 = row[x * 3 + 1] as f64 * g0;
                let mut b4 = 0.0f64;
                let mut b5 = row[x * 3 + 2] as f64 * g0;
                let mut b6 = 0.0f64;

                for k in 1..=n {
                    let r = (x + k).min(width - 1) * 3;
                    let l = x.saturating_sub(k) * 3;
                    let g = kernel.g[k] as f64;
                    let xg = kernel.xg[k] as f64;

                    let tg = (row[r] + row[l]) as f64;
                    b1 += tg * g;
                    b4 += tg * kernel.xxg[k] as f64;
                    b2 += (row[r] - row[l]) as f64 * xg;
                    b3 += (row[r + 1] + row[l + 1]) as f64 * g;
                    b6 += (row[r + 1] - row[l + 1]) as f64 * xg;
                    b5 += (row[r + 2] + row[l + 2]) as f64 * g;
                }

                out[0] = (b3 * kernel.ig11) as f32;
                out[1] = (b2 * kernel.ig11) as f32;
                out[2] = (b1 * kernel.ig03 + b5 * kernel.ig33) as f32;
                out[3] = (b1 * kernel.ig03 + b4 * kernel.ig33) as f32;
                out[4] = (b6 * kernel.ig55) as f32;
            }
        });
}
