use crate::{Image, ImageError};

/// Concatenate two images along the channel axis.
///
/// The `C1` channels of `first` are written first, followed by the `C2`
/// channels of `second`. Values are converted into the destination type
/// without rescaling.
///
/// # Arguments
///
/// * `first` - The image providing the leading channels.
/// * `second` - The image providing the trailing channels.
/// * `dst` - The destination image with `C1 + C2` channels.
///
/// # Errors
///
/// Fails when the spatial sizes differ or when `C3 != C1 + C2`.
///
/// Example:
///
/// ```
/// use motionflow_image::{Image, ImageSize};
/// use motionflow_image::ops::concat_channels;
///
/// let size = ImageSize { width: 1, height: 1 };
/// let rgb = Image::<u8, 3>::new(size, vec![1, 2, 3]).unwrap();
/// let flow = Image::<f32, 2>::new(size, vec![0.5, -0.5]).unwrap();
///
/// let mut out = Image::<f32, 5>::from_size_val(size, 0.0).unwrap();
/// concat_channels(&rgb, &flow, &mut out).unwrap();
///
/// assert_eq!(out.as_slice(), &[1.0, 2.0, 3.0, 0.5, -0.5]);
/// ```
pub fn concat_channels<T1, T2, U, const C1: usize, const C2: usize, const C3: usize>(
    first: &Image<T1, C1>,
    second: &Image<T2, C2>,
    dst: &mut Image<U, C3>,
) -> Result<(), ImageError>
where
    T1: Copy + num_traits::NumCast,
    T2: Copy + num_traits::NumCast,
    U: Copy + num_traits::NumCast,
{
    if C1 + C2 != C3 {
        return Err(ImageError::InvalidChannelCount(C1 + C2, C3));
    }

    for other in [second.size(), dst.size()] {
        if first.size() != other {
            return Err(ImageError::InvalidImageSize(
                first.width(),
                first.height(),
                other.width,
                other.height,
            ));
        }
    }

    let cast_err = || ImageError::CastError(std::any::type_name::<U>().to_string());

    dst.as_slice_mut()
        .chunks_exact_mut(C3)
        .zip(first.as_slice().chunks_exact(C1))
        .zip(second.as_slice().chunks_exact(C2))
        .try_for_each(|((out, a), b)| {
            let (head, tail) = out.split_at_mut(C1);
            for (o, &v) in head.iter_mut().zip(a) {
                *o = U::from(v).ok_or_else(cast_err)?;
            }
            for (o, &v) in tail.iter_mut().zip(b) {
                *o = U::from(v).ok_or_else(cast_err)?;
            }
            Ok::<(), ImageError>(())
        })?;

    Ok(())
}
