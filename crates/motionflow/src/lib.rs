#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

#[doc(inline)]
pub use motionflow_image as image;

#[doc(inline)]
pub use motionflow_imgproc as imgproc;

#[doc(inline)]
pub use motionflow_motion as motion;
