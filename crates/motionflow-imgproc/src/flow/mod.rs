//! Dense optical flow.
//!
//! Implements Gunnar Farnebäck's two-frame motion estimation based on
//! polynomial expansion, computed coarse to fine over an image pyramid.

mod error;
pub use error::FlowError;

mod farneback;
pub use farneback::{calc_optical_flow_farneback, farneback_flow};

mod params;
pub use params::{FarnebackFlags, FarnebackParams};

mod polynomial;
pub use polynomial::poly_expansion;
