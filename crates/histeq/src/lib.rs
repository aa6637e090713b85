#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

#[doc(inline)]
pub use histeq_image as image;

#[doc(inline)]
pub use histeq_imgproc as imgproc;

#[doc(inline)]
pub use histeq_io as io;
