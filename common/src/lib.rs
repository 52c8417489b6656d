pub mod config;
pub mod frame;
pub mod source;

pub use frame::{Frame, FrameError, PixelFormat};
pub use source::{AcquisitionError, FrameHandle, FrameSource};
