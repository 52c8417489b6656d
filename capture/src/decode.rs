use image::ImageReader;
use pulsecam_common::{Frame, FrameError, PixelFormat};
use std::io::Cursor;

/// Decode a JPEG (or any format `image` can sniff) into an RGBA frame.
pub fn decode_jpeg(jpeg_data: &[u8]) -> Result<Frame, FrameError> {
    let img = ImageReader::new(Cursor::new(jpeg_data))
        .with_guessed_format()
        .map_err(|e| FrameError::Decode(e.to_string()))?
        .decode()
        .map_err(|e| FrameError::Decode(e.to_string()))?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Frame::new(width, height, PixelFormat::Rgba8, rgba.into_raw())
}
