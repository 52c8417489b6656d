/// Channel layout of a frame's pixel bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelFormat {
    /// `[R, G, B, A, ...]`, what browsers and `image::RgbaImage` hand out.
    #[default]
    Rgba8,
    /// `[R, G, B, ...]`
    Rgb8,
    /// `[B, G, R, A, ...]`, common for native capture buffers.
    Bgra8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgba8 | PixelFormat::Bgra8 => 4,
            PixelFormat::Rgb8 => 3,
        }
    }

    /// Byte offset of the red channel within one pixel.
    pub fn red_offset(self) -> usize {
        match self {
            PixelFormat::Rgba8 | PixelFormat::Rgb8 => 0,
            PixelFormat::Bgra8 => 2,
        }
    }
}

/// One captured video frame.
///
/// Frames are handed to the analysis core by reference for the duration of a
/// single extraction and are never retained by it.
#[derive(Debug, Clone)]
pub struct Frame {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl Frame {
    /// Wrap raw pixel bytes. Trailing bytes past `width * height` pixels are
    /// kept but ignored by the pixel accessors.
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        data: Vec<u8>,
    ) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::ZeroSized { width, height });
        }
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if data.len() < expected {
            return Err(FrameError::TooShort {
                got: data.len(),
                expected,
            });
        }
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    /// A frame where every pixel has the same RGB value.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Result<Self, FrameError> {
        let pixel = [rgb[0], rgb[1], rgb[2], 255];
        let data = pixel.repeat(width as usize * height as usize);
        Self::new(width, height, PixelFormat::Rgba8, data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Pixel bytes, exactly `pixel_count() * bytes_per_pixel()` long.
    pub fn pixels(&self) -> &[u8] {
        &self.data[..self.pixel_count() * self.format.bytes_per_pixel()]
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame payload too short: got {got} bytes, expected at least {expected}")]
    TooShort { got: usize, expected: usize },
    #[error("frame has zero area ({width}x{height})")]
    ZeroSized { width: u32, height: u32 },
    #[error("failed to decode frame: {0}")]
    Decode(String),
    #[error("camera connection failed: {0}")]
    Transport(String),
    #[error("frame source closed")]
    SourceClosed,
}
