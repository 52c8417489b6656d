use pulsecam_common::Frame;

/// Mean red-channel intensity of one frame, `0.0..=255.0`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Sample(f32);

impl Sample {
    pub fn new(value: f32) -> Self {
        Self(value)
    }

    pub fn value(self) -> f32 {
        self.0
    }
}

/// Reduce a frame to its mean red intensity.
///
/// Red carries the strongest cardiac absorption swing when a fingertip
/// covers the lens. Single pass, no allocation.
pub fn extract(frame: &Frame) -> Sample {
    let format = frame.format();
    let red_sum: u64 = frame
        .pixels()
        .chunks_exact(format.bytes_per_pixel())
        .map(|pixel| pixel[format.red_offset()] as u64)
        .sum();
    Sample((red_sum as f64 / frame.pixel_count() as f64) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulsecam_common::PixelFormat;

    #[test]
    fn solid_frame_yields_its_red_level() {
        let frame = Frame::solid(4, 4, [200, 10, 10]).unwrap();
        assert_eq!(extract(&frame).value(), 200.0);
    }

    #[test]
    fn averages_over_every_pixel() {
        // Two RGBA pixels: red 100 and red 201.
        let frame = Frame::new(2, 1, PixelFormat::Rgba8, vec![100, 0, 0, 255, 201, 9, 9, 255])
            .unwrap();
        assert_eq!(extract(&frame).value(), 150.5);
    }

    #[test]
    fn ignores_green_blue_and_alpha() {
        let frame = Frame::new(1, 1, PixelFormat::Rgba8, vec![7, 255, 255, 255]).unwrap();
        assert_eq!(extract(&frame).value(), 7.0);
    }

    #[test]
    fn reads_red_from_bgra_and_rgb() {
        let bgra = Frame::new(1, 1, PixelFormat::Bgra8, vec![1, 2, 90, 255]).unwrap();
        assert_eq!(extract(&bgra).value(), 90.0);

        let rgb = Frame::new(2, 1, PixelFormat::Rgb8, vec![10, 0, 0, 30, 0, 0]).unwrap();
        assert_eq!(extract(&rgb).value(), 20.0);
    }

    #[test]
    fn stays_within_channel_range() {
        let white = Frame::solid(3, 3, [255, 255, 255]).unwrap();
        let black = Frame::solid(3, 3, [0, 0, 0]).unwrap();
        assert_eq!(extract(&white).value(), 255.0);
        assert_eq!(extract(&black).value(), 0.0);
    }
}
