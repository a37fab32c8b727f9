use thiserror::Error;

#[derive(Error, Debug)]
pub enum OverlayError {
    #[error("failed to decode overlay image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("overlay must be non-empty, got {width}x{height}")]
    Empty { width: u32, height: u32 },
    #[error("overlay data length {actual} does not match {width}x{height} RGBA")]
    DataLength {
        width: u32,
        height: u32,
        actual: usize,
    },
}

/// Immutable straight-alpha RGBA image composited onto each eye.
///
/// Loaded once at startup and shared across frames behind an `Arc`;
/// nothing mutates it after construction.
#[derive(Debug, PartialEq)]
pub struct OverlayAsset {
    rgba: Vec<u8>,
    width: u32,
    height: u32,
}

impl OverlayAsset {
    pub fn from_rgba(rgba: Vec<u8>, width: u32, height: u32) -> Result<Self, OverlayError> {
        if width == 0 || height == 0 {
            return Err(OverlayError::Empty { width, height });
        }
        if rgba.len() != width as usize * height as usize * 4 {
            return Err(OverlayError::DataLength {
                width,
                height,
                actual: rgba.len(),
            });
        }
        Ok(Self {
            rgba,
            width,
            height,
        })
    }

    /// Built-in heart graphic, `size` x `size`, anti-aliased edges.
    pub fn heart(size: u32) -> Result<Self, OverlayError> {
        const COLOR: [u8; 3] = [220, 20, 60];
        const SUBSAMPLES: u32 = 4;

        let half = size as f64 / 2.0;
        let mut rgba = Vec::with_capacity(size as usize * size as usize * 4);
        for py in 0..size {
            for px in 0..size {
                let mut inside = 0u32;
                for sy in 0..SUBSAMPLES {
                    for sx in 0..SUBSAMPLES {
                        let fx = px as f64 + (sx as f64 + 0.5) / SUBSAMPLES as f64;
                        let fy = py as f64 + (sy as f64 + 0.5) / SUBSAMPLES as f64;
                        let x = (fx - half) / half * 1.3;
                        let y = (half - fy) / half * 1.3;
                        if in_heart(x, y) {
                            inside += 1;
                        }
                    }
                }
                let alpha = (inside * 255 / (SUBSAMPLES * SUBSAMPLES)) as u8;
                rgba.extend_from_slice(&[COLOR[0], COLOR[1], COLOR[2], alpha]);
            }
        }
        Self::from_rgba(rgba, size, size)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.rgba[i],
            self.rgba[i + 1],
            self.rgba[i + 2],
            self.rgba[i + 3],
        ]
    }
}

/// Heart curve `(x² + y² - 1)³ - x²y³ <= 0`, y pointing up.
fn in_heart(x: f64, y: f64) -> bool {
    let r = x * x + y * y - 1.0;
    r * r * r - x * x * y * y * y <= 0.0
}
