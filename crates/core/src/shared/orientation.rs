use std::str::FromStr;

use image::{imageops, ImageBuffer, Luma, LumaA, Pixel, Rgb, Rgba};

use super::frame::Frame;
use super::geometry::Point;

/// Clockwise rotation that brings a sensor image upright.
///
/// Phone cameras deliver landscape buffers while the device is held in
/// portrait, so the default is `Right` (EXIF tag 6).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Orientation {
    Up,
    #[default]
    Right,
    Down,
    Left,
}

impl Orientation {
    /// EXIF / image-orientation tag for this rotation.
    pub fn exif_tag(self) -> u8 {
        match self {
            Orientation::Up => 1,
            Orientation::Right => 6,
            Orientation::Down => 3,
            Orientation::Left => 8,
        }
    }

    /// Mirrored EXIF tags (2, 4, 5, 7) are not produced by capture sources.
    pub fn from_exif_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Orientation::Up),
            6 => Some(Orientation::Right),
            3 => Some(Orientation::Down),
            8 => Some(Orientation::Left),
            _ => None,
        }
    }

    /// Maps container rotation metadata (degrees clockwise) to the nearest
    /// quarter turn.
    pub fn from_rotation_degrees(degrees: i32) -> Self {
        match degrees.rem_euclid(360) {
            45..=134 => Orientation::Right,
            135..=224 => Orientation::Down,
            225..=315 => Orientation::Left,
            _ => Orientation::Up,
        }
    }

    /// Maps a point in upright-image coordinates back to sensor coordinates.
    pub fn to_sensor(self, upright: Point, sensor_width: f64, sensor_height: f64) -> Point {
        let (ux, uy) = (upright.x, upright.y);
        match self {
            Orientation::Up => Point::new(ux, uy),
            Orientation::Right => Point::new(uy, sensor_height - ux),
            Orientation::Down => Point::new(sensor_width - ux, sensor_height - uy),
            Orientation::Left => Point::new(sensor_width - uy, ux),
        }
    }

    /// The rotation that undoes this one.
    pub fn inverse(self) -> Self {
        match self {
            Orientation::Right => Orientation::Left,
            Orientation::Left => Orientation::Right,
            other => other,
        }
    }

    /// Rotates an upright image into the sensor layout this orientation
    /// describes, tagging the result with `self`.
    pub fn to_sensor_frame(self, upright: &Frame) -> Frame {
        self.inverse().upright(upright).with_orientation(self)
    }

    /// Rotates a sensor frame so its content is upright.
    ///
    /// Frames with 1 to 4 channels are rotated through `image::imageops`;
    /// any other layout is returned unrotated with a warning.
    pub fn upright(self, frame: &Frame) -> Frame {
        let rotated = match frame.channels() {
            _ if self == Orientation::Up => None,
            1 => self.rotate::<Luma<u8>>(frame),
            2 => self.rotate::<LumaA<u8>>(frame),
            3 => self.rotate::<Rgb<u8>>(frame),
            4 => self.rotate::<Rgba<u8>>(frame),
            c => {
                log::warn!("Cannot rotate a {c}-channel frame");
                None
            }
        };
        let Some((data, width, height)) = rotated else {
            return frame.clone().with_orientation(Orientation::Up);
        };
        Frame::new(data, width, height, frame.channels(), frame.index())
            .with_orientation(Orientation::Up)
            .with_timestamp(frame.timestamp())
    }

    fn rotate<P>(self, frame: &Frame) -> Option<(Vec<u8>, u32, u32)>
    where
        P: Pixel<Subpixel = u8> + 'static,
    {
        let view = ImageBuffer::<P, &[u8]>::from_raw(frame.width(), frame.height(), frame.data())?;
        let out = match self {
            Orientation::Up => return None,
            Orientation::Right => imageops::rotate90(&view),
            Orientation::Down => imageops::rotate180(&view),
            Orientation::Left => imageops::rotate270(&view),
        };
        let (width, height) = out.dimensions();
        Some((out.into_raw(), width, height))
    }
}

impl FromStr for Orientation {
    type Err = String;

    /// Accepts a direction name (`up`, `right`, `down`, `left`) or an EXIF
    /// tag (`1`, `6`, `3`, `8`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" => Ok(Orientation::Up),
            "right" => Ok(Orientation::Right),
            "down" => Ok(Orientation::Down),
            "left" => Ok(Orientation::Left),
            other => other
                .parse::<u8>()
                .ok()
                .and_then(Orientation::from_exif_tag)
                .ok_or_else(|| format!("invalid orientation '{s}'")),
        }
    }
}
