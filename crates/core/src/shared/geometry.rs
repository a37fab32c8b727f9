/// A point in a 2D coordinate space (sensor or display, by context).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle with origin at its top-left corner.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    /// Rectangle at the origin covering `width` x `height` pixels.
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        Self::new(0.0, 0.0, width as f64, height as f64)
    }

    pub fn width(&self) -> f64 {
        self.size.width
    }

    pub fn height(&self) -> f64 {
        self.size.height
    }

    pub fn min_x(&self) -> f64 {
        self.origin.x
    }

    pub fn min_y(&self) -> f64 {
        self.origin.y
    }

    pub fn max_x(&self) -> f64 {
        self.origin.x + self.size.width
    }

    pub fn max_y(&self) -> f64 {
        self.origin.y + self.size.height
    }

    /// True when either dimension is zero, negative or NaN.
    pub fn is_degenerate(&self) -> bool {
        !(self.size.width > 0.0 && self.size.height > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_rect_edges() {
        let r = Rect::new(10.0, 20.0, 100.0, 50.0);
        assert_relative_eq!(r.min_x(), 10.0);
        assert_relative_eq!(r.max_x(), 110.0);
        assert_relative_eq!(r.min_y(), 20.0);
        assert_relative_eq!(r.max_y(), 70.0);
    }

    #[test]
    fn test_from_dimensions() {
        let r = Rect::from_dimensions(640, 480);
        assert_eq!(r, Rect::new(0.0, 0.0, 640.0, 480.0));
    }

    #[rstest]
    #[case::zero_width(Rect::new(0.0, 0.0, 0.0, 10.0), true)]
    #[case::zero_height(Rect::new(0.0, 0.0, 10.0, 0.0), true)]
    #[case::negative(Rect::new(0.0, 0.0, -5.0, 10.0), true)]
    #[case::nan(Rect::new(0.0, 0.0, f64::NAN, 10.0), true)]
    #[case::valid(Rect::new(5.0, 5.0, 1.0, 1.0), false)]
    fn test_is_degenerate(#[case] r: Rect, #[case] expected: bool) {
        assert_eq!(r.is_degenerate(), expected);
    }
}
