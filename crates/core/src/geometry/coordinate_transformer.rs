//! Sensor-space to display-space mapping for feature points.
//!
//! The sensor delivers landscape buffers while the display is portrait, so
//! the x and y axes swap: display width scales with sensor height and display
//! height with sensor width. Mirroring flips the result across the
//! destination's vertical midline.

use thiserror::Error;

use crate::shared::geometry::{Point, Rect};

use super::affine_transform::AffineTransform;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("degenerate geometry: source {source_width}x{source_height}, destination {dest_width}x{dest_height}")]
    DegenerateGeometry {
        source_width: f64,
        source_height: f64,
        dest_width: f64,
        dest_height: f64,
    },
}

/// Everything needed to place one overlay: frame rect, render-target rect,
/// and whether the preview is mirrored.
///
/// Built per placement. The destination may change between frames (device
/// rotation, window resize), so the transform is never cached.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeometryContext {
    pub source: Rect,
    pub destination: Rect,
    pub mirrored: bool,
}

impl GeometryContext {
    pub fn new(source: Rect, destination: Rect, mirrored: bool) -> Self {
        Self {
            source,
            destination,
            mirrored,
        }
    }

    /// Full sensor-to-display transform, including the destination origin.
    pub fn transform(&self) -> Result<AffineTransform, GeometryError> {
        if self.source.is_degenerate() || self.destination.is_degenerate() {
            return Err(GeometryError::DegenerateGeometry {
                source_width: self.source.width(),
                source_height: self.source.height(),
                dest_width: self.destination.width(),
                dest_height: self.destination.height(),
            });
        }

        let width_scale = self.destination.width() / self.source.height();
        let height_scale = self.destination.height() / self.source.width();

        let rotate = if self.mirrored {
            AffineTransform::new(
                0.0,
                height_scale,
                -width_scale,
                0.0,
                self.destination.width(),
                0.0,
            )
        } else {
            AffineTransform::new(0.0, height_scale, width_scale, 0.0, 0.0, 0.0)
        };

        Ok(rotate.then(&AffineTransform::translation(
            self.destination.min_x(),
            self.destination.min_y(),
        )))
    }

    pub fn map(&self, point: Point) -> Result<Point, GeometryError> {
        Ok(self.transform()?.apply(point))
    }
}

/// Maps `point` from `source` (sensor) space into `destination` (display) space.
pub fn transform(
    point: Point,
    source: Rect,
    destination: Rect,
    mirrored: bool,
) -> Result<Point, GeometryError> {
    GeometryContext::new(source, destination, mirrored).map(point)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn sensor() -> Rect {
        Rect::new(0.0, 0.0, 640.0, 480.0)
    }

    fn display() -> Rect {
        Rect::new(0.0, 0.0, 360.0, 640.0)
    }

    #[test]
    fn test_unmirrored_swaps_and_scales_axes() {
        // width_scale = 360 / 480 = 0.75, height_scale = 640 / 640 = 1.0
        let p = transform(Point::new(100.0, 200.0), sensor(), display(), false).unwrap();
        assert_relative_eq!(p.x, 150.0);
        assert_relative_eq!(p.y, 100.0);
    }

    #[test]
    fn test_mirrored_flips_horizontally() {
        let p = transform(Point::new(100.0, 200.0), sensor(), display(), true).unwrap();
        assert_relative_eq!(p.x, 360.0 - 150.0);
        assert_relative_eq!(p.y, 100.0);
    }

    #[test]
    fn test_destination_origin_offsets_result() {
        let dest = Rect::new(20.0, 40.0, 360.0, 640.0);
        let p = transform(Point::new(100.0, 200.0), sensor(), dest, false).unwrap();
        assert_relative_eq!(p.x, 170.0);
        assert_relative_eq!(p.y, 140.0);
    }

    #[test]
    fn test_corners_map_to_destination_corners() {
        let ctx = GeometryContext::new(sensor(), display(), false);
        let far = ctx.map(Point::new(640.0, 480.0)).unwrap();
        assert_relative_eq!(far.x, 360.0);
        assert_relative_eq!(far.y, 640.0);
        let origin = ctx.map(Point::new(0.0, 0.0)).unwrap();
        assert_relative_eq!(origin.x, 0.0);
        assert_relative_eq!(origin.y, 0.0);
    }

    #[rstest]
    #[case::zero_source_width(Rect::new(0.0, 0.0, 0.0, 480.0), display())]
    #[case::zero_source_height(Rect::new(0.0, 0.0, 640.0, 0.0), display())]
    #[case::zero_destination(sensor(), Rect::new(0.0, 0.0, 0.0, 0.0))]
    fn test_degenerate_geometry_rejected(#[case] source: Rect, #[case] dest: Rect) {
        let result = transform(Point::new(1.0, 1.0), source, dest, false);
        assert!(matches!(
            result,
            Err(GeometryError::DegenerateGeometry { .. })
        ));
    }

    #[rstest]
    #[case(sensor(), display())]
    #[case(Rect::new(0.0, 0.0, 1920.0, 1080.0), Rect::new(10.0, 5.0, 375.0, 812.0))]
    #[case(Rect::new(0.0, 0.0, 3.0, 7.0), Rect::new(-50.0, 100.0, 11.0, 2.0))]
    fn test_points_inside_source_land_inside_destination(
        #[case] source: Rect,
        #[case] dest: Rect,
    ) {
        let steps = 8;
        for mirrored in [false, true] {
            let ctx = GeometryContext::new(source, dest, mirrored);
            for i in 0..=steps {
                for j in 0..=steps {
                    let p = Point::new(
                        source.min_x() + source.width() * i as f64 / steps as f64,
                        source.min_y() + source.height() * j as f64 / steps as f64,
                    );
                    let q = ctx.map(p).unwrap();
                    assert!(
                        q.x >= dest.min_x() - 1e-9
                            && q.x <= dest.max_x() + 1e-9
                            && q.y >= dest.min_y() - 1e-9
                            && q.y <= dest.max_y() + 1e-9,
                        "{p:?} mapped outside {dest:?}: {q:?}"
                    );
                }
            }
        }
    }

    #[rstest]
    #[case(Point::new(0.0, 0.0))]
    #[case(Point::new(320.0, 240.0))]
    #[case(Point::new(17.5, 401.25))]
    fn test_mirrored_is_reflection_across_midline(#[case] p: Point) {
        let dest = Rect::new(30.0, 0.0, 360.0, 640.0);
        let plain = transform(p, sensor(), dest, false).unwrap();
        let mirrored = transform(p, sensor(), dest, true).unwrap();
        assert_relative_eq!(plain.x + mirrored.x, 2.0 * dest.min_x() + dest.width(), epsilon = 1e-9);
        assert_relative_eq!(plain.y, mirrored.y, epsilon = 1e-9);
    }

    #[test]
    fn test_transform_is_invertible() {
        let t = GeometryContext::new(sensor(), display(), true)
            .transform()
            .unwrap();
        assert!(t.invert().is_some());
    }
}
