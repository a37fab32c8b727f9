use crate::shared::frame::Frame;
use crate::shared::geometry::{Point, Rect};
use crate::shared::orientation::Orientation;

use super::coordinate_transformer::{GeometryContext, GeometryError};

/// Resamples a sensor frame into display space.
///
/// Uses the same transform as feature points, so an eye mapped through
/// [`GeometryContext::map`] lands on the eye pixels of the projected frame.
/// The output covers the destination rect in its own local coordinates
/// (destination origin at pixel 0,0). Nearest-neighbour sampling.
pub fn project_to_display(frame: &Frame, ctx: &GeometryContext) -> Result<Frame, GeometryError> {
    let local = GeometryContext::new(
        ctx.source,
        Rect {
            origin: Point::default(),
            size: ctx.destination.size,
        },
        ctx.mirrored,
    );
    let inverse = local.transform()?.invert().ok_or(GeometryError::DegenerateGeometry {
        source_width: ctx.source.width(),
        source_height: ctx.source.height(),
        dest_width: ctx.destination.width(),
        dest_height: ctx.destination.height(),
    })?;

    let out_w = ctx.destination.width().round().max(1.0) as usize;
    let out_h = ctx.destination.height().round().max(1.0) as usize;
    let src_w = frame.width() as usize;
    let src_h = frame.height() as usize;
    let c = frame.channels() as usize;
    let src = frame.data();
    let mut out = vec![0u8; out_w * out_h * c];

    if src_w > 0 && src_h > 0 {
        for dy in 0..out_h {
            for dx in 0..out_w {
                let s = inverse.apply(Point::new(dx as f64 + 0.5, dy as f64 + 0.5));
                let sx = (s.x.floor().max(0.0) as usize).min(src_w - 1);
                let sy = (s.y.floor().max(0.0) as usize).min(src_h - 1);
                let si = (sy * src_w + sx) * c;
                let di = (dy * out_w + dx) * c;
                out[di..di + c].copy_from_slice(&src[si..si + c]);
            }
        }
    }

    Ok(Frame::new(
        out,
        out_w as u32,
        out_h as u32,
        frame.channels(),
        frame.index(),
    )
    .with_orientation(Orientation::Up)
    .with_timestamp(frame.timestamp()))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Single-channel 4x2 sensor frame with distinct values per pixel.
    fn sensor_frame() -> Frame {
        Frame::new((0..8).collect(), 4, 2, 1, 3)
    }

    fn context(mirrored: bool) -> GeometryContext {
        GeometryContext::new(
            Rect::from_dimensions(4, 2),
            Rect::from_dimensions(2, 4),
            mirrored,
        )
    }

    #[test]
    fn test_unmirrored_projection_is_transpose() {
        // 0 1 2 3        0 4
        // 4 5 6 7   ->   1 5
        //                2 6
        //                3 7
        let out = project_to_display(&sensor_frame(), &context(false)).unwrap();
        assert_eq!((out.width(), out.height()), (2, 4));
        assert_eq!(out.data(), &[0, 4, 1, 5, 2, 6, 3, 7]);
    }

    #[test]
    fn test_mirrored_projection_flips_columns() {
        let out = project_to_display(&sensor_frame(), &context(true)).unwrap();
        assert_eq!(out.data(), &[4, 0, 5, 1, 6, 2, 7, 3]);
    }

    #[test]
    fn test_scaling_repeats_pixels() {
        let ctx = GeometryContext::new(
            Rect::from_dimensions(4, 2),
            Rect::from_dimensions(4, 8),
            false,
        );
        let out = project_to_display(&sensor_frame(), &ctx).unwrap();
        assert_eq!((out.width(), out.height()), (4, 8));
        // Display row 0 comes from sensor column 0 (values 0 and 4).
        assert_eq!(&out.data()[0..4], &[0, 0, 4, 4]);
    }

    #[test]
    fn test_mapped_point_hits_projected_pixel() {
        let frame = sensor_frame();
        let ctx = context(true);
        let out = project_to_display(&frame, &ctx).unwrap();
        // Centre of sensor pixel (2, 1) holds value 6.
        let p = ctx.map(Point::new(2.5, 1.5)).unwrap();
        assert_eq!(out.pixel(p.x.floor() as u32, p.y.floor() as u32)[0], 6);
    }

    #[test]
    fn test_preserves_index_and_marks_upright() {
        let out = project_to_display(&sensor_frame(), &context(false)).unwrap();
        assert_eq!(out.index(), 3);
        assert_eq!(out.orientation(), Orientation::Up);
    }

    #[test]
    fn test_degenerate_destination_fails() {
        let ctx = GeometryContext::new(
            Rect::from_dimensions(4, 2),
            Rect::from_dimensions(0, 4),
            false,
        );
        assert!(project_to_display(&sensor_frame(), &ctx).is_err());
    }
}
