use crate::compositing::domain::frame_compositor::FrameCompositor;
use crate::compositing::domain::overlay_asset::OverlayAsset;
use crate::shared::frame::Frame;
use crate::shared::geometry::Point;

/// CPU compositor using "source-over" alpha blending.
///
/// The overlay is straight (non-premultiplied) RGBA. RGB bases are treated
/// as opaque; RGBA bases get the combined alpha `as + ad * (1 - as)`.
/// Overlay pixels falling outside the base are clipped.
pub struct SourceOverCompositor;

impl SourceOverCompositor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SourceOverCompositor {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameCompositor for SourceOverCompositor {
    fn composite(&self, base: &Frame, overlay: &OverlayAsset, anchor: Point) -> Frame {
        let mut out = base.clone();
        let channels = out.channels() as usize;
        if channels < 3 {
            log::warn!("Cannot composite onto a {channels}-channel frame; leaving it unchanged");
            return out;
        }

        let (left, top) = placement_origin(overlay, anchor);
        let bw = out.width() as i64;
        let bh = out.height() as i64;
        let ow = overlay.width() as i64;
        let oh = overlay.height() as i64;

        let x0 = left.max(0);
        let y0 = top.max(0);
        let x1 = (left + ow).min(bw);
        let y1 = (top + oh).min(bh);
        if x0 >= x1 || y0 >= y1 {
            return out;
        }

        let data = out.data_mut();
        for by in y0..y1 {
            for bx in x0..x1 {
                let src = overlay.pixel((bx - left) as u32, (by - top) as u32);
                if src[3] == 0 {
                    continue;
                }
                let i = (by as usize * bw as usize + bx as usize) * channels;
                blend_pixel(&mut data[i..i + channels], src);
            }
        }

        out
    }
}

/// Top-left base pixel covered by the overlay when centred on `anchor`.
pub fn placement_origin(overlay: &OverlayAsset, anchor: Point) -> (i64, i64) {
    let half_w = overlay.width() as f64 / 2.0;
    let half_h = overlay.height() as f64 / 2.0;
    (
        (anchor.x - half_w).round() as i64,
        (anchor.y - half_h).round() as i64,
    )
}

fn blend_pixel(dst: &mut [u8], src: [u8; 4]) {
    let sa = src[3] as f32 / 255.0;

    if dst.len() >= 4 {
        let da = dst[3] as f32 / 255.0;
        let oa = sa + da * (1.0 - sa);
        if oa <= 0.0 {
            dst[..4].fill(0);
            return;
        }
        for c in 0..3 {
            let v = (src[c] as f32 * sa + dst[c] as f32 * da * (1.0 - sa)) / oa;
            dst[c] = v.round().clamp(0.0, 255.0) as u8;
        }
        dst[3] = (oa * 255.0).round().clamp(0.0, 255.0) as u8;
    } else {
        for c in 0..3 {
            let v = src[c] as f32 * sa + dst[c] as f32 * (1.0 - sa);
            dst[c] = v.round().clamp(0.0, 255.0) as u8;
        }
    }
}
