/// Eye detector backed by a YOLO face-pose model running in ONNX Runtime.
///
/// Rotates the frame upright using the orientation hint, letterboxes it to
/// the model input, runs inference, filters by confidence, applies NMS, and
/// reads the two eye keypoints of each surviving face. Keypoints are mapped
/// back to sensor coordinates before they leave the detector.
use std::borrow::Cow;
use std::path::Path;

use crate::detection::domain::face_feature::FaceFeature;
use crate::detection::domain::feature_detector::FeatureDetector;
use crate::shared::frame::Frame;
use crate::shared::geometry::Point;
use crate::shared::orientation::Orientation;

use ort::execution_providers::ExecutionProviderDispatch;

/// Fallback model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

pub const DEFAULT_CONFIDENCE: f64 = 0.25;

const NMS_IOU_THRESH: f64 = 0.45;

/// 5 landmarks × (x, y, conf).
const NUM_KEYPOINT_VALUES: usize = 15;

const LEFT_EYE_KEYPOINT: usize = 0;
const RIGHT_EYE_KEYPOINT: usize = 1;

/// Minimum keypoint confidence to report an eye as present.
const KEYPOINT_CONF_THRESH: f64 = 0.5;

pub struct OnnxEyeDetector {
    session: ort::session::Session,
    confidence: f64,
    input_size: u32,
}

impl OnnxEyeDetector {
    /// Loads the model and reads its input resolution (NCHW), falling back to
    /// 640 when the shape is dynamic.
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?
            .with_execution_providers(accelerators())?
            .commit_from_file(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    if shape.len() >= 4 && shape[2] > 0 {
                        Some(shape[2] as u32)
                    } else {
                        None
                    }
                } else {
                    None
                }
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        log::debug!("Loaded eye model {} (input {input_size}px)", model_path.display());

        Ok(Self {
            session,
            confidence,
            input_size,
        })
    }
}

/// Hardware providers tried before ONNX Runtime's built-in CPU provider.
/// Registration failures fall through to CPU.
fn accelerators() -> Vec<ExecutionProviderDispatch> {
    #[allow(unused_mut)]
    let mut providers = Vec::new();
    #[cfg(target_os = "macos")]
    providers.push(ort::execution_providers::CoreMLExecutionProvider::default().build());
    #[cfg(target_os = "windows")]
    providers.push(ort::execution_providers::DirectMLExecutionProvider::default().build());
    log::debug!("Requesting {} accelerated execution provider(s)", providers.len());
    providers
}

impl FeatureDetector for OnnxEyeDetector {
    fn detect(
        &mut self,
        frame: &Frame,
        orientation: Orientation,
    ) -> Result<Vec<FaceFeature>, Box<dyn std::error::Error>> {
        if frame.width() == 0 || frame.height() == 0 {
            return Ok(Vec::new());
        }
        if frame.channels() < 3 {
            return Err(format!("Expected RGB(A) frame, got {} channels", frame.channels()).into());
        }

        let upright: Cow<'_, Frame> = if orientation == Orientation::Up {
            Cow::Borrowed(frame)
        } else {
            Cow::Owned(orientation.upright(frame))
        };

        let (input_tensor, letterbox) = letterbox(&upright, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        if shape.len() != 3 {
            return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
        }
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let mut raw = parse_detections(data, &shape, self.confidence, &letterbox);
        let kept = nms(&mut raw, NMS_IOU_THRESH);

        let sensor_w = frame.width() as f64;
        let sensor_h = frame.height() as f64;
        Ok(kept
            .iter()
            .map(|d| {
                FaceFeature::new(
                    d.left_eye.map(|p| orientation.to_sensor(p, sensor_w, sensor_h)),
                    d.right_eye.map(|p| orientation.to_sensor(p, sensor_w, sensor_h)),
                )
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq)]
struct Letterbox {
    scale: f64,
    pad_x: u32,
    pad_y: u32,
}

impl Letterbox {
    fn to_image(&self, x: f64, y: f64) -> Point {
        Point::new(
            (x - self.pad_x as f64) / self.scale,
            (y - self.pad_y as f64) / self.scale,
        )
    }
}

/// Letterbox-resize a frame to `target_size` × `target_size`, NCHW float32.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, Letterbox) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).min(target_size);
    let new_h = ((fh * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // YOLO convention: pad with 114/255 gray
    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (
        tensor,
        Letterbox {
            scale,
            pad_x,
            pad_y,
        },
    )
}

// ---------------------------------------------------------------------------
// Post-processing
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct RawDetection {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    confidence: f64,
    left_eye: Option<Point>,
    right_eye: Option<Point>,
}

/// Parses `[1, features, detections]` (transposed) or
/// `[1, detections, features]` output into detections in upright-image
/// coordinates. Row layout: `[cx, cy, w, h, conf, kp0_x, kp0_y, kp0_conf, ...]`.
fn parse_detections(
    data: &[f32],
    shape: &[usize],
    min_confidence: f64,
    letterbox: &Letterbox,
) -> Vec<RawDetection> {
    let (num_dets, num_feats, transposed) = output_layout(shape);
    if num_feats < 5 {
        return Vec::new();
    }

    let value = |det: usize, feat: usize| -> f64 {
        if transposed {
            data[feat * num_dets + det] as f64
        } else {
            data[det * num_feats + feat] as f64
        }
    };

    let keypoint = |det: usize, k: usize| -> Option<Point> {
        if num_feats < 5 + NUM_KEYPOINT_VALUES {
            return None;
        }
        let base = 5 + k * 3;
        if value(det, base + 2) < KEYPOINT_CONF_THRESH {
            return None;
        }
        Some(letterbox.to_image(value(det, base), value(det, base + 1)))
    };

    let mut dets = Vec::new();
    for i in 0..num_dets {
        let conf = value(i, 4);
        if conf < min_confidence {
            continue;
        }
        let (cx, cy, w, h) = (value(i, 0), value(i, 1), value(i, 2), value(i, 3));
        let top_left = letterbox.to_image(cx - w / 2.0, cy - h / 2.0);
        let bottom_right = letterbox.to_image(cx + w / 2.0, cy + h / 2.0);

        dets.push(RawDetection {
            x1: top_left.x,
            y1: top_left.y,
            x2: bottom_right.x,
            y2: bottom_right.y,
            confidence: conf,
            left_eye: keypoint(i, LEFT_EYE_KEYPOINT),
            right_eye: keypoint(i, RIGHT_EYE_KEYPOINT),
        });
    }
    dets
}

/// Returns `(detections, features, transposed)` for a `[1, a, b]` output.
///
/// A dimension matching a known row width (box only, or box plus keypoints)
/// is the feature axis; otherwise the smaller dimension is.
fn output_layout(shape: &[usize]) -> (usize, usize, bool) {
    let is_feature_dim = |n: usize| n == 5 || n == 5 + NUM_KEYPOINT_VALUES;
    let transposed = match (is_feature_dim(shape[1]), is_feature_dim(shape[2])) {
        (true, false) => true,
        (false, true) => false,
        _ => shape[1] < shape[2],
    };
    if transposed {
        (shape[2], shape[1], true)
    } else {
        (shape[1], shape[2], false)
    }
}

/// Greedy NMS: sort by confidence descending, suppress overlapping boxes.
fn nms(dets: &mut [RawDetection], iou_thresh: f64) -> Vec<RawDetection> {
    dets.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; dets.len()];

    for i in 0..dets.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(dets[i].clone());
        for j in (i + 1)..dets.len() {
            if suppressed[j] {
                continue;
            }
            let iou = bbox_iou(
                &[dets[i].x1, dets[i].y1, dets[i].x2, dets[i].y2],
                &[dets[j].x1, dets[j].y1, dets[j].x2, dets[j].y2],
            );
            if iou > iou_thresh {
                suppressed[j] = true;
            }
        }
    }
    keep
}

fn bbox_iou(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    inter / (area_a + area_b - inter)
}
