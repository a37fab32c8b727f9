use crate::shared::geometry::Point;

/// Eye positions of one detected face, in sensor coordinates.
///
/// A position is meaningful only when its `has_*` flag is set; detectors
/// leave absent positions at the origin.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FaceFeature {
    pub left_eye_position: Point,
    pub has_left_eye: bool,
    pub right_eye_position: Point,
    pub has_right_eye: bool,
}

impl FaceFeature {
    pub fn new(left_eye: Option<Point>, right_eye: Option<Point>) -> Self {
        Self {
            left_eye_position: left_eye.unwrap_or_default(),
            has_left_eye: left_eye.is_some(),
            right_eye_position: right_eye.unwrap_or_default(),
            has_right_eye: right_eye.is_some(),
        }
    }

    pub fn left_eye(&self) -> Option<Point> {
        self.has_left_eye.then_some(self.left_eye_position)
    }

    pub fn right_eye(&self) -> Option<Point> {
        self.has_right_eye.then_some(self.right_eye_position)
    }
}
