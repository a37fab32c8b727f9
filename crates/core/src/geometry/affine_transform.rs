use crate::shared::geometry::Point;

/// 2D affine transform in the `(a, b, c, d, tx, ty)` convention:
///
/// ```text
/// x' = a*x + c*y + tx
/// y' = b*x + d*y + ty
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AffineTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub tx: f64,
    pub ty: f64,
}

impl AffineTransform {
    pub const IDENTITY: AffineTransform = AffineTransform::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

    pub const fn new(a: f64, b: f64, c: f64, d: f64, tx: f64, ty: f64) -> Self {
        Self { a, b, c, d, tx, ty }
    }

    pub const fn translation(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    pub fn apply(&self, p: Point) -> Point {
        Point::new(
            self.a * p.x + self.c * p.y + self.tx,
            self.b * p.x + self.d * p.y + self.ty,
        )
    }

    /// Transform that applies `self` first, then `next`.
    pub fn then(&self, next: &AffineTransform) -> AffineTransform {
        AffineTransform::new(
            next.a * self.a + next.c * self.b,
            next.b * self.a + next.d * self.b,
            next.a * self.c + next.c * self.d,
            next.b * self.c + next.d * self.d,
            next.a * self.tx + next.c * self.ty + next.tx,
            next.b * self.tx + next.d * self.ty + next.ty,
        )
    }

    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    /// `None` when the transform collapses the plane (zero determinant).
    pub fn invert(&self) -> Option<AffineTransform> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let a = self.d / det;
        let b = -self.b / det;
        let c = -self.c / det;
        let d = self.a / det;
        Some(AffineTransform::new(
            a,
            b,
            c,
            d,
            -(a * self.tx + c * self.ty),
            -(b * self.tx + d * self.ty),
        ))
    }
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_leaves_point() {
        let p = AffineTransform::IDENTITY.apply(Point::new(3.0, -4.0));
        assert_relative_eq!(p.x, 3.0);
        assert_relative_eq!(p.y, -4.0);
    }

    #[test]
    fn test_swap_axes_matrix() {
        // (0, 1, 1, 0) swaps x and y
        let t = AffineTransform::new(0.0, 1.0, 1.0, 0.0, 0.0, 0.0);
        let p = t.apply(Point::new(2.0, 7.0));
        assert_relative_eq!(p.x, 7.0);
        assert_relative_eq!(p.y, 2.0);
    }

    #[test]
    fn test_then_applies_in_order() {
        let scale = AffineTransform::new(2.0, 0.0, 0.0, 3.0, 0.0, 0.0);
        let shift = AffineTransform::translation(10.0, 20.0);
        let p = scale.then(&shift).apply(Point::new(1.0, 1.0));
        assert_relative_eq!(p.x, 12.0);
        assert_relative_eq!(p.y, 23.0);
    }

    #[test]
    fn test_invert_roundtrips() {
        let t = AffineTransform::new(0.0, 1.5, -0.75, 0.0, 360.0, 4.0);
        let inv = t.invert().unwrap();
        let p = Point::new(123.0, 45.0);
        let back = inv.apply(t.apply(p));
        assert_relative_eq!(back.x, p.x, epsilon = 1e-9);
        assert_relative_eq!(back.y, p.y, epsilon = 1e-9);
    }

    #[test]
    fn test_invert_singular_is_none() {
        let t = AffineTransform::new(1.0, 2.0, 2.0, 4.0, 0.0, 0.0);
        assert!(t.invert().is_none());
    }
}
