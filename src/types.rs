//! Strongly-typed numeric and geometric primitives.
//!
//! Points are `glam::DVec2`. Everything else that carries an invariant
//! (opacity range, affine composition order) gets a small newtype so the
//! invariant is checked once, at construction.

use std::fmt;
use std::str::FromStr;

use glam::{DAffine2, DMat2, DVec2, dvec2};

/// Error type for invalid numeric values
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericError {
    /// Value is NaN
    NaN,
    /// Value is infinite
    Infinite,
    /// Value is below the permitted range
    BelowRange,
    /// Value is above the permitted range
    AboveRange,
}

impl fmt::Display for NumericError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericError::NaN => write!(f, "value is NaN"),
            NumericError::Infinite => write!(f, "value is infinite"),
            NumericError::BelowRange => write!(f, "value is below the permitted range"),
            NumericError::AboveRange => write!(f, "value is above the permitted range"),
        }
    }
}

impl std::error::Error for NumericError {}

/// Opacity in `[0, 1]`
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct Opacity(f64);

impl Opacity {
    pub const OPAQUE: Opacity = Opacity(1.0);
    pub const TRANSPARENT: Opacity = Opacity(0.0);

    /// Create an opacity with validation (rejects NaN and values outside `[0, 1]`)
    pub fn try_new(val: f64) -> Result<Opacity, NumericError> {
        if val.is_nan() {
            Err(NumericError::NaN)
        } else if val.is_infinite() {
            Err(NumericError::Infinite)
        } else if val < 0.0 {
            Err(NumericError::BelowRange)
        } else if val > 1.0 {
            Err(NumericError::AboveRange)
        } else {
            Ok(Opacity(val))
        }
    }

    /// Clamp an arbitrary value into range. NaN becomes opaque.
    pub fn clamped(val: f64) -> Opacity {
        if val.is_nan() {
            Opacity::OPAQUE
        } else {
            Opacity(val.clamp(0.0, 1.0))
        }
    }

    #[inline]
    pub fn raw(self) -> f64 {
        self.0
    }

    #[inline]
    pub fn is_opaque(self) -> bool {
        self.0 >= 1.0
    }

    /// Product of two opacities, always in range
    #[inline]
    pub fn times(self, other: Opacity) -> Opacity {
        Opacity(self.0 * other.0)
    }
}

impl Default for Opacity {
    fn default() -> Self {
        Opacity::OPAQUE
    }
}

// ============================================================================
// Matrix
// ============================================================================

/// Affine transform in PDF operand order `[a b c d e f]`.
///
/// Points are row vectors: `x' = a*x + c*y + e`, `y' = b*x + d*y + f`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Matrix(DAffine2);

impl Matrix {
    pub const IDENTITY: Matrix = Matrix(DAffine2::IDENTITY);

    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Matrix(DAffine2::from_mat2_translation(
            DMat2::from_cols(dvec2(a, b), dvec2(c, d)),
            dvec2(e, f),
        ))
    }

    pub fn translate(tx: f64, ty: f64) -> Self {
        Matrix::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    pub fn scale(sx: f64, sy: f64) -> Self {
        Matrix::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Rotation by `degrees`, counter-clockwise in a y-up space
    pub fn rotate(degrees: f64) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Matrix::new(cos, sin, -sin, cos, 0.0, 0.0)
    }

    /// Horizontal shear: `x' = x + factor * y`
    pub fn shear_x(factor: f64) -> Self {
        Matrix::new(1.0, 0.0, factor, 1.0, 0.0, 0.0)
    }

    /// The six operands in PDF order
    pub fn to_array(self) -> [f64; 6] {
        let m = self.0.matrix2;
        let t = self.0.translation;
        [m.x_axis.x, m.x_axis.y, m.y_axis.x, m.y_axis.y, t.x, t.y]
    }

    pub fn is_identity(self) -> bool {
        self.0 == DAffine2::IDENTITY
    }

    /// `other` applied first, then `self`.
    ///
    /// This is the "local space on top" composition: a child transform is
    /// prepended to the transform accumulated by its ancestors.
    #[must_use]
    pub fn prepend(self, other: Matrix) -> Matrix {
        Matrix(self.0 * other.0)
    }

    /// `self` applied first, then `other`.
    #[must_use]
    pub fn append(self, other: Matrix) -> Matrix {
        Matrix(other.0 * self.0)
    }

    pub fn invert(self) -> Option<Matrix> {
        let det = self.0.matrix2.determinant();
        if det == 0.0 || !det.is_finite() {
            None
        } else {
            Some(Matrix(self.0.inverse()))
        }
    }

    pub fn transform_point(self, p: DVec2) -> DVec2 {
        self.0.transform_point2(p)
    }

    pub fn transform_vector(self, v: DVec2) -> DVec2 {
        self.0.transform_vector2(v)
    }

    /// Bounding box of a transformed rectangle
    pub fn transform_rect(self, r: Rect) -> Rect {
        let mut out = Rect::EMPTY;
        for corner in r.corners() {
            out.expand_point(self.transform_point(corner));
        }
        out
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix::IDENTITY
    }
}

// ============================================================================
// Rect
// ============================================================================

/// Axis-aligned rectangle, origin plus size
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Inverted box that grows on the first `expand_point`
    pub const EMPTY: Rect = Rect {
        x: f64::INFINITY,
        y: f64::INFINITY,
        width: f64::NEG_INFINITY,
        height: f64::NEG_INFINITY,
    };

    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_points(a: DVec2, b: DVec2) -> Self {
        let min = a.min(b);
        let max = a.max(b);
        Rect::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }

    pub fn is_empty(&self) -> bool {
        !(self.width >= 0.0 && self.height >= 0.0) || !self.x.is_finite()
    }

    pub fn min(&self) -> DVec2 {
        dvec2(self.x, self.y)
    }

    pub fn max(&self) -> DVec2 {
        dvec2(self.x + self.width, self.y + self.height)
    }

    pub fn center(&self) -> DVec2 {
        dvec2(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn corners(&self) -> [DVec2; 4] {
        [
            dvec2(self.x, self.y),
            dvec2(self.x + self.width, self.y),
            dvec2(self.x + self.width, self.y + self.height),
            dvec2(self.x, self.y + self.height),
        ]
    }

    /// Expand to include a point
    pub fn expand_point(&mut self, p: DVec2) {
        if self.is_empty() {
            *self = Rect::new(p.x, p.y, 0.0, 0.0);
            return;
        }
        let min = self.min().min(p);
        let max = self.max().max(p);
        *self = Rect::from_points(min, max);
    }

    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Rect::from_points(self.min().min(other.min()), self.max().max(other.max()))
    }

    /// `[x0 y0 x1 y1]` as used by `/BBox`
    pub fn to_array(&self) -> [f64; 4] {
        [self.x, self.y, self.x + self.width, self.y + self.height]
    }
}

// ============================================================================
// Color
// ============================================================================

/// sRGB color with straight alpha, all channels in `[0, 1]`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub a: f64,
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);

    pub const fn rgb(r: f64, g: f64, b: f64) -> Self {
        Color { a: 1.0, r, g, b }
    }

    pub const fn argb(a: f64, r: f64, g: f64, b: f64) -> Self {
        Color { a, r, g, b }
    }

    pub fn from_argb_u8(a: u8, r: u8, g: u8, b: u8) -> Self {
        Color {
            a: f64::from(a) / 255.0,
            r: f64::from(r) / 255.0,
            g: f64::from(g) / 255.0,
            b: f64::from(b) / 255.0,
        }
    }

    pub fn is_opaque(&self) -> bool {
        self.a >= 1.0
    }

    pub fn opacity(&self) -> Opacity {
        Opacity::clamped(self.a)
    }

    pub fn with_alpha(self, a: f64) -> Self {
        Color { a, ..self }
    }
}

/// Error from parsing a `#RRGGBB` / `#AARRGGBB` color
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorParseError(pub String);

impl fmt::Display for ColorParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid color: {}", self.0)
    }
}

impl std::error::Error for ColorParseError {}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .trim()
            .strip_prefix('#')
            .ok_or_else(|| ColorParseError(s.to_string()))?;
        let byte = |i: usize| {
            hex.get(i..i + 2)
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| ColorParseError(s.to_string()))
        };
        match hex.len() {
            6 => Ok(Color::from_argb_u8(255, byte(0)?, byte(2)?, byte(4)?)),
            8 => Ok(Color::from_argb_u8(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => Err(ColorParseError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_vec_eq(actual: DVec2, expected: DVec2) {
        assert!(
            (actual - expected).length() < 1e-9,
            "{actual:?} != {expected:?}"
        );
    }

    // ==================== Opacity tests ====================

    #[test]
    fn opacity_try_new_valid() {
        assert!(Opacity::try_new(0.0).is_ok());
        assert!(Opacity::try_new(0.5).is_ok());
        assert!(Opacity::try_new(1.0).is_ok());
    }

    #[test]
    fn opacity_try_new_rejects_out_of_range() {
        assert_eq!(Opacity::try_new(-0.1), Err(NumericError::BelowRange));
        assert_eq!(Opacity::try_new(1.5), Err(NumericError::AboveRange));
        assert_eq!(Opacity::try_new(f64::NAN), Err(NumericError::NaN));
        assert_eq!(Opacity::try_new(f64::INFINITY), Err(NumericError::Infinite));
    }

    #[test]
    fn opacity_times() {
        let half = Opacity::try_new(0.5).unwrap();
        assert_eq!(half.times(half).raw(), 0.25);
    }

    // ==================== Matrix tests ====================

    #[test]
    fn matrix_operand_order() {
        let m = Matrix::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0);
        assert_eq!(m.to_array(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        // x' = a*x + c*y + e, y' = b*x + d*y + f
        assert_vec_eq(m.transform_point(dvec2(1.0, 1.0)), dvec2(9.0, 12.0));
    }

    #[test]
    fn prepend_applies_local_transform_first() {
        let page = Matrix::scale(2.0, 2.0);
        let local = Matrix::translate(10.0, 0.0);
        let combined = page.prepend(local);
        // translate first, then scale
        assert_vec_eq(combined.transform_point(DVec2::ZERO), dvec2(20.0, 0.0));
        // append is the reverse order
        let reversed = page.append(local);
        assert_vec_eq(reversed.transform_point(DVec2::ZERO), dvec2(10.0, 0.0));
    }

    #[test]
    fn rotate_quarter_turn() {
        let m = Matrix::rotate(90.0);
        assert_vec_eq(m.transform_point(dvec2(1.0, 0.0)), dvec2(0.0, 1.0));
    }

    #[test]
    fn singular_matrix_has_no_inverse() {
        assert!(Matrix::scale(0.0, 1.0).invert().is_none());
        let m = Matrix::new(2.0, 0.0, 0.0, 4.0, 1.0, 1.0);
        let inv = m.invert().unwrap();
        assert_vec_eq(inv.transform_point(m.transform_point(dvec2(3.0, 7.0))), dvec2(3.0, 7.0));
    }

    // ==================== Rect tests ====================

    #[test]
    fn rect_expand_from_empty() {
        let mut r = Rect::EMPTY;
        assert!(r.is_empty());
        r.expand_point(dvec2(1.0, 2.0));
        r.expand_point(dvec2(4.0, -1.0));
        assert_eq!(r, Rect::new(1.0, -1.0, 3.0, 3.0));
    }

    #[test]
    fn transformed_rect_bounds() {
        let r = Rect::new(0.0, 0.0, 2.0, 1.0);
        let bounds = Matrix::rotate(90.0).transform_rect(r);
        assert!((bounds.x + 1.0).abs() < 1e-9);
        assert!((bounds.width - 1.0).abs() < 1e-9);
        assert!((bounds.height - 2.0).abs() < 1e-9);
    }

    // ==================== Color tests ====================

    #[test]
    fn parse_hex_colors() {
        let c: Color = "#FF0000".parse().unwrap();
        assert_eq!(c, Color::rgb(1.0, 0.0, 0.0));
        let c: Color = "#80000000".parse().unwrap();
        assert!((c.a - 128.0 / 255.0).abs() < 1e-12);
        assert!("red".parse::<Color>().is_err());
        assert!("#12345".parse::<Color>().is_err());
    }
}
