//! Default renderer settings and fixed constants

use crate::types::{Color, Rect};

/// Scene units (1/96 inch) to PDF points (1/72 inch)
pub const UNITS_TO_POINTS: f64 = 0.75;

/// Deepest scene nesting accepted before `NestingTooDeep`
pub const MAX_NESTING_DEPTH: usize = 64;

/// Upper bound on the rings of a repeated/reflected radial gradient
pub const MAX_RADIAL_REPEATS: usize = 256;

/// Tolerance of the flattening fallback, in scene units
pub const FLATNESS: f64 = 0.25;

/// Spaces of indentation per graphics state level
pub const INDENT: usize = 2;

/// Fill used when a feature cannot be drawn at all
pub const FALLBACK_COLOR: Color = Color::rgb(0.0, 1.0, 0.0);

/// Form bounding box of soft masks and nested visuals
pub const SOFT_MASK_BBOX: Rect = Rect {
    x: -32768.0,
    y: -32768.0,
    width: 65536.0,
    height: 65536.0,
};

/// Shear of the italic simulation, in degrees
pub const ITALIC_SHEAR_DEGREES: f64 = 20.0;

/// Stroke width of the bold simulation as a fraction of the em size
pub const BOLD_STROKE_FACTOR: f64 = 0.02;

/// Rotation applied to sideways glyph runs, in degrees
pub const SIDEWAYS_ROTATION: f64 = -90.0;
