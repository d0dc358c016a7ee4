//! Renderer configuration, targets and outputs

use crate::errors::{RenderError, RenderWarning};
use crate::object::{Dict, ObjectId};
use crate::scene::Node;
use crate::types::{Color, Matrix, Rect};

use super::defaults;

/// What to do when the scene uses a feature with no exact rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnsupportedFeaturePolicy {
    /// Draw an approximation and record a [`RenderWarning`]
    #[default]
    Fallback,
    /// Fail with [`RenderError::UnsupportedFeature`]
    Fail,
}

/// How curved segments reach the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CurveStrategy {
    /// Native cubic Bézier operators
    #[default]
    Bezier,
    /// Line segments within `RenderOptions::flatness`
    Flatten,
}

/// Renderer configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    /// Write `%` comments naming each scene node
    pub annotate_debug_comments: bool,
    /// Indent operators by graphics state depth
    pub indent: bool,
    pub unsupported_feature_policy: UnsupportedFeaturePolicy,
    pub curve_strategy: CurveStrategy,
    /// Flattening tolerance in scene units
    pub flatness: f64,
    pub max_nesting_depth: usize,
    pub max_radial_repeats: usize,
    /// Flat fill used for features that cannot be drawn at all
    pub fallback_color: Color,
    /// Bounding box of soft mask and nested visual forms
    pub soft_mask_bbox: Rect,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            annotate_debug_comments: false,
            indent: false,
            unsupported_feature_policy: UnsupportedFeaturePolicy::Fallback,
            curve_strategy: CurveStrategy::Bezier,
            flatness: defaults::FLATNESS,
            max_nesting_depth: defaults::MAX_NESTING_DEPTH,
            max_radial_repeats: defaults::MAX_RADIAL_REPEATS,
            fallback_color: defaults::FALLBACK_COLOR,
            soft_mask_bbox: defaults::SOFT_MASK_BBOX,
        }
    }
}

impl RenderOptions {
    pub fn with_annotate_debug_comments(mut self, on: bool) -> Self {
        self.annotate_debug_comments = on;
        self
    }

    pub fn with_indent(mut self, on: bool) -> Self {
        self.indent = on;
        self
    }

    pub fn with_unsupported_feature_policy(mut self, policy: UnsupportedFeaturePolicy) -> Self {
        self.unsupported_feature_policy = policy;
        self
    }

    pub fn with_curve_strategy(mut self, strategy: CurveStrategy) -> Self {
        self.curve_strategy = strategy;
        self
    }

    pub fn with_flatness(mut self, flatness: f64) -> Self {
        self.flatness = flatness;
        self
    }

    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    pub fn with_max_radial_repeats(mut self, repeats: usize) -> Self {
        self.max_radial_repeats = repeats;
        self
    }

    pub fn with_fallback_color(mut self, color: Color) -> Self {
        self.fallback_color = color;
        self
    }

    pub fn with_soft_mask_bbox(mut self, bbox: Rect) -> Self {
        self.soft_mask_bbox = bbox;
        self
    }
}

/// Where a content stream ends up
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderTarget {
    /// Page content; size in scene units
    Page { width: f64, height: f64 },
    /// Reusable form XObject
    Form { bbox: Rect, matrix: Option<Matrix> },
    /// Form XObject that is an isolated transparency group, so the alpha
    /// it is drawn with applies to its composited content
    Group { bbox: Rect },
    /// Luminosity soft mask group
    SoftMask { bbox: Rect },
}

/// Result of rendering one page or form
#[derive(Debug, Clone)]
pub struct RenderOutput {
    /// The registered content stream
    pub id: ObjectId,
    /// Resources the stream refers to, for the page dictionary
    pub resources: Dict,
    pub warnings: Vec<RenderWarning>,
}

/// One page of a document render
#[derive(Debug, Clone)]
pub struct Page {
    pub width: f64,
    pub height: f64,
    pub content: Vec<Node>,
}

impl Page {
    pub fn new(width: f64, height: f64, content: Vec<Node>) -> Self {
        Page {
            width,
            height,
            content,
        }
    }
}

/// Outcome of a document render
#[derive(Debug)]
pub struct DocumentOutput {
    /// One entry per page rendered, in order
    pub pages: Vec<Result<RenderOutput, RenderError>>,
}

impl DocumentOutput {
    pub fn failures(&self) -> impl Iterator<Item = (usize, &RenderError)> {
        self.pages
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.as_ref().err().map(|e| (i, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_set_fields() {
        let options = RenderOptions::default()
            .with_curve_strategy(CurveStrategy::Flatten)
            .with_flatness(0.1)
            .with_max_radial_repeats(4)
            .with_fallback_color(Color::WHITE);
        assert_eq!(options.curve_strategy, CurveStrategy::Flatten);
        assert_eq!(options.flatness, 0.1);
        assert_eq!(options.max_radial_repeats, 4);
        assert_eq!(options.fallback_color, Color::WHITE);
        assert_eq!(options.unsupported_feature_policy, UnsupportedFeaturePolicy::Fallback);
    }
}
