//! Error types with diagnostic codes using miette
//!
//! Rendering either fails with a [`RenderError`] or succeeds with a list of
//! [`RenderWarning`]s describing features that were approximated.

use miette::Diagnostic;
use thiserror::Error;

use crate::object::ObjectId;

// ============================================================================
// Render Errors
// ============================================================================

/// Errors that abort rendering of a page or form
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// A caller handed the renderer a value outside its contract.
    #[error("invalid parameter: {message}")]
    #[diagnostic(code(pdfscribe::render::invalid_parameter))]
    InvalidParameter { message: String },

    /// A feature without an approximation, raised only when the unsupported
    /// feature policy is `Fail`.
    #[error("unsupported feature: {feature}")]
    #[diagnostic(
        code(pdfscribe::render::unsupported_feature),
        help("set `UnsupportedFeaturePolicy::Fallback` to render an approximation instead")
    )]
    UnsupportedFeature { feature: String },

    /// Save/restore operators did not balance: a restore without a save, or
    /// saves still open when the stream was finalized.
    #[error("graphics state stack is unbalanced at depth {depth}")]
    #[diagnostic(
        code(pdfscribe::render::structural_imbalance),
        help("every push_state() must be matched by a pop_state() before finish()")
    )]
    StructuralImbalance { depth: usize },

    /// A font or image the scene references could not be resolved.
    #[error("missing {kind}: {uri}")]
    #[diagnostic(code(pdfscribe::render::missing_resource))]
    MissingResource { kind: ResourceKind, uri: String },

    /// The scene graph nests deeper than `RenderOptions::max_nesting_depth`.
    #[error("scene graph nesting exceeds {limit} levels")]
    #[diagnostic(
        code(pdfscribe::render::nesting_too_deep),
        help("raise `RenderOptions::max_nesting_depth` if the scene is legitimately this deep")
    )]
    NestingTooDeep { limit: usize },
}

impl RenderError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        RenderError::InvalidParameter {
            message: message.into(),
        }
    }

    /// Whether the error makes the whole document untrustworthy.
    ///
    /// Stack imbalance means the renderer itself is broken, so a document run
    /// stops at the first one. Every other error only loses the current page.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RenderError::StructuralImbalance { .. })
    }
}

/// Kind of external resource named in a [`RenderError::MissingResource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Font,
    Image,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Font => write!(f, "font"),
            ResourceKind::Image => write!(f, "image"),
        }
    }
}

// ============================================================================
// Warnings
// ============================================================================

/// A feature that was rendered with a fallback instead of failing.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderWarning {
    /// Short description of the unsupported feature
    pub feature: String,
    /// What was drawn instead
    pub fallback: String,
    /// The content stream being written when the feature was met
    pub stream: Option<ObjectId>,
}

impl std::fmt::Display for RenderWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (rendered as {})", self.feature, self.fallback)
    }
}
