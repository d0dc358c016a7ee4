//! Rendering session - state shared by every stream of one render call

use std::collections::HashMap;

use crate::errors::{RenderError, RenderWarning, ResourceKind};
use crate::host::{Host, ResolvedFont, ResolvedImage};
use crate::object::{Dict, ObjectId, PdfObject};
use crate::render::fmt;

use super::{RenderOptions, UnsupportedFeaturePolicy};

/// Value key of an interned graphics state dictionary
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ExtGStateKey {
    fill_alpha: String,
    stroke_alpha: String,
    soft_mask: Option<ObjectId>,
}

/// Everything a render call shares across the streams it writes: the host
/// collaborators, the options, collected warnings and the nesting depth.
pub struct RenderSession<'h> {
    pub(crate) host: Host<'h>,
    pub(crate) options: RenderOptions,
    warnings: Vec<RenderWarning>,
    depth: usize,
    ext_gstates: HashMap<ExtGStateKey, ObjectId>,
}

impl<'h> RenderSession<'h> {
    pub fn new(host: Host<'h>, options: RenderOptions) -> Self {
        RenderSession {
            host,
            options,
            warnings: Vec::new(),
            depth: 0,
            ext_gstates: HashMap::new(),
        }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn warnings(&self) -> &[RenderWarning] {
        &self.warnings
    }

    pub fn take_warnings(&mut self) -> Vec<RenderWarning> {
        std::mem::take(&mut self.warnings)
    }

    /// Current scene nesting depth
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Enter one level of nesting, failing past the configured limit
    pub(crate) fn enter(&mut self) -> Result<(), RenderError> {
        if self.depth >= self.options.max_nesting_depth {
            return Err(RenderError::NestingTooDeep {
                limit: self.options.max_nesting_depth,
            });
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Report a feature that can only be approximated.
    ///
    /// Under the `Fallback` policy a warning is recorded and the caller draws
    /// its fallback; under `Fail` the feature becomes an error.
    pub(crate) fn unsupported(
        &mut self,
        feature: impl Into<String>,
        fallback: impl Into<String>,
        stream: Option<ObjectId>,
    ) -> Result<(), RenderError> {
        let feature = feature.into();
        match self.options.unsupported_feature_policy {
            UnsupportedFeaturePolicy::Fail => Err(RenderError::UnsupportedFeature { feature }),
            UnsupportedFeaturePolicy::Fallback => {
                let warning = RenderWarning {
                    feature,
                    fallback: fallback.into(),
                    stream,
                };
                crate::log::warn!(%warning, "unsupported feature");
                self.warnings.push(warning);
                Ok(())
            }
        }
    }

    pub(crate) fn resolve_font(&self, uri: &str) -> Result<ResolvedFont<'h>, RenderError> {
        let fonts = self.host.fonts;
        fonts
            .resolve_font(uri)
            .or_else(|| {
                crate::log::debug!(uri, "font not found, trying placeholder");
                fonts.placeholder_font()
            })
            .ok_or_else(|| RenderError::MissingResource {
                kind: ResourceKind::Font,
                uri: uri.to_string(),
            })
    }

    pub(crate) fn resolve_image(&self, uri: &str) -> Result<ResolvedImage, RenderError> {
        let images = self.host.images;
        images
            .resolve_image(uri)
            .or_else(|| {
                crate::log::debug!(uri, "image not found, trying placeholder");
                images.placeholder_image()
            })
            .ok_or_else(|| RenderError::MissingResource {
                kind: ResourceKind::Image,
                uri: uri.to_string(),
            })
    }

    pub(crate) fn allocate(&mut self) -> ObjectId {
        self.host.doc.allocate()
    }

    pub(crate) fn register_as(&mut self, id: ObjectId, object: PdfObject) {
        crate::log::trace!(id = id.0, "object registered");
        self.host.doc.register(id, object);
    }

    /// Allocate an id and register `object` under it
    pub(crate) fn register(&mut self, object: PdfObject) -> ObjectId {
        let id = self.allocate();
        self.register_as(id, object);
        id
    }

    pub(crate) fn record_glyph(&mut self, font: ObjectId, glyph: u16, text: &str) {
        self.host.doc.record_glyph(font, glyph, text);
    }

    /// Graphics state dictionary with the given alphas and soft mask,
    /// shared by every stream of the session that asks for the same values
    pub(crate) fn ext_gstate(
        &mut self,
        fill_alpha: f64,
        stroke_alpha: f64,
        soft_mask: Option<ObjectId>,
    ) -> ObjectId {
        let key = ExtGStateKey {
            fill_alpha: fmt::color(fill_alpha),
            stroke_alpha: fmt::color(stroke_alpha),
            soft_mask,
        };
        if let Some(id) = self.ext_gstates.get(&key) {
            return *id;
        }

        let mut dict = Dict::new()
            .with("Type", PdfObject::name("ExtGState"))
            .with("ca", fill_alpha)
            .with("CA", stroke_alpha);
        if let Some(mask) = soft_mask {
            dict.set(
                "SMask",
                Dict::new()
                    .with("Type", PdfObject::name("Mask"))
                    .with("S", PdfObject::name("Luminosity"))
                    .with("G", mask),
            );
        }
        let id = self.register(dict.into());
        crate::log::debug!(id = id.0, fill_alpha, stroke_alpha, "ExtGState registered");
        self.ext_gstates.insert(key, id);
        id
    }
}
