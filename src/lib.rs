//! Render XPS-style scene graphs into PDF content streams.
//!
//! The renderer walks a [`scene`] of canvases, paths, glyph runs and nested
//! visuals and writes the content stream of a page or form, registering the
//! patterns, shadings, forms and graphics states it needs with a
//! [`host::DocumentObjects`] collaborator. Fonts and images come from
//! [`host::FontResolver`] and [`host::ImageResolver`].
//!
//! ```
//! use pdfscribe::host::{Host, MemoryDocument, MemoryFonts, MemoryImages};
//! use pdfscribe::render::{render, RenderOptions, RenderTarget};
//! use pdfscribe::scene::{Brush, Geometry, Node, PathNode};
//! use pdfscribe::types::{Color, Rect};
//!
//! let mut doc = MemoryDocument::new();
//! let (fonts, images) = (MemoryFonts::new(), MemoryImages::new());
//! let square = PathNode::new(Geometry::rect(Rect::new(10.0, 10.0, 50.0, 50.0)))
//!     .with_fill(Brush::solid(Color::rgb(1.0, 0.0, 0.0)));
//! let out = render(
//!     Host::new(&mut doc, &fonts, &images),
//!     &[Node::Path(square)],
//!     RenderTarget::Page { width: 816.0, height: 1056.0 },
//!     RenderOptions::default(),
//! )
//! .unwrap();
//! assert!(doc.stream_text(out.id).unwrap().contains("10 10 50 50 re"));
//! ```

pub mod errors;
pub mod host;
mod indices;
mod log;
pub mod object;
pub mod render;
pub mod scene;
pub mod types;

pub use errors::{RenderError, RenderWarning};
pub use indices::parse_indices;
pub use render::{
    DocumentOutput, Page, RenderOptions, RenderOutput, RenderTarget, UnsupportedFeaturePolicy,
    render,
    render_document,
};
