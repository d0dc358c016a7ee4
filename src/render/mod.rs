//! PDF content stream rendering for scene graphs
//!
//! This module is organized into submodules:
//! - `defaults`: Default settings and fixed constants
//! - `types`: Options, targets and outputs
//! - `context`: RenderSession shared by every stream of one render call
//! - `writer`: ContentWriter, the operator sink of one stream
//! - `state`: Graphics state snapshots and the save/restore stack
//! - `resources`: Per-stream resource names
//! - `fmt`: Operand formatting
//! - `geometry`, `path_builder`: Figures to path operators
//! - `path`, `glyphs`: Path and glyph run nodes
//! - `brush`, `pattern`, `shading`: Paint selection, patterns, soft masks and
//!   shading functions

pub mod brush;
pub mod context;
pub mod defaults;
pub mod fmt;
pub mod geometry;
pub mod glyphs;
pub mod path;
pub mod path_builder;
pub mod pattern;
pub mod resources;
pub mod shading;
pub mod state;
pub mod types;
pub mod writer;

// Re-export commonly used items
pub use context::RenderSession;
pub use types::*;
pub use writer::ContentWriter;

use crate::errors::RenderError;
use crate::host::Host;
use crate::scene::{Canvas, Node, Visual};
use crate::types::Opacity;

use resources::ResourceCategory;

/// Render `nodes` into a new stream for `target` and register it
pub fn render(
    host: Host<'_>,
    nodes: &[Node],
    target: RenderTarget,
    options: RenderOptions,
) -> Result<RenderOutput, RenderError> {
    let mut session = RenderSession::new(host, options);
    render_with(&mut session, nodes, target)
}

/// Like [`render`], inside an existing session so graphics states are
/// shared with earlier streams
pub fn render_with(
    session: &mut RenderSession<'_>,
    nodes: &[Node],
    target: RenderTarget,
) -> Result<RenderOutput, RenderError> {
    let mut writer = ContentWriter::new(session, target);
    let result = render_nodes(session, &mut writer, nodes).and_then(|()| writer.finish(session));
    let warnings = session.take_warnings();
    let finished = result?;
    Ok(RenderOutput {
        id: finished.id,
        resources: finished.resources,
        warnings,
    })
}

/// Render every page, one result per page.
///
/// A page that fails does not stop the run, except for a fatal error: the
/// run stops there and the output ends with that page's error.
pub fn render_document(host: Host<'_>, pages: &[Page], options: RenderOptions) -> DocumentOutput {
    let mut session = RenderSession::new(host, options);
    let mut output = DocumentOutput { pages: Vec::new() };
    for (index, page) in pages.iter().enumerate() {
        let target = RenderTarget::Page {
            width: page.width,
            height: page.height,
        };
        let result = render_with(&mut session, &page.content, target);
        let fatal = match &result {
            Ok(out) => {
                crate::log::debug!(
                    page = index,
                    id = out.id.0,
                    warnings = out.warnings.len(),
                    "page rendered"
                );
                false
            }
            Err(err) => {
                crate::log::warn!(page = index, %err, "page failed");
                err.is_fatal()
            }
        };
        output.pages.push(result);
        if fatal {
            break;
        }
    }
    output
}

/// Run `f` one nesting level deeper
fn nested<T>(
    session: &mut RenderSession<'_>,
    f: impl FnOnce(&mut RenderSession<'_>) -> Result<T, RenderError>,
) -> Result<T, RenderError> {
    session.enter()?;
    let result = f(session);
    session.leave();
    result
}

/// Write `nodes` into `writer` in order
pub fn render_nodes(
    session: &mut RenderSession<'_>,
    writer: &mut ContentWriter,
    nodes: &[Node],
) -> Result<(), RenderError> {
    for node in nodes {
        match node {
            Node::Canvas(canvas) => {
                nested(session, |session| emit_canvas(session, writer, canvas))?
            }
            Node::Path(p) => path::emit_path(session, writer, p)?,
            Node::Glyphs(run) => glyphs::emit_glyph_run(session, writer, run)?,
            Node::Visual(visual) => emit_visual(session, writer, visual)?,
            Node::Comment(text) => writer.comment(text),
        }
    }
    Ok(())
}

fn emit_canvas(
    session: &mut RenderSession<'_>,
    writer: &mut ContentWriter,
    canvas: &Canvas,
) -> Result<(), RenderError> {
    let opacity = Opacity::try_new(canvas.opacity)
        .map_err(|e| RenderError::invalid(format!("canvas opacity {}: {e}", canvas.opacity)))?;
    let saved = canvas.render_transform.is_some()
        || canvas.clip.is_some()
        || !opacity.is_opaque()
        || canvas.opacity_mask.is_some();
    writer.comment("Canvas");
    if saved {
        writer.push_state();
    }
    if let Some(m) = canvas.render_transform {
        writer.transform(m);
    }
    if let Some(clip) = &canvas.clip {
        path::write_clip(session, writer, clip);
    }
    writer.stack_mut().multiply_opacity(opacity.raw())?;
    if let Some(mask) = &canvas.opacity_mask {
        let bounds = match &canvas.clip {
            Some(clip) => geometry::control_bounds(clip),
            None => session.options.soft_mask_bbox,
        };
        brush::apply_opacity_mask(session, writer, mask, bounds)?;
    }

    render_nodes(session, writer, &canvas.children)?;

    if saved {
        writer.pop_state()?;
    }
    Ok(())
}

/// Render a visual into its own form and draw it with `Do`
fn emit_visual(
    session: &mut RenderSession<'_>,
    writer: &mut ContentWriter,
    visual: &Visual,
) -> Result<(), RenderError> {
    let opacity = Opacity::try_new(visual.opacity)
        .map_err(|e| RenderError::invalid(format!("visual opacity {}: {e}", visual.opacity)))?;
    let form = nested(session, |session| {
        let bbox = session.options.soft_mask_bbox;
        let mut inner = ContentWriter::new(session, RenderTarget::Group { bbox });
        inner.comment("Visual");
        render_nodes(session, &mut inner, &visual.children)?;
        Ok(inner.finish(session)?.id)
    })?;
    crate::log::debug!(form = form.0, "visual form registered");

    let saved = visual.transform.is_some() || !opacity.is_opaque();
    if saved {
        writer.push_state();
    }
    if let Some(m) = visual.transform {
        writer.transform(m);
    }
    writer.stack_mut().multiply_opacity(opacity.raw())?;
    brush::apply_alpha(session, writer, 1.0, 1.0);
    writer.draw_xobject(ResourceCategory::Form, form);
    if saved {
        writer.pop_state()?;
    }
    Ok(())
}
