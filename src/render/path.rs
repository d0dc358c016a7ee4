//! Path node emission

use crate::errors::RenderError;
use crate::scene::{Geometry, LineCap, LineJoin, PathNode, Stroke};
use crate::types::{Opacity, Rect};

use super::brush::{self, Area, Paint, Usage};
use super::context::RenderSession;
use super::geometry::{build_path, control_bounds, triangle_caps};
use super::path_builder::{PathOp, write_path};
use super::writer::{ContentWriter, LineStyle};

/// `J`/`j`/`w`/`M`/`d` operands of a stroke. Triangle caps are drawn
/// separately, so they stroke with butt ends.
pub fn line_style(stroke: &Stroke) -> LineStyle {
    let cap = match stroke.start_cap {
        LineCap::Flat | LineCap::Triangle => 0,
        LineCap::Round => 1,
        LineCap::Square => 2,
    };
    let join = match stroke.join {
        LineJoin::Miter => 0,
        LineJoin::Round => 1,
        LineJoin::Bevel => 2,
    };
    let dash = if stroke.dash_array.iter().any(|d| *d > 0.0) {
        stroke.dash_array.iter().map(|d| d.max(0.0) * stroke.thickness).collect()
    } else {
        Vec::new()
    };
    LineStyle {
        width: stroke.thickness,
        cap,
        join,
        miter_limit: stroke.miter_limit.max(1.0),
        dash,
        dash_phase: stroke.dash_offset * stroke.thickness,
    }
}

/// Rectangle of a path that is a single `re`
fn single_rect(ops: &[PathOp]) -> Option<Rect> {
    match ops {
        [PathOp::Rect(origin, size)] => Some(Rect::new(origin.x, origin.y, size.x, size.y)),
        _ => None,
    }
}

/// Write `geometry` followed by the clip operator
pub fn write_clip(session: &RenderSession<'_>, writer: &mut ContentWriter, geometry: &Geometry) {
    let options = session.options();
    write_path(writer, &build_path(geometry, options.curve_strategy, options.flatness));
    writer.op(if geometry.fill_rule().is_even_odd() { "W* n" } else { "W n" });
}

/// Painting operator for a simple fill and/or stroke
fn paint_operator(fill: bool, stroke: bool, even_odd: bool) -> &'static str {
    match (fill, stroke, even_odd) {
        (true, false, false) => "f",
        (true, false, true) => "f*",
        (false, true, _) => "S",
        (true, true, false) => "B",
        (true, true, true) => "B*",
        (false, false, _) => "n",
    }
}

/// Emit a path node: optional saved state for transform, clip, opacity and
/// opacity mask, then the fill and stroke.
pub fn emit_path(
    session: &mut RenderSession<'_>,
    writer: &mut ContentWriter,
    node: &PathNode,
) -> Result<(), RenderError> {
    let opacity =
        Opacity::try_new(node.opacity).map_err(|e| {
            RenderError::invalid(format!("path opacity {}: {e}", node.opacity))
        })?;
    if node.data.is_empty() {
        return Ok(());
    }
    let stroke = node.stroke.as_ref().filter(|s| s.thickness > 0.0);

    let saved =
        node.render_transform.is_some()
            || node.clip.is_some()
            || !opacity.is_opaque()
            || node.opacity_mask.is_some();
    writer.comment("Path");
    if saved {
        writer.push_state();
    }
    if let Some(m) = node.render_transform {
        writer.transform(m);
    }
    if let Some(clip) = &node.clip {
        write_clip(session, writer, clip);
    }
    writer.stack_mut().multiply_opacity(opacity.raw())?;

    let ops = build_path(&node.data, session.options.curve_strategy, session.options.flatness);
    let even_odd = node.data.fill_rule().is_even_odd();
    let bounds = control_bounds(&node.data);
    if let Some(mask) = &node.opacity_mask {
        brush::apply_opacity_mask(session, writer, mask, bounds)?;
    }

    let area = Area {
        bounds,
        rect: single_rect(&ops),
    };
    let fill = match &node.fill {
        Some(b) => brush::plan(session, writer, b, area, Usage::Fill)?,
        None => Paint::None,
    };
    let stroke_paint = match stroke {
        Some(s) => {
            let half = s.thickness / 2.0;
            let stroke_bounds = Rect::new(
                bounds.x - half,
                bounds.y - half,
                bounds.width + s.thickness,
                bounds.height + s.thickness,
            );
            brush::plan(session, writer, &s.brush, Area::new(stroke_bounds), Usage::Stroke)?
        }
        None => Paint::None,
    };

    if !fill.is_none() && !fill.is_simple() {
        let write_geometry = |w: &mut ContentWriter| write_path(w, &ops);
        brush::paint_complex_fill(session, writer, &fill, area, even_odd, &write_geometry)?;
    }

    let (mut fill_alpha, mut stroke_alpha) = (1.0, 1.0);
    let mut filled = false;
    if let Paint::Simple { source, alpha } = fill {
        brush::apply_simple(writer, source, false);
        fill_alpha = alpha;
        filled = true;
    }
    let mut stroked = false;
    if let (Some(s), Paint::Simple { source, alpha }) = (stroke, &stroke_paint) {
        brush::apply_simple(writer, *source, true);
        writer.set_line_style(&line_style(s));
        stroke_alpha = *alpha;
        stroked = true;
    }
    if filled || stroked {
        brush::apply_alpha(session, writer, fill_alpha, stroke_alpha);
        write_path(writer, &ops);
        writer.op(paint_operator(filled, stroked, even_odd));
    }

    if let (Some(s), Paint::Simple { source, alpha }) = (stroke, &stroke_paint) {
        let start = s.start_cap == LineCap::Triangle;
        let end = s.end_cap == LineCap::Triangle;
        let caps = if start || end {
            triangle_caps(&node.data, s.thickness, start, end)
        } else {
            Vec::new()
        };
        if !caps.is_empty() {
            writer.comment("triangle caps");
            brush::apply_simple(writer, *source, false);
            brush::apply_alpha(session, writer, *alpha, *alpha);
            for [a, b, c] in caps {
                writer.move_to(a);
                writer.line_to(b);
                writer.line_to(c);
                writer.close_path();
            }
            writer.op("f");
        }
    }

    if saved {
        writer.pop_state()?;
    }
    Ok(())
}
