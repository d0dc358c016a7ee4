//! Patterns, shadings and soft masks
//!
//! Each builder registers its objects with the document through the session
//! and returns the id; none of them writes into the caller's stream except
//! [`draw_radial_series`], which paints directly.

use glam::{DVec2, dvec2};

use crate::errors::RenderError;
use crate::object::{Dict, ObjectId, PdfObject};
use crate::host::ResolvedImage;
use crate::scene::{
    Gradient, LinearGradientBrush, Node, RadialGradientBrush, SpreadMethod, TileBrush, TileMode,
};
use crate::types::{Matrix, Rect};

use super::context::RenderSession;
use super::resources::ResourceCategory;
use super::shading::{
    FunctionMode, axial_shading, build_shading_function, color_space_for, radial_shading,
    sorted_stops,
};
use super::writer::ContentWriter;
use super::{RenderTarget, render_nodes};

/// A gradient brush of either kind
#[derive(Debug, Clone, Copy)]
pub enum GradientRef<'a> {
    Linear(&'a LinearGradientBrush),
    Radial(&'a RadialGradientBrush),
}

impl GradientRef<'_> {
    pub fn gradient(&self) -> &Gradient {
        match self {
            GradientRef::Linear(b) => &b.gradient,
            GradientRef::Radial(b) => &b.gradient,
        }
    }

    /// Brush space to user space
    pub fn transform(&self) -> Matrix {
        self.gradient().transform.unwrap_or(Matrix::IDENTITY)
    }
}

/// A registered shading plus the transform from its coordinate space to
/// brush space (non-identity only for elliptical radial gradients)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientShading {
    pub shading: ObjectId,
    pub space: Matrix,
}

/// Focus point and shading-to-brush transform of a radial gradient.
///
/// Shadings only know circles, so an ellipse is drawn as a circle of radius
/// `radius_x` squeezed vertically about the center. The focus is moved so
/// that it lands on the gradient origin after the squeeze.
pub fn ellipse_space(brush: &RadialGradientBrush) -> (DVec2, Matrix) {
    let (rx, ry) = (brush.radius_x, brush.radius_y);
    if rx == ry || rx <= 0.0 || ry <= 0.0 {
        return (brush.origin, Matrix::IDENTITY);
    }
    let c = brush.center;
    let m = Matrix::translate(c.x, c.y)
        .prepend(Matrix::scale(1.0, ry / rx))
        .prepend(Matrix::translate(-c.x, -c.y));
    let focus = dvec2(brush.origin.x, c.y + (brush.origin.y - c.y) * rx / ry);
    (focus, m)
}

/// Register the function and pad shading of a gradient
pub fn build_gradient_shading(
    session: &mut RenderSession<'_>,
    gradient: GradientRef<'_>,
    mode: FunctionMode,
) -> Result<GradientShading, RenderError> {
    let space = color_space_for(mode);
    let function = build_shading_function(&gradient.gradient().stops, mode, space, false)?;
    let function_id = session.register(function.to_object());

    let (dict, shading_space) = match gradient {
        GradientRef::Linear(b) => (
            axial_shading(b.start, b.end, function_id, space),
            Matrix::IDENTITY,
        ),
        GradientRef::Radial(b) => {
            let (focus, m) = ellipse_space(b);
            (
                radial_shading(focus, 0.0, b.center, b.radius_x.max(0.0), function_id, space, true),
                m,
            )
        }
    };
    let shading = session.register(dict.into());
    crate::log::debug!(shading = shading.0, ?mode, "gradient shading registered");
    Ok(GradientShading {
        shading,
        space: shading_space,
    })
}

/// Shading pattern (`PatternType 2`) painting `shading` under `matrix`
pub fn shading_pattern(
    session: &mut RenderSession<'_>,
    shading: ObjectId,
    matrix: Matrix,
) -> ObjectId {
    let dict = Dict::new()
        .with("Type", PdfObject::name("Pattern"))
        .with("PatternType", 2i64)
        .with("Shading", shading)
        .with("Matrix", PdfObject::reals(&matrix.to_array()));
    let id = session.register(dict.into());
    crate::log::debug!(pattern = id.0, "shading pattern registered");
    id
}

/// Transform from a tile brush's viewbox to its viewport, `None` when
/// either is degenerate
pub fn viewbox_transform(tile: &TileBrush) -> Option<Matrix> {
    let (vb, vp) = (tile.viewbox, tile.viewport);
    if vb.width <= 0.0 || vb.height <= 0.0 || vp.width <= 0.0 || vp.height <= 0.0 {
        return None;
    }
    let sx = vp.width / vb.width;
    let sy = vp.height / vb.height;
    Some(Matrix::new(sx, 0.0, 0.0, sy, vp.x - vb.x * sx, vp.y - vb.y * sy))
}

/// Tiling pattern (`PatternType 1`) repeating the form `content` over the
/// brush viewport.
///
/// There is no way to switch tiling off, so `TileMode::None` doubles the
/// horizontal step instead.
pub fn tiling_pattern(
    session: &mut RenderSession<'_>,
    content: ObjectId,
    tile: &TileBrush,
    matrix: Matrix,
) -> ObjectId {
    let vp = tile.viewport;
    let x_step = match tile.tile_mode {
        TileMode::None => vp.width * 2.0,
        _ => vp.width,
    };
    let dict = Dict::new()
        .with("Type", PdfObject::name("Pattern"))
        .with("PatternType", 1i64)
        .with("PaintType", 1i64)
        .with("TilingType", 3i64)
        .with("BBox", PdfObject::reals(&vp.to_array()))
        .with("XStep", x_step)
        .with("YStep", vp.height)
        .with(
            "Resources",
            Dict::new().with("XObject", Dict::new().with("Fm0", content)),
        )
        .with("Matrix", PdfObject::reals(&matrix.to_array()));
    let data = b"/Fm0 Do\n".to_vec();
    let id = session.register(PdfObject::Stream {
        dict: dict.with("Length", data.len() as i64),
        data,
    });
    crate::log::debug!(
        pattern = id.0,
        form = content.0,
        ?tile.tile_mode,
        "tiling pattern registered"
    );
    id
}

/// Form holding one tile of an image brush
pub fn image_tile_form(
    session: &mut RenderSession<'_>,
    image_uri: &str,
    tile: &TileBrush,
) -> Result<Option<ObjectId>, RenderError> {
    let Some(view) = viewbox_transform(tile) else {
        return Ok(None);
    };
    let image = session.resolve_image(image_uri)?;
    session.enter()?;
    let mut writer = ContentWriter::new(
        session,
        RenderTarget::Form {
            bbox: tile.viewport,
            matrix: None,
        },
    );
    writer.comment(&format!("image brush {image_uri}"));
    let placed = view.transform_rect(image_extent(&image));
    let finished = draw_image(&mut writer, image.id, placed).and_then(|()| writer.finish(session));
    session.leave();
    Ok(Some(finished?.id))
}

/// Form holding one tile of a visual brush
pub fn visual_tile_form(
    session: &mut RenderSession<'_>,
    visual: &[Node],
    tile: &TileBrush,
) -> Result<Option<ObjectId>, RenderError> {
    let Some(view) = viewbox_transform(tile) else {
        return Ok(None);
    };
    session.enter()?;
    let mut writer = ContentWriter::new(session, RenderTarget::Group { bbox: tile.viewport });
    writer.comment("visual brush");
    writer.transform(view);
    let result = render_nodes(session, &mut writer, visual).and_then(|()| writer.finish(session));
    session.leave();
    Ok(Some(result?.id))
}

/// Image extent in scene units, at the image's own resolution
pub fn image_extent(image: &ResolvedImage) -> Rect {
    let dpi = |d: f64| if d > 0.0 { d } else { 96.0 };
    Rect::new(
        0.0,
        0.0,
        f64::from(image.width) * 96.0 / dpi(image.dpi.0),
        f64::from(image.height) * 96.0 / dpi(image.dpi.1),
    )
}

/// `cm` mapping the image unit square onto `placed` (top row first) and `Do`
pub fn draw_image(
    writer: &mut ContentWriter,
    image: ObjectId,
    placed: Rect,
) -> Result<(), RenderError> {
    writer.push_state();
    writer.transform(Matrix::new(
        placed.width,
        0.0,
        0.0,
        -placed.height,
        placed.x,
        placed.y + placed.height,
    ));
    writer.draw_xobject(ResourceCategory::Image, image);
    writer.pop_state()
}

/// Render a luminosity soft mask form and return its id.
///
/// `draw` writes the mask content in the user space that is current when the
/// mask's graphics state is applied.
pub fn soft_mask<'h, F>(session: &mut RenderSession<'h>, draw: F) -> Result<ObjectId, RenderError>
where
    F: FnOnce(&mut RenderSession<'h>, &mut ContentWriter) -> Result<(), RenderError>,
{
    session.enter()?;
    let bbox = session.options.soft_mask_bbox;
    let mut writer = ContentWriter::new(session, RenderTarget::SoftMask { bbox });
    writer.comment("soft mask");
    let result = draw(session, &mut writer).and_then(|()| writer.finish(session));
    session.leave();
    let id = result?.id;
    crate::log::debug!(mask = id.0, "soft mask registered");
    Ok(id)
}

/// Soft mask whose luminosity is the alpha of a gradient
pub fn gradient_soft_mask(
    session: &mut RenderSession<'_>,
    gradient: GradientRef<'_>,
    bounds: Rect,
) -> Result<ObjectId, RenderError> {
    soft_mask(session, |session, writer| {
        draw_gradient(session, writer, gradient, FunctionMode::Luminosity, bounds)
    })
}

/// Paint a gradient over the whole clip region of `writer`.
///
/// Radial gradients with a repeating spread become a ring series; everything
/// else is one pad shading. `bounds` is the painted area in current user
/// space.
pub fn draw_gradient(
    session: &mut RenderSession<'_>,
    writer: &mut ContentWriter,
    gradient: GradientRef<'_>,
    mode: FunctionMode,
    bounds: Rect,
) -> Result<(), RenderError> {
    match gradient {
        GradientRef::Radial(b) if b.gradient.spread != SpreadMethod::Pad => {
            draw_radial_series(session, writer, b, mode, bounds)
        }
        _ => {
            let shading = build_gradient_shading(session, gradient, mode)?;
            writer.transform(gradient.transform().prepend(shading.space));
            writer.paint_shading(shading.shading);
            Ok(())
        }
    }
}

/// Number of rings drawn for a repeating radial gradient covering `bounds`
pub fn radial_repeat_count(bounds: Rect, rx: f64, ry: f64, max: usize) -> usize {
    let r = rx.max(ry);
    if r <= 0.0 || !r.is_finite() || bounds.is_empty() {
        return 1;
    }
    let cap = max.max(1);
    let fits = (bounds.width.max(bounds.height) / (2.0 * r)).ceil();
    if !fits.is_finite() {
        return cap;
    }
    (fits * 2.0).clamp(1.0, cap as f64) as usize
}

/// Paint a reflected or repeated radial gradient as concentric rings,
/// outermost first, over a background of the outermost stop.
pub fn draw_radial_series(
    session: &mut RenderSession<'_>,
    writer: &mut ContentWriter,
    brush: &RadialGradientBrush,
    mode: FunctionMode,
    bounds: Rect,
) -> Result<(), RenderError> {
    let stops = sorted_stops(&brush.gradient.stops)?;
    let space = color_space_for(mode);
    let (focus, ellipse) = ellipse_space(brush);
    let to_user = brush.gradient.transform.unwrap_or(Matrix::IDENTITY).prepend(ellipse);
    let local = to_user.invert().map(|inv| inv.transform_rect(bounds));

    let r = brush.radius_x.max(0.0);
    let n = radial_repeat_count(
        local.unwrap_or(bounds),
        brush.radius_x,
        brush.radius_y,
        session.options.max_radial_repeats,
    );
    crate::log::debug!(rings = n, spread = ?brush.gradient.spread, "radial gradient series");
    writer.comment(&format!("radial series of {n} rings"));

    writer.transform(to_user);
    if let (Some(local), Some(outer)) = (local, stops.last()) {
        match mode {
            FunctionMode::Color => writer.set_fill_color(outer.color),
            FunctionMode::Luminosity => writer.set_fill_gray(outer.color.a),
        }
        writer.rect(local.x, local.y, local.width, local.height);
        writer.op("f");
    }

    let forward = session.register(build_shading_function(&stops, mode, space, false)?.to_object());
    let mut reversed = None;
    for k in (0..n).rev() {
        let reverse = brush.gradient.spread == SpreadMethod::Reflect && k % 2 == 1;
        let function = if reverse {
            match reversed {
                Some(id) => id,
                None => {
                    let function = build_shading_function(&stops, mode, space, true)?;
                    let id = session.register(function.to_object());
                    reversed = Some(id);
                    id
                }
            }
        } else {
            forward
        };
        let inner = if k == 0 { focus } else { brush.center };
        let ring = radial_shading(
            inner,
            k as f64 * r,
            brush.center,
            (k + 1) as f64 * r,
            function,
            space,
            false,
        );
        let id = session.register(ring.into());
        writer.paint_shading(id);
    }
    Ok(())
}
