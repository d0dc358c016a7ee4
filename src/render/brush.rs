//! Brush realization
//!
//! [`plan`] decides how a brush reaches the stream: a colour or pattern
//! selected with `rg`/`scn`, a pattern behind a soft mask, a clipped ring
//! series or a directly drawn image. [`apply_simple`] and [`apply_alpha`]
//! then write the selection operators.

use crate::errors::RenderError;
use crate::host::ResolvedImage;
use crate::object::ObjectId;
use crate::scene::{Brush, RadialGradientBrush, SpreadMethod, TileBrush, TileMode};
use crate::types::{Color, Matrix, Opacity, Rect};

use super::context::RenderSession;
use super::pattern::{
    self, GradientRef, build_gradient_shading, gradient_soft_mask, image_extent, image_tile_form,
    shading_pattern,
    tiling_pattern, viewbox_transform, visual_tile_form,
};
use super::resources::ResourceCategory;
use super::shading::FunctionMode;
use super::writer::ContentWriter;

/// What the brush paints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Usage {
    Fill,
    Stroke,
    Text,
}

/// Colour operand of a simple paint
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Source {
    Color(Color),
    Pattern(ObjectId),
}

/// How one brush is painted
#[derive(Debug, Clone, PartialEq)]
pub enum Paint<'a> {
    /// Paints nothing
    None,
    /// Colour or pattern selected with `rg`/`scn`
    Simple { source: Source, alpha: f64 },
    /// Pattern painted under a luminosity soft mask
    Masked { pattern: ObjectId, mask: ObjectId, alpha: f64 },
    /// Repeating radial gradient drawn as rings through a clip
    RadialSeries {
        brush: &'a RadialGradientBrush,
        mask: Option<ObjectId>,
        alpha: f64,
    },
    /// Image drawn with `cm` and `Do` through a clip
    Image {
        image: ResolvedImage,
        placed: Rect,
        alpha: f64,
    },
}

impl Paint<'_> {
    pub fn is_none(&self) -> bool {
        matches!(self, Paint::None)
    }

    /// Paints that only need selection operators before the painting operator
    pub fn is_simple(&self) -> bool {
        matches!(self, Paint::Simple { .. })
    }

    pub fn alpha(&self) -> f64 {
        match self {
            Paint::None => 1.0,
            Paint::Simple { alpha, .. }
            | Paint::Masked { alpha, .. }
            | Paint::RadialSeries { alpha, .. }
            | Paint::Image { alpha, .. } => *alpha,
        }
    }
}

/// Area a brush is painted over, in current user space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Area {
    pub bounds: Rect,
    /// Set when the painted geometry is exactly this rectangle
    pub rect: Option<Rect>,
}

impl Area {
    pub fn new(bounds: Rect) -> Self {
        Area { bounds, rect: None }
    }
}

/// Whether painting `brush` sets a soft mask, which has to stay inside a
/// saved state
pub fn needs_mask(brush: &Brush) -> bool {
    match brush {
        Brush::Linear(b) => b.gradient.has_stop_alpha(),
        Brush::Radial(b) => b.gradient.has_stop_alpha(),
        Brush::Solid(_) | Brush::Image(_) | Brush::Visual(_) => false,
    }
}

/// Decide how `brush` is painted over `area` in the current state of
/// `writer`. Registers any pattern, shading or mask the paint needs.
pub fn plan<'a>(
    session: &mut RenderSession<'_>,
    writer: &ContentWriter,
    brush: &'a Brush,
    area: Area,
    usage: Usage,
) -> Result<Paint<'a>, RenderError> {
    let opacity = Opacity::try_new(brush.opacity())
        .map_err(|e| RenderError::invalid(format!("brush opacity {}: {e}", brush.opacity())))?
        .raw();
    match brush {
        Brush::Solid(solid) => Ok(Paint::Simple {
            source: Source::Color(solid.color),
            alpha: opacity * solid.color.a,
        }),
        Brush::Linear(b) => {
            if b.gradient.spread != SpreadMethod::Pad {
                session.unsupported(
                    format!("linear gradient with {:?} spread", b.gradient.spread),
                    "pad spread",
                    Some(writer.id()),
                )?;
            }
            plan_gradient(session, writer, GradientRef::Linear(b), area, usage, opacity)
        }
        Brush::Radial(b) => {
            if b.gradient.spread != SpreadMethod::Pad {
                if usage == Usage::Fill {
                    let mask = if b.gradient.has_stop_alpha() {
                        Some(gradient_soft_mask(session, GradientRef::Radial(b), area.bounds)?)
                    } else {
                        None
                    };
                    return Ok(Paint::RadialSeries {
                        brush: b,
                        mask,
                        alpha: opacity,
                    });
                }
                session.unsupported(
                    format!("radial gradient with {:?} spread on {usage:?}", b.gradient.spread),
                    "pad spread",
                    Some(writer.id()),
                )?;
            }
            plan_gradient(session, writer, GradientRef::Radial(b), area, usage, opacity)
        }
        Brush::Image(b) => {
            let Some(tile) = usable_tile(session, writer, &b.tile)? else {
                return fallback(session, writer, "image brush with an empty viewbox or viewport");
            };
            if usage == Usage::Fill
                && tile.tile_mode == TileMode::None
                && tile.transform.is_none()
                && area.rect == Some(tile.viewport)
            {
                let image = session.resolve_image(&b.image_uri)?;
                if let Some(view) = viewbox_transform(&tile) {
                    crate::log::debug!(uri = %b.image_uri, "image drawn directly");
                    return Ok(Paint::Image {
                        image,
                        placed: view.transform_rect(image_extent(&image)),
                        alpha: opacity,
                    });
                }
            }
            match image_tile_form(session, &b.image_uri, &tile)? {
                Some(form) => Ok(tiled(session, writer, form, &tile, opacity)),
                None => Ok(Paint::None),
            }
        }
        Brush::Visual(b) => {
            let Some(tile) = usable_tile(session, writer, &b.tile)? else {
                return fallback(session, writer, "visual brush with an empty viewbox or viewport");
            };
            match visual_tile_form(session, &b.visual, &tile)? {
                Some(form) => Ok(tiled(session, writer, form, &tile, opacity)),
                None => Ok(Paint::None),
            }
        }
    }
}

fn plan_gradient<'a>(
    session: &mut RenderSession<'_>,
    writer: &ContentWriter,
    gradient: GradientRef<'_>,
    area: Area,
    usage: Usage,
    opacity: f64,
) -> Result<Paint<'a>, RenderError> {
    let shading = build_gradient_shading(session, gradient, FunctionMode::Color)?;
    let matrix = writer
        .transform_matrix()
        .prepend(gradient.transform())
        .prepend(shading.space);
    let pattern = shading_pattern(session, shading.shading, matrix);
    if usage != Usage::Stroke && gradient.gradient().has_stop_alpha() {
        let mask = gradient_soft_mask(session, gradient, area.bounds)?;
        return Ok(Paint::Masked {
            pattern,
            mask,
            alpha: opacity,
        });
    }
    Ok(Paint::Simple {
        source: Source::Pattern(pattern),
        alpha: opacity,
    })
}

/// Tile brush with flip modes replaced by plain tiling, `None` when the
/// brush cannot produce a tile at all
fn usable_tile(
    session: &mut RenderSession<'_>,
    writer: &ContentWriter,
    tile: &TileBrush,
) -> Result<Option<TileBrush>, RenderError> {
    if viewbox_transform(tile).is_none() {
        return Ok(None);
    }
    let mut tile = *tile;
    if matches!(tile.tile_mode, TileMode::FlipX | TileMode::FlipY | TileMode::FlipXY) {
        session.unsupported(
            format!("{:?} tile mode", tile.tile_mode),
            "plain tiling",
            Some(writer.id()),
        )?;
        tile.tile_mode = TileMode::Tile;
    }
    Ok(Some(tile))
}

fn tiled<'a>(
    session: &mut RenderSession<'_>,
    writer: &ContentWriter,
    form: ObjectId,
    tile: &TileBrush,
    opacity: f64,
) -> Paint<'a> {
    let matrix = writer
        .transform_matrix()
        .prepend(tile.transform.unwrap_or(Matrix::IDENTITY));
    Paint::Simple {
        source: Source::Pattern(tiling_pattern(session, form, tile, matrix)),
        alpha: opacity,
    }
}

/// Flat fill in the configured fallback colour
fn fallback<'a>(
    session: &mut RenderSession<'_>,
    writer: &ContentWriter,
    feature: &str,
) -> Result<Paint<'a>, RenderError> {
    session.unsupported(feature, "flat fallback fill", Some(writer.id()))?;
    Ok(Paint::Simple {
        source: Source::Color(session.options.fallback_color),
        alpha: 1.0,
    })
}

/// Select the colour of a simple paint for filling or stroking
pub fn apply_simple(writer: &mut ContentWriter, source: Source, stroke: bool) {
    match (source, stroke) {
        (Source::Color(c), false) => writer.set_fill_color(c),
        (Source::Color(c), true) => writer.set_stroke_color(c),
        (Source::Pattern(id), false) => {
            let name = writer.resource(ResourceCategory::Pattern, id);
            writer.set_fill_pattern(&name);
        }
        (Source::Pattern(id), true) => {
            let name = writer.resource(ResourceCategory::Pattern, id);
            writer.set_stroke_pattern(&name);
        }
    }
}

/// Realize fill and stroke alpha, combined with the element opacity of the
/// current state. Nothing is written while both stay opaque and no graphics
/// state has been set yet.
pub fn apply_alpha(
    session: &mut RenderSession<'_>,
    writer: &mut ContentWriter,
    fill: f64,
    stroke: f64,
) {
    let opacity = writer.state().opacity.raw();
    let (ca, stroke_ca) = (opacity * fill, opacity * stroke);
    if ca >= 1.0 && stroke_ca >= 1.0 && writer.state().ext_gstate.is_none() {
        return;
    }
    let id = session.ext_gstate(ca, stroke_ca, None);
    writer.set_ext_gstate(id);
}

/// Paint the non-simple fills. `write_geometry` writes the path being
/// filled; `even_odd` picks the fill or clip rule. The caller has selected
/// nothing; everything happens inside a saved state.
pub fn paint_complex_fill(
    session: &mut RenderSession<'_>,
    writer: &mut ContentWriter,
    paint: &Paint<'_>,
    area: Area,
    even_odd: bool,
    write_geometry: &dyn Fn(&mut ContentWriter),
) -> Result<(), RenderError> {
    let clip = if even_odd { "W* n" } else { "W n" };
    writer.push_state();
    match *paint {
        Paint::None | Paint::Simple { .. } => {}
        Paint::Masked { pattern, mask, alpha } => {
            let ca = writer.state().opacity.raw() * alpha;
            let gs = session.ext_gstate(ca, ca, Some(mask));
            writer.set_ext_gstate(gs);
            apply_simple(writer, Source::Pattern(pattern), false);
            write_geometry(writer);
            writer.op(if even_odd { "f*" } else { "f" });
        }
        Paint::RadialSeries { brush, mask, alpha } => {
            match mask {
                Some(mask) => {
                    let ca = writer.state().opacity.raw() * alpha;
                    let gs = session.ext_gstate(ca, ca, Some(mask));
                    writer.set_ext_gstate(gs);
                }
                None => apply_alpha(session, writer, alpha, alpha),
            }
            write_geometry(writer);
            writer.op(clip);
            pattern::draw_radial_series(session, writer, brush, FunctionMode::Color, area.bounds)?;
        }
        Paint::Image { image, placed, alpha } => {
            apply_alpha(session, writer, alpha, alpha);
            write_geometry(writer);
            writer.op(clip);
            pattern::draw_image(writer, image.id, placed)?;
        }
    }
    writer.pop_state()
}

/// Apply an element's opacity mask to the current (saved) state.
///
/// Gradient masks become a luminosity soft mask in a graphics state, other
/// brushes are ignored with a warning.
pub fn apply_opacity_mask(
    session: &mut RenderSession<'_>,
    writer: &mut ContentWriter,
    mask: &Brush,
    bounds: Rect,
) -> Result<(), RenderError> {
    let gradient = match mask {
        Brush::Linear(b) => {
            if b.gradient.spread != SpreadMethod::Pad {
                session.unsupported(
                    format!("linear gradient opacity mask with {:?} spread", b.gradient.spread),
                    "pad spread",
                    Some(writer.id()),
                )?;
            }
            GradientRef::Linear(b)
        }
        Brush::Radial(b) => GradientRef::Radial(b),
        Brush::Solid(_) | Brush::Image(_) | Brush::Visual(_) => {
            return session.unsupported(
                "opacity mask that is not a gradient",
                "no mask",
                Some(writer.id()),
            );
        }
    };
    writer.stack_mut().multiply_opacity(gradient.gradient().opacity)?;
    let mask = gradient_soft_mask(session, gradient, bounds)?;
    let alpha = writer.state().opacity.raw();
    let gs = session.ext_gstate(alpha, alpha, Some(mask));
    writer.set_ext_gstate(gs);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Host, ImageResolver, MemoryDocument, MemoryFonts, MemoryImages};
    use crate::object::PdfObject;
    use crate::render::{RenderOptions, RenderTarget};
    use crate::scene::{
        Geometry, Gradient, GradientStop, ImageBrush, LinearGradientBrush, Node, PathNode,
        SolidColorBrush, VisualBrush,
    };
    use glam::dvec2;

    fn linear(stops: Vec<GradientStop>, spread: SpreadMethod) -> Brush {
        let mut gradient = Gradient::new(stops);
        gradient.spread = spread;
        Brush::Linear(LinearGradientBrush {
            gradient,
            start: dvec2(0.0, 0.0),
            end: dvec2(100.0, 0.0),
        })
    }

    fn opaque_stops() -> Vec<GradientStop> {
        vec![
            GradientStop::new(0.0, Color::rgb(1.0, 0.0, 0.0)),
            GradientStop::new(1.0, Color::rgb(0.0, 0.0, 1.0)),
        ]
    }

    fn form(session: &mut RenderSession<'_>) -> ContentWriter {
        ContentWriter::new(
            session,
            RenderTarget::Form {
                bbox: Rect::new(0.0, 0.0, 100.0, 100.0),
                matrix: None,
            },
        )
    }

    #[test]
    fn solid_alpha_multiplies_brush_opacity() {
        let mut doc = MemoryDocument::new();
        let (fonts, images) = (MemoryFonts::new(), MemoryImages::new());
        let mut session =
            RenderSession::new(Host::new(&mut doc, &fonts, &images), RenderOptions::default());
        let writer = form(&mut session);
        let brush =
            Brush::Solid(SolidColorBrush::new(Color::argb(0.5, 1.0, 0.0, 0.0)).with_opacity(0.5));
        let paint =
            plan(&mut session, &writer, &brush, Area::new(Rect::EMPTY), Usage::Fill).unwrap();
        assert_eq!(paint.alpha(), 0.25);
        assert!(paint.is_simple());
    }

    #[test]
    fn linear_reflect_warns_and_pads() {
        let mut doc = MemoryDocument::new();
        let (fonts, images) = (MemoryFonts::new(), MemoryImages::new());
        let mut session =
            RenderSession::new(Host::new(&mut doc, &fonts, &images), RenderOptions::default());
        let writer = form(&mut session);
        let brush = linear(opaque_stops(), SpreadMethod::Reflect);
        let paint =
            plan(&mut session, &writer, &brush, Area::new(Rect::EMPTY), Usage::Fill).unwrap();
        assert!(matches!(paint, Paint::Simple { source: Source::Pattern(_), .. }));
        assert_eq!(session.warnings().len(), 1);
        assert_eq!(session.warnings()[0].fallback, "pad spread");
    }

    #[test]
    fn transparent_gradient_gets_a_mask() {
        let mut doc = MemoryDocument::new();
        let (fonts, images) = (MemoryFonts::new(), MemoryImages::new());
        let mask = {
            let mut session =
                RenderSession::new(Host::new(&mut doc, &fonts, &images), RenderOptions::default());
            let writer = form(&mut session);
            let brush = linear(
                vec![
                    GradientStop::new(0.0, Color::argb(0.0, 1.0, 0.0, 0.0)),
                    GradientStop::new(1.0, Color::rgb(1.0, 0.0, 0.0)),
                ],
                SpreadMethod::Pad,
            );
            let area = Area::new(Rect::new(0.0, 0.0, 100.0, 100.0));
            match plan(&mut session, &writer, &brush, area, Usage::Fill).unwrap() {
                Paint::Masked { mask, .. } => mask,
                other => panic!("expected a masked paint, got {other:?}"),
            }
        };
        let dict = doc.get(mask).and_then(PdfObject::as_dict).unwrap();
        assert_eq!(
            dict.get("Group").unwrap().to_string(),
            "<< /Type /Group /S /Transparency /CS /DeviceGray >>"
        );
        let text = doc.stream_text(mask).unwrap();
        assert!(text.contains("/Sh0 sh"), "{text}");
    }

    #[test]
    fn gradient_stroke_ignores_stop_alpha() {
        let mut doc = MemoryDocument::new();
        let (fonts, images) = (MemoryFonts::new(), MemoryImages::new());
        let mut session =
            RenderSession::new(Host::new(&mut doc, &fonts, &images), RenderOptions::default());
        let writer = form(&mut session);
        let brush = linear(
            vec![
                GradientStop::new(0.0, Color::argb(0.0, 1.0, 0.0, 0.0)),
                GradientStop::new(1.0, Color::rgb(1.0, 0.0, 0.0)),
            ],
            SpreadMethod::Pad,
        );
        let paint =
            plan(&mut session, &writer, &brush, Area::new(Rect::EMPTY), Usage::Stroke).unwrap();
        assert!(paint.is_simple());
    }

    #[test]
    fn image_on_its_viewport_is_drawn_directly() {
        let mut doc = MemoryDocument::new();
        let fonts = MemoryFonts::new();
        let mut images = MemoryImages::new();
        images.insert(
            "/a.png",
            ResolvedImage {
                id: ObjectId(900),
                width: 10,
                height: 10,
                dpi: (96.0, 96.0),
            },
        );
        let mut session =
            RenderSession::new(Host::new(&mut doc, &fonts, &images), RenderOptions::default());
        let writer = form(&mut session);
        let viewport = Rect::new(5.0, 5.0, 20.0, 20.0);
        let brush = Brush::Image(ImageBrush {
            image_uri: "/a.png".into(),
            tile: TileBrush::new(Rect::new(0.0, 0.0, 10.0, 10.0), viewport),
        });

        let direct = plan(
            &mut session,
            &writer,
            &brush,
            Area {
                bounds: viewport,
                rect: Some(viewport),
            },
            Usage::Fill,
        )
        .unwrap();
        assert_eq!(
            direct,
            Paint::Image {
                image: images.resolve_image("/a.png").unwrap(),
                placed: viewport,
                alpha: 1.0,
            }
        );

        let tiled = plan(&mut session, &writer, &brush, Area::new(viewport), Usage::Fill).unwrap();
        assert!(matches!(tiled, Paint::Simple { source: Source::Pattern(_), .. }));
    }

    #[test]
    fn degenerate_tile_falls_back_to_flat_fill() {
        let mut doc = MemoryDocument::new();
        let (fonts, images) = (MemoryFonts::new(), MemoryImages::new());
        let options = RenderOptions::default();
        let mut session = RenderSession::new(Host::new(&mut doc, &fonts, &images), options.clone());
        let writer = form(&mut session);
        let brush = Brush::Image(ImageBrush {
            image_uri: "/a.png".into(),
            tile: TileBrush::new(Rect::EMPTY, Rect::new(0.0, 0.0, 1.0, 1.0)),
        });
        let paint =
            plan(&mut session, &writer, &brush, Area::new(Rect::EMPTY), Usage::Fill).unwrap();
        assert_eq!(
            paint,
            Paint::Simple {
                source: Source::Color(options.fallback_color),
                alpha: 1.0
            }
        );
    }

    #[test]
    fn brush_opacity_out_of_range_is_invalid() {
        let mut doc = MemoryDocument::new();
        let (fonts, images) = (MemoryFonts::new(), MemoryImages::new());
        let mut session =
            RenderSession::new(Host::new(&mut doc, &fonts, &images), RenderOptions::default());
        let writer = form(&mut session);
        for opacity in [f64::NAN, 1.5, -0.1] {
            let brush = Brush::Solid(SolidColorBrush::new(Color::BLACK).with_opacity(opacity));
            let result = plan(&mut session, &writer, &brush, Area::new(Rect::EMPTY), Usage::Fill);
            assert!(matches!(result, Err(RenderError::InvalidParameter { .. })), "{opacity}");
        }
    }

    fn red_square_brush() -> Brush {
        let square = PathNode::new(Geometry::rect(Rect::new(0.0, 0.0, 10.0, 10.0)))
            .with_fill(Brush::solid(Color::rgb(1.0, 0.0, 0.0)));
        let mut tile = TileBrush::new(
            Rect::new(0.0, 0.0, 10.0, 10.0),
            Rect::new(0.0, 0.0, 20.0, 20.0),
        );
        tile.tile_mode = TileMode::Tile;
        Brush::Visual(VisualBrush {
            visual: vec![Node::Path(square)],
            tile,
        })
    }

    #[test]
    fn visual_brush_tiles_its_nested_scene() {
        let mut doc = MemoryDocument::new();
        let (fonts, images) = (MemoryFonts::new(), MemoryImages::new());
        let brush = red_square_brush();
        let paint = {
            let mut session =
                RenderSession::new(Host::new(&mut doc, &fonts, &images), RenderOptions::default());
            let writer = form(&mut session);
            plan(&mut session, &writer, &brush, Area::new(Rect::EMPTY), Usage::Fill).unwrap()
        };
        let Paint::Simple {
            source: Source::Pattern(pattern),
            ..
        } = paint
        else {
            panic!("expected a pattern paint, got {paint:?}");
        };
        let dict = doc.get(pattern).and_then(PdfObject::as_dict).unwrap();
        assert_eq!(dict.get("PatternType").and_then(PdfObject::as_f64), Some(1.0));
        assert_eq!(dict.get("XStep").and_then(PdfObject::as_f64), Some(20.0));
        let content = dict
            .get("Resources")
            .and_then(PdfObject::as_dict)
            .and_then(|r| r.get("XObject"))
            .and_then(PdfObject::as_dict)
            .and_then(|x| x.get("Fm0"))
            .and_then(PdfObject::as_ref_id)
            .unwrap();
        let tile = doc.get(content).and_then(PdfObject::as_dict).unwrap();
        assert!(tile.get("Group").is_some());
        assert_eq!(
            doc.stream_text(content).unwrap(),
            "q\n2 0 0 2 0 0 cm\n1 0 0 rg\n0 0 10 10 re\nf*\nQ\n"
        );
    }

    #[test]
    fn visual_brush_counts_towards_nesting() {
        let mut doc = MemoryDocument::new();
        let (fonts, images) = (MemoryFonts::new(), MemoryImages::new());
        let options = RenderOptions::default().with_max_nesting_depth(0);
        let mut session = RenderSession::new(Host::new(&mut doc, &fonts, &images), options);
        let writer = form(&mut session);
        let brush = red_square_brush();
        let result = plan(&mut session, &writer, &brush, Area::new(Rect::EMPTY), Usage::Fill);
        assert_eq!(result.unwrap_err(), RenderError::NestingTooDeep { limit: 0 });
    }
}
