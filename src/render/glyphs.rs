//! Glyph run emission
//!
//! A run is laid out into positioned glyphs first ([`layout`]) and then
//! written as text operators. Glyphs whose position follows from the font's
//! own advances are collected into one `Tj`; an explicit offset or advance
//! breaks the pending segment and moves the pen with `Td`.

use glam::{DVec2, dvec2};

use crate::errors::RenderError;
use crate::host::ResolvedFont;
use crate::scene::{GlyphMapping, GlyphRun};
use crate::types::{Color, Matrix, Opacity, Rect};

use super::brush::{self, Area, Paint, Usage};
use super::context::RenderSession;
use super::defaults;
use super::fmt::{coord, coords};
use super::geometry::build_path;
use super::path_builder::write_path;
use super::writer::ContentWriter;

/// One glyph after layout, in scene units relative to the run origin
#[derive(Debug, Clone, PartialEq)]
pub struct LaidGlyph {
    pub index: u16,
    /// Pen advance after this glyph
    pub advance: f64,
    /// Whether `advance` came from the mapping instead of the font
    pub explicit_advance: bool,
    /// Offset along the baseline
    pub u: f64,
    /// Offset perpendicular to the baseline, up is positive
    pub v: f64,
    /// Source text of the cluster this glyph starts, empty for the rest
    pub text: String,
}

impl LaidGlyph {
    fn has_offset(&self) -> bool {
        self.u != 0.0 || self.v != 0.0
    }
}

fn natural_advance(font: &ResolvedFont<'_>, index: u16, em: f64) -> f64 {
    let upem = font.metrics.units_per_em();
    let upem = if upem > 0.0 { upem } else { 1000.0 };
    font.metrics.advance_width(index) / upem * em
}

fn first_char(units: &[u16]) -> Option<char> {
    char::decode_utf16(units.iter().copied()).next().and_then(Result::ok)
}

/// Lay out `run` against `font`.
///
/// The cluster mapping is consumed first, each entry one glyph; text left
/// over once the mapping runs out maps one character to one glyph through
/// the font's character map.
pub fn layout(run: &GlyphRun, font: &ResolvedFont<'_>) -> Vec<LaidGlyph> {
    let em = run.em_size;
    let units: Vec<u16> = run.unicode.encode_utf16().collect();
    let mut cursor = 0;
    let mut glyphs = Vec::new();

    let mapped = |entry: &GlyphMapping, index: u16, text: String| {
        let (advance, explicit_advance) = match entry.advance {
            Some(a) => (a / 100.0 * em, true),
            None => (natural_advance(font, index, em), false),
        };
        LaidGlyph {
            index,
            advance,
            explicit_advance,
            u: entry.u_offset.unwrap_or(0.0) / 100.0 * em,
            v: entry.v_offset.unwrap_or(0.0) / 100.0 * em,
            text,
        }
    };

    let mut cluster_char = None;
    for entry in run.mapping.iter().flatten() {
        let text = if entry.code_units > 0 {
            let end = (cursor + entry.code_units).min(units.len());
            let cluster = &units[cursor.min(end)..end];
            cluster_char = first_char(cluster);
            cursor = end;
            String::from_utf16_lossy(cluster)
        } else {
            String::new()
        };
        let index = match entry.index {
            Some(index) => index,
            None => cluster_char.map_or(0, |c| font.metrics.glyph_index(c)),
        };
        glyphs.push(mapped(entry, index, text));
    }

    let rest = &units[cursor.min(units.len())..];
    for c in char::decode_utf16(rest.iter().copied()) {
        let c = c.unwrap_or(char::REPLACEMENT_CHARACTER);
        let index = font.metrics.glyph_index(c);
        glyphs.push(LaidGlyph {
            index,
            advance: natural_advance(font, index, em),
            explicit_advance: false,
            u: 0.0,
            v: 0.0,
            text: c.to_string(),
        });
    }
    glyphs
}

/// Text matrix of a run: origin, y flipped back up, then the italic shear
/// and the sideways rotation in glyph space
pub fn text_matrix(run: &GlyphRun) -> Matrix {
    let mut m = Matrix::new(1.0, 0.0, 0.0, -1.0, run.origin.x, run.origin.y);
    if run.simulations.italic {
        m = m.prepend(Matrix::shear_x(defaults::ITALIC_SHEAR_DEGREES.to_radians().tan()));
    }
    if run.is_sideways {
        m = m.prepend(Matrix::rotate(defaults::SIDEWAYS_ROTATION));
    }
    m
}

/// Writes positioned glyphs, tracking the line start of `Td`
struct TextCursor {
    line: DVec2,
    pending: Vec<u16>,
    pending_at: DVec2,
}

impl TextCursor {
    fn new() -> Self {
        TextCursor {
            line: DVec2::ZERO,
            pending: Vec::new(),
            pending_at: DVec2::ZERO,
        }
    }

    fn move_to(&mut self, writer: &mut ContentWriter, at: DVec2) {
        let delta = at - self.line;
        if delta != DVec2::ZERO {
            writer.text_op(&format!("{} {} Td", coord(delta.x), coord(delta.y)));
            self.line = at;
        }
    }

    fn show(&mut self, writer: &mut ContentWriter, at: DVec2, glyphs: &[u16]) {
        self.move_to(writer, at);
        let hex: String = glyphs.iter().map(|g| format!("{g:04X}")).collect();
        writer.text_op(&format!("<{hex}> Tj"));
    }

    fn push(&mut self, at: DVec2, glyph: u16) {
        if self.pending.is_empty() {
            self.pending_at = at;
        }
        self.pending.push(glyph);
    }

    fn flush(&mut self, writer: &mut ContentWriter) {
        if !self.pending.is_empty() {
            let pending = std::mem::take(&mut self.pending);
            self.show(writer, self.pending_at, &pending);
        }
    }
}

/// Write the text operators of laid-out glyphs. Assumes the font, text
/// matrix and paint are already selected.
pub fn write_glyphs(
    session: &mut RenderSession<'_>,
    writer: &mut ContentWriter,
    font: &ResolvedFont<'_>,
    glyphs: &[LaidGlyph],
    right_to_left: bool,
) {
    let mut cursor = TextCursor::new();
    let mut pen = 0.0;
    for glyph in glyphs {
        session.record_glyph(font.id, glyph.index, &glyph.text);
        if right_to_left {
            pen -= glyph.advance;
            cursor.show(writer, dvec2(pen + glyph.u, glyph.v), &[glyph.index]);
            continue;
        }
        if glyph.has_offset() {
            cursor.flush(writer);
            cursor.show(writer, dvec2(pen + glyph.u, glyph.v), &[glyph.index]);
            pen += glyph.advance;
            continue;
        }
        cursor.push(dvec2(pen, 0.0), glyph.index);
        pen += glyph.advance;
        if glyph.explicit_advance {
            cursor.flush(writer);
        }
    }
    cursor.flush(writer);
}

/// Rough bounds of a run, for paints that need an area
fn run_bounds(run: &GlyphRun, glyphs: &[LaidGlyph]) -> Rect {
    let width: f64 = glyphs.iter().map(|g| g.advance).sum();
    let x = if run.is_right_to_left() {
        run.origin.x - width
    } else {
        run.origin.x
    };
    Rect::new(x, run.origin.y - run.em_size, width.abs(), run.em_size * 1.25)
}

/// Emit a glyph run node
pub fn emit_glyph_run(
    session: &mut RenderSession<'_>,
    writer: &mut ContentWriter,
    run: &GlyphRun,
) -> Result<(), RenderError> {
    let opacity = Opacity::try_new(run.opacity)
        .map_err(|e| RenderError::invalid(format!("glyph run opacity: {e}")))?;
    let Some(fill) = &run.fill else {
        crate::log::trace!(text = %run.unicode, "glyph run without fill skipped");
        return Ok(());
    };
    let font = session.resolve_font(&run.font_uri)?;
    let glyphs = layout(run, &font);
    crate::log::debug!(font = font.id.0, glyphs = glyphs.len(), text = %run.unicode, "glyph run");
    writer.comment(&format!("Glyphs {:?}", run.unicode));

    let saved = run.render_transform.is_some()
        || run.clip.is_some()
        || !opacity.is_opaque()
        || brush::needs_mask(fill);
    if saved {
        writer.push_state();
    }
    if let Some(m) = run.render_transform {
        writer.transform(m);
    }
    if let Some(clip) = &run.clip {
        let options = session.options();
        write_path(writer, &build_path(clip, options.curve_strategy, options.flatness));
        writer.op(if clip.fill_rule().is_even_odd() { "W* n" } else { "W n" });
    }
    writer.stack_mut().multiply_opacity(opacity.raw())?;

    let area = Area::new(run_bounds(run, &glyphs));
    match brush::plan(session, writer, fill, area, Usage::Text)? {
        Paint::Simple { source, alpha } => {
            brush::apply_simple(writer, source, false);
            brush::apply_alpha(session, writer, alpha, alpha);
        }
        Paint::Masked { pattern, mask, alpha } => {
            let ca = writer.state().opacity.raw() * alpha;
            let gs = session.ext_gstate(ca, ca, Some(mask));
            writer.set_ext_gstate(gs);
            brush::apply_simple(writer, brush::Source::Pattern(pattern), false);
        }
        Paint::None | Paint::RadialSeries { .. } | Paint::Image { .. } => {}
    }

    if run.simulations.bold {
        writer.set_text_mode(2);
        writer.set_stroke_color(fill.uniform_color().unwrap_or(Color::BLACK));
        writer.set_line_width(run.em_size * defaults::BOLD_STROKE_FACTOR);
    } else if writer.state().text_mode.is_some_and(|mode| mode != 0) {
        writer.set_text_mode(0);
    }

    writer.set_font(font.id, run.em_size);
    writer.text_op(&format!("{} Tm", coords(&text_matrix(run).to_array())));
    write_glyphs(session, writer, &font, &glyphs, run.is_right_to_left());

    if saved {
        writer.pop_state()?;
    }
    Ok(())
}
