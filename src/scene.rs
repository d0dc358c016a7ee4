//! Scene graph handed to the renderer.
//!
//! The scene is read-only input: canvases, paths, glyph runs and nested
//! visuals, with geometry and brushes attached. Coordinates are in scene
//! units (1/96 inch), y pointing down.

use enum_dispatch::enum_dispatch;
use glam::DVec2;

use crate::types::{Color, Matrix, Rect};

// ============================================================================
// Nodes
// ============================================================================

/// A node of the scene graph
#[derive(Debug, Clone)]
pub enum Node {
    Canvas(Canvas),
    Path(PathNode),
    Glyphs(GlyphRun),
    Visual(Visual),
    /// Free text, written as a `%` comment when debug annotation is enabled
    Comment(String),
}

/// Inline group of child nodes
#[derive(Debug, Clone, Default)]
pub struct Canvas {
    pub children: Vec<Node>,
    pub render_transform: Option<Matrix>,
    pub clip: Option<Geometry>,
    pub opacity: f64,
    pub opacity_mask: Option<Brush>,
}

impl Canvas {
    pub fn new(children: Vec<Node>) -> Self {
        Canvas {
            children,
            opacity: 1.0,
            ..Default::default()
        }
    }
}

/// Nested visual, drawn through its own reusable form
#[derive(Debug, Clone, Default)]
pub struct Visual {
    pub children: Vec<Node>,
    pub transform: Option<Matrix>,
    pub opacity: f64,
}

impl Visual {
    pub fn new(children: Vec<Node>) -> Self {
        Visual {
            children,
            transform: None,
            opacity: 1.0,
        }
    }
}

/// A filled and/or stroked geometry
#[derive(Debug, Clone, Default)]
pub struct PathNode {
    pub data: Geometry,
    pub fill: Option<Brush>,
    pub stroke: Option<Stroke>,
    pub render_transform: Option<Matrix>,
    pub clip: Option<Geometry>,
    pub opacity: f64,
    pub opacity_mask: Option<Brush>,
}

impl PathNode {
    pub fn new(data: Geometry) -> Self {
        PathNode {
            data,
            opacity: 1.0,
            ..Default::default()
        }
    }

    pub fn with_fill(mut self, fill: Brush) -> Self {
        self.fill = Some(fill);
        self
    }

    pub fn with_stroke(mut self, stroke: Stroke) -> Self {
        self.stroke = Some(stroke);
        self
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_transform(mut self, transform: Matrix) -> Self {
        self.render_transform = Some(transform);
        self
    }

    pub fn with_clip(mut self, clip: Geometry) -> Self {
        self.clip = Some(clip);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineCap {
    #[default]
    Flat,
    Square,
    Round,
    Triangle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineJoin {
    #[default]
    Miter,
    Bevel,
    Round,
}

/// Stroke brush plus line attributes
#[derive(Debug, Clone)]
pub struct Stroke {
    pub brush: Brush,
    pub thickness: f64,
    pub start_cap: LineCap,
    pub end_cap: LineCap,
    pub dash_cap: LineCap,
    pub join: LineJoin,
    pub miter_limit: f64,
    /// Dash lengths in multiples of the thickness
    pub dash_array: Vec<f64>,
    /// Dash offset in multiples of the thickness
    pub dash_offset: f64,
}

impl Stroke {
    pub fn new(brush: Brush, thickness: f64) -> Self {
        Stroke {
            brush,
            thickness,
            start_cap: LineCap::Flat,
            end_cap: LineCap::Flat,
            dash_cap: LineCap::Flat,
            join: LineJoin::Miter,
            miter_limit: 10.0,
            dash_array: Vec::new(),
            dash_offset: 0.0,
        }
    }

    pub fn with_caps(mut self, start: LineCap, end: LineCap) -> Self {
        self.start_cap = start;
        self.end_cap = end;
        self
    }

    pub fn with_join(mut self, join: LineJoin) -> Self {
        self.join = join;
        self
    }

    pub fn with_dashes(mut self, dashes: Vec<f64>, offset: f64) -> Self {
        self.dash_array = dashes;
        self.dash_offset = offset;
        self
    }
}

// ============================================================================
// Glyph runs
// ============================================================================

/// Style simulations applied on top of the font outlines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StyleSimulations {
    pub bold: bool,
    pub italic: bool,
}

/// One entry of a cluster mapping.
///
/// Each entry covers `code_units` UTF-16 code units of the run's text and
/// `glyph_count` glyphs. Only the first glyph of a cluster carries the
/// explicit values; following glyphs of a multi-glyph cluster get their own
/// entries with `code_units == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GlyphMapping {
    pub code_units: usize,
    pub glyph_count: usize,
    pub index: Option<u16>,
    /// Advance width in 1/100 em
    pub advance: Option<f64>,
    /// Offset along the baseline in 1/100 em
    pub u_offset: Option<f64>,
    /// Offset perpendicular to the baseline in 1/100 em, up is positive
    pub v_offset: Option<f64>,
}

impl GlyphMapping {
    pub fn has_offset(&self) -> bool {
        self.u_offset.is_some_and(|u| u != 0.0) || self.v_offset.is_some_and(|v| v != 0.0)
    }
}

/// A run of glyphs sharing font, size and fill
#[derive(Debug, Clone)]
pub struct GlyphRun {
    pub origin: DVec2,
    pub font_uri: String,
    pub em_size: f64,
    pub unicode: String,
    pub mapping: Option<Vec<GlyphMapping>>,
    pub bidi_level: u8,
    pub is_sideways: bool,
    pub simulations: StyleSimulations,
    pub fill: Option<Brush>,
    pub render_transform: Option<Matrix>,
    pub clip: Option<Geometry>,
    pub opacity: f64,
}

impl GlyphRun {
    pub fn new(
        origin: DVec2,
        font_uri: impl Into<String>,
        em_size: f64,
        unicode: impl Into<String>,
    ) -> Self {
        GlyphRun {
            origin,
            font_uri: font_uri.into(),
            em_size,
            unicode: unicode.into(),
            mapping: None,
            bidi_level: 0,
            is_sideways: false,
            simulations: StyleSimulations::default(),
            fill: Some(Brush::Solid(SolidColorBrush::new(Color::BLACK))),
            render_transform: None,
            clip: None,
            opacity: 1.0,
        }
    }

    pub fn is_right_to_left(&self) -> bool {
        self.bidi_level % 2 == 1
    }
}

// ============================================================================
// Geometry
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillRule {
    #[default]
    EvenOdd,
    NonZero,
}

impl FillRule {
    pub fn is_even_odd(self) -> bool {
        self == FillRule::EvenOdd
    }
}

/// Ordered list of figures
#[derive(Debug, Clone, Default)]
pub struct Geometry {
    pub figures: Vec<Figure>,
}

impl Geometry {
    pub fn new(figures: Vec<Figure>) -> Self {
        Geometry { figures }
    }

    /// Closed axis-aligned rectangle as a single three-point polyline figure
    pub fn rect(r: Rect) -> Self {
        let [p0, p1, p2, p3] = r.corners();
        Geometry::new(vec![
            Figure::new(p0, true).with_segment(Segment::Poly(PolySegment::lines(vec![p1, p2, p3]))),
        ])
    }

    /// Fill rule of the geometry, taken from its first figure
    pub fn fill_rule(&self) -> FillRule {
        self.figures.first().map(|f| f.fill_rule).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.figures.is_empty()
    }
}

/// A connected series of segments
#[derive(Debug, Clone)]
pub struct Figure {
    pub start: DVec2,
    pub closed: bool,
    pub fill_rule: FillRule,
    pub transform: Option<Matrix>,
    pub segments: Vec<Segment>,
}

impl Figure {
    pub fn new(start: DVec2, closed: bool) -> Self {
        Figure {
            start,
            closed,
            fill_rule: FillRule::default(),
            transform: None,
            segments: Vec::new(),
        }
    }

    pub fn with_segment(mut self, segment: Segment) -> Self {
        self.segments.push(segment);
        self
    }

    pub fn with_fill_rule(mut self, rule: FillRule) -> Self {
        self.fill_rule = rule;
        self
    }

    pub fn with_transform(mut self, transform: Matrix) -> Self {
        self.transform = Some(transform);
        self
    }
}

/// Shared behaviour of all segment kinds
#[enum_dispatch]
pub trait SegmentPoints {
    /// Points carried by the segment, in order
    fn points(&self) -> Vec<DVec2>;

    /// Where the segment leaves the pen
    fn end_point(&self) -> Option<DVec2> {
        self.points().last().copied()
    }
}

/// A segment of a figure
#[enum_dispatch(SegmentPoints)]
#[derive(Debug, Clone)]
pub enum Segment {
    Poly(PolySegment),
    Cubic(CubicSegment),
    Quadratic(QuadraticSegment),
    Arc(ArcSegment),
}

/// Straight lines through each point
#[derive(Debug, Clone)]
pub struct PolySegment {
    pub points: Vec<DVec2>,
}

impl PolySegment {
    pub fn lines(points: Vec<DVec2>) -> Self {
        PolySegment { points }
    }
}

impl SegmentPoints for PolySegment {
    fn points(&self) -> Vec<DVec2> {
        self.points.clone()
    }
}

/// Cubic Béziers, three points per curve (control, control, end)
#[derive(Debug, Clone)]
pub struct CubicSegment {
    pub points: Vec<DVec2>,
}

impl SegmentPoints for CubicSegment {
    fn points(&self) -> Vec<DVec2> {
        self.points.clone()
    }
}

/// Quadratic Béziers, two points per curve (control, end)
#[derive(Debug, Clone)]
pub struct QuadraticSegment {
    pub points: Vec<DVec2>,
}

impl SegmentPoints for QuadraticSegment {
    fn points(&self) -> Vec<DVec2> {
        self.points.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SweepDirection {
    #[default]
    Counterclockwise,
    Clockwise,
}

/// Elliptical arc to `point`
#[derive(Debug, Clone)]
pub struct ArcSegment {
    pub point: DVec2,
    pub size: DVec2,
    pub rotation_angle: f64,
    pub is_large_arc: bool,
    pub sweep: SweepDirection,
}

impl SegmentPoints for ArcSegment {
    fn points(&self) -> Vec<DVec2> {
        vec![self.point]
    }
}

// ============================================================================
// Brushes
// ============================================================================

/// Paint for fills, strokes and opacity masks
#[derive(Debug, Clone)]
pub enum Brush {
    Solid(SolidColorBrush),
    Linear(LinearGradientBrush),
    Radial(RadialGradientBrush),
    Image(ImageBrush),
    Visual(VisualBrush),
}

impl Brush {
    pub fn solid(color: Color) -> Self {
        Brush::Solid(SolidColorBrush::new(color))
    }

    /// Brush-level opacity
    pub fn opacity(&self) -> f64 {
        match self {
            Brush::Solid(b) => b.opacity,
            Brush::Linear(b) => b.gradient.opacity,
            Brush::Radial(b) => b.gradient.opacity,
            Brush::Image(b) => b.tile.opacity,
            Brush::Visual(b) => b.tile.opacity,
        }
    }

    /// The color a uniform brush paints, if it is one
    pub fn uniform_color(&self) -> Option<Color> {
        match self {
            Brush::Solid(b) => Some(b.color),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SolidColorBrush {
    pub color: Color,
    pub opacity: f64,
}

impl SolidColorBrush {
    pub fn new(color: Color) -> Self {
        SolidColorBrush {
            color,
            opacity: 1.0,
        }
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    pub offset: f64,
    pub color: Color,
}

impl GradientStop {
    pub fn new(offset: f64, color: Color) -> Self {
        GradientStop { offset, color }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpreadMethod {
    #[default]
    Pad,
    Reflect,
    Repeat,
}

/// Data shared by both gradient kinds
#[derive(Debug, Clone, PartialEq)]
pub struct Gradient {
    pub stops: Vec<GradientStop>,
    pub spread: SpreadMethod,
    pub transform: Option<Matrix>,
    pub opacity: f64,
}

impl Gradient {
    pub fn new(stops: Vec<GradientStop>) -> Self {
        Gradient {
            stops,
            spread: SpreadMethod::Pad,
            transform: None,
            opacity: 1.0,
        }
    }

    /// Whether the alpha varies along the gradient
    pub fn has_stop_alpha(&self) -> bool {
        self.stops.iter().any(|s| !s.color.is_opaque())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinearGradientBrush {
    pub gradient: Gradient,
    pub start: DVec2,
    pub end: DVec2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RadialGradientBrush {
    pub gradient: Gradient,
    pub center: DVec2,
    pub origin: DVec2,
    pub radius_x: f64,
    pub radius_y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TileMode {
    #[default]
    None,
    Tile,
    FlipX,
    FlipY,
    FlipXY,
}

/// Tiling data shared by image and visual brushes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileBrush {
    /// Source region of the content
    pub viewbox: Rect,
    /// Where the viewbox lands in brush space
    pub viewport: Rect,
    pub tile_mode: TileMode,
    pub transform: Option<Matrix>,
    pub opacity: f64,
}

impl TileBrush {
    pub fn new(viewbox: Rect, viewport: Rect) -> Self {
        TileBrush {
            viewbox,
            viewport,
            tile_mode: TileMode::None,
            transform: None,
            opacity: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageBrush {
    pub image_uri: String,
    pub tile: TileBrush,
}

#[derive(Debug, Clone)]
pub struct VisualBrush {
    pub visual: Vec<Node>,
    pub tile: TileBrush,
}
