//! Content stream writer
//!
//! Owns the text of one content stream, its graphics state stack and its
//! resource table. All operators go through here so that `BT`/`ET` pairing,
//! `q`/`Q` balance and the realized-state cache stay consistent.

use glam::DVec2;

use crate::errors::RenderError;
use crate::object::{Dict, ObjectId, PdfObject};
use crate::types::{Color, Matrix, Rect};

use super::context::RenderSession;
use super::defaults;
use super::fmt::{color, coord, coords};
use super::resources::{ResourceCategory, ResourceTable};
use super::state::{GraphicsState, StateStack, realize};
use super::RenderTarget;

/// Whether the writer is inside a text object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    Graphics,
    Text,
}

/// Line attributes in PDF terms
#[derive(Debug, Clone, PartialEq)]
pub struct LineStyle {
    pub width: f64,
    /// `J` operand: 0 butt, 1 round, 2 projecting square
    pub cap: u8,
    /// `j` operand: 0 miter, 1 round, 2 bevel
    pub join: u8,
    pub miter_limit: f64,
    pub dash: Vec<f64>,
    pub dash_phase: f64,
}

/// A stream that has been registered with the document
#[derive(Debug, Clone)]
pub struct FinishedStream {
    pub id: ObjectId,
    pub resources: Dict,
    pub length: usize,
}

pub struct ContentWriter {
    id: ObjectId,
    target: RenderTarget,
    buf: String,
    stack: StateStack,
    resources: ResourceTable,
    mode: StreamMode,
    indent: bool,
    annotate: bool,
}

impl ContentWriter {
    /// Start a stream for `target`: allocates its object id, writes the
    /// initial save and, for pages, the default page transform.
    pub fn new(session: &mut RenderSession<'_>, target: RenderTarget) -> Self {
        let id = session.allocate();
        let mut writer = ContentWriter {
            id,
            target,
            buf: String::new(),
            stack: StateStack::new(GraphicsState::default()),
            resources: ResourceTable::new(),
            mode: StreamMode::Graphics,
            indent: session.options.indent,
            annotate: session.options.annotate_debug_comments,
        };
        crate::log::debug!(id = id.0, ?target, depth = session.depth(), "content stream started");
        writer.push_state();
        if let RenderTarget::Page { height, .. } = target {
            let s = defaults::UNITS_TO_POINTS;
            writer.transform(Matrix::new(s, 0.0, 0.0, -s, 0.0, height * s));
        }
        writer
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn target(&self) -> RenderTarget {
        self.target
    }

    pub fn state(&self) -> &GraphicsState {
        self.stack.current()
    }

    pub fn stack_mut(&mut self) -> &mut StateStack {
        &mut self.stack
    }

    /// Current user space to stream base space
    pub fn transform_matrix(&self) -> Matrix {
        self.stack.current().transform
    }

    pub fn mode(&self) -> StreamMode {
        self.mode
    }

    /// Number of saves currently open, the initial one included
    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    pub fn resources(&self) -> &ResourceTable {
        &self.resources
    }

    /// Resource name of `id`, interned on first use
    pub fn resource(&mut self, category: ResourceCategory, id: ObjectId) -> String {
        self.resources.intern(category, id)
    }

    /// Text written so far
    pub fn content(&self) -> &str {
        &self.buf
    }

    fn line(&mut self, text: &str) {
        if self.indent {
            let mut level = self.stack.depth().saturating_sub(1);
            if self.mode == StreamMode::Text {
                level += 1;
            }
            for _ in 0..level * defaults::INDENT {
                self.buf.push(' ');
            }
        }
        self.buf.push_str(text);
        self.buf.push('\n');
    }

    /// Graphics operator, closes an open text object first
    pub fn op(&mut self, text: &str) {
        self.end_text();
        self.line(text);
    }

    /// Text operator, opens a text object first
    pub fn text_op(&mut self, text: &str) {
        self.begin_text();
        self.line(text);
    }

    /// Operator legal in both modes (colors, line style, `gs`, text state)
    fn state_op(&mut self, text: &str) {
        self.line(text);
    }

    /// `% text` line, only written with debug annotation on
    pub fn comment(&mut self, text: &str) {
        if self.annotate {
            let text: String = text
                .chars()
                .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
                .collect();
            self.line(&format!("% {text}"));
        }
    }

    pub fn begin_text(&mut self) {
        if self.mode == StreamMode::Graphics {
            self.line("BT");
            self.mode = StreamMode::Text;
        }
    }

    pub fn end_text(&mut self) {
        if self.mode == StreamMode::Text {
            self.mode = StreamMode::Graphics;
            self.line("ET");
        }
    }

    /// `q`
    pub fn push_state(&mut self) {
        self.op("q");
        self.stack.push();
    }

    /// `Q`
    pub fn pop_state(&mut self) -> Result<(), RenderError> {
        self.end_text();
        self.stack.pop()?;
        self.line("Q");
        Ok(())
    }

    /// `cm`, skipped for the identity
    pub fn transform(&mut self, m: Matrix) {
        if m.is_identity() {
            return;
        }
        self.op(&format!("{} cm", coords(&m.to_array())));
        self.stack.multiply_transform(m);
    }

    pub fn set_fill_color(&mut self, c: Color) {
        let op = format!("{} {} {} rg", color(c.r), color(c.g), color(c.b));
        if realize(&mut self.stack.current_mut().fill, &op) {
            self.state_op(&op);
        }
    }

    pub fn set_stroke_color(&mut self, c: Color) {
        let op = format!("{} {} {} RG", color(c.r), color(c.g), color(c.b));
        if realize(&mut self.stack.current_mut().stroke, &op) {
            self.state_op(&op);
        }
    }

    /// Gray fill, used inside luminosity masks
    pub fn set_fill_gray(&mut self, gray: f64) {
        let op = format!("{} g", color(gray));
        if realize(&mut self.stack.current_mut().fill, &op) {
            self.state_op(&op);
        }
    }

    pub fn set_fill_pattern(&mut self, pattern: &str) {
        let op = format!("/Pattern cs /{pattern} scn");
        if realize(&mut self.stack.current_mut().fill, &op) {
            self.state_op(&op);
        }
    }

    pub fn set_stroke_pattern(&mut self, pattern: &str) {
        let op = format!("/Pattern CS /{pattern} SCN");
        if realize(&mut self.stack.current_mut().stroke, &op) {
            self.state_op(&op);
        }
    }

    /// `/Gs0 gs`
    pub fn set_ext_gstate(&mut self, id: ObjectId) {
        let name = self.resource(ResourceCategory::ExtGState, id);
        let op = format!("/{name} gs");
        if realize(&mut self.stack.current_mut().ext_gstate, &op) {
            self.state_op(&op);
        }
    }

    pub fn set_line_style(&mut self, style: &LineStyle) {
        let ops = [
            format!("{} w", coord(style.width)),
            format!("{} J", style.cap),
            format!("{} j", style.join),
            format!("{} M", coord(style.miter_limit)),
            format!("[{}] {} d", coords(&style.dash), coord(style.dash_phase)),
        ];
        for (i, op) in ops.iter().enumerate() {
            let line = &mut self.stack.current_mut().line;
            let slot = match i {
                0 => &mut line.width,
                1 => &mut line.cap,
                2 => &mut line.join,
                3 => &mut line.miter,
                _ => &mut line.dash,
            };
            if realize(slot, op) {
                self.state_op(op);
            }
        }
    }

    /// Only the width, for text stroking
    pub fn set_line_width(&mut self, width: f64) {
        let op = format!("{} w", coord(width));
        if realize(&mut self.stack.current_mut().line.width, &op) {
            self.state_op(&op);
        }
    }

    /// `/F0 12 Tf`
    pub fn set_font(&mut self, font: ObjectId, size: f64) {
        let name = self.resource(ResourceCategory::Font, font);
        let op = format!("/{name} {} Tf", coord(size));
        if realize(&mut self.stack.current_mut().font, &op) {
            self.state_op(&op);
        }
    }

    /// `Tr`
    pub fn set_text_mode(&mut self, mode: u8) {
        let state = self.stack.current_mut();
        if state.text_mode != Some(mode) {
            state.text_mode = Some(mode);
            self.state_op(&format!("{mode} Tr"));
        }
    }

    pub fn move_to(&mut self, p: DVec2) {
        self.op(&format!("{} {} m", coord(p.x), coord(p.y)));
    }

    pub fn line_to(&mut self, p: DVec2) {
        self.op(&format!("{} {} l", coord(p.x), coord(p.y)));
    }

    pub fn curve_to(&mut self, c1: DVec2, c2: DVec2, p: DVec2) {
        self.op(&format!(
            "{} c",
            coords(&[c1.x, c1.y, c2.x, c2.y, p.x, p.y])
        ));
    }

    pub fn rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.op(&format!("{} re", coords(&[x, y, w, h])));
    }

    pub fn close_path(&mut self) {
        self.op("h");
    }

    /// `/Im0 Do` or `/Fm0 Do`
    pub fn draw_xobject(&mut self, category: ResourceCategory, id: ObjectId) {
        let name = self.resource(category, id);
        self.op(&format!("/{name} Do"));
    }

    /// `/Sh0 sh`
    pub fn paint_shading(&mut self, id: ObjectId) {
        let name = self.resource(ResourceCategory::Shading, id);
        self.op(&format!("/{name} sh"));
    }

    /// Close the stream and register it with the document.
    ///
    /// The initial save is restored here; any other save still open is a
    /// structural imbalance.
    pub fn finish(
        mut self,
        session: &mut RenderSession<'_>,
    ) -> Result<FinishedStream, RenderError> {
        self.end_text();
        let open = self.stack.depth();
        if open != 1 {
            return Err(RenderError::StructuralImbalance {
                depth: open.saturating_sub(1),
            });
        }
        self.pop_state()?;

        let resources = self.resources.to_dict();
        let length = self.buf.len();
        let mut dict = match self.target {
            RenderTarget::Page { .. } => Dict::new(),
            RenderTarget::Form { bbox, matrix } => form_dict(bbox, matrix, &resources),
            RenderTarget::Group { bbox } => form_dict(bbox, None, &resources).with(
                "Group",
                Dict::new()
                    .with("Type", PdfObject::name("Group"))
                    .with("S", PdfObject::name("Transparency")),
            ),
            RenderTarget::SoftMask { bbox } => form_dict(bbox, None, &resources).with(
                "Group",
                Dict::new()
                    .with("Type", PdfObject::name("Group"))
                    .with("S", PdfObject::name("Transparency"))
                    .with("CS", PdfObject::name("DeviceGray")),
            ),
        };
        dict.set("Length", length as i64);

        crate::log::debug!(
            id = self.id.0,
            length,
            target = ?self.target,
            "content stream finished"
        );
        session.register_as(
            self.id,
            PdfObject::Stream {
                dict,
                data: self.buf.into_bytes(),
            },
        );
        Ok(FinishedStream {
            id: self.id,
            resources,
            length,
        })
    }
}

fn form_dict(bbox: Rect, matrix: Option<Matrix>, resources: &Dict) -> Dict {
    let mut dict = Dict::new()
        .with("Type", PdfObject::name("XObject"))
        .with("Subtype", PdfObject::name("Form"))
        .with("BBox", PdfObject::reals(&bbox.to_array()));
    if let Some(m) = matrix {
        dict.set("Matrix", PdfObject::reals(&m.to_array()));
    }
    dict.with("Resources", resources.clone())
}
