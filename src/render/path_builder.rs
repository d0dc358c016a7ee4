//! Path construction operators collected before they reach a stream.
//!
//! Geometry is first turned into a list of [`PathOp`]s so that the same path
//! can be written several times (fill pass, clip, soft mask) and inspected in
//! tests without parsing stream text.

use glam::DVec2;

use super::writer::ContentWriter;

/// One path construction operator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathOp {
    /// `m`
    MoveTo(DVec2),
    /// `l`
    LineTo(DVec2),
    /// `c`
    CurveTo(DVec2, DVec2, DVec2),
    /// `re`, origin plus size
    Rect(DVec2, DVec2),
    /// `h`
    Close,
}

/// Accumulates path operators and tracks the current point
#[derive(Debug, Clone, Default)]
pub struct PathBuilder {
    ops: Vec<PathOp>,
    current: Option<DVec2>,
}

impl PathBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn move_to(&mut self, p: DVec2) {
        self.ops.push(PathOp::MoveTo(p));
        self.current = Some(p);
    }

    pub fn line_to(&mut self, p: DVec2) {
        self.ops.push(PathOp::LineTo(p));
        self.current = Some(p);
    }

    pub fn curve_to(&mut self, c1: DVec2, c2: DVec2, p: DVec2) {
        self.ops.push(PathOp::CurveTo(c1, c2, p));
        self.current = Some(p);
    }

    pub fn rect(&mut self, origin: DVec2, size: DVec2) {
        self.ops.push(PathOp::Rect(origin, size));
        self.current = Some(origin);
    }

    pub fn close(&mut self) {
        self.ops.push(PathOp::Close);
    }

    /// Current point, if a subpath is open
    pub fn current(&self) -> Option<DVec2> {
        self.current
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn build(self) -> Vec<PathOp> {
        self.ops
    }
}

/// Write `ops` as path construction operators
pub fn write_path(writer: &mut ContentWriter, ops: &[PathOp]) {
    for op in ops {
        match *op {
            PathOp::MoveTo(p) => writer.move_to(p),
            PathOp::LineTo(p) => writer.line_to(p),
            PathOp::CurveTo(c1, c2, p) => writer.curve_to(c1, c2, p),
            PathOp::Rect(origin, size) => writer.rect(origin.x, origin.y, size.x, size.y),
            PathOp::Close => writer.close_path(),
        }
    }
}
