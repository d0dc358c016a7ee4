//! Graphics state snapshots and the save/restore stack

use crate::errors::RenderError;
use crate::types::{Matrix, Opacity};

/// Line style operators last written in the current state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RealizedLine {
    pub width: Option<String>,
    pub cap: Option<String>,
    pub join: Option<String>,
    pub miter: Option<String>,
    pub dash: Option<String>,
}

/// Value snapshot of everything a content stream has established so far.
///
/// The realized fields hold the exact operator text last written, so a
/// state change is skipped when it would write the same text again.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphicsState {
    /// Accumulated transform from user space to the stream's base space
    pub transform: Matrix,
    /// Accumulated element opacity
    pub opacity: Opacity,
    pub fill: Option<String>,
    pub stroke: Option<String>,
    pub line: RealizedLine,
    pub ext_gstate: Option<String>,
    /// Font selection (`/F0 12 Tf`)
    pub font: Option<String>,
    /// Text rendering mode (`Tr` operand)
    pub text_mode: Option<u8>,
    /// Stack level, used for indentation
    pub depth: usize,
}

/// Record `op` in `slot`, returning whether it differs from what was there
pub(crate) fn realize(slot: &mut Option<String>, op: &str) -> bool {
    if slot.as_deref() == Some(op) {
        false
    } else {
        *slot = Some(op.to_string());
        true
    }
}

/// Graphics state stack mirroring the `q`/`Q` nesting of a stream
#[derive(Debug, Clone, Default)]
pub struct StateStack {
    current: GraphicsState,
    saved: Vec<GraphicsState>,
}

impl StateStack {
    pub fn new(initial: GraphicsState) -> Self {
        StateStack {
            current: initial,
            saved: Vec::new(),
        }
    }

    pub fn current(&self) -> &GraphicsState {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut GraphicsState {
        &mut self.current
    }

    /// Number of open saves
    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    /// Save a snapshot of the current state
    pub fn push(&mut self) {
        self.saved.push(self.current.clone());
        self.current.depth = self.saved.len();
    }

    /// Restore the snapshot taken by the matching `push`
    pub fn pop(&mut self) -> Result<(), RenderError> {
        match self.saved.pop() {
            Some(previous) => {
                self.current = previous;
                Ok(())
            }
            None => Err(RenderError::StructuralImbalance { depth: 0 }),
        }
    }

    /// Prepend `m` to the accumulated transform and return the result
    pub fn multiply_transform(&mut self, m: Matrix) -> Matrix {
        self.current.transform = self.current.transform.prepend(m);
        self.current.transform
    }

    /// Multiply the accumulated opacity by `o`, which must lie in `[0, 1]`
    pub fn multiply_opacity(&mut self, o: f64) -> Result<Opacity, RenderError> {
        let o = Opacity::try_new(o)
            .map_err(|e| RenderError::invalid(format!("opacity {o}: {e}")))?;
        self.current.opacity = self.current.opacity.times(o);
        Ok(self.current.opacity)
    }
}
