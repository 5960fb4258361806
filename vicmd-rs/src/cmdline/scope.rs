//! Conditional scope stack for `:if`/`:elseif`/`:else`/`:endif`.
//!
//! Each script, sourced file or top-level line runs between
//! [`ScopeStack::scope_start`] and [`ScopeStack::scope_finish`]; the guard
//! frame pushed by `scope_start` is never popped by control commands, so an
//! unbalanced block in an inner scope cannot leak into the outer one.

use thiserror::Error;
use tracing::trace;

/// One frame of the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IfFrame {
    /// Boundary of one execution scope.
    ScopeGuard,
    /// No branch taken yet.
    BeforeMatch,
    /// Inside the branch being executed.
    Match,
    /// A branch was already taken; remaining `elseif`s are skipped.
    AfterMatch,
    /// Inside an `else` reached because nothing matched.
    Else,
    /// Inside an `else` after some branch matched.
    Finish,
}

/// Role of a command in conditional blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    If,
    ElseIf,
    Else,
    EndIf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScopeError {
    #[error("Misplaced :{0}")]
    Misplaced(&'static str),
    #[error("Missing :endif")]
    MissingEndif,
}

// ── ScopeStack ────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone)]
pub struct ScopeStack {
    frames: Vec<IfFrame>,
    /// `if`s opened inside a branch that is being skipped.
    skipped_ifs: usize,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scope_start(&mut self) {
        self.frames.push(IfFrame::ScopeGuard);
    }

    /// Close the innermost scope.  Open `if` blocks are discarded and
    /// reported.
    pub fn scope_finish(&mut self) -> Result<(), ScopeError> {
        self.skipped_ifs = 0;
        let unterminated = !self.at_boundary();
        self.unwind();
        self.frames.pop();
        if unterminated {
            Err(ScopeError::MissingEndif)
        } else {
            Ok(())
        }
    }

    /// Drop every `if` frame of the innermost scope, leaving its guard.
    pub fn scope_escape(&mut self) {
        self.skipped_ifs = 0;
        self.unwind();
    }

    pub fn enter_if(&mut self, cond: bool) {
        let frame = if cond { IfFrame::Match } else { IfFrame::BeforeMatch };
        trace!(?frame, "enter if");
        self.frames.push(frame);
    }

    /// Whether an `elseif` at this point needs its condition.  Conditions of
    /// branches that cannot be taken are never evaluated.
    pub fn wants_condition(&self) -> bool {
        self.frames.last() == Some(&IfFrame::BeforeMatch)
    }

    pub fn enter_elseif(&mut self, cond: bool) -> Result<(), ScopeError> {
        let top = self.top_mut("elseif")?;
        *top = match *top {
            IfFrame::BeforeMatch if cond => IfFrame::Match,
            IfFrame::BeforeMatch => IfFrame::BeforeMatch,
            IfFrame::Match | IfFrame::AfterMatch => IfFrame::AfterMatch,
            IfFrame::Else | IfFrame::Finish | IfFrame::ScopeGuard => {
                return Err(ScopeError::Misplaced("elseif"))
            }
        };
        trace!(frame = ?*top, "enter elseif");
        Ok(())
    }

    pub fn enter_else(&mut self) -> Result<(), ScopeError> {
        let top = self.top_mut("else")?;
        *top = match *top {
            IfFrame::BeforeMatch => IfFrame::Else,
            IfFrame::Match | IfFrame::AfterMatch => IfFrame::Finish,
            IfFrame::Else | IfFrame::Finish | IfFrame::ScopeGuard => {
                return Err(ScopeError::Misplaced("else"))
            }
        };
        trace!(frame = ?*top, "enter else");
        Ok(())
    }

    pub fn leave_endif(&mut self) -> Result<(), ScopeError> {
        self.top_mut("endif")?;
        self.frames.pop();
        Ok(())
    }

    /// True when commands at this point should run.
    pub fn is_reachable(&self) -> bool {
        matches!(
            self.frames.last(),
            None | Some(IfFrame::ScopeGuard | IfFrame::Match | IfFrame::Else)
        )
    }

    /// Decide whether a command with the given control role runs.
    ///
    /// Inside a skipped branch nested `if`/`endif` pairs are only counted;
    /// `else`, `elseif` and `endif` belonging to the innermost open block are
    /// let through so their handlers can update the stack.
    pub fn gate(&mut self, control: Option<Control>) -> bool {
        if self.skipped_ifs == 0 && self.is_reachable() {
            return true;
        }
        match control {
            Some(Control::If) => {
                self.skipped_ifs += 1;
                false
            }
            Some(Control::EndIf) if self.skipped_ifs > 0 => {
                self.skipped_ifs -= 1;
                false
            }
            Some(Control::EndIf | Control::Else | Control::ElseIf) => self.skipped_ifs == 0,
            None => false,
        }
    }

    /// Number of frames, guards included.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    fn at_boundary(&self) -> bool {
        matches!(self.frames.last(), None | Some(IfFrame::ScopeGuard))
    }

    fn unwind(&mut self) {
        while matches!(self.frames.last(), Some(f) if *f != IfFrame::ScopeGuard) {
            self.frames.pop();
        }
    }

    fn top_mut(&mut self, cmd: &'static str) -> Result<&mut IfFrame, ScopeError> {
        match self.frames.last_mut() {
            Some(top) if *top != IfFrame::ScopeGuard => Ok(top),
            _ => Err(ScopeError::Misplaced(cmd)),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
