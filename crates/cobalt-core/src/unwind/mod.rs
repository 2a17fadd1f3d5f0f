//! # Stack Unwinder
//!
//! Reconstructs the caller chain of a halted thread.
//!
//! The walk itself is delegated to the platform's stack-walk primitive (a
//! [`StackWalker`] handed out by the symbol provider). This module seeds it
//! from a register snapshot, applies the stop conditions and the depth cap,
//! and turns any fault reported by the primitive into an early end of the walk.
//!
//! Resolving a captured address to a readable description is a separate,
//! pull-based step: see [`describe_address`].

use tracing::{trace, warn};

use crate::error::Result;
use crate::symbols::{display_name, SymbolProvider};
use crate::types::{Address, ThreadContext};

/// Frame registers exchanged with the stack-walk primitive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkFrame
{
    pub pc: Address,
    pub sp: Address,
    pub fp: Address,
    pub return_address: Address,
}

impl WalkFrame
{
    /// Seed a walk from a register snapshot.
    pub fn from_context(context: &ThreadContext) -> Self
    {
        Self {
            pc: context.pc,
            sp: context.sp,
            fp: context.fp,
            return_address: Address::ZERO,
        }
    }
}

/// Platform stack-walk primitive
pub trait StackWalker
{
    /// Advance `frame` to the next frame of the walk.
    ///
    /// `context` is the walker's private copy of the register snapshot and may
    /// be updated along the way. Returns `Ok(false)` when there are no more frames.
    ///
    /// ## Errors
    ///
    /// A fault while following the frame chain (for example into unmapped
    /// memory). The unwinder treats it as the end of the walk.
    fn step(&mut self, frame: &mut WalkFrame, context: &mut ThreadContext) -> Result<bool>;
}

/// Captured call stack
///
/// Holds exactly `max_depth` slots: the captured program counters, oldest
/// call first, followed by zero-filled slots. Consumed by iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackTrace
{
    slots: Vec<Address>,
    depth: usize,
}

impl StackTrace
{
    /// Number of captured frames
    pub fn depth(&self) -> usize
    {
        self.depth
    }

    /// All slots including the zero fill
    pub fn slots(&self) -> &[Address]
    {
        &self.slots
    }

    /// Captured program counters, oldest call first
    pub fn frames(&self) -> &[Address]
    {
        &self.slots[..self.depth]
    }

    /// Consume the trace, current frame first.
    pub fn innermost_first(self) -> impl Iterator<Item = Address>
    {
        let depth = self.depth;
        self.slots.into_iter().take(depth).rev()
    }
}

impl IntoIterator for StackTrace
{
    type Item = Address;
    type IntoIter = std::iter::Take<std::vec::IntoIter<Address>>;

    /// Captured program counters, oldest call first.
    fn into_iter(self) -> Self::IntoIter
    {
        let depth = self.depth;
        self.slots.into_iter().take(depth)
    }
}

/// Walk the stack of a halted thread.
///
/// The walk works on a copy of `context`; the snapshot passed in is left
/// untouched. It stops when the walker reports no more frames, when a frame
/// has a zero program counter or frame pointer, when `max_depth` frames have
/// been captured, or when the walker faults.
pub fn capture_stack_trace(walker: &mut dyn StackWalker, context: &ThreadContext, max_depth: usize) -> StackTrace
{
    let mut copy = context.clone();
    let mut frame = WalkFrame::from_context(context);
    let mut captured = Vec::with_capacity(max_depth);

    while captured.len() < max_depth {
        match walker.step(&mut frame, &mut copy) {
            Ok(true) => {}
            Ok(false) => break,
            Err(err) => {
                warn!("stack walk ended early: {err}");
                break;
            }
        }
        if frame.fp.is_null() || frame.pc.is_null() {
            break;
        }
        trace!(pc = %frame.pc, fp = %frame.fp, "captured frame");
        captured.push(frame.pc);
    }

    let depth = captured.len();
    captured.reverse();
    captured.resize(max_depth, Address::ZERO);
    StackTrace { slots: captured, depth }
}

/// Describe a code address: function, source position and module.
///
/// Each part is looked up independently; a missing function name is left
/// out, a missing line renders ` N/A:??`, a missing module is left out.
pub fn describe_address<P>(symbols: &P, address: Address) -> String
where
    P: SymbolProvider + ?Sized,
{
    let mut text = symbols
        .symbol_from_address(address)
        .map(|hit| display_name(&hit.name))
        .unwrap_or_default();

    match symbols.line_from_address(address) {
        Some(line) => text.push_str(&format!("      #{line}")),
        None => text.push_str(" N/A:??"),
    }

    if let Some(module) = symbols.module_name(address) {
        text.push_str(&format!(" @{module}"));
    }
    text
}
