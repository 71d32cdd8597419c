//! Symbolic math: expression trees, compilation to callable programs, and the
//! named symbols of the rod model.

pub mod compile;
pub mod expr;
pub mod syms;

pub use compile::*;
pub use expr::*;
pub use syms::*;

use thiserror::Error;

/// Errors from evaluating or compiling expressions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    /// A symbol had no value (or no argument slot).
    #[error("symbol `{0}` has no value")]
    Unbound(Symbol),

    #[error("expected {expected} arguments, got {got}")]
    Arity { expected: usize, got: usize },

    /// Stack imbalance while running a compiled program.
    #[error("malformed program")]
    Malformed,
}
