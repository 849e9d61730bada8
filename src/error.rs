use std::collections::TryReserveError;

use thiserror::Error;

use crate::template::MAX_CHUNKS;

/// Why a template failed to compile.
///
/// No [`crate::Template`] or [`crate::Progress`] exists after one of these is
/// returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// A `$` directive is malformed. `offset` is the byte position of its `$`.
    #[error("invalid directive at byte {offset}: {reason}")]
    InvalidDirective {
        offset: usize,
        reason: DirectiveError,
    },

    #[error("template compiles to more than {} chunks", MAX_CHUNKS)]
    TooManyChunks,

    /// Literal text outgrew its pool. The pool is reserved at the length of
    /// the format string, so [`crate::Template::compile`] never returns this
    /// for a format it accepted the memory for.
    #[error("literal text exceeds the {capacity} byte pool")]
    LiteralPoolFull { capacity: usize },

    #[error("failed to allocate template storage: {0}")]
    Allocation(#[from] TryReserveError),
}

impl CompileError {
    /// Returns `true` for the chunk-count and literal-pool limits.
    pub fn is_capacity_exceeded(&self) -> bool {
        matches!(self, Self::TooManyChunks | Self::LiteralPoolFull { .. })
    }

    /// Returns `true` when the format string itself is malformed.
    pub fn is_invalid_directive(&self) -> bool {
        matches!(self, Self::InvalidDirective { .. })
    }
}

/// The specific grammar rule a directive broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DirectiveError {
    #[error("unknown directive kind `{0}`")]
    UnknownKind(char),

    #[error("format ended before a directive kind")]
    Unterminated,

    #[error("unexpected `{0}` inside directive")]
    UnexpectedChar(char),

    #[error("a directive cannot be both fixed-width and flexible")]
    FixedAndFlex,

    #[error("only one flexible directive is allowed")]
    SecondFlex,

    #[error("a bar needs a fixed width or `=`")]
    BarWithoutWidth,

    #[error("a bar needs a fill character")]
    BarWithoutFill,

    #[error("directive width does not fit in usize")]
    WidthOverflow,
}
