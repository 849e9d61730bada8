//! Format string compilation.
//!
//! A template is literal text interleaved with `$` directives:
//!
//! ```text
//! $[width]kind[extra]
//! ```
//!
//! | kind | draws                          | extra           |
//! |------|--------------------------------|-----------------|
//! | `t`  | the task title                 |                 |
//! | `p`  | the percentage, e.g. `31.00`   |                 |
//! | `b`  | a bar                          | fill character  |
//!
//! `width` is either a column count or `=`, which makes the directive take
//! whatever the rest of the line leaves over. Only one directive may use `=`,
//! and a bar must have one of the two.
//!
//! ```rust,ignore
//! let template = Template::compile("$=t [$20b#] $p%")?;
//! assert_eq!(
//!     template.line(40, Some("HELLO"), 40.0),
//!     "HELLO      [########            ] 40.00%",
//! );
//! ```

mod chunk;
mod token;

use std::str::FromStr;

pub use chunk::{ChunkKind, ChunkWidth, DisplayChunk};
use token::{DIRECTIVE_START, TokenKind};

use crate::error::{CompileError, DirectiveError};

/// Upper bound on compiled chunks per template.
pub const MAX_CHUNKS: usize = 16;

/// A compiled format string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    chunks: Vec<DisplayChunk>,
    /// Backing text for every literal chunk.
    pool: String,
    flex: Option<usize>,
}

impl Template {
    /// Compiles `format` into a template.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::InvalidDirective`] for malformed directives and
    /// [`CompileError::TooManyChunks`] when more than [`MAX_CHUNKS`] chunks are
    /// needed.
    pub fn compile(format: &str) -> Result<Self, CompileError> {
        let mut pool = String::new();
        pool.try_reserve_exact(format.len())?;
        let mut chunks = Vec::new();
        chunks.try_reserve_exact(MAX_CHUNKS)?;

        let mut compiler = Compiler {
            src: format,
            chunks,
            pool,
            pool_capacity: format.len(),
            flex: None,
        };
        compiler.run()?;

        tracing::trace!(format, chunks = compiler.chunks.len(), "template compiled");
        Ok(Self {
            chunks: compiler.chunks,
            pool: compiler.pool,
            flex: compiler.flex,
        })
    }

    /// Compiled chunks in line order.
    pub fn chunks(&self) -> &[DisplayChunk] {
        &self.chunks
    }

    /// Position of the flexible chunk, if the template has one.
    pub fn flex_index(&self) -> Option<usize> {
        self.flex
    }

    /// Text of a literal chunk. `None` for every other kind.
    pub fn literal(&self, chunk: &DisplayChunk) -> Option<&str> {
        match &chunk.kind {
            ChunkKind::Literal(range) => self.pool.get(range.clone()),
            _ => None,
        }
    }
}

impl FromStr for Template {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::compile(s)
    }
}

struct Compiler<'a> {
    src: &'a str,
    chunks: Vec<DisplayChunk>,
    pool: String,
    pool_capacity: usize,
    flex: Option<usize>,
}

impl Compiler<'_> {
    fn run(&mut self) -> Result<(), CompileError> {
        let mut pos = 0;
        let mut literal_start = None;

        while let Some(ch) = self.src[pos..].chars().next() {
            if ch == DIRECTIVE_START {
                if let Some(start) = literal_start.take() {
                    self.push_literal(start, pos)?;
                }
                pos = self.directive(pos)?;
            } else {
                literal_start.get_or_insert(pos);
                pos += ch.len_utf8();
            }
        }

        if let Some(start) = literal_start {
            self.push_literal(start, pos)?;
        }
        Ok(())
    }

    /// Parses the directive whose `$` sits at `offset` and returns the
    /// position just past it.
    fn directive(&mut self, offset: usize) -> Result<usize, CompileError> {
        let invalid = |reason| CompileError::InvalidDirective { offset, reason };

        let mut pos = offset + DIRECTIVE_START.len_utf8();
        let mut fixed = None;
        let mut flex = false;

        let letter = loop {
            let token = token::peek(&self.src[pos..]).ok_or(invalid(DirectiveError::Unterminated))?;
            pos += token.len;
            match token.kind {
                TokenKind::FlexMark => {
                    if self.flex.is_some() || flex {
                        return Err(invalid(DirectiveError::SecondFlex));
                    }
                    flex = true;
                }
                TokenKind::Number(Some(n)) => fixed = Some(n),
                TokenKind::Number(None) => return Err(invalid(DirectiveError::WidthOverflow)),
                TokenKind::Letter(letter) => break letter,
                TokenKind::DirectiveStart => {
                    return Err(invalid(DirectiveError::UnexpectedChar(DIRECTIVE_START)));
                }
                TokenKind::Other(ch) => return Err(invalid(DirectiveError::UnexpectedChar(ch))),
            }
        };

        let width = match (fixed, flex) {
            (Some(_), true) => return Err(invalid(DirectiveError::FixedAndFlex)),
            (Some(n), false) => ChunkWidth::Fixed(n),
            (None, true) => ChunkWidth::Flex,
            (None, false) => ChunkWidth::Natural,
        };

        let kind = match letter {
            't' => ChunkKind::Title,
            'p' => ChunkKind::Percentage,
            'b' => {
                if width == ChunkWidth::Natural {
                    return Err(invalid(DirectiveError::BarWithoutWidth));
                }
                let fill = self.src[pos..]
                    .chars()
                    .next()
                    .ok_or(invalid(DirectiveError::BarWithoutFill))?;
                pos += fill.len_utf8();
                ChunkKind::Bar { fill }
            }
            other => return Err(invalid(DirectiveError::UnknownKind(other))),
        };

        if width == ChunkWidth::Flex {
            self.flex = Some(self.chunks.len());
        }
        self.push(DisplayChunk { kind, width })?;
        Ok(pos)
    }

    /// Copies `src[start..end]` into the pool. Literals are disjoint slices of
    /// `src`, so they always fit a pool reserved at `src.len()`.
    fn push_literal(&mut self, start: usize, end: usize) -> Result<(), CompileError> {
        let text = &self.src[start..end];
        let begin = self.pool.len();
        if begin + text.len() > self.pool_capacity {
            return Err(CompileError::LiteralPoolFull {
                capacity: self.pool_capacity,
            });
        }
        self.pool.push_str(text);
        self.push(DisplayChunk {
            kind: ChunkKind::Literal(begin..self.pool.len()),
            width: ChunkWidth::Natural,
        })
    }

    fn push(&mut self, chunk: DisplayChunk) -> Result<(), CompileError> {
        if self.chunks.len() >= MAX_CHUNKS {
            return Err(CompileError::TooManyChunks);
        }
        self.chunks.push(chunk);
        Ok(())
    }
}
