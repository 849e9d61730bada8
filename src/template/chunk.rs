use std::ops::Range;

/// How many columns a chunk takes on the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkWidth {
    /// Whatever the content measures.
    Natural,
    /// Exactly this many columns, padded or truncated.
    Fixed(usize),
    /// The columns left over after every other chunk is measured.
    Flex,
}

/// What a chunk draws.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkKind {
    /// Verbatim text, stored as a byte range into the template's literal pool.
    Literal(Range<usize>),
    Title,
    /// A bar filled with `fill` up to the task's percentage.
    Bar { fill: char },
    /// The percentage with two decimals, e.g. `31.00`.
    Percentage,
}

/// One compiled directive or literal run of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayChunk {
    pub(crate) kind: ChunkKind,
    pub(crate) width: ChunkWidth,
}

impl DisplayChunk {
    /// What the chunk draws.
    pub fn kind(&self) -> &ChunkKind {
        &self.kind
    }

    /// How many columns the chunk takes.
    pub fn width(&self) -> ChunkWidth {
        self.width
    }

    /// `true` for the directive marked with `=`.
    pub fn is_flex(&self) -> bool {
        self.width == ChunkWidth::Flex
    }
}
