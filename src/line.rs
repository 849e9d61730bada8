//! Single-line rendering of a compiled [`Template`].
//!
//! Rendering is two passes. The first measures every chunk except the
//! flexible one; the second hands the flexible chunk whatever the console
//! width leaves over and writes each chunk padded or truncated to its width.

use crate::template::{ChunkKind, ChunkWidth, MAX_CHUNKS, Template};
use crate::width::{UnicodeWidth, WidthClassifier};

/// Byte-bounded destination for one rendered line.
///
/// Writing stops once `capacity` bytes are used.
#[derive(Debug, Clone)]
pub struct LineBuffer {
    text: String,
    capacity: usize,
}

impl LineBuffer {
    /// Sized for a console `columns` wide: four bytes per column covers any
    /// UTF-8 character.
    pub fn for_width(columns: usize) -> Self {
        let capacity = columns.saturating_mul(4);
        Self {
            text: String::with_capacity(capacity),
            capacity,
        }
    }

    /// A buffer that never fills up.
    pub fn unbounded() -> Self {
        Self {
            text: String::new(),
            capacity: usize::MAX,
        }
    }

    /// The rendered line.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Maximum bytes the line may take.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Empties the buffer, keeping its capacity.
    pub fn clear(&mut self) {
        self.text.clear();
    }

    fn push(&mut self, ch: char) -> bool {
        if self.capacity - self.text.len() < ch.len_utf8() {
            return false;
        }
        self.text.push(ch);
        true
    }
}

/// Formats a percentage with exactly two decimals, e.g. `31.00`.
pub fn format_percentage(percentage: f64) -> String {
    format!("{percentage:.2}")
}

/// Columns of a `columns` wide bar covered at `percentage`.
fn filled_columns(columns: usize, percentage: f64) -> usize {
    let filled = (columns as f64 * percentage / 100.0).floor();
    // NaN falls through `as` to 0
    filled.clamp(0.0, columns as f64) as usize
}

/// Control characters would move the cursor, so they are drawn as spaces.
fn printable(ch: char) -> char {
    if ch.is_control() { ' ' } else { ch }
}

/// Writes chunk content into a [`LineBuffer`] until either the buffer or the
/// console line is full.
struct Emitter<'a> {
    line: &'a mut LineBuffer,
    widths: &'a dyn WidthClassifier,
    columns_left: usize,
    full: bool,
}

impl Emitter<'_> {
    fn push(&mut self, ch: char, width: usize) -> bool {
        if self.full {
            return false;
        }
        if width > self.columns_left || !self.line.push(ch) {
            self.full = true;
            return false;
        }
        self.columns_left -= width;
        true
    }

    fn pad(&mut self, columns: usize) {
        for _ in 0..columns {
            if !self.push(' ', 1) {
                return;
            }
        }
    }

    /// Writes `text` into exactly `columns` columns. A wide character that
    /// would straddle the edge is dropped and replaced by padding.
    fn text(&mut self, text: &str, columns: usize) {
        let mut used = 0;
        for ch in text.chars().map(printable) {
            let width = self.widths.width(ch);
            if used + width > columns {
                break;
            }
            if !self.push(ch, width) {
                return;
            }
            used += width;
        }
        self.pad(columns - used);
    }

    fn bar(&mut self, fill: char, columns: usize, percentage: f64) {
        let fill = printable(fill);
        let filled = filled_columns(columns, percentage);
        let glyph = self.widths.width(fill).max(1);
        let mut used = 0;
        while used + glyph <= filled {
            if !self.push(fill, glyph) {
                return;
            }
            used += glyph;
        }
        self.pad(columns - used);
    }
}

impl Template {
    /// Renders one line for a task into `line`, replacing its contents.
    ///
    /// When `console_width` covers every non-flexible chunk the result is
    /// exactly `console_width` columns wide. Otherwise the flexible chunk
    /// collapses to zero and the line is cut at `console_width`, so it never
    /// wraps. Control characters are drawn as spaces.
    ///
    /// # Panics
    ///
    /// Panics if a chunk reaches emission without a resolved width, which a
    /// successfully compiled template rules out.
    pub fn render_line(
        &self, line: &mut LineBuffer, console_width: usize, title: Option<&str>, percentage: f64,
        widths: &dyn WidthClassifier,
    ) {
        line.clear();
        let title = title.unwrap_or("");
        let percent = format_percentage(percentage);

        let mut allotted = [None; MAX_CHUNKS];
        let mut taken = 0usize;
        for (slot, chunk) in allotted.iter_mut().zip(self.chunks()) {
            let width = match (chunk.width(), chunk.kind()) {
                (ChunkWidth::Flex, _) => continue,
                (ChunkWidth::Fixed(n), _) => n,
                (ChunkWidth::Natural, ChunkKind::Literal(_)) => {
                    widths.measure(self.literal(chunk).unwrap_or(""))
                }
                (ChunkWidth::Natural, ChunkKind::Title) => widths.measure(title),
                (ChunkWidth::Natural, ChunkKind::Percentage) => widths.measure(&percent),
                // bars always carry a declared width
                (ChunkWidth::Natural, ChunkKind::Bar { .. }) => 0,
            };
            *slot = Some(width);
            taken = taken.saturating_add(width);
        }

        if let Some(flex) = self.flex_index() {
            allotted[flex] = Some(console_width.saturating_sub(taken));
        }

        let mut out = Emitter {
            line,
            widths,
            columns_left: console_width,
            full: false,
        };
        for (index, chunk) in self.chunks().iter().enumerate() {
            if out.full {
                break;
            }
            let Some(columns) = allotted[index] else {
                tracing::error!(index, "chunk width unresolved at emission");
                panic!("chunk {index} has no resolved width after measuring");
            };
            match chunk.kind() {
                ChunkKind::Literal(_) => out.text(self.literal(chunk).unwrap_or(""), columns),
                ChunkKind::Title => out.text(title, columns),
                ChunkKind::Bar { fill } => out.bar(*fill, columns, percentage),
                ChunkKind::Percentage => out.text(&percent, columns),
            }
        }
    }

    /// Renders one line into a fresh string using [`UnicodeWidth`].
    pub fn line(&self, console_width: usize, title: Option<&str>, percentage: f64) -> String {
        let mut line = LineBuffer::unbounded();
        self.render_line(&mut line, console_width, title, percentage, &UnicodeWidth);
        line.text
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn template(format: &str) -> Template {
        Template::compile(format).unwrap()
    }

    #[test]
    fn canonical_line_at_forty_percent() {
        let line = template("$=t [$20b#] $p%").line(40, Some("HELLO"), 40.0);
        assert_eq!(line, "HELLO      [########            ] 40.00%");
        assert_eq!(UnicodeWidth.measure(&line), 40);
    }

    #[test]
    fn flexible_chunk_absorbs_remaining_width() {
        let t = template("$=t|$p");
        for width in [7, 8, 20, 120] {
            let line = t.line(width, Some("abc"), 5.0);
            assert_eq!(UnicodeWidth.measure(&line), width, "width {width}: {line:?}");
        }
    }

    #[test]
    fn flexible_chunk_collapses_when_console_is_too_narrow() {
        let line = template("$=t [$10b=] $p%").line(12, Some("title"), 50.0);
        assert_eq!(line, " [=====     ");
        assert!(UnicodeWidth.measure(&line) <= 12);

        let line = template("$=b# $p").line(3, None, 50.0);
        assert_eq!(line, " 50");
    }

    #[test]
    fn line_is_cut_at_console_width() {
        let t = template("$8t|$p");
        assert_eq!(t.line(5, Some("abcdefgh"), 0.0), "abcde");
        // a wide character never straddles the console edge
        assert_eq!(template("ab界").line(3, None, 0.0), "ab");
        assert_eq!(template("[$6b界]").line(4, None, 100.0), "[界");
        assert_eq!(t.line(0, Some("x"), 0.0), "");
    }

    #[test]
    fn control_characters_draw_as_spaces() {
        let t = template("$=t|");
        assert_eq!(t.line(8, Some("a\nb\r\u{1b}c"), 0.0), "a b  c |");
        assert_eq!(template("$3b\t").line(80, None, 100.0), "   ");
    }

    #[test]
    fn flexible_bar() {
        let line = template("[$=b#]").line(12, None, 50.0);
        assert_eq!(line, "[#####     ]");
    }

    #[test]
    fn fixed_widths_pad_and_truncate() {
        let t = template("$6t|$3p|");
        assert_eq!(t.line(80, Some("ab"), 7.5), "ab    |7.5|");
        assert_eq!(t.line(80, Some("abcdefgh"), 100.0), "abcdef|100|");
    }

    #[test]
    fn wide_title_is_measured_in_columns() {
        let t = template("$=t|");
        assert_eq!(t.line(6, Some("界界"), 0.0), "界界 |");
        // a wide character never straddles the edge
        assert_eq!(t.line(4, Some("界界"), 0.0), "界 |");
    }

    #[test]
    fn missing_title_renders_blank() {
        assert_eq!(template("$t[$4b*]").line(40, None, 100.0), "[****]");
        assert_eq!(template("$3t[$4b*]").line(40, None, 0.0), "   [    ]");
    }

    #[test]
    fn percentage_always_has_two_decimals() {
        assert_eq!(format_percentage(31.0), "31.00");
        assert_eq!(format_percentage(0.0), "0.00");
        assert_eq!(format_percentage(100.0), "100.00");
        assert_eq!(format_percentage(33.333), "33.33");
    }

    #[test]
    fn bar_fill_is_floored() {
        assert_eq!(filled_columns(20, 40.0), 8);
        assert_eq!(filled_columns(3, 99.9), 2);
        assert_eq!(filled_columns(10, 100.0), 10);
        assert_eq!(filled_columns(10, f64::NAN), 0);
    }

    #[test]
    fn wide_fill_glyph_keeps_bar_width() {
        let line = template("[$5b界]").line(80, None, 100.0);
        assert_eq!(line, "[界界 ]");
        assert_eq!(UnicodeWidth.measure(&line), 7);
    }

    #[test]
    fn writing_stops_when_buffer_is_full() {
        let t = template("$=t [$20b#] $p%");
        let mut line = LineBuffer::for_width(2);
        t.render_line(&mut line, 40, Some("HELLO"), 40.0, &UnicodeWidth);
        assert_eq!(line.as_str(), "HELLO   ");
        assert_eq!(line.capacity(), 8);
    }

    #[test]
    fn rendering_replaces_previous_content() {
        let t = template("$p");
        let mut line = LineBuffer::for_width(10);
        t.render_line(&mut line, 10, None, 1.0, &UnicodeWidth);
        t.render_line(&mut line, 10, None, 2.0, &UnicodeWidth);
        assert_eq!(line.as_str(), "2.00");
    }
}
