use std::io::{Stdout, Write};

/// Where rendered lines go.
///
/// The frame driver only ever needs relative cursor movement: it moves up
/// over the previous frame, clears each line and rewrites it.
pub trait OutputSink {
    fn write(&mut self, text: &str) -> std::io::Result<()>;

    fn move_cursor_up(&mut self, lines: usize) -> std::io::Result<()>;

    /// Clears the line under the cursor and returns to its first column.
    fn clear_current_line(&mut self) -> std::io::Result<()>;

    /// Called once at the end of every render.
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// [`OutputSink`] over any [`std::io::Write`] using ANSI escape sequences.
#[derive(Debug)]
pub struct AnsiSink<W: Write> {
    target: W,
}

impl AnsiSink<Stdout> {
    /// Draws to the process's standard output.
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> AnsiSink<W> {
    /// Draws to `target`.
    pub fn new(target: W) -> Self {
        Self { target }
    }

    /// The underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.target
    }

    /// Unwraps the sink, returning the underlying writer.
    pub fn into_inner(self) -> W {
        self.target
    }
}

impl<W: Write> OutputSink for AnsiSink<W> {
    fn write(&mut self, text: &str) -> std::io::Result<()> {
        self.target.write_all(text.as_bytes())
    }

    fn move_cursor_up(&mut self, lines: usize) -> std::io::Result<()> {
        if lines > 0 {
            write!(self.target, "\x1b[{lines}A")?;
        }
        Ok(())
    }

    fn clear_current_line(&mut self) -> std::io::Result<()> {
        self.target.write_all(b"\r\x1b[2K")
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.target.flush()
    }
}
