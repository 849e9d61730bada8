use std::time::Duration;

/// Width used when the console cannot report one.
pub const DEFAULT_CONSOLE_WIDTH: usize = 80;

/// Reports the console's current column count.
pub trait ConsoleWidth: Send {
    /// `None` when the width is unknown, e.g. when output is piped.
    fn columns(&self) -> Option<usize>;
}

impl<F> ConsoleWidth for F
where F: Fn() -> Option<usize> + Send
{
    fn columns(&self) -> Option<usize> {
        self()
    }
}

/// Asks the terminal through `crossterm`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalWidth;

impl ConsoleWidth for TerminalWidth {
    fn columns(&self) -> Option<usize> {
        match crossterm::terminal::size() {
            Ok((columns, _)) if columns > 0 => Some(usize::from(columns)),
            _ => None,
        }
    }
}

/// Always the same width.
#[derive(Debug, Clone, Copy)]
pub struct FixedWidth(pub usize);

impl ConsoleWidth for FixedWidth {
    fn columns(&self) -> Option<usize> {
        Some(self.0)
    }
}

/// Blocks between frames.
pub trait Pacer: Send {
    fn wait_ms(&mut self, ms: u64);
}

impl<F> Pacer for F
where F: FnMut(u64) + Send
{
    fn wait_ms(&mut self, ms: u64) {
        self(ms)
    }
}

/// Sleeps the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleep;

impl Pacer for ThreadSleep {
    fn wait_ms(&mut self, ms: u64) {
        std::thread::sleep(Duration::from_millis(ms));
    }
}
