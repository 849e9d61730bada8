#![doc = include_str!("../README.md")]

pub(crate) mod console;
pub(crate) mod error;
pub(crate) mod event;
pub(crate) mod line;
pub(crate) mod progress;
pub(crate) mod sink;
pub(crate) mod task;
pub mod template;
pub(crate) mod width;

#[cfg(feature = "tracing")]
pub(crate) mod tracing;


/// Re-exports of all public types and traits.
pub mod prelude {
    pub use crate::console::{
        ConsoleWidth, DEFAULT_CONSOLE_WIDTH, FixedWidth, Pacer, TerminalWidth, ThreadSleep,
    };
    pub use crate::error::{CompileError, DirectiveError};
    pub use crate::event::{EventKind, Subscriber};
    pub use crate::line::{LineBuffer, format_percentage};
    pub use crate::progress::{DEFAULT_WIDTH_PROBE_INTERVAL, Progress};
    pub use crate::sink::{AnsiSink, OutputSink};
    pub use crate::task::{TaskPhase, Tasks};
    pub use crate::template::{ChunkKind, ChunkWidth, DisplayChunk, MAX_CHUNKS, Template};
    #[cfg(feature = "tracing")]
    pub use crate::tracing::{ProgressLayer, progress_layer};
    pub use crate::width::{UnicodeWidth, WidthClassifier};
}

pub use crate::prelude::*;
