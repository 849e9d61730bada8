//! Drive tasks from `tracing` spans.
//!
//! A span with a `task` field owns that task for its lifetime: opening it
//! starts the task, closing it aborts the task if it has not reached 100%.
//! Inside the span, events and recorded fields update it:
//!
//! | field      | effect                                      |
//! |------------|---------------------------------------------|
//! | `task`     | task index (on the span, or on an event)    |
//! | `title`    | replaces the title (span name by default)   |
//! | `progress` | sets the percentage                         |
//!
//! ```rust,ignore
//! let progress = Progress::new("$=t [$30b#] $p%", 2)?;
//! tracing_subscriber::registry()
//!     .with(progress_layer(progress.tasks().clone()))
//!     .init();
//!
//! let span = tracing::info_span!("download", task = 0, title = "fetching index");
//! let _guard = span.enter();
//! tracing::info!(progress = 50.0);
//! ```

mod layer;

pub use layer::{ProgressLayer, progress_layer};
