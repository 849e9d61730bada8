//! Tasks driven by `tracing` spans through [`ProgressLayer`].
//!
//! A span with a `task` field starts that task; `progress` and `title`
//! fields on the span or its events update it; closing the span stops it.

use std::time::Duration;

use bar_tally::*;
use tracing::info_span;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut progress = Progress::new("$=t [$40b#] $p%", 2)?;
    tracing_subscriber::registry()
        .with(progress_layer(progress.tasks().clone()))
        .init();

    let jobs: Vec<_> = [("compile", 20u64), ("test", 35)]
        .into_iter()
        .enumerate()
        .map(|(task, (name, pause))| {
            let span = info_span!("job", task, title = name, progress = tracing::field::Empty);
            std::thread::spawn(move || {
                for step in 0..100u64 {
                    span.record("progress", step);
                    std::thread::sleep(Duration::from_millis(pause));
                }
                span.in_scope(|| tracing::info!(title = "done", progress = 100u64));
            })
        })
        .collect();

    progress.render_till_complete(30)?;

    for job in jobs {
        let _ = job.join();
    }
    Ok(())
}
