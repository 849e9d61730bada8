//! Async producers on tokio, frames drawn from a blocking task.
//!
//! `Tasks` is a plain `Send + Sync` handle, so async code updates it directly.
//! The frame loop blocks, so it runs on `spawn_blocking`.

use std::time::Duration;

use bar_tally::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let progress = Progress::new("$=t [$30b#] $p%", 3)?;
    let tasks = progress.tasks().clone();

    // task 2 only starts once task 0 is finished
    progress.subscribe(EventKind::TaskStopped, |tasks, index| {
        if index == Some(0) {
            tasks.start(2);
        }
    });
    tasks.start(0);
    tasks.start(1);

    let renderer = tokio::task::spawn_blocking(move || {
        let mut progress = progress;
        progress.render_till_complete(30)
    });

    let downloads: Vec<_> = [("fetch index", 15), ("fetch crates", 25)]
        .into_iter()
        .enumerate()
        .map(|(index, (title, pause))| {
            let tasks = tasks.clone();
            tokio::spawn(async move {
                tasks.update_title(index, title);
                for step in 0..=100 {
                    tasks.update_percentage(index, f64::from(step));
                    tokio::time::sleep(Duration::from_millis(pause)).await;
                }
            })
        })
        .collect();

    let chained = {
        let tasks = tasks.clone();
        tokio::spawn(async move {
            while !tasks.is_running(2) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            tasks.update_title(2, "unpack");
            for step in 0..=100 {
                tasks.update_percentage(2, f64::from(step));
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
    };

    for download in downloads {
        download.await?;
    }
    chained.await?;
    renderer.await??;
    Ok(())
}
