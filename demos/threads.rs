//! One producer thread per task, the main thread drawing frames.
//!
//! Each task stops when it reaches 100%; its final line stays in the
//! scrollback while the others keep redrawing below it.

use std::time::Duration;

use bar_tally::*;

const TASKS: usize = 4;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut progress = Progress::new("$=t [$40b#] $p%", TASKS)?;
    progress.subscribe(EventKind::AllComplete, |_, _| eprintln!("all done"));
    progress.tasks().start_all();

    let workers: Vec<_> = (0..TASKS)
        .map(|index| {
            let tasks = progress.tasks().clone();
            std::thread::spawn(move || {
                tasks.update_title(index, format!("worker {index}"));
                let pause = Duration::from_millis(10 + 15 * index as u64);
                for step in 0..=100 {
                    tasks.update_percentage(index, f64::from(step));
                    std::thread::sleep(pause);
                }
            })
        })
        .collect();

    progress.render_till_complete(30)?;

    for worker in workers {
        let _ = worker.join();
    }
    Ok(())
}
