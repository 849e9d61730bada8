//! A single summary line: the mean of every running task, redrawn in place.

use std::time::Duration;

use bar_tally::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut progress = Progress::new("$=t {$30b*} $6p%", 3)?;
    let tasks = progress.tasks().clone();
    tasks.start_all();

    let producer = std::thread::spawn(move || {
        for step in 0..=100 {
            for index in 0..tasks.len() {
                // later tasks lag behind
                let lag = 10.0 * index as f64;
                tasks.update_percentage(index, (f64::from(step) * 1.2 - lag).max(0.0));
            }
            std::thread::sleep(Duration::from_millis(25));
        }
        for index in 0..tasks.len() {
            tasks.abort(index);
        }
    });

    while progress.still_running() {
        progress.begin_frame();
        progress.render_sum("overall")?;
        progress.end_frame();
        progress.wait_fps(20);
    }
    println!();

    let _ = producer.join();
    Ok(())
}
