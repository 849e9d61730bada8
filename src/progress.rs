use std::io::Stdout;

use crate::console::{ConsoleWidth, DEFAULT_CONSOLE_WIDTH, Pacer, TerminalWidth, ThreadSleep};
use crate::error::CompileError;
use crate::event::EventKind;
use crate::line::LineBuffer;
use crate::sink::{AnsiSink, OutputSink};
use crate::task::{TaskPhase, Tasks};
use crate::template::Template;
use crate::width::{UnicodeWidth, WidthClassifier};

/// Frames between console width queries.
pub const DEFAULT_WIDTH_PROBE_INTERVAL: usize = 10;

/// Draws every task as one template-formatted line and redraws them in place
/// each frame.
///
/// ```rust,ignore
/// let mut progress = Progress::new("$=t [$40b#] $p%", 4)?;
/// progress.tasks().start_all();
///
/// // hand progress.tasks().clone() to producers, then:
/// while progress.still_running() {
///     progress.begin_frame();
///     progress.render()?;
///     progress.end_frame();
///     progress.wait_fps(30);
/// }
/// ```
///
/// Dropping a `Progress` aborts every task still running.
pub struct Progress<S: OutputSink = AnsiSink<Stdout>> {
    template: Template,
    tasks: Tasks,
    sink: S,
    console: Box<dyn ConsoleWidth>,
    pacer: Box<dyn Pacer>,
    widths: Box<dyn WidthClassifier>,
    probe_interval: usize,
    frames_since_probe: usize,
    console_width: Option<usize>,
    line: LineBuffer,
    /// Running lines drawn last frame: how far the next frame moves up.
    frame_lines: usize,
    in_frame: bool,
    completion_reported: bool,
}

impl<S: OutputSink> std::fmt::Debug for Progress<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Progress {{")?;
        writeln!(f, "  template: {:?}", self.template)?;
        writeln!(f, "  tasks: {:?}", self.tasks)?;
        writeln!(f, "  console_width: {:?}", self.console_width)?;
        writeln!(f, "  frame_lines: {}", self.frame_lines)?;
        writeln!(f, "}}")
    }
}

impl Progress<AnsiSink<Stdout>> {
    /// Compiles `format` and allocates `task_count` idle tasks, drawing to stdout.
    ///
    /// # Errors
    ///
    /// Fails when `format` does not compile or storage cannot be allocated.
    pub fn new(format: &str, task_count: usize) -> Result<Self, CompileError> {
        Self::with_sink(format, task_count, AnsiSink::stdout())
    }
}

impl<S: OutputSink> Progress<S> {
    /// Like [`Progress::new`] but drawing to `sink`.
    ///
    /// # Errors
    ///
    /// Fails when `format` does not compile or storage cannot be allocated.
    pub fn with_sink(format: &str, task_count: usize, sink: S) -> Result<Self, CompileError> {
        let template = Template::compile(format)?;
        let tasks = Tasks::new(task_count)?;
        tracing::debug!(chunks = template.chunks().len(), task_count, "progress created");

        Ok(Self {
            template,
            tasks,
            sink,
            console: Box::new(TerminalWidth),
            pacer: Box::new(ThreadSleep),
            widths: Box::new(UnicodeWidth),
            probe_interval: DEFAULT_WIDTH_PROBE_INTERVAL,
            frames_since_probe: 0,
            console_width: None,
            line: LineBuffer::for_width(0),
            frame_lines: 0,
            in_frame: false,
            completion_reported: false,
        })
    }

    /// Sets where the console width comes from. Defaults to [`TerminalWidth`].
    pub fn console_width(mut self, console: impl ConsoleWidth + 'static) -> Self {
        self.console = Box::new(console);
        self
    }

    /// Sets how [`Progress::wait_ms`] blocks. Defaults to [`ThreadSleep`].
    pub fn pacer(mut self, pacer: impl Pacer + 'static) -> Self {
        self.pacer = Box::new(pacer);
        self
    }

    /// Sets how character widths are measured. Defaults to [`UnicodeWidth`].
    pub fn width_classifier(mut self, widths: impl WidthClassifier + 'static) -> Self {
        self.widths = Box::new(widths);
        self
    }

    /// Re-query the console width every `frames` frames (at least 1).
    pub fn width_probe_interval(mut self, frames: usize) -> Self {
        self.probe_interval = frames.max(1);
        self
    }

    /// The compiled format every line is drawn with.
    pub fn template(&self) -> &Template {
        &self.template
    }

    /// The task registry. Clone it to hand to producers.
    pub fn tasks(&self) -> &Tasks {
        &self.tasks
    }

    /// Where lines are drawn.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Mutable access to the sink, e.g. to print between frames.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// The width lines are currently rendered at, once known.
    pub fn current_width(&self) -> Option<usize> {
        self.console_width
    }

    /// Shorthand for [`Tasks::subscribe`].
    pub fn subscribe<F>(&self, kind: EventKind, callback: F)
    where F: Fn(&Tasks, Option<usize>) + Send + Sync + 'static {
        self.tasks.subscribe(kind, callback);
    }

    /// Ends the run: [`Progress::still_running`] returns `false` from now on.
    pub fn abort(&self) {
        self.tasks.abort_all();
    }

    /// `false` once no task is running or waiting to be drawn as stopped, or
    /// after [`Progress::abort`]. The first `false` emits
    /// [`EventKind::AllComplete`].
    ///
    /// Completion latches: tasks started afterwards do not revive the run.
    pub fn still_running(&mut self) -> bool {
        if self.tasks.is_settled() {
            self.tasks.mark_complete();
        }
        if !self.tasks.is_aborted() {
            return true;
        }
        if !self.completion_reported {
            self.completion_reported = true;
            tracing::debug!("all tasks complete");
            self.tasks.emit(EventKind::AllComplete, None);
        }
        false
    }

    /// Opens a frame, re-querying the console width when a probe is due.
    pub fn begin_frame(&mut self) {
        self.begin_frame_with_width(None);
    }

    /// Opens a frame at a caller-supplied width, skipping the console query.
    pub fn begin_frame_with_width(&mut self, console_width: Option<usize>) {
        if self.in_frame {
            tracing::trace!("frame opened twice without end_frame");
        }
        self.in_frame = true;
        self.refresh_width(console_width);
    }

    /// Closes the frame: tasks that stopped during it will not be drawn again.
    pub fn end_frame(&mut self) {
        self.in_frame = false;
        self.tasks.end_frame();
    }

    /// Redraws the task area: first tasks that stopped this frame, then every
    /// running task, one line each.
    ///
    /// The cursor moves up over last frame's running lines first, so stopped
    /// lines stay behind in the scrollback while running ones are redrawn.
    ///
    /// # Errors
    ///
    /// Propagates sink failures.
    pub fn render(&mut self) -> std::io::Result<()> {
        let width = self.ensure_width();

        let mut stopped = Vec::new();
        let mut running = Vec::new();
        for index in 0..self.tasks.len() {
            match self.tasks.phase(index) {
                Some(TaskPhase::Stopped) => stopped.push(index),
                Some(TaskPhase::Running) => running.push(index),
                _ => {}
            }
        }

        if self.frame_lines > 0 {
            self.sink.move_cursor_up(self.frame_lines)?;
        }
        for &index in stopped.iter().chain(&running) {
            self.draw_task(index, width)?;
        }
        self.frame_lines = running.len();

        self.sink.flush()
    }

    /// Draws one line in place summarizing every running task: `title` with
    /// the mean percentage. Renders 0% when nothing is running.
    ///
    /// # Errors
    ///
    /// Propagates sink failures.
    pub fn render_sum(&mut self, title: &str) -> std::io::Result<()> {
        let (sum, count) = (0..self.tasks.len())
            .filter(|&index| self.tasks.is_running(index))
            .filter_map(|index| self.tasks.percentage(index))
            .fold((0.0, 0u32), |(sum, count), p| (sum + p, count + 1));
        let mean = if count == 0 { 0.0 } else { sum / f64::from(count) };
        self.print_line(title, mean)
    }

    /// Draws one arbitrary line in place, without a trailing newline.
    ///
    /// # Errors
    ///
    /// Propagates sink failures.
    pub fn print_line(&mut self, title: &str, percentage: f64) -> std::io::Result<()> {
        let width = self.ensure_width();
        self.template
            .render_line(&mut self.line, width, Some(title), percentage, self.widths.as_ref());
        self.sink.clear_current_line()?;
        self.sink.write(self.line.as_str())?;
        self.sink.flush()
    }

    /// Runs frames at `fps` until [`Progress::still_running`] turns `false`.
    ///
    /// # Errors
    ///
    /// Stops at the first sink failure.
    pub fn render_till_complete(&mut self, fps: u32) -> std::io::Result<()> {
        while self.still_running() {
            self.begin_frame();
            self.render()?;
            self.end_frame();
            self.wait_fps(fps);
        }
        Ok(())
    }

    /// Blocks for `ms` milliseconds through the configured [`Pacer`].
    pub fn wait_ms(&mut self, ms: u64) {
        self.pacer.wait_ms(ms);
    }

    /// Waits one frame at `fps` frames per second. `0` does not wait.
    pub fn wait_fps(&mut self, fps: u32) {
        if let Some(ms) = 1000u64.checked_div(u64::from(fps)) {
            self.wait_ms(ms);
        }
    }

    fn draw_task(&mut self, index: usize, width: usize) -> std::io::Result<()> {
        let Self {
            template,
            tasks,
            line,
            widths,
            sink,
            ..
        } = self;
        let drawn = tasks.with_task(index, |task| {
            template.render_line(line, width, task.title.as_deref(), task.percentage, widths.as_ref())
        });
        if drawn.is_none() {
            return Ok(());
        }
        sink.clear_current_line()?;
        sink.write(line.as_str())?;
        sink.write("\n")
    }

    fn ensure_width(&mut self) -> usize {
        if self.console_width.is_none() {
            self.refresh_width(None);
        }
        self.console_width.unwrap_or(DEFAULT_CONSOLE_WIDTH)
    }

    /// Adopts `requested`, or queries the console when no width is known yet
    /// or the probe interval has passed. The line buffer is only reallocated
    /// when the width changes.
    fn refresh_width(&mut self, requested: Option<usize>) {
        let probe_due =
            self.console_width.is_none() || self.frames_since_probe >= self.probe_interval;
        let reported = match requested {
            Some(width) => Some(width),
            None if probe_due => {
                self.frames_since_probe = 0;
                self.console.columns()
            }
            None => None,
        };
        self.frames_since_probe += 1;

        let width = match (reported, self.console_width) {
            (Some(width), _) => width,
            (None, Some(_)) => return,
            (None, None) => {
                tracing::warn!(fallback = DEFAULT_CONSOLE_WIDTH, "console width unknown");
                DEFAULT_CONSOLE_WIDTH
            }
        };
        if self.console_width != Some(width) {
            tracing::debug!(width, "console width changed");
            self.console_width = Some(width);
            self.line = LineBuffer::for_width(width);
        }
    }
}

impl<S: OutputSink> Drop for Progress<S> {
    fn drop(&mut self) {
        self.tasks.stop_running();
    }
}
