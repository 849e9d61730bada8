use std::collections::TryReserveError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::event::{EventBus, EventKind, Subscriber};

/// Where a task is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskPhase {
    /// Never started, or stopped and already drawn in its final state.
    Idle,
    Running,
    /// Stopped during the current frame. Drawn once more, then idle.
    Stopped,
}

#[derive(Debug, Default)]
pub(crate) struct TaskState {
    pub(crate) running: bool,
    pub(crate) title: Option<String>,
    /// Always within `0.0..=100.0`.
    pub(crate) percentage: f64,
    pub(crate) just_started: bool,
    pub(crate) just_stopped: bool,
}

impl TaskState {
    pub(crate) fn phase(&self) -> TaskPhase {
        if self.running {
            TaskPhase::Running
        } else if self.just_stopped {
            TaskPhase::Stopped
        } else {
            TaskPhase::Idle
        }
    }

    fn start(&mut self) {
        self.title = None;
        self.percentage = 0.0;
        self.running = true;
        self.just_started = true;
        self.just_stopped = false;
    }

    fn stop(&mut self) {
        self.running = false;
        self.just_started = false;
        self.just_stopped = true;
    }
}

fn clamp_percentage(percentage: f64) -> f64 {
    if percentage.is_nan() {
        return 0.0;
    }
    percentage.clamp(0.0, 100.0)
}

/// Fixed set of task slots shared between producers and the frame driver.
pub(crate) struct TaskRegistry {
    slots: Box<[Mutex<TaskState>]>,
    aborted: AtomicBool,
    events: EventBus,
}

impl std::fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "TaskRegistry {{")?;
        for (index, slot) in self.slots.iter().enumerate() {
            let task = slot.lock().unwrap_or_else(PoisonError::into_inner);
            writeln!(f, "  {index}: {:?}", *task)?;
        }
        writeln!(f, "  aborted: {}", self.aborted.load(Ordering::Relaxed))?;
        writeln!(f, "  subscribers: {:?}", self.events)?;
        writeln!(f, "}}")
    }
}

impl TaskRegistry {
    fn new(count: usize) -> Result<Self, TryReserveError> {
        let mut slots = Vec::new();
        slots.try_reserve_exact(count)?;
        slots.extend((0..count).map(|_| Mutex::default()));
        Ok(Self {
            slots: slots.into_boxed_slice(),
            aborted: AtomicBool::new(false),
            events: EventBus::default(),
        })
    }

    fn slot(&self, index: usize) -> Option<MutexGuard<'_, TaskState>> {
        self.slots
            .get(index)
            .map(|slot| slot.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Shared handle to the task registry.
///
/// Cheap to clone and safe to send to producer threads. Each index should be
/// updated by one producer at a time; different indices never contend.
/// Every call with an out-of-range index, and every update to a task that is
/// not running, is silently ignored.
///
/// ```rust,ignore
/// let tasks = progress.tasks().clone();
/// std::thread::spawn(move || {
///     tasks.start(0);
///     tasks.update_title(0, "download");
///     for step in 0..=100 {
///         tasks.update_percentage(0, f64::from(step));
///     }
/// });
/// ```
#[derive(Debug, Clone)]
pub struct Tasks {
    registry: Arc<TaskRegistry>,
}

impl Tasks {
    pub(crate) fn new(count: usize) -> Result<Self, TryReserveError> {
        Ok(Self {
            registry: Arc::new(TaskRegistry::new(count)?),
        })
    }

    /// Number of task slots. Fixed at construction.
    pub fn len(&self) -> usize {
        self.registry.slots.len()
    }

    /// `true` when the registry has no task slots.
    pub fn is_empty(&self) -> bool {
        self.registry.slots.is_empty()
    }

    /// (Re)starts a task: clears its title, resets it to 0% and marks it running.
    pub fn start(&self, index: usize) {
        let Some(mut task) = self.registry.slot(index) else {
            return ignored("start", index);
        };
        task.start();
        drop(task);

        tracing::debug!(index, "task started");
        self.emit(EventKind::TaskStarted, Some(index));
    }

    /// Starts every task in index order.
    pub fn start_all(&self) {
        for index in 0..self.len() {
            self.start(index);
        }
    }

    /// Stops a running task. Its title and percentage are kept so the final
    /// state is drawn once more.
    pub fn abort(&self, index: usize) {
        let Some(mut task) = self.registry.slot(index) else {
            return ignored("abort", index);
        };
        if !task.running {
            return ignored("abort", index);
        }
        task.stop();
        drop(task);

        tracing::debug!(index, "task stopped");
        self.emit(EventKind::TaskStopped, Some(index));
    }

    /// Sets a running task's percentage, clamped to `0.0..=100.0`.
    ///
    /// Reaching 100 stops the task.
    pub fn update_percentage(&self, index: usize, percentage: f64) {
        let Some(mut task) = self.registry.slot(index) else {
            return ignored("update_percentage", index);
        };
        if !task.running {
            return ignored("update_percentage", index);
        }
        let percentage = clamp_percentage(percentage);
        task.percentage = percentage;
        if percentage < 100.0 {
            return;
        }
        task.stop();
        drop(task);

        tracing::debug!(index, "task complete");
        self.emit(EventKind::TaskStopped, Some(index));
    }

    /// Replaces a running task's title.
    pub fn update_title(&self, index: usize, title: impl Into<String>) {
        let Some(mut task) = self.registry.slot(index) else {
            return ignored("update_title", index);
        };
        if !task.running {
            return ignored("update_title", index);
        }
        task.title = Some(title.into());
    }

    /// Ends the whole run. [`crate::Progress::still_running`] reports `false`
    /// from its next call on.
    pub fn abort_all(&self) {
        if !self.registry.aborted.swap(true, Ordering::AcqRel) {
            tracing::debug!("progress aborted");
        }
    }

    /// Latches the end of the run once every task has settled. Unlike
    /// [`Tasks::abort_all`] this is not an abort and is not logged as one.
    pub(crate) fn mark_complete(&self) {
        self.registry.aborted.store(true, Ordering::Release);
    }

    /// `true` once the run has ended, by [`Tasks::abort_all`] or by every task
    /// settling.
    pub fn is_aborted(&self) -> bool {
        self.registry.aborted.load(Ordering::Acquire)
    }

    /// Lifecycle phase of a task. `None` for an out-of-range index.
    pub fn phase(&self, index: usize) -> Option<TaskPhase> {
        self.with_task(index, TaskState::phase)
    }

    /// `true` when the task is in [`TaskPhase::Running`].
    pub fn is_running(&self, index: usize) -> bool {
        self.phase(index) == Some(TaskPhase::Running)
    }

    /// Last stored percentage of a task. `None` for an out-of-range index.
    pub fn percentage(&self, index: usize) -> Option<f64> {
        self.with_task(index, |task| task.percentage)
    }

    /// A copy of the task's title, if it has one.
    pub fn title(&self, index: usize) -> Option<String> {
        self.with_task(index, |task| task.title.clone()).flatten()
    }

    /// Number of tasks currently running.
    pub fn running_count(&self) -> usize {
        (0..self.len()).filter(|&index| self.is_running(index)).count()
    }

    /// `true` when no task is running or waiting to be drawn as stopped.
    pub fn is_settled(&self) -> bool {
        (0..self.len()).all(|index| self.phase(index) == Some(TaskPhase::Idle))
    }

    /// Installs `callback` for `kind`, replacing any previous one.
    ///
    /// Callbacks run on whichever thread caused the event, with no registry
    /// lock held, so they may call back into `Tasks`.
    pub fn subscribe<F>(&self, kind: EventKind, callback: F)
    where F: Fn(&Tasks, Option<usize>) + Send + Sync + 'static {
        let subscriber: Subscriber = Arc::new(callback);
        self.registry.events.subscribe(kind, subscriber);
    }

    /// Removes the callback for `kind`. Returns `true` if there was one.
    pub fn unsubscribe(&self, kind: EventKind) -> bool {
        self.registry.events.unsubscribe(kind).is_some()
    }

    pub(crate) fn emit(&self, kind: EventKind, index: Option<usize>) {
        self.registry.events.emit(self, kind, index);
    }

    pub(crate) fn with_task<T>(&self, index: usize, f: impl FnOnce(&TaskState) -> T) -> Option<T> {
        self.registry.slot(index).map(|task| f(&task))
    }

    /// Closes the transient one-frame window of every task.
    pub(crate) fn end_frame(&self) {
        for slot in self.registry.slots.iter() {
            let mut task = slot.lock().unwrap_or_else(PoisonError::into_inner);
            task.just_started = false;
            task.just_stopped = false;
        }
    }

    /// Aborts every running task, firing one `TaskStopped` per task.
    pub(crate) fn stop_running(&self) {
        for index in 0..self.len() {
            self.abort(index);
        }
    }
}

fn ignored(operation: &'static str, index: usize) {
    tracing::trace!(operation, index, "ignored: index out of range or task not running");
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn recorder(tasks: &Tasks) -> Arc<Mutex<Vec<(EventKind, Option<usize>)>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        for kind in [EventKind::TaskStarted, EventKind::TaskStopped, EventKind::AllComplete] {
            let log = log.clone();
            tasks.subscribe(kind, move |_, index| log.lock().unwrap().push((kind, index)));
        }
        log
    }

    #[test]
    fn start_resets_the_task() {
        let tasks = Tasks::new(1).unwrap();
        tasks.start(0);
        tasks.update_title(0, "first");
        tasks.update_percentage(0, 60.0);
        tasks.abort(0);

        tasks.start(0);
        assert_eq!(tasks.phase(0), Some(TaskPhase::Running));
        assert_eq!(tasks.title(0), None);
        assert_eq!(tasks.percentage(0), Some(0.0));
    }

    #[test]
    fn percentage_is_clamped() {
        let tasks = Tasks::new(1).unwrap();
        let log = recorder(&tasks);
        tasks.start(0);

        tasks.update_percentage(0, -5.0);
        assert_eq!(tasks.percentage(0), Some(0.0));
        tasks.update_percentage(0, f64::NAN);
        assert_eq!(tasks.percentage(0), Some(0.0));

        tasks.update_percentage(0, 150.0);
        assert_eq!(tasks.percentage(0), Some(100.0));
        assert_eq!(tasks.phase(0), Some(TaskPhase::Stopped));

        // further updates are ignored once stopped
        tasks.update_percentage(0, 150.0);
        let stops = log
            .lock()
            .unwrap()
            .iter()
            .filter(|(kind, _)| *kind == EventKind::TaskStopped)
            .count();
        assert_eq!(stops, 1);
    }

    #[test]
    fn abort_keeps_final_state() {
        let tasks = Tasks::new(2).unwrap();
        tasks.start(1);
        tasks.update_title(1, "upload");
        tasks.update_percentage(1, 42.5);
        tasks.abort(1);

        assert_eq!(tasks.phase(1), Some(TaskPhase::Stopped));
        assert_eq!(tasks.title(1).as_deref(), Some("upload"));
        assert_eq!(tasks.percentage(1), Some(42.5));

        tasks.end_frame();
        assert_eq!(tasks.phase(1), Some(TaskPhase::Idle));
        assert!(tasks.is_settled());
    }

    #[test]
    fn updates_to_idle_tasks_are_ignored() {
        let tasks = Tasks::new(1).unwrap();
        let log = recorder(&tasks);
        tasks.update_title(0, "nope");
        tasks.update_percentage(0, 50.0);
        tasks.abort(0);

        assert_eq!(tasks.title(0), None);
        assert_eq!(tasks.percentage(0), Some(0.0));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn out_of_range_index_is_a_no_op() {
        let tasks = Tasks::new(2).unwrap();
        let log = recorder(&tasks);
        tasks.start(2);
        tasks.abort(7);
        tasks.update_title(2, "x");
        tasks.update_percentage(usize::MAX, 10.0);

        assert_eq!(tasks.phase(2), None);
        assert_eq!(tasks.running_count(), 0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn title_is_replaced() {
        let tasks = Tasks::new(1).unwrap();
        tasks.start(0);
        tasks.update_title(0, "one");
        tasks.update_title(0, String::from("two"));
        assert_eq!(tasks.title(0).as_deref(), Some("two"));
    }

    #[test]
    fn events_follow_the_lifecycle() {
        let tasks = Tasks::new(3).unwrap();
        let log = recorder(&tasks);
        tasks.start_all();
        tasks.abort(1);
        tasks.update_percentage(2, 100.0);

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                (EventKind::TaskStarted, Some(0)),
                (EventKind::TaskStarted, Some(1)),
                (EventKind::TaskStarted, Some(2)),
                (EventKind::TaskStopped, Some(1)),
                (EventKind::TaskStopped, Some(2)),
            ]
        );
    }

    #[test]
    fn subscriber_can_call_back_into_tasks() {
        let tasks = Tasks::new(2).unwrap();
        // chain: when task 0 stops, start task 1
        tasks.subscribe(EventKind::TaskStopped, |tasks, index| {
            if index == Some(0) {
                tasks.start(1);
            }
        });
        tasks.start(0);
        tasks.update_percentage(0, 100.0);
        assert!(tasks.is_running(1));
    }

    #[test]
    fn unsubscribe_clears_the_slot() {
        let tasks = Tasks::new(1).unwrap();
        let log = recorder(&tasks);
        assert!(tasks.unsubscribe(EventKind::TaskStarted));
        assert!(!tasks.unsubscribe(EventKind::TaskStarted));
        tasks.start(0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn subscribing_again_replaces_the_callback() {
        let tasks = Tasks::new(1).unwrap();
        let first = Arc::new(Mutex::new(0));
        let second = Arc::new(Mutex::new(0));
        let counter = first.clone();
        tasks.subscribe(EventKind::TaskStarted, move |_, _| *counter.lock().unwrap() += 1);
        let counter = second.clone();
        tasks.subscribe(EventKind::TaskStarted, move |_, _| *counter.lock().unwrap() += 1);

        tasks.start(0);
        assert_eq!(*first.lock().unwrap(), 0);
        assert_eq!(*second.lock().unwrap(), 1);
    }

    #[test]
    fn emit_guards_the_index() {
        let tasks = Tasks::new(2).unwrap();
        let log = recorder(&tasks);
        tasks.emit(EventKind::TaskStarted, Some(5));
        tasks.emit(EventKind::AllComplete, None);
        tasks.emit(EventKind::TaskStopped, Some(1));
        assert_eq!(
            *log.lock().unwrap(),
            vec![(EventKind::AllComplete, None), (EventKind::TaskStopped, Some(1))]
        );
    }

    #[test]
    fn producers_update_their_own_index_concurrently() {
        let tasks = Tasks::new(8).unwrap();
        tasks.start_all();
        let handles: Vec<_> = (0..tasks.len())
            .map(|index| {
                let tasks = tasks.clone();
                std::thread::spawn(move || {
                    for step in 0..=100 {
                        tasks.update_title(index, format!("step {step}"));
                        tasks.update_percentage(index, f64::from(step));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        for index in 0..tasks.len() {
            assert_eq!(tasks.phase(index), Some(TaskPhase::Stopped));
            assert_eq!(tasks.percentage(index), Some(100.0));
            assert_eq!(tasks.title(index).as_deref(), Some("step 100"));
        }
    }
}
