use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::{LookupSpan, SpanRef};

use crate::Tasks;

/// A `tracing` [`tracing_subscriber::Layer`] that maps spans and their events
/// onto a [`Tasks`] registry.
#[derive(Debug, Clone)]
pub struct ProgressLayer {
    tasks: Tasks,
}

/// Creates a [`ProgressLayer`] updating `tasks`.
pub fn progress_layer(tasks: Tasks) -> ProgressLayer {
    ProgressLayer::new(tasks)
}

impl ProgressLayer {
    /// A layer driving `tasks`. Same as [`progress_layer`].
    pub fn new(tasks: Tasks) -> Self {
        Self { tasks }
    }

    fn apply(&self, index: usize, fields: TaskFields) {
        if let Some(title) = fields.title {
            self.tasks.update_title(index, title);
        }
        if let Some(progress) = fields.progress {
            self.tasks.update_percentage(index, progress);
        }
    }
}

impl<S> Layer<S> for ProgressLayer
where S: Subscriber + for<'a> LookupSpan<'a>
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut fields = TaskFields::default();
        attrs.record(&mut fields);
        let Some(index) = fields.task else {
            return;
        };
        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(TaskIndexExt(index));
        }

        self.tasks.start(index);
        let title = fields
            .title
            .take()
            .unwrap_or_else(|| attrs.metadata().name().to_string());
        self.tasks.update_title(index, title);
        self.apply(index, fields);
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let Some(index) = ctx.span(id).and_then(|span| task_index(&span)) else {
            return;
        };
        let mut fields = TaskFields::default();
        values.record(&mut fields);
        self.apply(index, fields);
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut fields = TaskFields::default();
        event.record(&mut fields);

        let index = fields.task.or_else(|| {
            ctx.event_scope(event)
                .and_then(|mut scope| scope.find_map(|span| task_index(&span)))
        });
        if let Some(index) = index {
            self.apply(index, fields);
        }
    }

    fn on_close(&self, id: Id, ctx: Context<'_, S>) {
        if let Some(index) = ctx.span(&id).and_then(|span| task_index(&span)) {
            self.tasks.abort(index);
        }
    }
}

fn task_index<S>(span: &SpanRef<'_, S>) -> Option<usize>
where S: for<'a> LookupSpan<'a> {
    span.extensions().get::<TaskIndexExt>().map(|ext| ext.0)
}

/// Span extension recording which task a span drives.
#[derive(Debug, Clone, Copy)]
struct TaskIndexExt(usize);

/// The task-related fields of a span or event.
#[derive(Debug, Default)]
struct TaskFields {
    task: Option<usize>,
    title: Option<String>,
    progress: Option<f64>,
}

impl Visit for TaskFields {
    fn record_u64(&mut self, field: &Field, value: u64) {
        match field.name() {
            "task" => self.task = usize::try_from(value).ok(),
            "progress" => self.progress = Some(value as f64),
            _ => {}
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        match field.name() {
            "task" => self.task = usize::try_from(value).ok(),
            "progress" => self.progress = Some(value as f64),
            _ => {}
        }
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        if field.name() == "progress" {
            self.progress = Some(value);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "title" {
            self.title = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "title" {
            self.title = Some(format!("{value:?}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use tracing_subscriber::layer::SubscriberExt;

    use super::*;
    use crate::TaskPhase;

    fn with_layer(tasks: &Tasks, f: impl FnOnce()) {
        let subscriber = tracing_subscriber::registry().with(progress_layer(tasks.clone()));
        tracing::subscriber::with_default(subscriber, f);
    }

    #[test]
    fn span_drives_task_lifecycle() {
        let tasks = Tasks::new(2).unwrap();
        with_layer(&tasks, || {
            let span = tracing::info_span!("download", task = 1);
            assert!(tasks.is_running(1));
            assert_eq!(tasks.title(1).as_deref(), Some("download"));

            span.in_scope(|| tracing::info!(progress = 25.5));
            assert_eq!(tasks.percentage(1), Some(25.5));

            span.in_scope(|| tracing::info!(title = "verifying"));
            assert_eq!(tasks.title(1).as_deref(), Some("verifying"));

            drop(span);
            assert_eq!(tasks.phase(1), Some(TaskPhase::Stopped));
        });
    }

    #[test]
    fn title_field_overrides_span_name() {
        let tasks = Tasks::new(1).unwrap();
        with_layer(&tasks, || {
            let _span = tracing::info_span!("job", task = 0, title = "compile crate");
            assert_eq!(tasks.title(0).as_deref(), Some("compile crate"));
        });
    }

    #[test]
    fn recorded_progress_updates_task() {
        let tasks = Tasks::new(1).unwrap();
        with_layer(&tasks, || {
            let span = tracing::info_span!("job", task = 0, progress = tracing::field::Empty);
            span.record("progress", 80u64);
            assert_eq!(tasks.percentage(0), Some(80.0));
            span.record("progress", 100u64);
            assert_eq!(tasks.phase(0), Some(TaskPhase::Stopped));
        });
    }

    #[test]
    fn events_may_name_their_task() {
        let tasks = Tasks::new(3).unwrap();
        tasks.start(2);
        with_layer(&tasks, || {
            tracing::info!(task = 2, progress = 10);
        });
        assert_eq!(tasks.percentage(2), Some(10.0));
    }

    #[test]
    fn nested_spans_update_the_enclosing_task() {
        let tasks = Tasks::new(1).unwrap();
        with_layer(&tasks, || {
            let outer = tracing::info_span!("outer", task = 0);
            let inner = tracing::info_span!(parent: &outer, "inner");
            inner.in_scope(|| tracing::info!(progress = 60.0));
            assert_eq!(tasks.percentage(0), Some(60.0));
        });
    }

    #[test]
    fn spans_without_task_are_ignored() {
        let tasks = Tasks::new(1).unwrap();
        with_layer(&tasks, || {
            let span = tracing::info_span!("unrelated");
            span.in_scope(|| tracing::info!(progress = 50.0));
        });
        assert_eq!(tasks.phase(0), Some(TaskPhase::Idle));
    }
}
