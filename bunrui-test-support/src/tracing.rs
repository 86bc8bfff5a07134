//! Recording layer utilities for capturing spans and events in tests.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::{LookupSpan, Registry};

/// Layer that records closed spans and emitted events for later assertions.
///
/// Clones share the same buffers, so a clone can be installed on a
/// subscriber while the original is kept for inspection.
#[derive(Clone, Default)]
pub struct RecordingLayer {
    spans: Arc<Mutex<Vec<SpanRecord>>>,
    events: Arc<Mutex<Vec<EventRecord>>>,
}

impl RecordingLayer {
    /// Closed spans in completion order.
    ///
    /// # Examples
    /// ```
    /// use bunrui_test_support::tracing::RecordingLayer;
    ///
    /// let layer = RecordingLayer::default();
    /// assert!(layer.spans().is_empty());
    /// ```
    #[must_use]
    pub fn spans(&self) -> Vec<SpanRecord> {
        lock(&self.spans).clone()
    }

    /// Emitted events in emission order.
    ///
    /// # Examples
    /// ```
    /// use bunrui_test_support::tracing::RecordingLayer;
    ///
    /// let layer = RecordingLayer::default();
    /// assert!(layer.events().is_empty());
    /// ```
    #[must_use]
    pub fn events(&self) -> Vec<EventRecord> {
        lock(&self.events).clone()
    }

    /// Names of closed spans, in completion order.
    #[must_use]
    pub fn span_names(&self) -> Vec<String> {
        lock(&self.spans)
            .iter()
            .map(|span| span.name.clone())
            .collect()
    }

    /// First closed span called `name`, if any.
    #[must_use]
    pub fn find_span(&self, name: &str) -> Option<SpanRecord> {
        lock(&self.spans).iter().find(|span| span.name == name).cloned()
    }

    /// Events recorded at `level`.
    #[must_use]
    pub fn events_at(&self, level: Level) -> Vec<EventRecord> {
        lock(&self.events)
            .iter()
            .filter(|event| event.level == level)
            .cloned()
            .collect()
    }

    /// Runs `f` with this layer installed as the thread's default
    /// subscriber and returns its result.
    ///
    /// # Examples
    /// ```
    /// use bunrui_test_support::tracing::RecordingLayer;
    ///
    /// let layer = RecordingLayer::default();
    /// layer.record(|| tracing::info_span!("demo", rows = 3).in_scope(|| ()));
    /// let span = layer.find_span("demo").expect("span recorded");
    /// assert_eq!(span.field("rows"), Some("3"));
    /// ```
    pub fn record<R>(&self, f: impl FnOnce() -> R) -> R {
        let subscriber = Registry::default().with(self.clone());
        tracing::subscriber::with_default(subscriber, f)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Snapshot of a closed span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanRecord {
    /// Span name captured from the tracing metadata.
    pub name: String,
    /// Target of the span's callsite.
    pub target: String,
    /// Structured fields recorded against the span, including later
    /// `Span::record` calls.
    pub fields: HashMap<String, String>,
}

impl SpanRecord {
    /// Recorded value of `name`, rendered as text.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Snapshot of an emitted event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    /// Log level associated with the event.
    pub level: Level,
    /// Event target string extracted from the metadata.
    pub target: String,
    /// Structured fields attached to the event, including `message`.
    pub fields: HashMap<String, String>,
}

impl EventRecord {
    /// Recorded value of `name`, rendered as text.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// The event's message, when it has one.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.field("message")
    }
}

struct SpanData {
    name: String,
    target: String,
    fields: HashMap<String, String>,
}

impl<S> Layer<S> for RecordingLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        id: &tracing::span::Id,
        ctx: Context<'_, S>,
    ) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut data = SpanData {
            name: attrs.metadata().name().to_owned(),
            target: attrs.metadata().target().to_owned(),
            fields: HashMap::new(),
        };
        attrs.record(&mut FieldRecorder(&mut data.fields));
        span.extensions_mut().insert(data);
    }

    fn on_record(
        &self,
        id: &tracing::span::Id,
        values: &tracing::span::Record<'_>,
        ctx: Context<'_, S>,
    ) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut extensions = span.extensions_mut();
        if let Some(data) = extensions.get_mut::<SpanData>() {
            values.record(&mut FieldRecorder(&mut data.fields));
        }
    }

    fn on_close(&self, id: tracing::span::Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(&id) else {
            return;
        };
        let Some(data) = span.extensions_mut().remove::<SpanData>() else {
            return;
        };
        lock(&self.spans).push(SpanRecord {
            name: data.name,
            target: data.target,
            fields: data.fields,
        });
    }

    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = HashMap::new();
        event.record(&mut FieldRecorder(&mut fields));
        lock(&self.events).push(EventRecord {
            level: *event.metadata().level(),
            target: event.metadata().target().to_owned(),
            fields,
        });
    }
}

struct FieldRecorder<'a>(&'a mut HashMap<String, String>);

impl FieldRecorder<'_> {
    fn insert(&mut self, field: &Field, value: String) {
        self.0.insert(field.name().to_owned(), value);
    }
}

impl Visit for FieldRecorder<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, format!("{value:?}"));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, value.to_owned());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, value.to_string());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use tracing::Level;

    use super::RecordingLayer;

    #[test]
    fn records_late_span_fields() {
        let layer = RecordingLayer::default();
        layer.record(|| {
            let span = tracing::info_span!("stage", rows = 4_u64, clusters = tracing::field::Empty);
            span.record("clusters", 2_u64);
        });
        let span = layer.find_span("stage").expect("span recorded");
        assert_eq!(span.field("rows"), Some("4"));
        assert_eq!(span.field("clusters"), Some("2"));
    }

    #[rstest]
    #[case(Level::WARN)]
    #[case(Level::INFO)]
    fn filters_events_by_level(#[case] level: Level) {
        let layer = RecordingLayer::default();
        layer.record(|| {
            tracing::warn!(reason = "fallback", "switched");
            tracing::info!(stage = "done", "finished");
        });
        let events = layer.events_at(level);
        assert_eq!(events.len(), 1);
        assert!(events[0].message().is_some());
    }

    #[test]
    fn nothing_is_recorded_outside_the_closure() {
        let layer = RecordingLayer::default();
        tracing::info!("unobserved");
        assert!(layer.events().is_empty());
        assert!(layer.span_names().is_empty());
    }
}
