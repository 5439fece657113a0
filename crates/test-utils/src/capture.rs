//! Span capture for asserting on the spans a store operation emits.

use std::{
    fmt,
    sync::{Arc, Mutex},
};

use tracing::{
    Subscriber,
    field::{Field, Visit},
    span::{Attributes, Id},
};
use tracing_subscriber::{
    Layer,
    layer::{Context, SubscriberExt},
    registry::LookupSpan,
};

/// A span recorded by [`SpanCapture`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedSpan {
    /// Span name, e.g. `entkv.store`.
    pub name: &'static str,
    /// Name of the parent span, if any.
    pub parent: Option<&'static str>,
    /// Fields recorded at creation, rendered as strings.
    pub fields: Vec<(&'static str, String)>,
}

impl CapturedSpan {
    /// Value of the field `name`, if it was recorded.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.iter().find(|(field, _)| *field == name).map(|(_, value)| value.as_str())
    }
}

/// Layer recording every span created while it is installed.
#[derive(Debug, Clone, Default)]
pub struct SpanCapture {
    spans: Arc<Mutex<Vec<CapturedSpan>>>,
}

impl SpanCapture {
    /// Creates an empty capture.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spans recorded so far, in creation order.
    pub fn spans(&self) -> Vec<CapturedSpan> {
        self.spans.lock().map(|spans| spans.clone()).unwrap_or_default()
    }
}

impl<S> Layer<S> for SpanCapture
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut fields = FieldVisitor::default();
        attrs.record(&mut fields);
        let parent = ctx.span(id).and_then(|span| span.parent()).map(|parent| parent.name());

        if let Ok(mut spans) = self.spans.lock() {
            spans.push(CapturedSpan { name: attrs.metadata().name(), parent, fields: fields.0 });
        }
    }
}

#[derive(Default)]
struct FieldVisitor(Vec<(&'static str, String)>);

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.push((field.name(), value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.push((field.name(), format!("{value:?}")));
    }
}

/// Runs `f` with a thread-local subscriber that records every span, returning
/// the result of `f` and the recorded spans.
pub fn capture_spans<R>(f: impl FnOnce() -> R) -> (R, Vec<CapturedSpan>) {
    let capture = SpanCapture::new();
    let subscriber = tracing_subscriber::registry().with(capture.clone());
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, capture.spans())
}
