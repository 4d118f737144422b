//! The render span and its duration field are emitted on every render.

use std::sync::{Arc, Mutex};

use tracing::Subscriber;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};
use vellum_core::data;
use vellum_runtime::{ComponentOptions, SharedTarget};

#[derive(Default)]
struct RenderTraceState {
    render_spans: usize,
    duration_records: usize,
    warnings: usize,
}

struct RenderTraceCapture {
    state: Arc<Mutex<RenderTraceState>>,
}

impl<S> Layer<S> for RenderTraceCapture
where
    S: Subscriber + for<'lookup> tracing_subscriber::registry::LookupSpan<'lookup>,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        _id: &tracing::Id,
        _ctx: Context<'_, S>,
    ) {
        if attrs.metadata().name() == "component.render" {
            self.state.lock().expect("render trace lock").render_spans += 1;
        }
    }

    fn on_record(&self, id: &tracing::Id, values: &tracing::span::Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        if span.metadata().name() != "component.render" {
            return;
        }
        struct V {
            saw: bool,
        }
        impl tracing::field::Visit for V {
            fn record_u64(&mut self, field: &tracing::field::Field, _value: u64) {
                if field.name() == "render_duration_us" {
                    self.saw = true;
                }
            }

            fn record_debug(&mut self, _field: &tracing::field::Field, _value: &dyn std::fmt::Debug) {
            }
        }
        let mut v = V { saw: false };
        values.record(&mut v);
        if v.saw {
            self.state.lock().expect("render trace lock").duration_records += 1;
        }
    }

    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == tracing::Level::WARN {
            self.state.lock().expect("render trace lock").warnings += 1;
        }
    }
}

#[test]
fn render_span_records_duration() {
    let state = Arc::new(Mutex::new(RenderTraceState::default()));
    let subscriber = tracing_subscriber::registry().with(RenderTraceCapture {
        state: Arc::clone(&state),
    });
    let _guard = tracing::subscriber::set_default(subscriber);

    let component = ComponentOptions::new()
        .data(data! { "n" => 0 })
        .template("{{ n }} {{ missing }}")
        .target(SharedTarget::new())
        .build()
        .unwrap();
    component.set("n", 1).unwrap();

    let snapshot = state.lock().expect("render trace lock");
    assert_eq!(snapshot.render_spans, 2, "mount render plus one update");
    assert_eq!(snapshot.duration_records, 2);
    assert_eq!(snapshot.warnings, 2, "one failed interpolation per render");
}
