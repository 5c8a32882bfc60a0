use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, registry};
use tracing_tree::HierarchicalLayer;

/// Installs the global subscriber. The filter comes from `RUST_LOG` and
/// defaults to `info`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = registry()
        .with(filter)
        .with(
            HierarchicalLayer::default()
                .with_writer(std::io::stderr)
                .with_indent_lines(true)
                .with_targets(true)
                .with_deferred_spans(true)
                .with_span_retrace(true),
        )
        .try_init();
}

/// Runs `f` inside a trace-level span named after the operation.
pub fn trace_misc<T>(desc: &'static str, f: impl FnOnce() -> T) -> T {
    let span = tracing::trace_span!("misc", op = desc);
    let _guard = span.enter();
    f()
}
