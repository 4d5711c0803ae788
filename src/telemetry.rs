//! OpenTelemetry tracing bootstrap
//!
//! [`init_tracer`] builds an OTLP/gRPC span exporter, a batching tracer
//! provider tagged with the service name, and installs it as the process-wide
//! provider. The returned [`Telemetry`] handle owns the provider: spans are
//! started through it explicitly, and [`Telemetry::shutdown`] flushes pending
//! spans exactly once, either when called or when the handle is dropped.

use crate::error::{AppError, Result};
use crate::types::TracingMode;
use opentelemetry::trace::{Status, TraceContextExt, Tracer, TracerProvider as _};
use opentelemetry::{global, Context, KeyValue};
use opentelemetry_otlp::SpanExporter;
use opentelemetry_sdk::trace::{Sampler, SdkTracer, SdkTracerProvider};
use opentelemetry_sdk::Resource;

/// Flushes and releases a tracer provider
pub trait ProviderShutdown: Send + Sync {
    fn shutdown(&self) -> Result<()>;
}

impl ProviderShutdown for SdkTracerProvider {
    fn shutdown(&self) -> Result<()> {
        SdkTracerProvider::shutdown(self)
            .map_err(|e| AppError::telemetry(format!("failed to shut down tracer provider: {}", e)))
    }
}

/// Tracer handle plus the provider it must flush on teardown
pub struct Telemetry {
    tracer: SdkTracer,
    mode: TracingMode,
    provider: Option<Box<dyn ProviderShutdown>>,
}

impl Telemetry {
    /// Wrap a tracer and the provider that produced it
    pub fn new(tracer: SdkTracer, mode: TracingMode, provider: Box<dyn ProviderShutdown>) -> Self {
        Self {
            tracer,
            mode,
            provider: Some(provider),
        }
    }

    /// Span API without any exporter behind it
    pub fn disabled(service_name: &'static str) -> Self {
        let provider = SdkTracerProvider::builder()
            .with_sampler(Sampler::AlwaysOff)
            .build();
        let tracer = provider.tracer(service_name);
        Self::new(tracer, TracingMode::Disabled, Box::new(provider))
    }

    pub fn mode(&self) -> TracingMode {
        self.mode
    }

    /// Start `name` as a child of `parent` and return the context carrying it
    pub fn start_span(&self, name: &'static str, parent: &Context) -> Context {
        let span = self.tracer.start_with_context(name, parent);
        parent.with_span(span)
    }

    /// Whether the provider has already been released
    pub fn is_shut_down(&self) -> bool {
        self.provider.is_none()
    }

    /// Flush pending spans and release the provider. Only the first call
    /// reaches the provider.
    pub fn shutdown(&mut self) -> Result<()> {
        match self.provider.take() {
            Some(provider) => provider.shutdown(),
            None => Ok(()),
        }
    }
}

impl Drop for Telemetry {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

impl std::fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Telemetry")
            .field("mode", &self.mode)
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

/// End the span carried by `cx`, marking it failed when `result` is an error
pub fn finish_span<T>(cx: &Context, result: &Result<T>) {
    let span = cx.span();
    if let Err(error) = result {
        span.set_attribute(KeyValue::new("error.category", error.category()));
        span.record_error(error);
        span.set_status(Status::error(error.to_string()));
    }
    span.end();
}

/// Build the tracing pipeline for `service_name`
pub fn init_tracer(service_name: &'static str, mode: TracingMode) -> Result<Telemetry> {
    if mode == TracingMode::Disabled {
        return Ok(Telemetry::disabled(service_name));
    }

    let exporter = new_exporter()?;
    let resource = new_resource(service_name)?;

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource)
        .build();

    global::set_tracer_provider(provider.clone());
    let tracer = provider.tracer(service_name);

    Ok(Telemetry::new(tracer, TracingMode::Enabled, Box::new(provider)))
}

/// OTLP over plaintext gRPC; endpoint comes from the standard
/// `OTEL_EXPORTER_OTLP_*` variables, defaulting to `http://localhost:4317`
fn new_exporter() -> Result<SpanExporter> {
    SpanExporter::builder()
        .with_tonic()
        .build()
        .map_err(|e| AppError::telemetry(format!("failed to initialize otel exporter: {}", e)))
}

/// SDK default attributes merged with `service.name`
fn new_resource(service_name: &'static str) -> Result<Resource> {
    if service_name.trim().is_empty() {
        return Err(AppError::telemetry(
            "failed to initialize otel provider: error merging provider resource: empty service name",
        ));
    }

    Ok(Resource::builder().with_service_name(service_name).build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::trace::{SpanKind, Status};
    use opentelemetry_sdk::trace::InMemorySpanExporter;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingShutdown(Arc<AtomicUsize>);

    impl ProviderShutdown for CountingShutdown {
        fn shutdown(&self) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn recording_telemetry() -> (Telemetry, InMemorySpanExporter) {
        let exporter = InMemorySpanExporter::default();
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(exporter.clone())
            .build();
        let tracer = provider.tracer("speedtest");
        (Telemetry::new(tracer, TracingMode::Enabled, Box::new(provider)), exporter)
    }

    #[test]
    fn test_shutdown_reaches_provider_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = SdkTracerProvider::builder().build();
        let tracer = provider.tracer("speedtest");
        let mut telemetry = Telemetry::new(
            tracer,
            TracingMode::Enabled,
            Box::new(CountingShutdown(calls.clone())),
        );

        telemetry.shutdown().unwrap();
        telemetry.shutdown().unwrap();
        assert!(telemetry.is_shut_down());
        drop(telemetry);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_shuts_down() {
        let calls = Arc::new(AtomicUsize::new(0));
        let tracer = SdkTracerProvider::builder().build().tracer("speedtest");
        let telemetry = Telemetry::new(
            tracer,
            TracingMode::Enabled,
            Box::new(CountingShutdown(calls.clone())),
        );

        drop(telemetry);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_child_spans_and_error_status() {
        let (mut telemetry, exporter) = recording_telemetry();

        let root = telemetry.start_span("speedtest", &Context::new());
        let child = telemetry.start_span("run_speed_test", &root);
        finish_span::<()>(&child, &Err(AppError::server_not_found("empty server list")));
        finish_span(&root, &Ok(()));

        let spans = exporter.get_finished_spans().unwrap();
        assert_eq!(spans.len(), 2);

        let child = spans.iter().find(|s| s.name == "run_speed_test").unwrap();
        let root = spans.iter().find(|s| s.name == "speedtest").unwrap();
        assert_eq!(child.parent_span_id, root.span_context.span_id());
        assert_eq!(child.span_kind, SpanKind::Internal);
        assert!(matches!(child.status, Status::Error { .. }));
        assert_eq!(root.status, Status::Unset);

        telemetry.shutdown().unwrap();
    }

    #[test]
    fn test_disabled_mode_is_usable() {
        let mut telemetry = init_tracer("speedtest", TracingMode::Disabled).unwrap();
        assert_eq!(telemetry.mode(), TracingMode::Disabled);

        let cx = telemetry.start_span("speedtest", &Context::new());
        finish_span(&cx, &Ok(()));
        assert!(!cx.span().span_context().is_sampled());

        telemetry.shutdown().unwrap();
        assert!(telemetry.is_shut_down());
    }

    #[test]
    fn test_empty_service_name_rejected() {
        let error = new_resource(" ").unwrap_err();
        assert_eq!(error.category(), "TELEMETRY");
        assert!(error.to_string().contains("error merging provider resource"));
    }
}
