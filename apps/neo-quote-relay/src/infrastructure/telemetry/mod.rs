//! Tracing and OpenTelemetry Setup
//!
//! Wires `tracing` to the console and, when enabled, exports spans over
//! OTLP so poll cycles and connection lifecycles show up in OpenObserve
//! or any other OTLP-compatible backend.
//!
//! # Environment Variables
//!
//! - `OTEL_ENABLED`: Set to "false" to disable span export (default: true)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: http://localhost:4318)
//! - `OTEL_SERVICE_NAME`: Service name for traces (default: neo-quote-relay)
//! - `RUST_LOG`: Console filter; chatty transport crates are capped at
//!   `warn` unless the filter names them explicitly
//!
//! Export failures never stop the relay: if the OTLP exporter cannot be
//! built the process falls back to console logging and keeps going.

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Service name for OpenTelemetry traces.
const DEFAULT_SERVICE_NAME: &str = "neo-quote-relay";

/// Default OTLP endpoint.
const DEFAULT_OTLP_ENDPOINT: &str = "http://localhost:4318";

/// Transport crates whose `info` output would drown the relay's own logs.
const QUIET_DIRECTIVES: &[&str] = &["tungstenite=warn", "h2=warn", "hyper=warn", "reqwest=warn"];

/// Guard that flushes and shuts down span export when dropped.
pub struct TelemetryGuard {
    provider: Option<SdkTracerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("Failed to shut down OpenTelemetry tracer provider: {e}");
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Whether OpenTelemetry is enabled.
    pub enabled: bool,
    /// OTLP exporter endpoint.
    pub otlp_endpoint: String,
    /// Service name for traces.
    pub service_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            otlp_endpoint: DEFAULT_OTLP_ENDPOINT.to_string(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let disabled =
            std::env::var("OTEL_ENABLED").is_ok_and(|v| v.eq_ignore_ascii_case("false"));
        Self {
            enabled: !disabled,
            otlp_endpoint: std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_OTLP_ENDPOINT.to_string()),
            service_name: std::env::var("OTEL_SERVICE_NAME")
                .unwrap_or_else(|_| DEFAULT_SERVICE_NAME.to_string()),
        }
    }
}

/// Initialize telemetry from the environment.
///
/// Returns a guard that must stay alive for the life of the process; spans
/// buffered by the exporter are flushed when it drops.
#[must_use]
pub fn init() -> TelemetryGuard {
    init_with_config(TelemetryConfig::from_env())
}

/// Initialize telemetry with an explicit configuration.
#[must_use]
pub fn init_with_config(config: TelemetryConfig) -> TelemetryGuard {
    let env_filter = relay_env_filter();

    if !config.enabled {
        init_console_only(env_filter);
        return TelemetryGuard { provider: None };
    }

    let exporter = match opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&config.otlp_endpoint)
        .build()
    {
        Ok(exporter) => exporter,
        Err(e) => {
            eprintln!("Failed to create OTLP exporter: {e}, using console logging only");
            init_console_only(env_filter);
            return TelemetryGuard { provider: None };
        }
    };

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(
            opentelemetry_sdk::Resource::builder()
                .with_service_name(config.service_name.clone())
                .build(),
        )
        .build();

    let tracer = provider.tracer(config.service_name.clone());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .init();

    tracing::info!(
        service_name = %config.service_name,
        endpoint = %config.otlp_endpoint,
        "OpenTelemetry initialized"
    );

    TelemetryGuard {
        provider: Some(provider),
    }
}

/// Console filter: `RUST_LOG` when set, `info` otherwise, with transport
/// crates capped so a reconnecting socket cannot flood the output.
fn relay_env_filter() -> EnvFilter {
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    for raw in QUIET_DIRECTIVES {
        if let Ok(directive) = raw.parse() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}

fn init_console_only(env_filter: EnvFilter) {
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

// =============================================================================
// Tests
// =============================================================================
