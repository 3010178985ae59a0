//! Logging and tracing export settings.

use std::time::Duration;

use clap::Args;

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum LogFormat {
    /// Single-line, human-readable.
    Compact,

    /// One JSON object per event, for log shippers.
    Json,
}

#[derive(Debug, Args)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` holds no directives
    #[arg(short, long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

/// OTLP trace export. Off by default so a local run needs no collector.
#[derive(Debug, Args)]
pub struct ObservabilityConfig {
    #[arg(long, env = "OTEL_ENABLED", default_value_t = false)]
    pub otel_enabled: bool,

    /// Continue traces from an inbound `traceparent` header (requires export)
    #[arg(long, env = "OTEL_PARENT_PROPAGATION_ENABLED", default_value_t = false)]
    pub otel_parent_propagation_enabled: bool,

    /// OTLP gRPC collector endpoint
    #[arg(
        long,
        env = "OTEL_EXPORTER_OTLP_ENDPOINT",
        default_value = "http://localhost:4317"
    )]
    pub otel_exporter_otlp_endpoint: String,

    #[arg(long, env = "OTEL_EXPORTER_OTLP_TIMEOUT_SECONDS", default_value_t = 3)]
    pub otel_exporter_otlp_timeout_seconds: u64,

    #[arg(long, env = "OTEL_SERVICE_NAME", default_value = "scansehat-json")]
    pub otel_service_name: String,

    #[arg(long, env = "OTEL_SERVICE_VERSION", default_value = env!("CARGO_PKG_VERSION"))]
    pub otel_service_version: String,

    #[arg(long, env = "OTEL_DEPLOYMENT_ENVIRONMENT", default_value = "development")]
    pub otel_deployment_environment: String,

    /// Fraction of root traces sampled; clamped to [0.0, 1.0]
    #[arg(long, env = "OTEL_TRACE_SAMPLE_RATIO", default_value_t = 1.0)]
    pub otel_trace_sample_ratio: f64,

    /// Requests slower than this are logged at warn
    #[arg(long, env = "SLOW_REQUEST_THRESHOLD_MS", default_value_t = 1_000)]
    pub slow_request_threshold_ms: u64,
}

impl ObservabilityConfig {
    pub(crate) fn export_timeout(&self) -> Duration {
        Duration::from_secs(self.otel_exporter_otlp_timeout_seconds)
    }

    pub(crate) fn trace_sample_ratio(&self) -> f64 {
        self.otel_trace_sample_ratio.clamp(0.0, 1.0)
    }

    /// Parent extraction needs the global propagator, which only exists with export on.
    pub(crate) fn parent_propagation(&self) -> bool {
        self.otel_enabled && self.otel_parent_propagation_enabled
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use testresult::TestResult;

    use super::*;

    #[derive(Debug, Parser)]
    struct Harness {
        #[command(flatten)]
        observability: ObservabilityConfig,
    }

    fn parse(args: &[&str]) -> Result<ObservabilityConfig, clap::Error> {
        Harness::try_parse_from(std::iter::once("test").chain(args.iter().copied()))
            .map(|harness| harness.observability)
    }

    #[test]
    fn export_is_off_by_default() -> TestResult {
        let config = parse(&[])?;

        assert!(!config.otel_enabled, "export disabled");
        assert!(!config.parent_propagation(), "no propagation without export");
        assert_eq!(config.export_timeout(), Duration::from_secs(3));

        Ok(())
    }

    #[test]
    fn propagation_requires_export() -> TestResult {
        let without_export = parse(&["--otel-parent-propagation-enabled"])?;
        let with_export = parse(&["--otel-enabled", "--otel-parent-propagation-enabled"])?;

        assert!(!without_export.parent_propagation(), "export off");
        assert!(with_export.parent_propagation(), "export on");

        Ok(())
    }

    #[test]
    fn sample_ratio_is_clamped_to_unit_interval() -> TestResult {
        let low = parse(&["--otel-trace-sample-ratio=-0.5"])?;
        let mid = parse(&["--otel-trace-sample-ratio", "0.25"])?;
        let high = parse(&["--otel-trace-sample-ratio", "4"])?;

        assert!(low.trace_sample_ratio().abs() < f64::EPSILON, "negative clamps to 0");
        assert!((mid.trace_sample_ratio() - 0.25).abs() < f64::EPSILON, "in range is kept");
        assert!((high.trace_sample_ratio() - 1.0).abs() < f64::EPSILON, "above 1 clamps to 1");

        Ok(())
    }
}
