//! Log output and optional OTLP trace export.
//!
//! Export turns on when `OTEL_EXPORTER_OTLP_ENDPOINT` is set (gRPC only).
//! Exported spans carry the workspace's public URL and the identity provider
//! host, so several deployments can share one collector.

use crate::GIT_COMMIT_HASH;
use anyhow::{Result, anyhow};
use base64ct::{Base64, Encoding};
use once_cell::sync::OnceCell;
use opentelemetry::propagation::TextMapCompositePropagator;
use opentelemetry::{KeyValue, global, trace::TracerProvider as _};
use opentelemetry_otlp::{Compression, SpanExporter, WithExportConfig, WithTonicConfig};
use opentelemetry_sdk::{
    Resource,
    propagation::{BaggagePropagator, TraceContextPropagator},
    trace::SdkTracerProvider,
};
use std::{env::var, time::Duration};
use tonic::{
    metadata::{Ascii, Binary, MetadataKey, MetadataMap, MetadataValue},
    transport::ClientTlsConfig,
};
use tracing::{Level, debug};
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};
use ulid::Ulid;
use url::Url;

const ENV_ENDPOINT: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
const ENV_HEADERS: &str = "OTEL_EXPORTER_OTLP_HEADERS";
const ENV_PROTOCOL: &str = "OTEL_EXPORTER_OTLP_PROTOCOL";
const ENV_INSTANCE_ID: &str = "OTEL_SERVICE_INSTANCE_ID";

const EXPORT_TIMEOUT: Duration = Duration::from_secs(3);

/// Targets whose warnings (failed sign-in, sign-out or session checks) are
/// shown even at the default `ERROR` verbosity.
const AUTH_TARGETS: [&str; 2] = ["stagecall::auth", "stagecall::provider"];

static TRACER_PROVIDER: OnceCell<SdkTracerProvider> = OnceCell::new();

/// Where this instance serves from.
#[derive(Clone, Debug, Default)]
pub struct Deployment {
    pub public_url: Option<String>,
    pub provider_url: Option<String>,
}

impl Deployment {
    fn resource_attributes(&self, instance_id: String) -> Vec<KeyValue> {
        let mut attributes = vec![
            KeyValue::new("service.name", env!("CARGO_PKG_NAME")),
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
            KeyValue::new("service.instance.id", instance_id),
            KeyValue::new("vcs.ref.head.revision", GIT_COMMIT_HASH),
        ];
        if let Some(public_url) = &self.public_url {
            attributes.push(KeyValue::new("stagecall.public_url", public_url.clone()));
        }
        // Host only; the provider URL may embed a project reference path.
        if let Some(host) = self
            .provider_url
            .as_deref()
            .and_then(|url| Url::parse(url).ok())
            .and_then(|url| url.host_str().map(ToString::to_string))
        {
            attributes.push(KeyValue::new("stagecall.provider.host", host));
        }
        attributes
    }
}

/// Collector settings read from the standard `OTEL_EXPORTER_OTLP_*` variables.
#[derive(Debug, PartialEq, Eq)]
struct OtlpExport {
    endpoint: String,
    /// Set for `https` endpoints.
    tls_domain: Option<String>,
    headers: Vec<(String, String)>,
}

impl OtlpExport {
    fn from_env() -> Option<Self> {
        let endpoint = var(ENV_ENDPOINT).ok().filter(|value| !value.trim().is_empty())?;

        if let Ok(protocol) = var(ENV_PROTOCOL)
            && protocol != "grpc"
        {
            debug!("{ENV_PROTOCOL}='{protocol}' ignored: only 'grpc' is supported");
        }

        let headers = var(ENV_HEADERS)
            .map(|raw| header_pairs(&raw))
            .unwrap_or_default();
        Some(Self::new(&endpoint, headers))
    }

    fn new(endpoint: &str, headers: Vec<(String, String)>) -> Self {
        let endpoint = endpoint.trim();
        let endpoint = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!("https://{}", endpoint.trim_end_matches('/'))
        };
        let tls_domain = endpoint
            .strip_prefix("https://")
            .and_then(|rest| rest.split(['/', ':']).next())
            .filter(|host| !host.is_empty())
            .map(ToString::to_string);

        Self {
            endpoint,
            tls_domain,
            headers,
        }
    }

    /// gRPC metadata; `-bin` keys carry base64 values.
    fn metadata(&self) -> Result<MetadataMap> {
        let mut metadata = MetadataMap::with_capacity(self.headers.len());

        for (name, value) in &self.headers {
            let name = name.to_ascii_lowercase();
            if name.ends_with("-bin") {
                let bytes = Base64::decode_vec(value)
                    .map_err(|e| anyhow!("failed to base64-decode value for key {name}: {e}"))?;
                let key = MetadataKey::<Binary>::from_bytes(name.as_bytes())
                    .map_err(|e| anyhow!("invalid binary metadata key {name}: {e}"))?;
                metadata.insert_bin(key, MetadataValue::from_bytes(&bytes));
            } else {
                let key = MetadataKey::<Ascii>::from_bytes(name.as_bytes())
                    .map_err(|e| anyhow!("invalid ASCII metadata key {name}: {e}"))?;
                let value = value
                    .parse::<MetadataValue<Ascii>>()
                    .map_err(|e| anyhow!("invalid ASCII metadata value for key {name}: {e}"))?;
                metadata.insert(key, value);
            }
        }

        Ok(metadata)
    }

    fn exporter(&self) -> Result<SpanExporter> {
        let mut builder = SpanExporter::builder()
            .with_tonic()
            .with_endpoint(&self.endpoint)
            .with_compression(Compression::Gzip)
            .with_timeout(EXPORT_TIMEOUT);

        if let Some(domain) = &self.tls_domain {
            builder = builder.with_tls_config(
                ClientTlsConfig::new()
                    .domain_name(domain.clone())
                    .with_native_roots(),
            );
        }

        if !self.headers.is_empty() {
            builder = builder.with_metadata(self.metadata()?);
        }

        Ok(builder.build()?)
    }
}

/// `key=value` pairs separated by commas; malformed entries are skipped.
fn header_pairs(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            let key = key.trim();
            (!key.is_empty()).then(|| (key.to_string(), value.trim().to_string()))
        })
        .collect()
}

fn tracer_provider(export: &OtlpExport, deployment: &Deployment) -> Result<SdkTracerProvider> {
    let instance_id = var(ENV_INSTANCE_ID).unwrap_or_else(|_| Ulid::new().to_string());

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(export.exporter()?)
        .with_resource(
            Resource::builder_empty()
                .with_attributes(deployment.resource_attributes(instance_id))
                .build(),
        )
        .build();

    let _ = TRACER_PROVIDER.set(provider.clone());

    global::set_tracer_provider(provider.clone());
    global::set_text_map_propagator(TextMapCompositePropagator::new(vec![
        Box::new(TraceContextPropagator::new()),
        Box::new(BaggagePropagator::new()),
    ]));

    Ok(provider)
}

fn filter(level: Level) -> Result<EnvFilter> {
    let mut filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
        .add_directive("hyper=error".parse()?)
        .add_directive("h2=error".parse()?)
        .add_directive("tokio=error".parse()?)
        .add_directive("reqwest=warn".parse()?)
        .add_directive("opentelemetry_sdk=warn".parse()?);

    if level < Level::WARN {
        for target in AUTH_TARGETS {
            filter = filter.add_directive(format!("{target}=warn").parse()?);
        }
    }

    Ok(filter)
}

/// Initialize logging and, when a collector is configured, trace export.
///
/// # Errors
///
/// Returns an error if the exporter or subscriber cannot be initialized
pub fn init(verbosity_level: Option<Level>, deployment: &Deployment) -> Result<()> {
    let filter = filter(verbosity_level.unwrap_or(Level::ERROR))?;

    let fmt_layer = fmt::layer()
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_target(false)
        .pretty();

    match OtlpExport::from_env() {
        Some(export) => {
            let tracer = tracer_provider(&export, deployment)?.tracer(env!("CARGO_PKG_NAME"));
            let subscriber = Registry::default()
                .with(fmt_layer)
                .with(tracing_opentelemetry::layer().with_tracer(tracer))
                .with(filter);
            tracing::subscriber::set_global_default(subscriber)?;
            debug!(endpoint = %export.endpoint, "Exporting traces");
        }
        None => {
            let subscriber = Registry::default().with(fmt_layer).with(filter);
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    Ok(())
}

/// Flush and stop the tracer provider (noop if not initialized)
pub fn shutdown_tracer() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        debug!("shutting down tracer provider");
        let _ = provider.shutdown();
    }
}
