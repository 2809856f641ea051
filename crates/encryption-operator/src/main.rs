//! Encryption operator - keeps the managed encryption list in step with the
//! auxiliary API server's coordination secret

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::Client;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use encryption_common::events::{object_reference, KubeEventPublisher};
use encryption_common::telemetry::{init_telemetry, LogFormat, TelemetryConfig};
use encryption_operator::poller::{cache_task_error, run_poller};
use encryption_provider::{
    forward_events, AuthorityResolver, ChannelNotifier, ProviderConfig, SecretCache,
};

/// Name reported as the event source
const CONTROLLER_NAME: &str = "encryption-operator";

/// Encryption operator - resolves which group-resources to keep encrypted
#[derive(Parser, Debug)]
#[command(name = "encryption-operator", version, about, long_about = None)]
struct Cli {
    /// YAML file with the provider configuration (defaults apply when omitted)
    #[arg(long, env = "ENCRYPTION_PROVIDER_CONFIG")]
    config: Option<PathBuf>,

    /// Namespace holding the coordination secret
    #[arg(long)]
    config_namespace: Option<String>,

    /// Namespace of the auxiliary API server
    #[arg(long)]
    target_namespace: Option<String>,

    /// Annotation that keeps this operator in charge of every resource
    #[arg(long)]
    annotation_key: Option<String>,

    /// Seconds between synchronization passes
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    poll_interval_secs: u64,

    /// Log format: json or text
    #[arg(long, env = "LOG_FORMAT", default_value = "json")]
    log_format: LogFormat,

    /// Kind of the object change events are recorded on
    #[arg(long, default_value = "Deployment")]
    event_object_kind: String,

    /// API version of the object change events are recorded on
    #[arg(long, default_value = "apps/v1")]
    event_object_api_version: String,

    /// Name of the object change events are recorded on
    #[arg(long, default_value = CONTROLLER_NAME)]
    event_object_name: String,

    /// Namespace of the object change events are recorded on
    #[arg(long, env = "POD_NAMESPACE", default_value = "default")]
    event_object_namespace: String,
}

impl Cli {
    /// Load the configuration file, then apply command-line overrides
    fn provider_config(&self) -> encryption_common::Result<ProviderConfig> {
        let mut config = match &self.config {
            Some(path) => ProviderConfig::load(path)?,
            None => ProviderConfig::default(),
        };
        if let Some(ns) = &self.config_namespace {
            config.config_namespace = ns.clone();
        }
        if let Some(ns) = &self.target_namespace {
            config.target_namespace = ns.clone();
        }
        if let Some(key) = &self.annotation_key {
            config.annotation_key = key.clone();
        }
        config.validate()?;
        Ok(config)
    }

    fn event_object_ref(&self) -> ObjectReference {
        object_reference(
            &self.event_object_api_version,
            &self.event_object_kind,
            &self.event_object_name,
            &self.event_object_namespace,
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_telemetry(TelemetryConfig {
        service_name: CONTROLLER_NAME.to_string(),
        log_format: cli.log_format,
        ..Default::default()
    })?;

    let config = cli.provider_config()?;
    let interval = Duration::from_secs(cli.poll_interval_secs);

    info!(
        config_namespace = %config.config_namespace,
        secret = %config.coordination_secret_name(),
        resources = config.encrypted_resources.len(),
        externally_managed = config.externally_managed_resources.len(),
        "Starting encryption operator"
    );

    let client = Client::try_default().await?;

    let cache = Arc::new(SecretCache::new(config.config_namespace.clone()));
    let mut cache_task = tokio::spawn(Arc::clone(&cache).run(client.clone()));

    // Resolution before the first sync falls back to the full list, so a slow
    // start only delays the handoff.
    if tokio::time::timeout(interval, cache.wait_until_synced())
        .await
        .is_err()
    {
        warn!(
            namespace = %config.config_namespace,
            "Secret cache not synced yet, starting with the full list"
        );
    }

    let (notifier, events_rx) = ChannelNotifier::new();
    let publisher = KubeEventPublisher::new(client, CONTROLLER_NAME, cli.event_object_ref());
    let forwarder = tokio::spawn(async move {
        forward_events(events_rx, &publisher).await;
    });

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
                return;
            }
            info!("Shutdown signal received");
            shutdown.cancel();
        });
    }

    let mut resolver = AuthorityResolver::new(&config, Arc::clone(&cache), notifier);

    // A stopped watch task freezes the cache, so it ends the poller too.
    let cache_failure = tokio::select! {
        _ = run_poller(&mut resolver, interval, shutdown) => None,
        result = &mut cache_task => Some(cache_task_error(result)),
    };

    // Dropping the resolver closes the event channel and lets queued events drain.
    drop(resolver);
    forwarder.await?;

    match cache_failure {
        Some(err) => {
            error!(error = %err, "Secret cache stopped, exiting");
            Err(err.into())
        }
        None => {
            cache_task.abort();
            Ok(())
        }
    }
}
