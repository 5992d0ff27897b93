//! # vault-sync
//!
//! Command line entry point for the Vault sync operations.
//!
//! ```bash
//! # Bind a Kubernetes secret to a Vault path
//! vault-sync bind --binding binding.yaml --secret my-app --namespace default
//!
//! # Bind an annotated secret exported to a file
//! vault-sync bind --secret-file secret.yaml
//!
//! # Mirror one Vault path into another
//! vault-sync mirror --mirror mirror.yaml
//!
//! # Print the CRDs
//! vault-sync crdgen
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client, CustomResourceExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use vault_sync_controller::observability;
use vault_sync_controller::prelude::*;

/// Sync Kubernetes secrets and Vault paths into Vault without clobbering fields
#[derive(Parser)]
#[command(name = "vault-sync", about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print collected Prometheus metrics to stderr before exiting
    #[arg(long, global = true)]
    print_metrics: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge the fields of a Kubernetes secret into a Vault path
    Bind {
        /// VaultBinding manifest (or bare spec). Without it the secret's
        /// annotations are used.
        #[arg(long, value_name = "FILE")]
        binding: Option<PathBuf>,

        /// Secret manifest to read instead of fetching it from the cluster
        #[arg(long, value_name = "FILE", conflicts_with = "secret")]
        secret_file: Option<PathBuf>,

        /// Name of the secret to fetch from the cluster
        #[arg(long)]
        secret: Option<String>,

        /// Namespace of the secret (defaults to the binding's or the client's namespace)
        #[arg(short, long)]
        namespace: Option<String>,
    },
    /// Merge the data of one Vault path into another
    Mirror {
        /// VaultMirror manifest (or bare spec)
        #[arg(long, value_name = "FILE")]
        mirror: PathBuf,
    },
    /// Print the CustomResourceDefinitions as YAML
    Crdgen,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if matches!(cli.command, Commands::Crdgen) {
        return crdgen();
    }

    rustls::crypto::ring::default_provider()
        .install_default()
        .unwrap_or_else(|_| panic!("Failed to install rustls crypto provider"));

    let config = Arc::new(ControllerConfig::from_env());
    observability::init_tracing(&config)?;
    if config.enable_metrics {
        observability::register_metrics()?;
    }

    let registry = Arc::new(AuthMethodRegistry::with_defaults(config.auth_defaults()));
    let pool = ClientPool::new(registry, Arc::clone(&config));

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling");
            on_signal.cancel();
        }
    });

    let written = match cli.command {
        Commands::Bind {
            binding,
            secret_file,
            secret,
            namespace,
        } => {
            run_bind(
                &pool,
                &cancel,
                binding.as_deref(),
                secret_file.as_deref(),
                secret,
                namespace,
            )
            .await?
        }
        Commands::Mirror { mirror } => run_mirror(&pool, &cancel, &mirror).await?,
        Commands::Crdgen => return crdgen(),
    };

    info!(written, "done");

    if cli.print_metrics && config.enable_metrics {
        eprint!("{}", observability::metrics::gather_text()?);
    }

    Ok(())
}

fn crdgen() -> Result<()> {
    let documents = [
        serde_yaml::to_string(&VaultBinding::crd())
            .context("Failed to serialize VaultBinding CRD")?,
        serde_yaml::to_string(&VaultMirror::crd())
            .context("Failed to serialize VaultMirror CRD")?,
    ];
    print!("{}", documents.join("---\n"));
    Ok(())
}

async fn run_bind(
    pool: &ClientPool,
    cancel: &CancellationToken,
    binding_file: Option<&Path>,
    secret_file: Option<&Path>,
    secret_name: Option<String>,
    namespace: Option<String>,
) -> Result<bool> {
    let mut binding = match binding_file {
        Some(path) => Some(read_manifest::<VaultBinding, VaultBindingSpec>(path, |b| b.spec)?),
        None => None,
    };

    let secret = match secret_file {
        Some(path) => read_yaml::<Secret>(path)?,
        None => {
            let name = secret_name
                .or_else(|| binding.as_ref().map(|b| b.secret.name.clone()))
                .filter(|name| !name.is_empty())
                .context(
                    "Either --secret, --secret-file or a binding with a secret name is required",
                )?;
            let namespace =
                namespace.or_else(|| binding.as_ref().and_then(|b| b.secret.namespace.clone()));
            fetch_secret(&name, namespace.as_deref()).await?
        }
    };

    if binding.is_none() {
        binding = binding_from_annotations(&secret).context("Failed to parse secret annotations")?;
    }
    let binding =
        binding.context("Secret carries no Vault path annotation and no binding was given")?;

    let handler = pool
        .get_or_connect(&binding.vault_spec(), cancel)
        .await
        .context("Failed to connect to Vault")?;

    bind_secret(&handler, &binding, &secret)
        .await
        .with_context(|| format!("Failed to bind secret to {}", binding.path))
}

async fn run_mirror(pool: &ClientPool, cancel: &CancellationToken, path: &Path) -> Result<bool> {
    let spec = read_manifest::<VaultMirror, VaultMirrorSpec>(path, |m| m.spec)?;

    let source = pool
        .get_or_connect(&spec.source, cancel)
        .await
        .context("Failed to connect to source Vault")?;
    let destination = pool
        .get_or_connect(&spec.destination, cancel)
        .await
        .context("Failed to connect to destination Vault")?;

    mirror(&source, &destination, &spec).await.with_context(|| {
        format!(
            "Failed to mirror {} to {}",
            spec.source.path, spec.destination.path
        )
    })
}

async fn fetch_secret(name: &str, namespace: Option<&str>) -> Result<Secret> {
    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;
    let api: Api<Secret> = match namespace {
        Some(namespace) => Api::namespaced(client, namespace),
        None => Api::default_namespaced(client),
    };
    api.get(name)
        .await
        .with_context(|| format!("Failed to get secret {name}"))
}

fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_yaml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Accept either a full resource manifest or just its spec
fn read_manifest<R, S>(path: &Path, spec: impl FnOnce(R) -> S) -> Result<S>
where
    R: serde::de::DeserializeOwned,
    S: serde::de::DeserializeOwned,
{
    let value: serde_yaml::Value = read_yaml(path)?;
    if value.get("spec").is_some() {
        let resource: R = serde_yaml::from_value(value)
            .with_context(|| format!("Failed to parse resource in {}", path.display()))?;
        Ok(spec(resource))
    } else {
        serde_yaml::from_value(value)
            .with_context(|| format!("Failed to parse spec in {}", path.display()))
    }
}
