//! Command-line entry point for post-install verification.
//!
//! Source selection mirrors istioctl: explicit `--filename` manifests win;
//! otherwise the installation is located in the cluster by `--revision`
//! (default revision when unset).

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use istio_verify::cluster::KubeCluster;
use istio_verify::render::PackageRenderer;
use istio_verify::verify::{InstallationSource, StatusVerifier};
use istio_verify::{Error, DEFAULT_ISTIO_NAMESPACE};

#[derive(Parser, Debug)]
#[command(
    name = "istio-verify",
    version,
    about = "Verify that an Istio control plane installation is present and healthy"
)]
struct Args {
    /// Manifest files describing the expected installation; when given, the
    /// cluster is verified against these instead of the in-cluster operator
    #[arg(short = 'f', long = "filename", value_name = "FILE")]
    filename: Vec<PathBuf>,

    /// Control plane revision to verify when no files are given
    #[arg(long, default_value = "")]
    revision: String,

    /// Namespace the control plane is expected in
    #[arg(long, default_value = DEFAULT_ISTIO_NAMESPACE)]
    istio_namespace: String,

    /// Install package path overriding what operator specs declare
    #[arg(long, value_name = "PATH")]
    manifests: Option<PathBuf>,

    /// Path to the kubeconfig file to use
    #[arg(long, env = "KUBECONFIG", value_name = "PATH")]
    kubeconfig: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cluster = KubeCluster::connect(args.kubeconfig.as_deref())
        .await
        .context("failed to connect to the cluster")?;
    let renderer = PackageRenderer::new(args.manifests.clone());

    let mut verifier =
        StatusVerifier::new(cluster, renderer).with_istio_namespace(args.istio_namespace.as_str());
    if let Some(manifests) = &args.manifests {
        verifier = verifier.with_manifests_path(manifests.display().to_string());
    }

    let from_cluster = args.filename.is_empty();
    let source = if from_cluster {
        InstallationSource::Revision(args.revision.clone())
    } else {
        InstallationSource::Files(args.filename.clone())
    };

    match verifier.verify(source).await {
        Ok(()) => Ok(()),
        Err(err @ (Error::RevisionNotFound { .. } | Error::Kube { .. })) if from_cluster => {
            Err(anyhow::Error::new(err).context(
                "could not load IstioOperator from cluster; use --filename to verify from manifest files",
            ))
        }
        Err(err) => Err(err.into()),
    }
}
