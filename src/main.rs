use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use nplist_k8s::KubeClient;

mod inspect;
mod render;

use crate::render::OutputFormat;

/// kubectl-nplist - Show the network policy rules that apply to a pod
#[derive(Parser, Debug)]
#[command(name = "kubectl-nplist")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Pod to inspect
    #[arg(value_name = "POD")]
    pod: String,

    /// Namespace to look for the pod (defaults to the context's namespace)
    #[arg(short, long)]
    namespace: Option<String>,

    /// Path to the kubeconfig file (defaults to $KUBECONFIG or ~/.kube/config)
    #[arg(long, value_name = "PATH")]
    kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use (defaults to the current context)
    #[arg(long)]
    context: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Diagnostics go to stderr so the table stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(args).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let client = KubeClient::new(args.kubeconfig.as_deref(), args.context.as_deref()).await?;

    let namespace = args
        .namespace
        .unwrap_or_else(|| client.default_namespace().to_string());

    let inspection = inspect::inspect(&client, &namespace, &args.pod).await?;
    println!("{}", render::render(&inspection, args.output)?);
    Ok(())
}
