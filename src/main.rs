//! # Cluster Version Controller
//!
//! Drives the cluster toward the desired `CVOConfig` through a leveled,
//! rate-limited work queue.
//!
//! ## Usage
//!
//! ```bash
//! cluster-version-controller --namespace openshift-cluster-version --name version \
//!     --node-name "$NODE_NAME" --workers 2
//! ```
//!
//! Every flag falls back to its environment variable (see `config`), then to the
//! built-in default.

use anyhow::Result;
use clap::Parser;
use cluster_version_controller::config::{load_config, ControllerConfig};
use cluster_version_controller::runtime::initialization::initialize;
use cluster_version_controller::runtime::watch_loop::run_watch_loop;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cluster-version-controller")]
#[command(about = "Reconciles the cluster toward its desired CVOConfig", version)]
struct Cli {
    /// Namespace of the CVOConfig and OperatorStatus objects
    #[arg(long)]
    namespace: Option<String>,

    /// Name of the CVOConfig and OperatorStatus objects
    #[arg(long)]
    name: Option<String>,

    /// Node the controller runs on
    #[arg(long)]
    node_name: Option<String>,

    /// Number of workers pulling from the queue
    #[arg(long)]
    workers: Option<usize>,

    /// Directory under which update payloads are extracted
    #[arg(long)]
    payload_path_prefix: Option<PathBuf>,
}

impl Cli {
    fn apply(self, config: &mut ControllerConfig) {
        if let Some(namespace) = self.namespace {
            config.namespace = namespace;
        }
        if let Some(name) = self.name {
            config.name = name;
        }
        if let Some(node_name) = self.node_name {
            config.node_name = node_name;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(prefix) = self.payload_path_prefix {
            config.payload_path_prefix = prefix;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut controller_config, server_config) = load_config();
    cli.apply(&mut controller_config);

    let init_result = initialize(controller_config, server_config).await?;
    run_watch_loop(init_result).await
}
