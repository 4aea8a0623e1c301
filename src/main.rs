mod settings;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use msfsm_checker::{HttpCompletionChecker, RetryingChecker};
use msfsm_config::ContractDef;
use msfsm_flow::{DeploymentFlowGraph, generate_for_contract};
use msfsm_runtime::{
  ChannelNotifier, FlowMonitor, MonitorConfig, RefreshOutcome, StatusPropagator,
};
use msfsm_store::{FsSnapshotStore, SnapshotStore};

use crate::settings::Settings;

/// msfsm - deployment flows for multi-automaton smart legal contracts
#[derive(Parser)]
#[command(name = "msfsm")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.msfsm)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  /// Path to the settings file (default: <data-dir>/settings.json)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Base URL of the execution backend
  #[arg(long, global = true, env = "MSFSM_API_URL")]
  api_url: Option<String>,

  /// Delay between two status refreshes, in milliseconds
  #[arg(long, global = true, env = "MSFSM_POLL_INTERVAL_MS")]
  poll_interval_ms: Option<u64>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Generate the deployment flow of a contract
  Generate {
    /// Path to the contract file (JSON)
    contract_file: PathBuf,

    /// Write the flow to this file instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,
  },

  /// Refresh the execution status of a deployed flow once
  Refresh {
    #[command(flatten)]
    target: FlowTarget,

    /// Write the refreshed flow back to the flow file
    #[arg(long)]
    write: bool,
  },

  /// Keep refreshing a deployed flow until it completes
  Watch {
    #[command(flatten)]
    target: FlowTarget,
  },

  /// Inspect stored execution snapshots
  Snapshot {
    #[command(subcommand)]
    action: SnapshotAction,
  },
}

#[derive(clap::Args)]
struct FlowTarget {
  /// Path to the flow file (JSON)
  flow_file: PathBuf,

  /// Name of the deployed contract on the execution backend
  #[arg(long)]
  contract_name: String,

  /// Contract id to track the execution under. A flow deployed under
  /// another id is reset for this one.
  #[arg(long)]
  contract_id: Option<String>,
}

#[derive(Subcommand)]
enum SnapshotAction {
  /// Print the stored snapshot of a contract
  Show { contract_id: String },

  /// Remove the stored snapshot of a contract
  Clear { contract_id: String },
}

type HttpFlowMonitor<N> = FlowMonitor<RetryingChecker<HttpCompletionChecker>, FsSnapshotStore, N>;

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_tracing();

  let data_dir = match cli.data_dir {
    Some(data_dir) => data_dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".msfsm"),
  };

  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async {
    let config_path = cli
      .config
      .unwrap_or_else(|| data_dir.join("settings.json"));
    let settings = Settings::load(&config_path)
      .await?
      .with_overrides(cli.api_url, cli.poll_interval_ms);

    match cli.command {
      Some(Commands::Generate { contract_file, out }) => generate(contract_file, out).await,
      Some(Commands::Refresh { target, write }) => {
        refresh(target, write, &settings, &data_dir).await
      }
      Some(Commands::Watch { target }) => watch(target, &settings, &data_dir).await,
      Some(Commands::Snapshot { action }) => snapshot(action, &data_dir).await,
      None => {
        println!("msfsm - use --help to see available commands");
        Ok(())
      }
    }
  })
}

/// Log to stderr, filtered by `RUST_LOG` (default `info`).
fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

  tracing_subscriber::registry()
    .with(filter)
    .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
    .init();
}

async fn generate(contract_file: PathBuf, out: Option<PathBuf>) -> Result<()> {
  let content = tokio::fs::read_to_string(&contract_file)
    .await
    .with_context(|| format!("failed to read contract file: {}", contract_file.display()))?;

  let contract = ContractDef::from_json(&content)
    .with_context(|| format!("failed to parse contract file: {}", contract_file.display()))?;

  let flow = generate_for_contract(&contract);
  eprintln!(
    "Generated flow for {}: {} nodes, {} edges",
    contract.name,
    flow.nodes.len(),
    flow.edges.len()
  );

  let json = flow.to_json_pretty()?;
  match out {
    Some(out) => tokio::fs::write(&out, json)
      .await
      .with_context(|| format!("failed to write flow file: {}", out.display()))?,
    None => println!("{json}"),
  }

  Ok(())
}

async fn refresh(target: FlowTarget, write: bool, settings: &Settings, data_dir: &Path) -> Result<()> {
  let flow = load_flow(&target).await?;
  let monitor = build_monitor(&target, settings, data_dir, flow, msfsm_runtime::NoopNotifier)?;

  if let Some(snapshot) = monitor.restore().await? {
    eprintln!("Restored snapshot from {}", snapshot.last_updated);
  }

  let outcome = monitor
    .refresh_once()
    .await
    .context("status refresh failed")?;

  let RefreshOutcome::Applied { report, .. } = outcome else {
    anyhow::bail!("flow changed during refresh");
  };

  for node in &report.nodes {
    eprintln!(
      "{} ({}): {}",
      node.automaton_id, node.execution_key, node.status
    );
  }
  eprintln!("Global status: {}", report.global_status());
  if report.failed_checks() > 0 {
    eprintln!("{} completion check(s) failed", report.failed_checks());
  }

  let json = report.flow.to_json_pretty()?;
  if write {
    write_flow(&target.flow_file, json).await?;
  } else {
    println!("{json}");
  }

  Ok(())
}

async fn watch(target: FlowTarget, settings: &Settings, data_dir: &Path) -> Result<()> {
  let flow = load_flow(&target).await?;
  let (notifier, mut events) = ChannelNotifier::channel();
  let monitor = build_monitor(&target, settings, data_dir, flow, notifier)?;

  monitor.restore().await?;

  // Print events as JSON lines
  let printer = tokio::spawn(async move {
    while let Some(event) = events.recv().await {
      match serde_json::to_string(&event) {
        Ok(line) => println!("{line}"),
        Err(e) => tracing::warn!(error = %e, "failed to encode event"),
      }
    }
  });

  let cancel = CancellationToken::new();
  let ctrl_c = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      ctrl_c.cancel();
    }
  });

  let status = monitor.run(cancel).await;
  let flow = monitor.flow().await;
  drop(monitor);
  printer.await.context("event printer failed")?;

  eprintln!("Global status: {status}");
  write_flow(&target.flow_file, flow.to_json_pretty()?).await
}

async fn snapshot(action: SnapshotAction, data_dir: &Path) -> Result<()> {
  let store = snapshot_store(data_dir);

  match action {
    SnapshotAction::Show { contract_id } => {
      let snapshot = store
        .load(&contract_id)
        .await
        .with_context(|| format!("failed to load snapshot for {contract_id}"))?
        .with_context(|| format!("no snapshot stored for {contract_id}"))?;
      println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }
    SnapshotAction::Clear { contract_id } => {
      store
        .delete(&contract_id)
        .await
        .with_context(|| format!("failed to clear snapshot for {contract_id}"))?;
      eprintln!("Cleared snapshot for {contract_id}");
    }
  }

  Ok(())
}

async fn load_flow(target: &FlowTarget) -> Result<DeploymentFlowGraph> {
  let path = &target.flow_file;
  let content = tokio::fs::read_to_string(path)
    .await
    .with_context(|| format!("failed to read flow file: {}", path.display()))?;

  let mut flow = DeploymentFlowGraph::from_json(&content)
    .with_context(|| format!("failed to parse flow file: {}", path.display()))?;

  if let Some(contract_id) = &target.contract_id
    && flow.execution_metadata.contract_id.as_ref() != Some(contract_id)
  {
    flow.prepare_deployment(contract_id.clone());
  }

  if flow.execution_metadata.contract_id.is_none() {
    tracing::warn!(
      flow_file = %path.display(),
      "flow has no contract id, snapshots will not be saved"
    );
  }

  Ok(flow)
}

fn build_monitor<N: msfsm_runtime::FlowNotifier>(
  target: &FlowTarget,
  settings: &Settings,
  data_dir: &Path,
  flow: DeploymentFlowGraph,
  notifier: N,
) -> Result<HttpFlowMonitor<N>> {
  let http = HttpCompletionChecker::new(settings.checker_config()?)
    .context("failed to create http client")?;
  let checker = RetryingChecker::new(http, settings.retry.clone());
  let propagator = StatusPropagator::with_notifier(checker, settings.propagation, notifier);

  let config =
    MonitorConfig::new(target.contract_name.clone()).with_poll_interval(settings.poll_interval());

  Ok(FlowMonitor::new(
    propagator,
    snapshot_store(data_dir),
    config,
    flow,
  ))
}

fn snapshot_store(data_dir: &Path) -> FsSnapshotStore {
  FsSnapshotStore::new(data_dir.join("snapshots"))
}

async fn write_flow(path: &Path, json: String) -> Result<()> {
  tokio::fs::write(path, json)
    .await
    .with_context(|| format!("failed to write flow file: {}", path.display()))
}
