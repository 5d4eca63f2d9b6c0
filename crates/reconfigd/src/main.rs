//! reconfigd: one-shot membership reconfiguration for an etcd node.
//!
//! Runs once at boot, before the store process starts. Decides whether
//! this node founds a new cluster or joins the running one, evicts dead
//! peers, registers itself and writes the environment file the store's
//! launcher sources.
//!
//! # Usage
//!
//! ```text
//! reconfigd --asg-name etcd-prod --lb-dns internal-etcd.elb.amazonaws.com
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use reconfig_cluster::{
    DEFAULT_MEMBERS_PATH, DEFAULT_METADATA_URL, HttpMembershipClient, IdentitySource,
    InstanceMetadataIdentity, Orchestrator, RunReport, StaticIdentity, StaticTopology,
};
use reconfig_core::{ReconfigResult, parse_duration};
use reconfig_health::HttpHealthProber;
use reconfig_metadata::MetadataEmitter;

#[derive(Parser, Debug)]
#[command(name = "reconfigd", version, about = "etcd membership reconfiguration")]
struct Cli {
    /// Autoscaling group the node belongs to.
    #[arg(long, env = "ASG_NAME")]
    asg_name: String,

    /// DNS name of the load balancer in front of the cluster.
    #[arg(long, env = "ETCD_RECONFIG_LB_DNS")]
    lb_dns: String,

    /// Known group instance address. Repeatable.
    #[arg(long = "instance", env = "ETCD_RECONFIG_INSTANCES", value_delimiter = ',')]
    instances: Vec<String>,

    /// Private IPv4 of this node. Skips the instance metadata lookup.
    #[arg(long, env = "ETCD_RECONFIG_LOCAL_IP")]
    local_ip: Option<String>,

    /// Instance metadata URL answering with the private IPv4.
    #[arg(long, default_value = DEFAULT_METADATA_URL)]
    metadata_url: String,

    /// Discovery seed, required when this node founds the cluster.
    #[arg(long, env = "ETCD_DISCOVERY")]
    discovery: Option<String>,

    /// Environment file written for the store process.
    #[arg(long, env = "ETCD_RECONFIG_OUTPUT", default_value = "/var/run/etcd-reconfig/env")]
    output: PathBuf,

    /// Timeout for every network call (e.g. 500ms, 5s, 1m).
    #[arg(long, default_value = "5s", value_parser = parse_duration)]
    timeout: Duration,

    /// Path of the members API on the client endpoint.
    #[arg(long, default_value = DEFAULT_MEMBERS_PATH)]
    members_path: String,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,
}

/// Where this node learns its private address.
enum NodeIdentity {
    Static(StaticIdentity),
    Metadata(InstanceMetadataIdentity),
}

impl NodeIdentity {
    fn from_cli(cli: &Cli) -> Self {
        match &cli.local_ip {
            Some(ip) => Self::Static(StaticIdentity::new(ip.as_str())),
            None => Self::Metadata(InstanceMetadataIdentity::new(
                cli.metadata_url.as_str(),
                cli.timeout,
            )),
        }
    }
}

impl IdentitySource for NodeIdentity {
    async fn private_ipv4(&self) -> ReconfigResult<String> {
        match self {
            Self::Static(source) => source.private_ipv4().await,
            Self::Metadata(source) => source.private_ipv4().await,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let report = run(cli).await?;
    info!(
        state = %report.state,
        evicted = report.evicted.len(),
        skipped = report.skipped.len(),
        keys = report.config.len(),
        "reconfiguration complete"
    );
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,reconfigd=debug,reconfig=debug"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn run(cli: Cli) -> anyhow::Result<RunReport> {
    info!(
        group = %cli.asg_name,
        load_balancer = %cli.lb_dns,
        timeout = ?cli.timeout,
        "etcd reconfiguration starting"
    );

    let topology =
        StaticTopology::new(cli.asg_name.as_str(), &cli.lb_dns).with_instances(cli.instances.clone());
    let endpoint = topology.topology().client_endpoint();

    // ── Collaborators ──────────────────────────────────────────

    let membership =
        HttpMembershipClient::new(&endpoint, cli.timeout).with_members_path(&cli.members_path);
    info!(url = %membership.members_url(), "members api");

    let prober = HttpHealthProber::new(cli.timeout);
    let identity = NodeIdentity::from_cli(&cli);
    let emitter = MetadataEmitter::new(cli.output.clone());

    // ── Single pass ────────────────────────────────────────────

    let mut orchestrator = Orchestrator::new(membership, prober, topology, identity)
        .with_discovery_seed(cli.discovery);

    orchestrator
        .run(&emitter)
        .await
        .with_context(|| format!("reconfiguring member list behind {}", cli.lb_dns))
}
