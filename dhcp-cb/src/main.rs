//! dhcp-cb: inspect a DHCPv6 configuration database.

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::error;
use tracing_subscriber::EnvFilter;

use dhcp_cb::render::{
    render_global_parameter, render_option, render_option_def, render_shared_network,
    render_subnet,
};
use dhcp_cb::{
    AuditStore, ConfigBackendDhcp6, ConnectionParams, GlobalParameterStore, OptionDefRegistry,
    OptionDefStore, OptionStore, ServerSelector, SharedNetworkStore, SqliteConfigBackend,
    SubnetStore,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Database access string (e.g., "name=/var/lib/dhcp-cb/config.db")
    #[arg(short, long, default_value = "name=/var/lib/dhcp-cb/config.db")]
    db: String,

    /// Server tag to read the configuration for
    #[arg(short, long, default_value = "all")]
    server: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List subnets
    Subnets,
    /// List shared networks
    SharedNetworks,
    /// List option definitions
    OptionDefs,
    /// List global options
    Options,
    /// List global parameters
    Globals,
    /// Show the audit trail
    Audit {
        /// Only entries recorded after this time (RFC 3339)
        #[arg(long)]
        since: Option<DateTime<Utc>>,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(&args) {
        error!(error = %format!("{:#}", e), "dhcp-cb failed");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let params: ConnectionParams = args.db.parse().context("invalid database access string")?;
    let backend = SqliteConfigBackend::open(&params).context("failed to open database")?;
    let selector = ServerSelector::from_tag(&args.server);

    let mut registry = OptionDefRegistry::with_std_dhcp6();
    for def in backend.get_all_option_defs(&selector)? {
        registry.add(def);
    }

    let output: Vec<Value> = match &args.command {
        Command::Subnets => backend
            .get_all_subnets(&selector)?
            .iter()
            .map(|subnet| render_subnet(subnet, &registry))
            .collect(),
        Command::SharedNetworks => backend
            .get_all_shared_networks(&selector)?
            .iter()
            .map(|network| render_shared_network(network, &registry))
            .collect(),
        Command::OptionDefs => backend
            .get_all_option_defs(&selector)?
            .iter()
            .map(render_option_def)
            .collect(),
        Command::Options => backend
            .get_all_options(&selector)?
            .iter()
            .map(|option| render_option(option, &registry))
            .collect(),
        Command::Globals => backend
            .get_all_global_parameters(&selector)?
            .iter()
            .map(render_global_parameter)
            .collect(),
        Command::Audit { since } => {
            let since = since.unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
            backend
                .get_recent_audit_entries(&selector, &since)?
                .iter()
                .map(serde_json::to_value)
                .collect::<Result<_, _>>()?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    tracing::debug!(backend = backend.backend_type(), host = backend.host(), "Done");
    Ok(())
}
