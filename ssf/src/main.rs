use clap::Parser;

use ssf::cli::{Cli, Command};
use ssf::runtime::AppRuntime;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = ssf_config::load(cli.config.as_deref().unwrap_or_else(|| std::path::Path::new("ssf.json")))?;

    if let Some(circuit_file) = &cli.circuit_file {
        let hops = ssf_config::circuit::read_circuit_file(circuit_file)?;
        tracing::info!(hops = hops.len(), "loaded circuit file");
    }

    let runtime = AppRuntime::start(cli.threads)?;

    match cli.command {
        Command::Server { listen, target } => {
            runtime.block_on(ssf::session::serve(listen, config.tls, target))?;
        }
        Command::Client { connect, listen } => {
            runtime.block_on(ssf::session::connect(connect, config.tls, listen))?;
        }
    }

    Ok(())
}
