//! Command-line surface (SPEC_FULL.md §6.7): argument parsing itself is
//! explicitly out of scope per spec.md §1, so this is kept to just enough
//! to drive the binary — config/circuit file paths and listen/target
//! overrides for the demo TCP-forwarder service.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "ssf", about = "Secure Socket Funneling")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the JSON configuration document (spec §6.1).
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the circuit file (spec §6.2): one `host:port` hop per line.
    #[arg(short = 'b', long, global = true)]
    pub circuit_file: Option<PathBuf>,

    /// Worker thread count; defaults to the platform's hardware concurrency.
    #[arg(long, global = true)]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Runs the server side: terminates the tunnel and dials `--target`
    /// for each forwarded fiber.
    Server {
        /// Address to accept tunnel connections on.
        #[arg(long, default_value = "127.0.0.1:8011")]
        listen: SocketAddr,

        /// Address the demo forwarder dials for each accepted fiber.
        #[arg(long, default_value = "127.0.0.1:22")]
        target: SocketAddr,
    },

    /// Runs the client side: connects the tunnel and exposes a local
    /// listener that forwards each accepted connection over a fiber.
    Client {
        /// Tunnel server to connect to.
        #[arg(long, default_value = "127.0.0.1:8011")]
        connect: SocketAddr,

        /// Local address the demo forwarder listens on.
        #[arg(long, default_value = "127.0.0.1:5555")]
        listen: SocketAddr,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_server_with_defaults() {
        let cli = Cli::parse_from(["ssf", "server"]);
        match cli.command {
            Command::Server { listen, target } => {
                assert_eq!(listen.port(), 8011);
                assert_eq!(target.port(), 22);
            }
            _ => panic!("expected Server"),
        }
    }

    #[test]
    fn parses_client_overrides() {
        let cli = Cli::parse_from(["ssf", "client", "--connect", "127.0.0.1:9000", "--listen", "127.0.0.1:6000"]);
        match cli.command {
            Command::Client { connect, listen } => {
                assert_eq!(connect.port(), 9000);
                assert_eq!(listen.port(), 6000);
            }
            _ => panic!("expected Client"),
        }
    }
}
