use clap::{Parser, Subcommand};
use std::net::SocketAddr;

#[derive(Parser, Debug)]
#[command(name = "relaybox")]
#[command(about = "relaybox persistence operator CLI", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the health/stats endpoint and the ledger expiry task
    Serve(ServeArgs),
    /// Print usage counters as JSON
    Stats,
    /// Run one backstop expiry pass over the ledger
    Sweep,
}

#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    /// Address to bind to (defaults to `server.bind_addr`)
    #[arg(long)]
    pub address: Option<SocketAddr>,
}
