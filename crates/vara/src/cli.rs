//! Clap derive structures for the `vara` CLI.

use clap::{Args, Parser, Subcommand};

use vara_core::EventKind;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// vara -- talk to a VARA HF/FM modem from the command line
#[derive(Debug, Parser)]
#[command(
    name = "vara",
    version,
    about = "Connect to remote stations through a VARA modem",
    long_about = "Drives a running VARA HF or VARA FM modem over its TCP command and\n\
        data ports. Payload is piped between stdin/stdout and the radio link;\n\
        logs go to stderr.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Modem profile to use
    #[arg(long, short = 'p', env = "VARA_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Host running the modem (overrides profile)
    #[arg(long, short = 'H', env = "VARA_HOST", global = true)]
    pub host: Option<String>,

    /// Command port (overrides profile)
    #[arg(long, env = "VARA_CMD_PORT", global = true)]
    pub cmd_port: Option<u16>,

    /// Data port (overrides profile; defaults to command port + 1)
    #[arg(long, env = "VARA_DATA_PORT", global = true)]
    pub data_port: Option<u16>,

    /// Local station call sign
    #[arg(long, short = 'm', env = "VARA_MYCALL", global = true)]
    pub mycall: Option<String>,

    /// Log every command-channel record
    #[arg(long, env = "VARA_DEBUG", global = true)]
    pub debug: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Call a remote station and pipe stdin/stdout over the link
    #[command(alias = "dial", alias = "c")]
    Connect(ConnectArgs),

    /// Wait for inbound calls and pipe them to stdin/stdout
    #[command(alias = "l")]
    Listen(ListenArgs),

    /// Print command-channel events without connecting
    #[command(alias = "mon")]
    Monitor(MonitorArgs),

    /// Manage the configuration file
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
pub struct ConnectArgs {
    /// Station to call: a call sign or a vara:///CALL URL
    pub target: String,
}

#[derive(Debug, Args)]
pub struct ListenArgs {
    /// Go back to listening after each connection ends
    #[arg(long, short = 'k')]
    pub keep_listening: bool,
}

#[derive(Debug, Args)]
pub struct MonitorArgs {
    /// Only show these event kinds (comma separated, e.g. busy_on,ptt_on)
    #[arg(long, short = 'k', value_delimiter = ',', value_parser = parse_kind)]
    pub kinds: Vec<EventKind>,
}

fn parse_kind(s: &str) -> Result<EventKind, String> {
    s.parse().map_err(|_| format!("unknown event kind '{s}'"))
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Print the effective configuration (file + environment)
    Show,

    /// Write a starter config file (stores --mycall if given)
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
