use std::path::PathBuf;

use clap::{ArgGroup, Args, Subcommand};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod inspect;
pub mod listen;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Accept peers and print the messages they send.
    Listen(ListenArgs),
    /// Send a single message.
    Send(SendArgs),
    /// Validate one message read from a file or stdin.
    Inspect(InspectArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Listen(args) => listen::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Inspect(args) => inspect::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Endpoint to bind (tcp://host:port, host:port or a socket path).
    pub endpoint: String,
    /// Exit after printing N messages.
    #[arg(long)]
    pub count: Option<usize>,
    /// Do not acknowledge received messages.
    #[arg(long)]
    pub no_ack: bool,
    /// Reject messages carrying unknown fields.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug)]
#[command(group(
    ArgGroup::new("payload")
        .required(true)
        .args(["req", "json", "file", "raw"])
))]
pub struct SendArgs {
    /// Endpoint to connect to.
    pub endpoint: String,
    /// Send a named request.
    #[arg(long)]
    pub req: Option<String>,
    /// Send a payload given as the JSON `data` object.
    #[arg(long)]
    pub json: Option<String>,
    /// Read the JSON `data` object from a file.
    #[arg(long)]
    pub file: Option<PathBuf>,
    /// Send the bytes verbatim, without an envelope.
    #[arg(long)]
    pub raw: Option<String>,
    /// Wait for the acknowledgment or reply and print it.
    #[arg(long)]
    pub wait: bool,
    /// Maximum time to wait when --wait is set (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// File holding one message. Reads stdin when omitted.
    #[arg(long)]
    pub file: Option<PathBuf>,
    /// Reject unknown fields.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show build target and enabled features.
    #[arg(long)]
    pub extended: bool,
}
