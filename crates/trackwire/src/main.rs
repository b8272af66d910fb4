mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "trackwire", version, about = "Tracking message peer CLI")]
struct Cli {
    /// Output format. Defaults to table on a terminal, json otherwise.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(
        long,
        value_name = "FORMAT",
        env = "TRACKWIRE_LOG_FORMAT",
        default_value = "text",
        global = true
    )]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        env = "TRACKWIRE_LOG_LEVEL",
        default_value = "info",
        global = true
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    match cmd::run(cli.command, format) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_send_request() {
        let cli = Cli::try_parse_from([
            "trackwire",
            "send",
            "127.0.0.1:5000",
            "--req",
            "sensor_info",
            "--wait",
        ])
        .expect("send args should parse");

        match cli.command {
            Command::Send(args) => {
                assert_eq!(args.req.as_deref(), Some("sensor_info"));
                assert!(args.wait);
                assert_eq!(args.wait_timeout, "5s");
            }
            other => panic!("expected send, got {other:?}"),
        }
    }

    #[test]
    fn send_requires_exactly_one_payload() {
        let err = Cli::try_parse_from([
            "trackwire",
            "send",
            "127.0.0.1:5000",
            "--req",
            "status",
            "--raw",
            "{",
        ])
        .expect_err("conflicting payloads should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);

        let err = Cli::try_parse_from(["trackwire", "send", "127.0.0.1:5000"])
            .expect_err("missing payload should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn parses_listen_with_global_format() {
        let cli = Cli::try_parse_from([
            "trackwire",
            "listen",
            "/tmp/trackwire.sock",
            "--count",
            "2",
            "--strict",
            "--format",
            "pretty",
        ])
        .expect("listen args should parse");

        assert!(matches!(cli.format, Some(OutputFormat::Pretty)));
        match cli.command {
            Command::Listen(args) => {
                assert_eq!(args.count, Some(2));
                assert!(args.strict);
                assert!(!args.no_ack);
            }
            other => panic!("expected listen, got {other:?}"),
        }
    }

    #[test]
    fn parses_inspect_from_stdin() {
        let cli = Cli::try_parse_from(["trackwire", "inspect"]).expect("inspect should parse");
        assert!(matches!(cli.command, Command::Inspect(ref args) if args.file.is_none()));
    }
}
