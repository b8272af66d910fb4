use std::fs;
use std::time::Duration;

use tracing::debug;
use trackwire_message::{Payload, StreamConfig};
use trackwire_peer::{connect_with_config, PeerConfig};
use trackwire_transport::Endpoint;

use crate::cmd::SendArgs;
use crate::exit::{io_error, peer_error, transport_error, CliError, CliResult, SUCCESS, TIMEOUT, USAGE};
use crate::output::{print_envelope, OutputFormat};

enum Outgoing {
    Message(Payload),
    Raw(Vec<u8>),
}

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let endpoint: Endpoint = args
        .endpoint
        .parse()
        .map_err(|err| transport_error("invalid endpoint", err))?;
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let outgoing = resolve_payload(&args)?;

    let config = PeerConfig {
        stream: StreamConfig {
            read_timeout: Some(wait_timeout),
            ..StreamConfig::default()
        },
        request_timeout: wait_timeout,
        ..PeerConfig::default()
    };
    let mut peer =
        connect_with_config(&endpoint, config).map_err(|err| peer_error("connect failed", err))?;

    match outgoing {
        Outgoing::Message(payload) if args.wait && payload.kind().awaits_reply() => {
            let reply = peer
                .request_with_timeout(payload, wait_timeout)
                .map_err(|err| peer_error("request failed", err))?;
            print_envelope(&reply, peer.label(), format);
        }
        Outgoing::Message(payload) => {
            let (envelope, _) = peer
                .send(payload)
                .map_err(|err| peer_error("send failed", err))?;
            debug!(id = envelope.id, kind = %envelope.kind(), "message sent");
        }
        Outgoing::Raw(bytes) => {
            peer.sender()
                .send_raw(&bytes)
                .map_err(|err| peer_error("send failed", err))?;
            if args.wait {
                let answer = peer
                    .recv()
                    .map_err(|err| peer_error("receive failed", err))?;
                return match answer {
                    Some(envelope) => {
                        print_envelope(&envelope, peer.label(), format);
                        Ok(SUCCESS)
                    }
                    None => {
                        eprintln!("error: no answer within {wait_timeout:?}");
                        Ok(TIMEOUT)
                    }
                };
            }
        }
    }

    let _ = peer.shutdown();
    Ok(SUCCESS)
}

fn resolve_payload(args: &SendArgs) -> CliResult<Outgoing> {
    if let Some(req) = &args.req {
        return Ok(Outgoing::Message(Payload::request(req.as_str())));
    }
    if let Some(raw) = &args.raw {
        return Ok(Outgoing::Raw(raw.as_bytes().to_vec()));
    }
    let text = if let Some(json) = &args.json {
        json.clone()
    } else if let Some(path) = &args.file {
        fs::read_to_string(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?
    } else {
        return Err(CliError::usage("one of --req, --json, --file or --raw is required"));
    };
    payload_from_json(&text).map(Outgoing::Message)
}

fn payload_from_json(text: &str) -> CliResult<Payload> {
    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|err| CliError::usage(format!("payload is not valid JSON: {err}")))?;
    Payload::from_value(value).map_err(|err| CliError::usage(err.to_string()))
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = match input.strip_suffix("ms") {
        Some(number) => (number, true),
        None => (input.strip_suffix('s').unwrap_or(input), false),
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
