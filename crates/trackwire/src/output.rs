use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serde_json::Value;
use trackwire_message::{Envelope, MessageId, MessageKind, Payload};

const MESSAGE_SCHEMA_ID: &str = "trackwire/cli/v1/message-received";
const INSPECTION_SCHEMA_ID: &str = "trackwire/cli/v1/message-rejected";

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct EnvelopeOutput<'a> {
    schema_id: &'a str,
    peer: &'a str,
    id: MessageId,
    time: f64,
    kind: MessageKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<MessageId>,
    message: &'a Envelope,
}

#[derive(Serialize)]
struct InspectionOutput<'a> {
    schema_id: &'a str,
    valid: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<&'a str>,
    recovered_id: MessageId,
}

pub fn print_envelope(envelope: &Envelope, peer: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = EnvelopeOutput {
                schema_id: MESSAGE_SCHEMA_ID,
                peer,
                id: envelope.id,
                time: envelope.time,
                kind: envelope.kind(),
                reply_to: envelope.reply_to(),
                message: envelope,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PEER", "ID", "TYPE", "TO", "DATA"])
                .add_row(vec![
                    peer.to_string(),
                    envelope.id.to_string(),
                    kind_label(envelope),
                    envelope
                        .reply_to()
                        .map(|to| to.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    data_preview(envelope),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let to = envelope
                .reply_to()
                .map(|to| format!(" to={to}"))
                .unwrap_or_default();
            println!(
                "peer={} id={} type={}{} time={:.3} data={}",
                peer,
                envelope.id,
                kind_label(envelope),
                to,
                envelope.time,
                data_preview(envelope)
            );
        }
        OutputFormat::Raw => match trackwire_message::encode(envelope) {
            Ok(mut bytes) => {
                bytes.push(b'\n');
                print_raw(&bytes);
            }
            Err(err) => eprintln!("error: {err}"),
        },
    }
}

/// Report input that failed decoding or validation.
pub fn print_inspection(error: &str, path: Option<&str>, recovered_id: MessageId, format: OutputFormat) {
    match format {
        OutputFormat::Json | OutputFormat::Raw => {
            let out = InspectionOutput {
                schema_id: INSPECTION_SCHEMA_ID,
                valid: false,
                error: error.to_string(),
                path,
                recovered_id,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["VALID", "PATH", "NACK TO", "ERROR"])
                .add_row(vec![
                    "false".to_string(),
                    display_path(path),
                    recovered_id.to_string(),
                    error.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "valid=false path={} nack_to={} error={}",
                display_path(path),
                recovered_id,
                error
            );
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn display_path(path: Option<&str>) -> String {
    match path {
        Some("") => "/".to_string(),
        Some(path) => path.to_string(),
        None => "-".to_string(),
    }
}

/// Envelope tag, with the nested report tag for data messages.
fn kind_label(envelope: &Envelope) -> String {
    match &envelope.payload {
        Payload::Data(report) => format!("{}/{}", envelope.kind(), report.kind()),
        _ => envelope.kind().to_string(),
    }
}

fn data_preview(envelope: &Envelope) -> String {
    match serde_json::to_value(&envelope.payload) {
        Ok(Value::Object(mut fields)) => fields
            .remove("data")
            .map(|data| data.to_string())
            .unwrap_or_default(),
        _ => String::new(),
    }
}
