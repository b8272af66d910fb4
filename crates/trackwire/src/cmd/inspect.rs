use std::fs;
use std::io::Read;

use tracing::debug;
use trackwire_message::recover_identifier;
use trackwire_schema::{EnvelopeValidator, SchemaError, ValidatorConfig};

use crate::cmd::InspectArgs;
use crate::exit::{io_error, schema_error, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_envelope, print_inspection, OutputFormat};

const INPUT_LABEL_STDIN: &str = "stdin";

pub fn run(args: InspectArgs, format: OutputFormat) -> CliResult<i32> {
    let (label, raw) = match &args.file {
        Some(path) => {
            let raw = fs::read(path)
                .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
            (path.display().to_string(), raw)
        }
        None => {
            let mut raw = Vec::new();
            std::io::stdin()
                .read_to_end(&mut raw)
                .map_err(|err| io_error("failed reading stdin", err))?;
            (INPUT_LABEL_STDIN.to_string(), raw)
        }
    };

    let validator = EnvelopeValidator::with_config(ValidatorConfig {
        strict_mode: args.strict,
    })
    .map_err(|err| schema_error("validator setup failed", err))?;

    match validator.decode(&raw) {
        Ok(envelope) => {
            print_envelope(&envelope, &label, format);
            Ok(SUCCESS)
        }
        Err(err @ SchemaError::CompileFailed(_)) => Err(schema_error("inspect failed", err)),
        Err(err) => {
            let recovered = recover_identifier(&raw);
            debug!(input = %label, recovered, error = %err, "message rejected");
            print_inspection(&err.to_string(), err.path(), recovered, format);
            Ok(DATA_INVALID)
        }
    }
}
