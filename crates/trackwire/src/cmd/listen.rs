use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{info, warn};
use trackwire_message::StreamConfig;
use trackwire_peer::{PeerConfig, PeerError, PeerListener};
use trackwire_schema::ValidatorConfig;
use trackwire_transport::Endpoint;

use crate::cmd::ListenArgs;
use crate::exit::{peer_error, transport_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_envelope, OutputFormat};

/// Read timeout and accept interval between checks of the shutdown flag.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let endpoint: Endpoint = args
        .endpoint
        .parse()
        .map_err(|err| transport_error("invalid endpoint", err))?;
    let config = PeerConfig {
        stream: StreamConfig {
            read_timeout: Some(POLL_INTERVAL),
            ..StreamConfig::default()
        },
        validator: ValidatorConfig {
            strict_mode: args.strict,
        },
        ..PeerConfig::default()
    };
    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(Arc::clone(&running))?;

    let listener = PeerListener::bind_with_config(&endpoint, config)
        .map_err(|err| peer_error("bind failed", err))?;
    listener
        .set_nonblocking(true)
        .map_err(|err| peer_error("bind failed", err))?;
    if let Ok(bound) = listener.local_endpoint() {
        info!(endpoint = %bound, "listening");
    }

    let mut printed = 0usize;

    while running.load(Ordering::SeqCst) {
        let accepted = listener
            .try_accept()
            .map_err(|err| peer_error("accept failed", err))?;
        let Some(mut peer) = accepted else {
            thread::sleep(POLL_INTERVAL);
            continue;
        };
        info!(peer = peer.label(), "peer connected");

        while running.load(Ordering::SeqCst) {
            let envelope = match peer.recv() {
                Ok(Some(envelope)) => envelope,
                Ok(None) => continue,
                Err(err) if err.is_fatal() => {
                    info!(peer = peer.label(), error = %err, "peer gone");
                    break;
                }
                Err(err) => return Err(peer_error("receive failed", err)),
            };

            print_envelope(&envelope, peer.label(), format);

            if !args.no_ack && envelope.kind().awaits_reply() {
                match peer.acknowledge(envelope.id, true) {
                    Ok(_) => {}
                    Err(err @ (PeerError::Transport(_) | PeerError::Disconnected(_))) => {
                        warn!(peer = peer.label(), error = %err, "could not acknowledge");
                        break;
                    }
                    Err(err) => return Err(peer_error("acknowledge failed", err)),
                }
            }

            printed = printed.saturating_add(1);
            if let Some(count) = args.count {
                if printed >= count {
                    return Ok(SUCCESS);
                }
            }
        }
    }

    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
