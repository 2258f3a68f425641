//! Status command: connect, wait for a first reading, print once, exit.

use std::time::Duration;

use plantwatch_core::Monitor;

use crate::cli::{GlobalOpts, StatusArgs};
use crate::error::CliError;
use crate::output;

pub async fn handle(monitor: &Monitor, args: StatusArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let StatusArgs { wait } = args;

    monitor.connect().await?;
    let mut stream = monitor.subscribe();

    // Wait until at least one reading has landed, bounded by --wait.
    // A window that expires without even a broker handshake is a
    // connection failure; one that expires on a live but silent broker
    // is a timeout.
    let deadline = tokio::time::sleep(Duration::from_secs(wait));
    tokio::pin!(deadline);

    let mut ever_connected = stream.current().connected;
    let snapshot = loop {
        if stream.current().last_reading_at.is_some() {
            break stream.latest();
        }
        tokio::select! {
            () = &mut deadline => {
                monitor.disconnect().await;
                if ever_connected {
                    return Err(CliError::Timeout { seconds: wait });
                }
                return Err(CliError::ConnectionFailed {
                    url: monitor.config().endpoint.to_string(),
                    reason: format!("no broker handshake within {wait}s"),
                });
            }
            changed = stream.changed() => {
                match changed {
                    Some(snap) => ever_connected |= snap.connected,
                    None => break stream.latest(),
                }
            }
        }
    };

    let color = output::should_color(&global.color);
    let out = output::render_snapshot(&global.output, &snapshot, color);
    output::print_output(&out, global.quiet);

    monitor.disconnect().await;
    Ok(())
}
