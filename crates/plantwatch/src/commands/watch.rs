//! Watch command: stream snapshots until Ctrl-C or a count is reached.

use plantwatch_core::Monitor;

use crate::cli::{GlobalOpts, WatchArgs};
use crate::error::CliError;
use crate::output;

pub async fn handle(monitor: &Monitor, args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let WatchArgs { count } = args;

    monitor.connect().await?;
    let mut stream = monitor.subscribe();
    let color = output::should_color(&global.color);

    // Show the initial (possibly all-sentinel) snapshot immediately.
    let out = output::render_snapshot(&global.output, stream.current(), color);
    output::print_output(&out, global.quiet);

    // A zero budget means the initial snapshot only.
    if count == Some(0) {
        monitor.disconnect().await;
        return Ok(());
    }

    let mut remaining = count;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::debug!("interrupt received, shutting down");
                break;
            }
            changed = stream.changed() => {
                let Some(snapshot) = changed else { break };
                let out = output::render_snapshot(&global.output, &snapshot, color);
                output::print_output(&out, global.quiet);

                if let Some(ref mut n) = remaining {
                    *n = n.saturating_sub(1);
                    if *n == 0 {
                        break;
                    }
                }
            }
        }
    }

    monitor.disconnect().await;
    Ok(())
}
