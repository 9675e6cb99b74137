//! Receiver: wait for one message, print it, then delete the queue.

use std::time::Duration;

use anyhow::{Context, Result};

use boundq::{Message, Namespace, OpenOptions};

use super::Settings;

/// Opens read-only, creating the queue if it is missing so the receiver may
/// start before the sender.
pub fn cmd_recv(
    ns: &Namespace,
    settings: &Settings,
    keep: bool,
    timeout: Option<Duration>,
) -> Result<()> {
    let handle = ns
        .open(
            &settings.name,
            OpenOptions::new()
                .read(true)
                .create(true)
                .capacity(settings.capacity)
                .max_message_size(settings.max_message_size),
        )
        .with_context(|| format!("failed to open queue {}", settings.name))?;

    let message = match timeout {
        Some(timeout) => handle.receive_timeout(timeout),
        None => handle.receive(),
    }
    .with_context(|| format!("failed to receive from {}", settings.name))?;

    print!("{}", render(&message));
    handle.close();

    if !keep {
        ns.delete(&settings.name)
            .with_context(|| format!("failed to delete queue {}", settings.name))?;
    }
    Ok(())
}

fn render(message: &Message) -> String {
    let text = String::from_utf8_lossy(&message.payload);
    if text.ends_with('\n') {
        format!("Received message: {text}")
    } else {
        format!("Received message: {text}\n")
    }
}
