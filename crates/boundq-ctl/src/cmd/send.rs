//! Sender: open (creating if needed) and send one message.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};

use boundq::{Namespace, OpenOptions};

use super::Settings;

pub fn cmd_send(ns: &Namespace, settings: &Settings, message: Option<String>) -> Result<()> {
    let handle = ns
        .open(
            &settings.name,
            OpenOptions::new()
                .write(true)
                .create(true)
                .capacity(settings.capacity)
                .max_message_size(settings.max_message_size),
        )
        .with_context(|| format!("failed to open queue {}", settings.name))?;

    let message = match message {
        Some(text) => text,
        None => prompt_line(&mut io::stdin().lock())?,
    };

    handle
        .send(message.as_bytes(), settings.priority)
        .with_context(|| format!("failed to send to {}", settings.name))?;
    tracing::info!(
        queue = %handle.name(),
        priority = settings.priority,
        len = message.len(),
        "message sent"
    );
    handle.close();
    Ok(())
}

/// Prompt on stdout and read one line, newline included.
fn prompt_line(input: &mut impl BufRead) -> Result<String> {
    print!("Send a message: ");
    io::stdout().flush().context("failed to flush stdout")?;
    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("failed to read message from stdin")?;
    Ok(line)
}
