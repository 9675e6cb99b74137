//! Queue administration commands.

use anyhow::{Context, Result};

use boundq::{Namespace, OpenOptions, QueueName};

use super::Settings;

pub fn cmd_create(ns: &Namespace, settings: &Settings) -> Result<()> {
    let handle = ns
        .open(
            &settings.name,
            OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .capacity(settings.capacity)
                .max_message_size(settings.max_message_size),
        )
        .with_context(|| format!("failed to create queue {}", settings.name))?;
    println!(
        "Queue {} ready (capacity {}, max message size {} bytes).",
        handle.name(),
        handle.capacity(),
        handle.max_message_size()
    );
    Ok(())
}

pub fn cmd_stat(ns: &Namespace, name: &str) -> Result<()> {
    let handle = ns
        .open(name, OpenOptions::new().read(true))
        .with_context(|| format!("failed to open queue {name}"))?;
    let attrs = handle
        .attributes()
        .with_context(|| format!("failed to read attributes of {name}"))?;

    println!("═══════════════════════════════════════");
    println!("  Queue {}", handle.name());
    println!("═══════════════════════════════════════");
    println!("  Capacity         : {}", attrs.capacity);
    println!("  Max message size : {} bytes", attrs.max_message_size);
    println!("  Queued           : {}", attrs.len);
    println!("  Total sent       : {}", attrs.total_sent);
    println!("  Total received   : {}", attrs.total_received);
    println!("  Store            : {}", ns.path_of(handle.name()).display());
    Ok(())
}

pub fn cmd_list(ns: &Namespace) -> Result<()> {
    let names: Vec<QueueName> = ns
        .list()
        .with_context(|| format!("failed to list {}", ns.root().display()))?;

    if names.is_empty() {
        println!("No queues in {}.", ns.root().display());
        return Ok(());
    }
    for name in &names {
        println!("{name}");
    }
    Ok(())
}

pub fn cmd_delete(ns: &Namespace, name: &str) -> Result<()> {
    ns.delete(name)
        .with_context(|| format!("failed to delete queue {name}"))?;
    println!("Deleted queue {}.", QueueName::parse(name)?);
    Ok(())
}
