//! CLI command modules.

use boundq_core::config::QueueConfig;

use crate::Flags;

pub mod config;
pub mod queue;
pub mod recv;
pub mod send;

/// Queue parameters after applying command-line flags over config.
#[derive(Debug, Clone)]
pub struct Settings {
    pub name: String,
    pub capacity: usize,
    pub max_message_size: usize,
    pub priority: u32,
}

impl Settings {
    pub fn resolve(config: &QueueConfig, flags: &Flags) -> Self {
        Self {
            name: flags.name.clone().unwrap_or_else(|| config.name.clone()),
            capacity: flags.capacity.unwrap_or(config.capacity),
            max_message_size: flags.max_size.unwrap_or(config.max_message_size),
            priority: flags.priority.unwrap_or(config.priority),
        }
    }
}
