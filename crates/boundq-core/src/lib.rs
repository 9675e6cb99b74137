//! boundq-core — queue names, on-host layout, configuration, and the error
//! taxonomy. All other boundq crates depend on this one.

pub mod config;
pub mod error;
pub mod layout;
pub mod name;

pub use error::{ErrorKind, QueueError};
pub use name::QueueName;
