pub mod build;
pub mod client;
pub mod command_line;
pub mod config;
pub mod contracts;
pub mod deploy;
pub mod error;
pub mod python;
pub mod utils;

#[cfg(all(test, unix))]
mod test_support;

pub use error::{Error, Result};
