//! CLI command implementations.
//!
//! - **discover**: Run discovery against an inventory and write a report
//! - **init**: Initialize a new lambdamap configuration file

pub mod discover;
pub mod init;

pub use discover::{handle_discover, DiscoverConfig};
pub use init::init_config;
