//! ghostline-configs
//!
//! Task configuration types and loader for the online-DDL metadata store.

pub mod config;

pub use config::*;
pub use config::defaults;
