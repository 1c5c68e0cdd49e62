//! Built-in DNS providers
//!
//! - [`LogProvider`]: writes intended updates to the log and changes nothing

mod log_provider;

pub use log_provider::{LogProvider, LogProviderFactory};
