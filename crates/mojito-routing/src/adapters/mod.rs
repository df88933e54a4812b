//! # Adapters
//!
//! Concrete implementations of the driven ports.
//!
//! - `SystemTimeSource` - wall clock
//! - `StaticConfigProvider` / `TomlConfigProvider` - configuration
//!   (the TOML loader requires the `toml-config` feature)
//! - `ChannelListener` - forwards route table events to a tokio channel

mod config;
mod listener;
mod time;

pub use config::StaticConfigProvider;
#[cfg(feature = "toml-config")]
pub use config::TomlConfigProvider;
pub use listener::ChannelListener;
pub use time::SystemTimeSource;
