pub mod client;
pub mod config;
pub mod diff;
pub mod error;
pub mod filter;
pub mod item;
pub mod util;

pub use client::IcingaClient;
pub use config::ClientConfig;
pub use error::{IcingaError, IcingaResult};
pub use item::{CurrentState, Item, ItemKind};
