pub use env_logger::Env;
pub use log::{debug, info, warn};

use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Initializes the logger of the host process once,
/// no matter how many times it gets called.
pub fn init_logger() {
  INIT_LOGGER.call_once(|| {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
  });
}

pub mod bridge;
pub mod client;
pub mod client_to_relay_communication;
pub mod database;
pub mod event;
pub mod event_service;
pub mod filter;
pub mod identity;
pub mod metadata_batcher;
pub mod query;
pub mod references;
pub mod relay_to_client_communication;
pub mod relay_url;
pub mod reply_chain;
pub mod schnorr;
pub mod session;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;
