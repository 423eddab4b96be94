//! Infrastructure configuration modules.

pub mod enrichment;
pub mod logging;
pub mod notifier;
pub mod reconnection;
pub mod settings;
pub mod source;
pub mod store;
