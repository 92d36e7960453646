//! Testing utilities for the dispatcher.
//!
//! Provides in-memory stand-ins for the external collaborators (failable
//! instance/consumer catalogs and a recording resync transport) plus
//! polling helpers. The integration scenarios for the dispatcher live in
//! this module as well.

mod utils;

pub use utils::{
    test_config, wait_until, RecordingTransport, TestConsumerCatalog, TestInstanceCatalog,
};
