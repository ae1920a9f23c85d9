use std::sync::Arc;

use pitchfund_core::RecordStore;
use pitchfund_eventstore::InMemoryRecordStore;
use tracing::{info, warn};

use crate::config::RecordStoreConfig;
use crate::rest_store::RestRecordStore;

pub fn connect_record_store(config: &RecordStoreConfig) -> Arc<dyn RecordStore> {
    match config {
        RecordStoreConfig::Rest { url, service_key } => {
            info!(%url, "using REST record store");
            Arc::new(RestRecordStore::new(url, service_key))
        }
        RecordStoreConfig::Memory => {
            warn!("using in-memory record store; data is lost on restart");
            Arc::new(InMemoryRecordStore::new())
        }
    }
}
