// Effectful Memory
//
// In-memory collaborators for every effect family. They are safe to share
// between concurrently running programs, and each carries a `Faults` table
// for making individual operations fail on demand.

use std::sync::Arc;

use effectful_core::interpreter::{
    BrokerInterpreter, CacheStoreInterpreter, ObjectStoreInterpreter, RecordStoreInterpreter,
    SessionInterpreter,
};
use effectful_core::{ConfigError, Dispatcher, InterpreterConfig};

pub mod broker;
pub mod cache;
pub mod faults;
pub mod objects;
pub mod records;
pub mod transport;

pub use broker::MemoryBroker;
pub use cache::MemoryCache;
pub use faults::{Faults, ANY};
pub use objects::{etag, MemoryObjectStore};
pub use records::MemoryRecordStore;
pub use transport::{ClientHandle, CloseFrame, MemoryTransport};

/// One in-memory collaborator per family
#[derive(Debug, Clone, Default)]
pub struct MemoryBackends {
    pub records: Arc<MemoryRecordStore>,
    pub objects: Arc<MemoryObjectStore>,
    pub cache: Arc<MemoryCache>,
    pub broker: Arc<MemoryBroker>,
    pub transport: Arc<MemoryTransport>,
}

impl MemoryBackends {
    pub fn new() -> Self {
        Self::default()
    }

    /// A dispatcher routing every family to these collaborators through the
    /// standard adapters. Fails if `config` does not validate.
    pub fn dispatcher(&self, config: InterpreterConfig) -> Result<Dispatcher, ConfigError> {
        config.validate()?;
        let config = Arc::new(config);
        Ok(Dispatcher::new(
            Arc::new(RecordStoreInterpreter::new(self.records.clone(), config.clone())),
            Arc::new(ObjectStoreInterpreter::new(self.objects.clone(), config.clone())),
            Arc::new(CacheStoreInterpreter::new(self.cache.clone(), config.clone())),
            Arc::new(BrokerInterpreter::new(self.broker.clone(), config.clone())),
            Arc::new(SessionInterpreter::new(self.transport.clone(), config)),
        ))
    }

    /// Drop every scheduled failure on every collaborator
    pub fn clear_faults(&self) {
        self.records.faults().clear();
        self.objects.faults().clear();
        self.cache.faults().clear();
        self.broker.faults().clear();
        self.transport.faults().clear();
    }
}
