use crate::record::FunctionRecord;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use simfaas_common::FunctionConfig;
use std::sync::Arc;
use tracing::debug;

/// Concurrent name -> record store. Records are never removed.
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    functions: DashMap<String, Arc<FunctionRecord>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upserts a function. An existing record keeps its instance state,
    /// counters and timestamps; only the configuration is replaced.
    pub fn define(&self, name: &str, config: FunctionConfig) {
        match self.functions.entry(name.to_string()) {
            Entry::Occupied(entry) => {
                entry.get().replace_config(config);
                debug!("{}: updated function config {:?}", name, config);
            }
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(FunctionRecord::new(name, config)));
                debug!("{}: defined function {:?}", name, config);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<FunctionRecord>> {
        self.functions.get(name).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Visits every record known at call time until `visitor` returns false.
    ///
    /// Shard locks are released before the visitor runs, so it may call back
    /// into the registry.
    pub fn for_each<F>(&self, mut visitor: F)
    where
        F: FnMut(&Arc<FunctionRecord>) -> bool,
    {
        let records: Vec<Arc<FunctionRecord>> = self
            .functions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        for record in &records {
            if !visitor(record) {
                break;
            }
        }
    }
}
