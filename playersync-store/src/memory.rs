//! In-memory remote store.
//!
//! Enforces the same optimistic-concurrency contract as the authoritative
//! store process, so engine tests exercise real conflict paths. Also usable
//! as a stand-in authority in single-process deployments and benches.

use crate::{PlayerPage, RemoteStore};
use async_trait::async_trait;
use playersync_core::{
    AttributeValue, PlayerId, PlayerIdentity, PlayerRecord, RecordVersion, StoreError,
    VERSION_NONE,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

/// Page size served by [`RemoteStore::list_by_attribute`].
const PAGE_SIZE: usize = 100;

#[derive(Default)]
pub struct InMemoryRemoteStore {
    records: RwLock<HashMap<PlayerId, PlayerRecord>>,
    /// When set, every call fails with `Unavailable` - used to test the
    /// degraded-service paths.
    offline: AtomicBool,
}

impl InMemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle simulated outage.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Seed a record directly, bypassing version checks. Test setup only.
    pub fn insert_raw(&self, mut record: PlayerRecord) {
        if record.version == VERSION_NONE {
            record.version = 1;
        }
        self.records
            .write()
            .expect("store lock poisoned")
            .insert(record.id(), record);
    }

    pub fn len(&self) -> usize {
        self.records.read().expect("store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable {
                reason: "simulated outage".into(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemoteStore {
    async fn fetch(&self, id: PlayerId) -> Result<PlayerRecord, StoreError> {
        self.check_online()?;
        self.records
            .read()
            .expect("store lock poisoned")
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound { id })
    }

    async fn fetch_by_name(&self, name: &str) -> Result<PlayerRecord, StoreError> {
        self.check_online()?;
        self.records
            .read()
            .expect("store lock poisoned")
            .values()
            .find(|record| record.identity.name.eq_ignore_ascii_case(name))
            .cloned()
            .ok_or_else(|| StoreError::NameNotFound { name: name.into() })
    }

    async fn write(
        &self,
        record: &PlayerRecord,
        expected_version: RecordVersion,
    ) -> Result<RecordVersion, StoreError> {
        self.check_online()?;
        let mut records = self.records.write().expect("store lock poisoned");
        let current = records.get(&record.id()).map(|r| r.version);
        match current {
            None if expected_version == VERSION_NONE => {
                let mut committed = record.clone();
                committed.version = 1;
                records.insert(committed.id(), committed);
                Ok(1)
            }
            None => Err(StoreError::NotFound { id: record.id() }),
            Some(actual) if actual == expected_version => {
                let mut committed = record.clone();
                committed.version = actual + 1;
                let new_version = committed.version;
                records.insert(committed.id(), committed);
                Ok(new_version)
            }
            Some(actual) => Err(StoreError::VersionConflict {
                id: record.id(),
                expected: expected_version,
                actual,
            }),
        }
    }

    async fn delete(&self, id: PlayerId) -> Result<(), StoreError> {
        self.check_online()?;
        self.records
            .write()
            .expect("store lock poisoned")
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound { id })
    }

    async fn list_by_attribute(
        &self,
        key: &str,
        value: &AttributeValue,
        page_token: Option<&str>,
    ) -> Result<PlayerPage, StoreError> {
        self.check_online()?;
        let offset: usize = match page_token {
            Some(token) => token.parse().map_err(|_| StoreError::Decode {
                reason: format!("bad page token {token:?}"),
            })?,
            None => 0,
        };
        let records = self.records.read().expect("store lock poisoned");
        let mut matches: Vec<PlayerIdentity> = records
            .values()
            .filter(|record| record.attribute(key) == Some(value))
            .map(|record| record.identity.clone())
            .collect();
        // stable order across pages
        matches.sort_by_key(|identity| identity.id);

        let page: Vec<PlayerIdentity> =
            matches.iter().skip(offset).take(PAGE_SIZE).cloned().collect();
        let next_offset = offset + page.len();
        let next_page_token = if next_offset < matches.len() {
            Some(next_offset.to_string())
        } else {
            None
        };
        Ok(PlayerPage {
            players: page,
            next_page_token,
        })
    }
}
