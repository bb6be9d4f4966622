//! Dictionary-compressed key store on LMDB
//!
//! A [`KeyStore`] is a single LMDB file holding two tables:
//!
//! - `data`: user key (UTF-8) to compressed record
//! - `key_map`: serialized field name to its encoded dictionary id
//!
//! Reads and writes go through transactions. Readers see a consistent
//! snapshot and never block; one writer at a time is serialized by LMDB.
//! Dictionary entries created inside a write transaction become visible to
//! the in-memory dictionary only once that transaction commits.
//!
//! The optional read-through cache is only invalidated by writes made through
//! this handle. Writes committed by another process are not seen by cached
//! keys until the store is reopened.

use crate::codec::{self, Record};
use crate::dictionary::{encode_index, KeyDictionary};
use ahash::AHashMap;
use ebiodiv_core::{Error, Result};
use heed::types::{Bytes, Str};
use heed::{Database, Env, EnvFlags, EnvOpenOptions, RoTxn, RwTxn, WithTls};
use parking_lot::RwLock;
use rmpv::Value as Packed;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const DB_DATA: &str = "data";
const DB_KEY_MAP: &str = "key_map";

/// Map sizes are rounded up to this, a multiple of every common page size
const MAP_ALIGNMENT: usize = 64 * 1024;

pub const DEFAULT_MAP_SIZE: usize = 1 << 30;
pub const DEFAULT_MAX_DBS: u32 = 255;

fn storage(e: heed::Error) -> Error {
    Error::Storage(e.to_string())
}

/// Configuration for opening a [`KeyStore`]
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Open without write access; a missing file is an error, never created
    pub read_only: bool,
    /// Keep decoded records in memory after the first read
    pub cache: bool,
    /// Upper bound of the memory map in bytes
    pub map_size: usize,
    pub max_dbs: u32,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            read_only: false,
            cache: true,
            map_size: DEFAULT_MAP_SIZE,
            max_dbs: DEFAULT_MAX_DBS,
        }
    }
}

impl StoreOptions {
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            cache: false,
            ..Self::default()
        }
    }
}

#[derive(Default)]
struct Cache {
    entries: AHashMap<String, Record>,
    /// Bumped on every invalidation so that a read racing a write never
    /// caches the value it saw before the write
    generation: u64,
}

/// Embedded transactional key-value store of JSON records
pub struct KeyStore {
    path: PathBuf,
    env: Env,
    data_db: Database<Str, Bytes>,
    key_map_db: Database<Bytes, Bytes>,
    dictionary: RwLock<KeyDictionary>,
    cache: Option<RwLock<Cache>>,
    read_only: bool,
}

impl KeyStore {
    pub fn open<P: AsRef<Path>>(path: P, options: StoreOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if options.read_only && !path.is_file() {
            return Err(Error::StoreNotFound(path));
        }

        let mut flags = EnvFlags::NO_SUB_DIR;
        if options.read_only {
            flags |= EnvFlags::READ_ONLY;
        }
        let map_size = options.map_size.max(1).div_ceil(MAP_ALIGNMENT) * MAP_ALIGNMENT;

        let env = unsafe {
            let mut env_options = EnvOpenOptions::new();
            env_options.map_size(map_size).max_dbs(options.max_dbs).flags(flags);
            env_options.open(&path).map_err(storage)?
        };

        let (data_db, key_map_db) = if options.read_only {
            let rtxn = env.read_txn().map_err(storage)?;
            let data_db = env
                .open_database::<Str, Bytes>(&rtxn, Some(DB_DATA))
                .map_err(storage)?
                .ok_or_else(|| Error::Storage(format!("missing table {}", DB_DATA)))?;
            let key_map_db = env
                .open_database::<Bytes, Bytes>(&rtxn, Some(DB_KEY_MAP))
                .map_err(storage)?
                .ok_or_else(|| Error::Storage(format!("missing table {}", DB_KEY_MAP)))?;
            rtxn.commit().map_err(storage)?;
            (data_db, key_map_db)
        } else {
            let mut wtxn = env.write_txn().map_err(storage)?;
            let data_db = env
                .create_database::<Str, Bytes>(&mut wtxn, Some(DB_DATA))
                .map_err(storage)?;
            let key_map_db = env
                .create_database::<Bytes, Bytes>(&mut wtxn, Some(DB_KEY_MAP))
                .map_err(storage)?;
            wtxn.commit().map_err(storage)?;
            (data_db, key_map_db)
        };

        let store = Self {
            path,
            env,
            data_db,
            key_map_db,
            dictionary: RwLock::new(KeyDictionary::new()),
            cache: options.cache.then(|| RwLock::new(Cache::default())),
            read_only: options.read_only,
        };

        let rtxn = store.env.read_txn().map_err(storage)?;
        store.merge_dictionary(store.key_map_db.iter(&rtxn).map_err(storage)?, None)?;
        info!(
            path = %store.path.display(),
            read_only = store.read_only,
            entries = store.data_db.len(&rtxn).map_err(storage)?,
            fields = store.dictionary.read().len(),
            "Opened key store"
        );
        drop(rtxn);

        Ok(store)
    }

    /// Read every record of a store opened read-only and without cache
    pub fn load<P: AsRef<Path>>(path: P) -> Result<BTreeMap<String, Record>> {
        let store = Self::open(path, StoreOptions::read_only())?;
        let records = store.read()?.items()?.collect::<Result<BTreeMap<_, _>>>()?;
        store.close();
        Ok(records)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn read(&self) -> Result<ReadTxn<'_>> {
        let txn = self.env.read_txn().map_err(storage)?;
        Ok(ReadTxn { store: self, txn })
    }

    /// Start the single write transaction
    ///
    /// Blocks while another writer is active, including one held by the
    /// calling thread: never nest this inside an open [`WriteTxn`].
    pub fn write(&self) -> Result<WriteTxn<'_>> {
        if self.read_only {
            return Err(Error::ReadOnly(self.path.clone()));
        }
        let txn = self.env.write_txn().map_err(storage)?;
        Ok(WriteTxn {
            store: self,
            txn,
            pending: KeyDictionary::new(),
            touched: Vec::new(),
            cleared: false,
        })
    }

    pub fn get(&self, key: &str) -> Result<Option<Record>> {
        let Some(cache) = &self.cache else {
            return self.read()?.get(key);
        };

        let generation = {
            let cache = cache.read();
            if let Some(record) = cache.entries.get(key) {
                return Ok(Some(record.clone()));
            }
            cache.generation
        };

        let record = self.read()?.get(key)?;
        if let Some(record) = &record {
            let mut cache = cache.write();
            if cache.generation == generation {
                cache.entries.insert(key.to_string(), record.clone());
            }
        }
        Ok(record)
    }

    /// Record under `key`, or `default` when absent
    pub fn get_or(&self, key: &str, default: Record) -> Result<Record> {
        Ok(self.get(key)?.unwrap_or(default))
    }

    /// Record under `key`; a missing key is an error
    pub fn try_get(&self, key: &str) -> Result<Record> {
        self.get(key)?
            .ok_or_else(|| Error::KeyNotFound(key.to_string()))
    }

    pub fn contains_key(&self, key: &str) -> Result<bool> {
        if let Some(cache) = &self.cache {
            if cache.read().entries.contains_key(key) {
                return Ok(true);
            }
        }
        self.read()?.contains_key(key)
    }

    pub fn set(&self, key: &str, record: &Record) -> Result<()> {
        let mut txn = self.write()?;
        txn.set(key, record)?;
        txn.commit()
    }

    pub fn delete(&self, key: &str) -> Result<()> {
        let mut txn = self.write()?;
        txn.delete(key)?;
        txn.commit()
    }

    /// Write many records in one transaction; returns how many were written
    pub fn store<I, K>(&self, records: I) -> Result<usize>
    where
        I: IntoIterator<Item = (K, Record)>,
        K: AsRef<str>,
    {
        let mut txn = self.write()?;
        let mut count = 0;
        for (key, record) in records {
            txn.set(key.as_ref(), &record)?;
            count += 1;
        }
        txn.commit()?;
        debug!(count, "Stored records");
        Ok(count)
    }

    /// Remove every record; the key dictionary is kept
    pub fn drop_all(&self) -> Result<()> {
        let mut txn = self.write()?;
        txn.clear()?;
        txn.commit()?;
        info!(path = %self.path.display(), "Dropped all records");
        Ok(())
    }

    pub fn len(&self) -> Result<u64> {
        self.read()?.len()
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Field names and their encoded ids, as persisted
    pub fn dictionary(&self) -> Result<Vec<(String, Vec<u8>)>> {
        let txn = self.env.read_txn().map_err(storage)?;
        let mut entries = Vec::new();
        for entry in self.key_map_db.iter(&txn).map_err(storage)? {
            let (name, code) = entry.map_err(storage)?;
            entries.push((codec::unpack_name(name)?, code.to_vec()));
        }
        Ok(entries)
    }

    pub fn dictionary_len(&self) -> Result<u64> {
        let txn = self.env.read_txn().map_err(storage)?;
        self.key_map_db.len(&txn).map_err(storage)
    }

    /// Wait for the environment to be fully closed
    pub fn close(self) {
        let KeyStore { env, path, .. } = self;
        env.prepare_for_closing().wait();
        info!(path = %path.display(), "Closed key store");
    }

    /// Merge persisted dictionary entries into memory
    ///
    /// Inside a write transaction the table also shows that transaction's
    /// own uncommitted names; they are passed as `pending` and skipped, so
    /// only committed entries ever reach the shared dictionary.
    fn merge_dictionary<'t, I>(&self, entries: I, pending: Option<&KeyDictionary>) -> Result<()>
    where
        I: IntoIterator<Item = heed::Result<(&'t [u8], &'t [u8])>>,
    {
        let mut fresh = KeyDictionary::new();
        for entry in entries {
            let (name, code) = entry.map_err(storage)?;
            let name = codec::unpack_name(name)?;
            if pending.is_some_and(|p| p.code(&name).is_some()) {
                continue;
            }
            fresh.insert(name, code.to_vec());
        }
        debug!(fields = fresh.len(), "Loaded key dictionary");
        self.dictionary.write().merge(fresh);
        Ok(())
    }

    fn field_name(&self, code: &[u8], pending: Option<&KeyDictionary>) -> Option<String> {
        if let Some(name) = pending.and_then(|p| p.name(code)) {
            return Some(name.to_string());
        }
        self.dictionary.read().name(code).map(str::to_string)
    }

    /// Decode a stored value; `reload` refreshes the dictionary on an unknown code
    fn decode(
        &self,
        bytes: &[u8],
        pending: Option<&KeyDictionary>,
        reload: &dyn Fn() -> Result<()>,
    ) -> Result<Record> {
        let entries = match codec::decompress(bytes)? {
            Packed::Map(entries) => entries,
            other => return Err(Error::CorruptRecord(format!("expected a map, got {}", other))),
        };

        let mut record = Record::new();
        let mut reloaded = false;
        for (code, value) in entries {
            let code = match code {
                Packed::Binary(code) => code,
                other => {
                    return Err(Error::CorruptRecord(format!("invalid field code {}", other)))
                }
            };
            let name = match self.field_name(&code, pending) {
                Some(name) => name,
                None if !reloaded => {
                    // written by another process since the dictionary was loaded
                    reloaded = true;
                    reload()?;
                    self.field_name(&code, pending).ok_or_else(|| unknown_code(&code))?
                }
                None => return Err(unknown_code(&code)),
            };
            record.insert(name, codec::from_packed(value)?);
        }
        Ok(record)
    }

    fn invalidate(&self, keys: Vec<String>, cleared: bool) {
        let Some(cache) = &self.cache else {
            return;
        };
        if keys.is_empty() && !cleared {
            return;
        }
        let mut cache = cache.write();
        if cleared {
            cache.entries.clear();
        } else {
            for key in &keys {
                cache.entries.remove(key);
            }
        }
        cache.generation += 1;
    }
}

fn unknown_code(code: &[u8]) -> Error {
    Error::CorruptRecord(format!("unknown field code {:02x?}", code))
}

/// Consistent read snapshot of a [`KeyStore`]
pub struct ReadTxn<'s> {
    store: &'s KeyStore,
    txn: RoTxn<'s, WithTls>,
}

impl<'s> ReadTxn<'s> {
    fn decode(&self, bytes: &[u8]) -> Result<Record> {
        self.store.decode(bytes, None, &|| {
            self.store
                .merge_dictionary(self.store.key_map_db.iter(&self.txn).map_err(storage)?, None)
        })
    }

    pub fn get(&self, key: &str) -> Result<Option<Record>> {
        match self.store.data_db.get(&self.txn, key).map_err(storage)? {
            Some(bytes) => Ok(Some(self.decode(bytes)?)),
            None => Ok(None),
        }
    }

    pub fn contains_key(&self, key: &str) -> Result<bool> {
        Ok(self.store.data_db.get(&self.txn, key).map_err(storage)?.is_some())
    }

    pub fn len(&self) -> Result<u64> {
        self.store.data_db.len(&self.txn).map_err(storage)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Lazily decoded `(key, record)` pairs in key order
    pub fn items(&self) -> Result<impl Iterator<Item = Result<(String, Record)>> + '_> {
        let iter = self.store.data_db.iter(&self.txn).map_err(storage)?;
        Ok(iter.map(move |entry| {
            let (key, bytes) = entry.map_err(storage)?;
            let record = self.decode(bytes)?;
            Ok((key.to_string(), record))
        }))
    }

    pub fn keys(&self) -> Result<impl Iterator<Item = Result<String>> + '_> {
        let iter = self.store.data_db.iter(&self.txn).map_err(storage)?;
        Ok(iter.map(|entry| entry.map(|(key, _)| key.to_string()).map_err(storage)))
    }

    pub fn values(&self) -> Result<impl Iterator<Item = Result<Record>> + '_> {
        Ok(self.items()?.map(|item| item.map(|(_, record)| record)))
    }
}

/// The single writer of a [`KeyStore`]
///
/// Dropping it without [`commit`](WriteTxn::commit) aborts every change,
/// dictionary entries included.
pub struct WriteTxn<'s> {
    store: &'s KeyStore,
    txn: RwTxn<'s>,
    pending: KeyDictionary,
    touched: Vec<String>,
    cleared: bool,
}

impl<'s> WriteTxn<'s> {
    /// Read through this transaction, its own uncommitted writes included
    pub fn get(&self, key: &str) -> Result<Option<Record>> {
        let Some(bytes) = self.store.data_db.get(&self.txn, key).map_err(storage)? else {
            return Ok(None);
        };
        let record = self.store.decode(bytes, Some(&self.pending), &|| {
            let entries = self.store.key_map_db.iter(&self.txn).map_err(storage)?;
            self.store.merge_dictionary(entries, Some(&self.pending))
        })?;
        Ok(Some(record))
    }

    pub fn set(&mut self, key: &str, record: &Record) -> Result<()> {
        let bytes = self.encode(record)?;
        self.store.data_db.put(&mut self.txn, key, &bytes).map_err(storage)?;
        self.touched.push(key.to_string());
        Ok(())
    }

    pub fn delete(&mut self, key: &str) -> Result<()> {
        if !self.store.data_db.delete(&mut self.txn, key).map_err(storage)? {
            return Err(Error::KeyNotFound(key.to_string()));
        }
        self.touched.push(key.to_string());
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.store.data_db.clear(&mut self.txn).map_err(storage)?;
        self.cleared = true;
        Ok(())
    }

    pub fn commit(self) -> Result<()> {
        let WriteTxn {
            store,
            txn,
            pending,
            touched,
            cleared,
        } = self;
        txn.commit().map_err(storage)?;
        if !pending.is_empty() {
            debug!(fields = pending.len(), "Committed new dictionary entries");
            store.dictionary.write().merge(pending);
        }
        store.invalidate(touched, cleared);
        Ok(())
    }

    fn encode(&mut self, record: &Record) -> Result<Vec<u8>> {
        let mut entries = Vec::with_capacity(record.len());
        for (name, value) in record {
            let code = self.code_for(name)?;
            entries.push((Packed::Binary(code), codec::to_packed(value)));
        }
        codec::compress(&Packed::Map(entries))
    }

    /// Dictionary id of a field name, assigning the next one if it is new
    fn code_for(&mut self, name: &str) -> Result<Vec<u8>> {
        if let Some(code) = self.store.dictionary.read().code(name) {
            return Ok(code.to_vec());
        }
        if let Some(code) = self.pending.code(name) {
            return Ok(code.to_vec());
        }

        let packed_name = codec::pack_name(name)?;
        let existing = self
            .store
            .key_map_db
            .get(&self.txn, &packed_name)
            .map_err(storage)?
            .map(<[u8]>::to_vec);
        if let Some(code) = existing {
            self.pending.insert(name.to_string(), code.clone());
            return Ok(code);
        }

        let index = self.store.key_map_db.len(&self.txn).map_err(storage)?;
        let code = encode_index(index);
        self.store
            .key_map_db
            .put(&mut self.txn, &packed_name, &code)
            .map_err(storage)?;
        debug!(field = name, index, "New dictionary entry");
        self.pending.insert(name.to_string(), code.clone());
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn record(value: serde_json::Value) -> Record {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    fn open(dir: &TempDir) -> KeyStore {
        KeyStore::open(dir.path().join("store.lmdb"), StoreOptions::default()).unwrap()
    }

    #[test]
    fn test_roundtrip_across_reopen() {
        let dir = TempDir::new().unwrap();
        let value = record(json!({"match": true, "nested": {"deep": [1, 2.5, null]}, "n": -3}));

        let store = open(&dir);
        store.set("20,42", &value).unwrap();
        assert_eq!(store.get("20,42").unwrap(), Some(value.clone()));
        store.close();

        let store = open(&dir);
        assert_eq!(store.get("20,42").unwrap(), Some(value));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_missing_keys() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        let default = record(json!({"match": null}));

        assert_eq!(store.get("nope").unwrap(), None);
        assert_eq!(store.get_or("nope", default.clone()).unwrap(), default);
        assert!(matches!(store.try_get("nope"), Err(Error::KeyNotFound(_))));
        assert!(matches!(store.delete("nope"), Err(Error::KeyNotFound(_))));
        assert!(!store.contains_key("nope").unwrap());
    }

    #[test]
    fn test_dictionary_is_append_only() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);

        store.set("a", &record(json!({"genus": "Carabus", "family": "Carabidae"}))).unwrap();
        let before = store.dictionary().unwrap();
        store.delete("a").unwrap();
        store.set("b", &record(json!({"genus": "Helix", "country": "CH"}))).unwrap();
        store.set("c", &record(json!({"family": "Helicidae"}))).unwrap();

        assert_eq!(store.dictionary_len().unwrap(), 3);
        let after = store.dictionary().unwrap();
        for entry in &before {
            assert!(after.contains(entry), "{:?} changed", entry);
        }
    }

    #[test]
    fn test_only_top_level_names_are_encoded() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        store.set("k", &record(json!({"outer": {"inner": 1, "other": 2}}))).unwrap();
        let names: Vec<_> = store.dictionary().unwrap().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["outer".to_string()]);
    }

    #[test]
    fn test_code_widths_in_store() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        let wide: Record = (0..300).map(|i| (format!("f{i}"), json!(i))).collect();
        store.set("wide", &wide).unwrap();

        let codes: Vec<_> = store.dictionary().unwrap().into_iter().map(|(_, c)| c).collect();
        assert_eq!(codes.len(), 300);
        assert!(codes.contains(&vec![0x00, 0xff]));
        assert!(codes.contains(&vec![0x01, 0x00, 0x01]));
        assert_eq!(store.get("wide").unwrap(), Some(wide));
    }

    #[test]
    fn test_aborted_write_keeps_nothing() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        {
            let mut txn = store.write().unwrap();
            txn.set("k", &record(json!({"fresh": 1}))).unwrap();
            assert_eq!(txn.get("k").unwrap(), Some(record(json!({"fresh": 1}))));
        }
        assert_eq!(store.dictionary_len().unwrap(), 0);
        assert_eq!(store.get("k").unwrap(), None);

        store.set("k", &record(json!({"other": 1}))).unwrap();
        assert_eq!(store.dictionary().unwrap()[0].1, encode_index(0));
    }

    #[test]
    fn test_snapshot_isolation() {
        let dir = TempDir::new().unwrap();
        let store = KeyStore::open(
            dir.path().join("store.lmdb"),
            StoreOptions { cache: false, ..StoreOptions::default() },
        )
        .unwrap();
        store.set("k", &record(json!({"v": 1}))).unwrap();

        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::scope(|s| {
            s.spawn(|| {
                let snapshot = store.read().unwrap();
                tx.send(()).unwrap();
                std::thread::sleep(std::time::Duration::from_millis(50));
                assert_eq!(snapshot.get("k").unwrap(), Some(record(json!({"v": 1}))));
            });
            rx.recv().unwrap();
            store.set("k", &record(json!({"v": 2}))).unwrap();
        });
        assert_eq!(store.get("k").unwrap(), Some(record(json!({"v": 2}))));
    }

    #[test]
    fn test_oversized_record_is_refused() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.lmdb");
        let store = KeyStore::open(&path, StoreOptions::default()).unwrap();
        let blob = record(json!({"blob": "a".repeat(2 * codec::MAX_DECOMPRESSED_SIZE)}));

        assert!(matches!(store.set("big", &blob), Err(Error::Serialization(_))));
        store.set("small", &record(json!({"blob": "a"}))).unwrap();
        store.close();

        let store = KeyStore::open(&path, StoreOptions::default()).unwrap();
        assert_eq!(store.get("big").unwrap(), None);
        let values = store.read().unwrap().values().unwrap().collect::<Result<Vec<_>>>();
        assert_eq!(values.unwrap().len(), 1);
    }

    #[test]
    fn test_cache_sees_local_writes() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        store.set("k", &record(json!({"v": 1}))).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(record(json!({"v": 1}))));

        store.set("k", &record(json!({"v": 2}))).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(record(json!({"v": 2}))));

        store.delete("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_bulk_store_and_iteration() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        let written = store
            .store((0..5).map(|i| (format!("k{i}"), record(json!({"i": i})))))
            .unwrap();
        assert_eq!(written, 5);

        let txn = store.read().unwrap();
        let keys = txn.keys().unwrap().collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(keys, vec!["k0", "k1", "k2", "k3", "k4"]);
        let values = txn.values().unwrap().collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(values[3], record(json!({"i": 3})));
        assert_eq!(txn.items().unwrap().count(), 5);
    }

    #[test]
    fn test_drop_all_keeps_dictionary() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        store.set("a", &record(json!({"x": 1, "y": 2}))).unwrap();
        assert!(store.get("a").unwrap().is_some());

        store.drop_all().unwrap();
        assert!(store.is_empty().unwrap());
        assert_eq!(store.get("a").unwrap(), None);
        assert_eq!(store.dictionary_len().unwrap(), 2);
    }

    #[test]
    fn test_read_only_missing_file_not_created() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.lmdb");
        assert!(matches!(
            KeyStore::open(&path, StoreOptions::read_only()),
            Err(Error::StoreNotFound(_))
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_load_and_read_only_writes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.lmdb");
        let store = KeyStore::open(&path, StoreOptions::default()).unwrap();
        store.set("a", &record(json!({"x": 1}))).unwrap();
        store.close();

        let records = KeyStore::load(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records["a"], record(json!({"x": 1})));

        let store = KeyStore::open(&path, StoreOptions::read_only()).unwrap();
        assert!(matches!(
            store.set("b", &record(json!({"x": 2}))),
            Err(Error::ReadOnly(_))
        ));
    }

    #[test]
    fn test_corrupt_value_is_reported() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        let mut txn = store.env.write_txn().unwrap();
        store.data_db.put(&mut txn, "bad", b"garbage").unwrap();
        txn.commit().unwrap();

        assert!(matches!(store.get("bad"), Err(Error::CorruptRecord(_))));
        assert!(store.contains_key("bad").unwrap());
    }

    #[test]
    fn test_unknown_code_triggers_dictionary_reload() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);

        // another writer adds a field the in-memory dictionary never saw
        let code = encode_index(0);
        let value = Packed::Map(vec![(Packed::Binary(code.clone()), Packed::from("x"))]);
        let mut txn = store.env.write_txn().unwrap();
        store
            .key_map_db
            .put(&mut txn, &codec::pack_name("late").unwrap(), &code)
            .unwrap();
        store
            .data_db
            .put(&mut txn, "k", &codec::compress(&value).unwrap())
            .unwrap();
        txn.commit().unwrap();

        assert_eq!(store.get("k").unwrap(), Some(record(json!({"late": "x"}))));

        // a second new name must not reuse the id taken by the other writer
        store.set("m", &record(json!({"next": 1}))).unwrap();
        assert_eq!(store.dictionary_len().unwrap(), 2);
        assert_eq!(store.get("k").unwrap(), Some(record(json!({"late": "x"}))));
    }

    #[test]
    fn test_reload_in_aborted_write_keeps_ids_unique() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.lmdb");
        let store = KeyStore::open(&path, StoreOptions::default()).unwrap();

        // another writer adds "late" and a record using it
        let code = encode_index(0);
        let value = Packed::Map(vec![(Packed::Binary(code.clone()), Packed::from("x"))]);
        let mut txn = store.env.write_txn().unwrap();
        store
            .key_map_db
            .put(&mut txn, &codec::pack_name("late").unwrap(), &code)
            .unwrap();
        store
            .data_db
            .put(&mut txn, "k", &codec::compress(&value).unwrap())
            .unwrap();
        txn.commit().unwrap();

        {
            let mut txn = store.write().unwrap();
            txn.set("m", &record(json!({"fresh": 1}))).unwrap();
            // the unknown code forces a reload while "fresh" is uncommitted
            assert_eq!(txn.get("k").unwrap(), Some(record(json!({"late": "x"}))));
        }

        store.set("n", &record(json!({"other": 1}))).unwrap();
        store.set("p", &record(json!({"fresh": 2}))).unwrap();
        assert_eq!(store.get("p").unwrap(), Some(record(json!({"fresh": 2}))));
        assert_eq!(store.get("n").unwrap(), Some(record(json!({"other": 1}))));

        let entries = store.dictionary().unwrap();
        assert_eq!(entries.len(), 3);
        let codes: std::collections::HashSet<_> = entries.iter().map(|(_, c)| c).collect();
        assert_eq!(codes.len(), 3);
        store.close();

        let store = KeyStore::open(&path, StoreOptions::default()).unwrap();
        assert_eq!(store.get("p").unwrap(), Some(record(json!({"fresh": 2}))));
        assert_eq!(store.get("k").unwrap(), Some(record(json!({"late": "x"}))));
    }
}
