use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde_json::Value;

use crate::error::StorageError;
use crate::schema::FormSchema;

/// Fixed key the schema is persisted under.
pub const STORAGE_KEY: &str = "question-logic-builder.formSchema";

/// Local durable string slots addressed by key.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", sanitize_key(key)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;
        fs::write(self.path_for(key), value)?;
        Ok(())
    }
}

fn sanitize_key(key: &str) -> String {
    let cleaned: String = key
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.') {
                ch
            } else {
                '-'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "slot".into()
    } else {
        cleaned
    }
}

/// In-process slots. Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slots: Rc<RefCell<BTreeMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.slots.borrow().get(key).cloned()
    }

    pub fn insert_raw(&self, key: &str, value: impl Into<String>) {
        self.slots.borrow_mut().insert(key.to_string(), value.into());
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.raw(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.insert_raw(key, value);
        Ok(())
    }
}

/// Reads the persisted schema, `Ok(None)` when nothing was stored yet.
pub fn load_schema(storage: &dyn KeyValueStore) -> Result<Option<FormSchema>, StorageError> {
    let Some(raw) = storage.get(STORAGE_KEY)? else {
        return Ok(None);
    };
    let value: Value = serde_json::from_str(&raw)?;
    if !value.get("categories").is_some_and(Value::is_array) {
        return Err(StorageError::Shape(
            "expected an object with a `categories` array",
        ));
    }
    Ok(Some(serde_json::from_value(value)?))
}

pub fn save_schema(storage: &mut dyn KeyValueStore, schema: &FormSchema) -> Result<(), StorageError> {
    let raw = serde_json::to_string(schema)?;
    storage.set(STORAGE_KEY, &raw)
}
