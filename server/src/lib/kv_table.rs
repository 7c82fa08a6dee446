use dashmap::DashMap;

/// String to string map shared by every connection.
///
/// Writers take the shard's write lock and readers its read lock, so a `get`
/// issued after `set` returns always sees the new value.
#[derive(Debug, Default)]
pub struct KeyValueTable {
    entries: DashMap<String, String>,
}

impl KeyValueTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Removing a missing key is not an error.
    pub fn delete(&self, key: &str) {
        self.entries.remove(key);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
