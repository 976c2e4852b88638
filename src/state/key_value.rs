use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type RowId = Uuid;

/// One toggleable name/value row. Identity is `id`, so duplicate keys are fine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValueEntry {
    pub id: RowId,
    pub key: String,
    pub value: String,
    pub enabled: bool,
}

impl KeyValueEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            key: key.into(),
            value: value.into(),
            enabled: true,
        }
    }

    pub fn disabled(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { enabled: false, ..Self::new(key, value) }
    }
}

impl Default for KeyValueEntry {
    fn default() -> Self {
        Self::new("", "")
    }
}

/// Header rows the editor can add in one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderPreset {
    Blank,
    Authorization,
    ContentType,
}

impl HeaderPreset {
    pub fn entry(self) -> KeyValueEntry {
        match self {
            HeaderPreset::Blank => KeyValueEntry::new("", ""),
            HeaderPreset::Authorization => KeyValueEntry::new("Authorization", ""),
            HeaderPreset::ContentType => KeyValueEntry::new("Content-Type", ""),
        }
    }
}

/// Ordered list of rows. Insertion order is preserved and significant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyValueList {
    entries: Vec<KeyValueEntry>,
}

impl KeyValueList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, KeyValueEntry> {
        self.entries.iter()
    }

    /// Enabled rows in list order.
    pub fn enabled(&self) -> impl Iterator<Item = &KeyValueEntry> {
        self.entries.iter().filter(|e| e.enabled)
    }

    pub fn get(&self, id: RowId) -> Option<&KeyValueEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn push(&mut self, entry: KeyValueEntry) -> RowId {
        let id = entry.id;
        self.entries.push(entry);
        id
    }

    /// Insert at `index`, clamped to the end of the list.
    pub fn insert(&mut self, index: usize, entry: KeyValueEntry) -> RowId {
        let id = entry.id;
        let index = index.min(self.entries.len());
        self.entries.insert(index, entry);
        id
    }

    /// Append an enabled row keyed `prefix + N`, with N the first number from 1
    /// not already used by a key in this list.
    pub fn add_default(&mut self, prefix: &str) -> RowId {
        let key = next_free_name(prefix, self.entries.iter().map(|e| e.key.as_str()));
        self.push(KeyValueEntry::new(key, ""))
    }

    /// Append an enabled `key_prefix + N` / `value_prefix + N` row, N chosen as in
    /// [`add_default`](Self::add_default). New query rows start as `Name1=Value1`.
    pub fn add_numbered_pair(&mut self, key_prefix: &str, value_prefix: &str) -> RowId {
        let key = next_free_name(key_prefix, self.entries.iter().map(|e| e.key.as_str()));
        let value = format!("{value_prefix}{}", &key[key_prefix.len()..]);
        self.push(KeyValueEntry::new(key, value))
    }

    pub fn remove(&mut self, id: RowId) -> Option<KeyValueEntry> {
        let idx = self.position(id)?;
        Some(self.entries.remove(idx))
    }

    /// Flip the enabled flag. Returns the new state.
    pub fn toggle(&mut self, id: RowId) -> Option<bool> {
        let entry = self.get_mut(id)?;
        entry.enabled = !entry.enabled;
        Some(entry.enabled)
    }

    pub fn set_enabled(&mut self, id: RowId, enabled: bool) -> bool {
        match self.get_mut(id) {
            Some(entry) => {
                entry.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn set_key(&mut self, id: RowId, key: impl Into<String>) -> bool {
        match self.get_mut(id) {
            Some(entry) => {
                entry.key = key.into();
                true
            }
            None => false,
        }
    }

    pub fn set_value(&mut self, id: RowId, value: impl Into<String>) -> bool {
        match self.get_mut(id) {
            Some(entry) => {
                entry.value = value.into();
                true
            }
            None => false,
        }
    }

    /// Move the row with `id` so it ends up at index `to`.
    pub fn move_row(&mut self, id: RowId, to: usize) -> bool {
        let Some(from) = self.position(id) else {
            return false;
        };
        let entry = self.entries.remove(from);
        let to = to.min(self.entries.len());
        self.entries.insert(to, entry);
        true
    }

    fn position(&self, id: RowId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    fn get_mut(&mut self, id: RowId) -> Option<&mut KeyValueEntry> {
        self.entries.iter_mut().find(|e| e.id == id)
    }
}

impl FromIterator<KeyValueEntry> for KeyValueList {
    fn from_iter<I: IntoIterator<Item = KeyValueEntry>>(iter: I) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}

impl<'a> IntoIterator for &'a KeyValueList {
    type Item = &'a KeyValueEntry;
    type IntoIter = std::slice::Iter<'a, KeyValueEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// A path component appended to the base URL. Value only, no key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSegment {
    pub id: RowId,
    pub value: String,
    pub enabled: bool,
}

impl PathSegment {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            value: value.into(),
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathSegmentList {
    segments: Vec<PathSegment>,
}

impl PathSegmentList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathSegment> {
        self.segments.iter()
    }

    pub fn enabled(&self) -> impl Iterator<Item = &PathSegment> {
        self.segments.iter().filter(|s| s.enabled)
    }

    pub fn push(&mut self, segment: PathSegment) -> RowId {
        let id = segment.id;
        self.segments.push(segment);
        id
    }

    pub fn remove(&mut self, id: RowId) -> Option<PathSegment> {
        let idx = self.segments.iter().position(|s| s.id == id)?;
        Some(self.segments.remove(idx))
    }

    pub fn toggle(&mut self, id: RowId) -> Option<bool> {
        let segment = self.segments.iter_mut().find(|s| s.id == id)?;
        segment.enabled = !segment.enabled;
        Some(segment.enabled)
    }

    pub fn set_value(&mut self, id: RowId, value: impl Into<String>) -> bool {
        match self.segments.iter_mut().find(|s| s.id == id) {
            Some(segment) => {
                segment.value = value.into();
                true
            }
            None => false,
        }
    }
}

impl FromIterator<PathSegment> for PathSegmentList {
    fn from_iter<I: IntoIterator<Item = PathSegment>>(iter: I) -> Self {
        Self { segments: iter.into_iter().collect() }
    }
}

/// First `prefix + N` (N from 1) that is not in `taken`. At most `taken.len() + 1`
/// candidates are tried, so the search always terminates.
pub fn next_free_name<'a>(prefix: &str, taken: impl Iterator<Item = &'a str>) -> String {
    let taken: Vec<&str> = taken.collect();
    (1..=taken.len() + 1)
        .map(|n| format!("{prefix}{n}"))
        .find(|candidate| !taken.contains(&candidate.as_str()))
        .unwrap_or_else(|| format!("{prefix}{}", taken.len() + 1))
}
