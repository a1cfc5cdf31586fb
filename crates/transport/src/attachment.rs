//! Key/value side data carried next to a payload.

use std::collections::BTreeMap;

use bytes::Bytes;

/// Out-of-band metadata carried next to a query or reply payload.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Attachment {
    entries: BTreeMap<String, Bytes>,
}

impl Attachment {
    /// Creates an empty attachment.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Inserts an entry, replacing any previous value under the same key.
    pub fn insert<K>(&mut self, key: K, value: Bytes) -> Option<Bytes>
    where
        K: Into<String>,
    {
        self.entries.insert(key.into(), value)
    }

    /// Returns the entry stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Bytes> {
        self.entries.get(key)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the attachment has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K> FromIterator<(K, Bytes)> for Attachment
where
    K: Into<String>,
{
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = (K, Bytes)>,
    {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
