use reqwest::header::HeaderMap;

/// Response headers as received, looked up case-insensitively.
///
/// Servers disagree on header-name casing and occasionally repeat a header.
/// Names are stored lowercased and `get` returns the first occurrence, so
/// `X-Cache`, `x-cache` and `X-CACHE` all resolve to the same value. A
/// missing header is `None`, never an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet {
    entries: Vec<(String, String)>,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.entries
            .push((name.as_ref().to_ascii_lowercase(), value.into()));
    }

    /// First value recorded for `name`, trimmed.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.trim())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for HeaderSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = HeaderSet::new();
        for (name, value) in iter {
            set.insert(name, value);
        }
        set
    }
}

impl From<&HeaderMap> for HeaderSet {
    fn from(map: &HeaderMap) -> Self {
        // HeaderMap iterates repeated names in insertion order.
        map.iter()
            .map(|(name, value)| {
                (
                    name.as_str(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect()
    }
}
