use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
/// Hosts for which connections bypass the proxy.
///
/// Matching is exact string equality against the host
/// as given by the caller: `localhost` does not match `127.0.0.1`,
/// and there are no wildcards.
pub struct IgnoreSet {
    hosts: HashSet<String>,
}

impl IgnoreSet {
    /// Creates a new empty [`IgnoreSet`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a host, returns `false` if it was already present.
    pub fn insert(&mut self, host: impl Into<String>) -> bool {
        self.hosts.insert(host.into())
    }

    /// Remove a host, returns `false` if it was not present.
    pub fn remove(&mut self, host: &str) -> bool {
        self.hosts.remove(host)
    }

    #[must_use]
    pub fn contains(&self, host: &str) -> bool {
        self.hosts.contains(host)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.hosts.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for IgnoreSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self {
            hosts: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl<S: Into<String>> Extend<S> for IgnoreSet {
    fn extend<T: IntoIterator<Item = S>>(&mut self, iter: T) {
        self.hosts.extend(iter.into_iter().map(Into::into));
    }
}
