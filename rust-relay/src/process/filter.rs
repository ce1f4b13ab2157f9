//! Content type and property whitelists.
//!
//! Both whitelists follow the same convention: an empty whitelist allows
//! everything, so operators can switch filtering off through configuration.

use std::fmt;

use thiserror::Error;

/// Returned when a whitelist is configured with the same entry twice.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("duplicate whitelist entry '{0}'")]
pub struct DuplicateEntry(pub String);

/// Ordered, de-duplicated allow-list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Whitelist(Vec<String>);

impl Whitelist {
    /// Build a whitelist, rejecting duplicates instead of dropping them.
    pub fn new<I, S>(entries: I) -> Result<Self, DuplicateEntry>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list: Vec<String> = Vec::new();
        for entry in entries {
            let entry = entry.into();
            if list.contains(&entry) {
                return Err(DuplicateEntry(entry));
            }
            list.push(entry);
        }
        Ok(Self(list))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, value: &str) -> bool {
        self.0.iter().any(|entry| entry == value)
    }

    pub fn entries(&self) -> &[String] {
        &self.0
    }

    /// Join the entries with `separator`, for diagnostics.
    pub fn join(&self, separator: &str) -> String {
        self.0.join(separator)
    }
}

impl fmt::Display for Whitelist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.join("; "))
    }
}

/// Both whitelists applied by the processor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WhitelistConfig {
    /// Allowed content type schema URIs
    pub content_types: Whitelist,
    /// Allowed content item body properties
    pub properties: Whitelist,
}

/// Whether a content type schema may be indexed.
///
/// Matching is exact and case-sensitive; no wildcards.
pub fn is_schema_allowed(schema: &str, whitelist: &Whitelist) -> bool {
    whitelist.is_empty() || whitelist.contains(schema)
}

/// Select the body properties to copy into the index document.
///
/// The result keeps the order of `property_names`, never the whitelist's.
/// An empty result must be reported by the caller rather than indexed.
pub fn select_properties<'a, I>(property_names: I, whitelist: &Whitelist) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    property_names
        .into_iter()
        .filter(|name| whitelist.is_empty() || whitelist.contains(name))
        .collect()
}
