// Copyright (c) The testdock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Declarative metadata attached to a test method or to the type declaring it.
///
/// Every field is independently optional. An absent field (or an empty string or set) means "defer
/// to the next precedence level".
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MetadataOverride {
    /// An explicit identity key. When set on a method, it alone determines the fingerprint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// A human-readable display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// The category of the test, e.g. `unit` or `integration`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Tags added to the test.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,

    /// Tickets (issue references) added to the test.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tickets: BTreeSet<String>,

    /// Contributors responsible for the test.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub contributors: BTreeSet<String>,

    /// Whether the test is active. Only meaningful on methods.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

impl MetadataOverride {
    /// Creates a new override with every field absent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the identity key.
    pub fn set_key(&mut self, key: impl Into<String>) -> &mut Self {
        self.key = Some(key.into());
        self
    }

    /// Sets the display name.
    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the category.
    pub fn set_category(&mut self, category: impl Into<String>) -> &mut Self {
        self.category = Some(category.into());
        self
    }

    /// Adds tags.
    pub fn add_tags(&mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Adds tickets.
    pub fn add_tickets(&mut self, tickets: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.tickets.extend(tickets.into_iter().map(Into::into));
        self
    }

    /// Adds contributors.
    pub fn add_contributors(
        &mut self,
        contributors: impl IntoIterator<Item = impl Into<String>>,
    ) -> &mut Self {
        self.contributors
            .extend(contributors.into_iter().map(Into::into));
        self
    }

    /// Sets the active flag.
    pub fn set_active(&mut self, active: bool) -> &mut Self {
        self.active = Some(active);
        self
    }

    /// Returns the key if it is present and non-empty.
    pub fn key(&self) -> Option<&str> {
        non_empty(self.key.as_deref())
    }

    /// Returns the display name if it is present and non-empty.
    pub fn name(&self) -> Option<&str> {
        non_empty(self.name.as_deref())
    }

    /// Returns the category if it is present and non-empty.
    pub fn category(&self) -> Option<&str> {
        non_empty(self.category.as_deref())
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_strings_are_absent() {
        let mut metadata = MetadataOverride::new();
        metadata.set_key("").set_name("").set_category("");
        assert_eq!(metadata.key(), None);
        assert_eq!(metadata.name(), None);
        assert_eq!(metadata.category(), None);

        metadata.set_category("integration");
        assert_eq!(metadata.category(), Some("integration"));
    }

    #[test]
    fn deserialize_partial() {
        let metadata: MetadataOverride =
            serde_json::from_str(r#"{"category": "db", "tags": ["slow"]}"#).unwrap();
        assert_eq!(metadata.category(), Some("db"));
        assert_eq!(metadata.tags, BTreeSet::from(["slow".to_owned()]));
        assert_eq!(metadata.active, None);
        assert!(metadata.tickets.is_empty());
    }
}
