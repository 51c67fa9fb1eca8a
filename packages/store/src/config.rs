//! # Store configuration: `prospector.toml` `[collections]` section
//!
//! Names the remote collections each store reads and writes. A missing or
//! partial section falls back to the production names, so an empty file is
//! equivalent to [`StoreConfig::default`].
//!
//! ```toml
//! [collections]
//! prospects = "prospects"
//! users = "users"
//! templates = "messageTemplates"
//! ```

use serde::{Deserialize, Serialize};

/// Top-level store configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub collections: CollectionsConfig,
}

/// Remote collection names.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CollectionsConfig {
    #[serde(default = "default_prospects")]
    pub prospects: String,
    #[serde(default = "default_users")]
    pub users: String,
    #[serde(default = "default_templates")]
    pub templates: String,
}

fn default_prospects() -> String {
    "prospects".to_string()
}

fn default_users() -> String {
    "users".to_string()
}

fn default_templates() -> String {
    "messageTemplates".to_string()
}

impl Default for CollectionsConfig {
    fn default() -> Self {
        Self {
            prospects: default_prospects(),
            users: default_users(),
            templates: default_templates(),
        }
    }
}

impl StoreConfig {
    /// Builder method to prefix every collection, e.g. for per-test isolation.
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        let c = &mut self.collections;
        c.prospects = format!("{prefix}{}", c.prospects);
        c.users = format!("{prefix}{}", c.users);
        c.templates = format!("{prefix}{}", c.templates);
        self
    }

    /// Parse from TOML string.
    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Serialize to TOML string.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
