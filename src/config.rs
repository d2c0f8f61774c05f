//! Query configuration, loaded from a JSON file.
//!
//! ```json
//! {
//!   "field_paths": { "status": "status.name", "key": "_id" },
//!   "custom_field_collection": "fields",
//!   "case_insensitive_like": false,
//!   "table": "tickets",
//!   "limits": { "max_query_length": 4096, "max_depth": 64 }
//! }
//! ```
//!
//! Every key is optional; missing keys take the defaults below. Entries in
//! `field_paths` are layered over the default mappings rather than replacing them.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Field name to storage path. Matched case-sensitively and applied before
    /// custom-field handling.
    #[serde(deserialize_with = "merge_field_paths")]
    pub field_paths: HashMap<String, String>,
    /// Name of the collection holding a ticket's custom fields
    pub custom_field_collection: String,
    /// Whether `~` ignores case
    pub case_insensitive_like: bool,
    /// Table queried by the SQL backend
    pub table: String,
    pub limits: QueryLimits,
}

/// Bounds a caller puts on a query before running the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryLimits {
    pub max_query_length: usize,
    pub max_depth: usize,
}

fn default_field_paths() -> HashMap<String, String> {
    [
        ("status", "status.name"),
        ("statusCategory", "status.type"),
        ("key", "_id"),
    ]
    .into_iter()
    .map(|(field, path)| (field.to_string(), path.to_string()))
    .collect()
}

fn merge_field_paths<'de, D>(
    deserializer: D,
) -> std::result::Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let overrides = HashMap::<String, String>::deserialize(deserializer)?;
    let mut field_paths = default_field_paths();
    field_paths.extend(overrides);
    Ok(field_paths)
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            field_paths: default_field_paths(),
            custom_field_collection: "fields".to_string(),
            case_insensitive_like: false,
            table: "tickets".to_string(),
            limits: QueryLimits::default(),
        }
    }
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            max_query_length: 4096,
            max_depth: 64,
        }
    }
}

impl QueryConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(Error::Config(format!(
                "config file not found: {}",
                path_ref.display()
            )));
        }

        let content = fs::read_to_string(path_ref)?;
        Self::from_json_str(&content).map_err(|e| {
            Error::Config(format!("cannot parse config file {}: {}", path_ref.display(), e))
        })
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// The configured storage path for a field, if it has one.
    pub fn resolve_path(&self, field: &str) -> Option<&str> {
        self.field_paths.get(field).map(String::as_str)
    }
}
