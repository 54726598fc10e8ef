use serde::{Deserialize, Deserializer, Serialize};

use crate::ordered_map::OrderedMap;

/// Category every service falls back to and that the service form always offers.
pub const FALLBACK_CATEGORY: &str = "Other";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub category: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub icon: String,
}

impl CategoryEntry {
    /// Human label for a category stored under `key`; empty names fall back to the key.
    pub fn display_name<'a>(&'a self, key: &'a str) -> &'a str {
        if self.name.is_empty() {
            key
        } else {
            &self.name
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceDefaults {
    pub name: String,
    pub description: String,
    pub icon: String,
    pub category: String,
}

impl Default for ServiceDefaults {
    fn default() -> Self {
        Self {
            name: "Docker service".into(),
            description: "Docker service".into(),
            icon: "🐳".into(),
            category: FALLBACK_CATEGORY.into(),
        }
    }
}

/// Full configuration document served by `GET /api/services`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub categories: OrderedMap<CategoryEntry>,
    #[serde(default)]
    pub services: OrderedMap<ServiceEntry>,
    #[serde(default)]
    pub defaults: ServiceDefaults,
    #[serde(
        default,
        rename = "categoryOrder",
        deserialize_with = "lenient_order",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub category_order: Vec<String>,
}

// Anything other than an array is treated as "no stored order"; non-string
// entries are skipped.
fn lenient_order<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let serde_json::Value::Array(items) = value else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            serde_json::Value::String(key) => Some(key),
            _ => None,
        })
        .collect())
}
