//! Tool configuration file
//!
//! The registry is built from a JSON (or YAML) document of the form:
//!
//! ```json
//! {
//!   "categories": {
//!     "math": { "enabled": true, "max_tools": 10, "rate_limit": 100, "timeout": "30s" }
//!   },
//!   "global": { "max_concurrent_calls": 0, "default_timeout": "1m" }
//! }
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::category::{Category, CategoryConfig};
use crate::error::ConfigError;

/// Settings shared by all categories
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalToolConfig {
    /// Upper bound on simultaneous tool executions (0 = unlimited)
    #[serde(default)]
    pub max_concurrent_calls: usize,
    /// Timeout for categories that configure none
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub default_timeout: Option<Duration>,
}

/// Tool manager configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolManagerConfig {
    /// Category name -> policy. Names are validated when the registry is built.
    #[serde(default)]
    pub categories: IndexMap<String, CategoryConfig>,
    #[serde(default)]
    pub global: GlobalToolConfig,
}

impl Default for ToolManagerConfig {
    fn default() -> Self {
        let mut categories = IndexMap::new();
        categories.insert(
            Category::Math.to_string(),
            CategoryConfig::enabled(10).with_timeout(Duration::from_secs(30)),
        );
        categories.insert(Category::Ai.to_string(), CategoryConfig::default());
        categories.insert(Category::System.to_string(), CategoryConfig::default());
        categories.insert(
            Category::Utility.to_string(),
            CategoryConfig::enabled(10).with_timeout(Duration::from_secs(60)),
        );

        Self {
            categories,
            global: GlobalToolConfig::default(),
        }
    }
}

impl ToolManagerConfig {
    /// Load configuration from a file; `.yaml`/`.yml` is parsed as YAML,
    /// anything else as JSON.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&contents)?,
            _ => serde_json::from_str(&contents)?,
        };

        debug!("Loaded tool config from {:?}", path);
        Ok(config)
    }

    /// Set the policy for one category
    pub fn with_category(mut self, category: Category, config: CategoryConfig) -> Self {
        self.categories.insert(category.to_string(), config);
        self
    }
}
