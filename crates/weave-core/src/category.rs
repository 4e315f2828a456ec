//! Tool categories and their per-category policy

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::RegistryError;

/// Administrative grouping of tools.
///
/// Variant order is the lookup precedence order: when the same tool name is
/// registered in two enabled categories, the earlier category wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Math,
    Ai,
    System,
    Utility,
}

impl Category {
    /// Every category, in precedence order
    pub const ALL: [Category; 4] = [
        Category::Math,
        Category::Ai,
        Category::System,
        Category::Utility,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Math => "math",
            Category::Ai => "ai",
            Category::System => "system",
            Category::Utility => "utility",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "math" => Ok(Category::Math),
            "ai" => Ok(Category::Ai),
            "system" => Ok(Category::System),
            "utility" => Ok(Category::Utility),
            other => Err(RegistryError::CategoryNotFound(other.to_string())),
        }
    }
}

/// Per-category policy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryConfig {
    /// Whether tools in this category are visible and callable
    #[serde(default)]
    pub enabled: bool,
    /// Maximum number of tools the category accepts
    #[serde(default)]
    pub max_tools: usize,
    /// Calls per second. Reserved: carried and reported, not enforced.
    #[serde(default)]
    pub rate_limit: u32,
    /// Invocation timeout (e.g. "30s"); `None` leaves calls unbounded
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
}

impl CategoryConfig {
    pub fn enabled(max_tools: usize) -> Self {
        Self {
            enabled: true,
            max_tools,
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
