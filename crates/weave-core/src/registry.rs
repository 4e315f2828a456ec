//! Categorized tool registry

use indexmap::IndexMap;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, RwLock, Semaphore};
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::category::{Category, CategoryConfig};
use crate::config::ToolManagerConfig;
use crate::error::{RegistryError, Result};
use crate::tool::{Emit, Tool, ToolCallResult, ToolInfo};

/// Caller-side context of one invocation
#[derive(Debug, Clone, Copy, Default)]
pub struct CallContext {
    /// Point in time after which the caller no longer wants the result
    pub deadline: Option<Instant>,
}

impl CallContext {
    /// No caller deadline
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }
}

/// Intersect the caller deadline with a category timeout started at `now`.
/// The sooner of the two wins; `None` means unbounded.
pub fn effective_deadline(
    caller: Option<Instant>,
    category_timeout: Option<Duration>,
    now: Instant,
) -> Option<Instant> {
    let category = category_timeout.map(|t| now + t);
    match (caller, category) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

struct CategoryState {
    config: CategoryConfig,
    tools: IndexMap<String, Arc<dyn Tool>>,
}

/// What a call needs, copied out of the registry before the lock is released
struct ResolvedTool {
    tool: Arc<dyn Tool>,
    category: Category,
    timeout: Option<Duration>,
}

/// Registry of tools grouped by [`Category`].
///
/// A single reader/writer lock guards the category maps. It is held for
/// lookups and mutations only, never while a tool runs.
pub struct ToolRegistry {
    categories: RwLock<BTreeMap<Category, CategoryState>>,
    /// Applied to categories without a timeout of their own
    default_timeout: Option<Duration>,
    /// Global cap on simultaneous executions
    call_permits: Option<(Arc<Semaphore>, usize)>,
}

impl ToolRegistry {
    /// Create a registry managing exactly the given categories
    pub fn new(categories: impl IntoIterator<Item = (Category, CategoryConfig)>) -> Self {
        let categories = categories
            .into_iter()
            .map(|(category, config)| {
                (
                    category,
                    CategoryState {
                        config,
                        tools: IndexMap::new(),
                    },
                )
            })
            .collect();

        Self {
            categories: RwLock::new(categories),
            default_timeout: None,
            call_permits: None,
        }
    }

    /// Build a registry from the tool configuration file.
    ///
    /// Unknown category names are skipped; every known category that the
    /// file leaves out is created disabled.
    pub fn from_config(config: &ToolManagerConfig) -> Self {
        let mut managed: BTreeMap<Category, CategoryConfig> = BTreeMap::new();

        for (name, category_config) in &config.categories {
            match name.parse::<Category>() {
                Ok(category) => {
                    managed.insert(category, category_config.clone());
                }
                Err(_) => warn!(category = %name, "Unknown category in config, skipping"),
            }
        }

        for category in Category::ALL {
            managed.entry(category).or_default();
        }

        let mut registry = Self::new(managed);
        registry.default_timeout = config.global.default_timeout;
        if config.global.max_concurrent_calls > 0 {
            registry = registry.with_max_concurrent_calls(config.global.max_concurrent_calls);
        }
        registry
    }

    /// Limit simultaneous tool executions across all categories
    pub fn with_max_concurrent_calls(mut self, limit: usize) -> Self {
        self.call_permits = Some((Arc::new(Semaphore::new(limit)), limit));
        self
    }

    /// Timeout used by categories that configure none
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Register a tool under its declared category.
    ///
    /// A tool with the same name in the same category is replaced.
    pub async fn register(&self, tool: Arc<dyn Tool>) -> Result<()> {
        let category = tool.category();
        let name = tool.name().to_string();

        let mut categories = self.categories.write().await;

        let shadowing: Vec<Category> = categories
            .iter()
            .filter(|(other, state)| **other != category && state.tools.contains_key(&name))
            .map(|(other, _)| *other)
            .collect();

        let state = categories
            .get_mut(&category)
            .ok_or_else(|| RegistryError::CategoryNotFound(category.to_string()))?;

        if !state.config.enabled {
            return Err(RegistryError::CategoryDisabled(category));
        }

        if state.tools.len() >= state.config.max_tools {
            return Err(RegistryError::CategoryFull {
                category,
                max: state.config.max_tools,
            });
        }

        state.tools.insert(name.clone(), tool);
        info!(tool = %name, category = %category, "Tool registered");

        for other in shadowing {
            warn!(
                tool = %name,
                category = %category,
                other_category = %other,
                "Tool name registered in more than one category; lookups use the first in precedence order"
            );
        }

        Ok(())
    }

    pub async fn set_category_enabled(&self, category: Category, enabled: bool) -> Result<()> {
        let mut categories = self.categories.write().await;
        let state = categories
            .get_mut(&category)
            .ok_or_else(|| RegistryError::CategoryNotFound(category.to_string()))?;

        state.config.enabled = enabled;
        if enabled {
            info!(category = %category, "Category enabled");
        } else {
            info!(category = %category, "Category disabled");
        }
        Ok(())
    }

    /// Replace a category's policy, including its enabled flag
    pub async fn update_category_config(
        &self,
        category: Category,
        config: CategoryConfig,
    ) -> Result<()> {
        let mut categories = self.categories.write().await;
        let state = categories
            .get_mut(&category)
            .ok_or_else(|| RegistryError::CategoryNotFound(category.to_string()))?;

        info!(
            category = %category,
            enabled = config.enabled,
            max_tools = config.max_tools,
            rate_limit = config.rate_limit,
            timeout = ?config.timeout,
            "Category config updated"
        );
        state.config = config;
        Ok(())
    }

    /// Snapshot of every managed category's policy
    pub async fn categories(&self) -> BTreeMap<Category, CategoryConfig> {
        let categories = self.categories.read().await;
        categories
            .iter()
            .map(|(category, state)| (*category, state.config.clone()))
            .collect()
    }

    /// Metadata of all tools in enabled categories, in precedence then
    /// registration order
    pub async fn list_tools(&self) -> Vec<ToolInfo> {
        let categories = self.categories.read().await;
        categories
            .values()
            .filter(|state| state.config.enabled)
            .flat_map(|state| state.tools.values().map(|tool| tool_info(tool.as_ref())))
            .collect()
    }

    /// Metadata of the tools in one category; empty if it is unknown or disabled
    pub async fn list_tools_in(&self, category: Category) -> Vec<ToolInfo> {
        let categories = self.categories.read().await;
        match categories.get(&category) {
            Some(state) if state.config.enabled => state
                .tools
                .values()
                .map(|tool| tool_info(tool.as_ref()))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Find an enabled tool by name
    pub async fn lookup(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.resolve(name).await.ok().map(|resolved| resolved.tool)
    }

    /// Invoke a tool and wrap its output in the uniform result envelope
    pub async fn invoke(&self, ctx: &CallContext, name: &str, args: Value) -> Result<ToolCallResult> {
        let resolved = self.resolve(name).await?;
        let _permit = self.acquire_permit()?;
        self.execute(ctx, resolved, args, None).await
    }

    /// Invoke a tool, forwarding its incremental output to `emit`.
    ///
    /// Tools without streaming support run through the synchronous path and
    /// never call `emit`.
    pub async fn invoke_stream(
        &self,
        ctx: &CallContext,
        name: &str,
        args: Value,
        emit: Emit<'_>,
    ) -> Result<ToolCallResult> {
        let resolved = self.resolve(name).await?;
        let _permit = self.acquire_permit()?;

        if resolved.tool.as_streaming().is_none() {
            warn!(tool = %name, "Tool does not support streaming, returning regular execution result");
            return self.execute(ctx, resolved, args, None).await;
        }

        self.execute(ctx, resolved, args, Some(emit)).await
    }

    async fn resolve(&self, name: &str) -> Result<ResolvedTool> {
        let categories = self.categories.read().await;

        let found = categories
            .iter()
            .filter(|(_, state)| state.config.enabled)
            .find_map(|(category, state)| {
                state.tools.get(name).map(|tool| ResolvedTool {
                    tool: Arc::clone(tool),
                    category: *category,
                    timeout: state.config.timeout.or(self.default_timeout),
                })
            });

        found.ok_or_else(|| {
            error!(tool = %name, "Tool not found");
            RegistryError::ToolNotFound(name.to_string())
        })
    }

    fn acquire_permit(&self) -> Result<Option<OwnedSemaphorePermit>> {
        match &self.call_permits {
            Some((semaphore, limit)) => Arc::clone(semaphore)
                .try_acquire_owned()
                .map(Some)
                .map_err(|_| RegistryError::TooManyConcurrentCalls(*limit)),
            None => Ok(None),
        }
    }

    async fn execute(
        &self,
        ctx: &CallContext,
        resolved: ResolvedTool,
        args: Value,
        emit: Option<Emit<'_>>,
    ) -> Result<ToolCallResult> {
        let ResolvedTool {
            tool,
            category,
            timeout,
        } = resolved;
        let name = tool.name().to_string();
        let started = Instant::now();
        let deadline = effective_deadline(ctx.deadline, timeout, started);

        info!(
            tool = %name,
            category = %category,
            streaming = emit.is_some(),
            args = %args,
            "Tool call started"
        );

        let call = async {
            match (emit, tool.as_streaming()) {
                (Some(emit), Some(streaming)) => streaming.execute_stream(args, emit).await,
                _ => tool.execute(args).await,
            }
        };

        let outcome = match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, call).await {
                Ok(result) => result.map_err(RegistryError::from),
                Err(_) => Err(RegistryError::Timeout {
                    tool: name.clone(),
                    elapsed: started.elapsed(),
                }),
            },
            None => call.await.map_err(RegistryError::from),
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        match outcome {
            Ok(output) => {
                info!(tool = %name, category = %category, duration_ms, "Tool call completed successfully");
                Ok(ToolCallResult::from_output(&output))
            }
            Err(e) => {
                error!(tool = %name, category = %category, duration_ms, error = %e, "Tool call failed");
                Err(e)
            }
        }
    }
}

fn tool_info(tool: &dyn Tool) -> ToolInfo {
    ToolInfo {
        name: tool.name().to_string(),
        description: tool.description().to_string(),
        category: tool.category(),
        input_schema: tool.input_schema(),
    }
}
