//! # weave-core
//!
//! Core of Weave Toolkit:
//! - the [`Tool`] contract, with optional streaming support
//! - a categorized [`ToolRegistry`] enforcing enablement, capacity and timeouts
//! - the tool configuration file format

pub mod category;
pub mod config;
pub mod error;
pub mod registry;
pub mod tool;

pub use category::{Category, CategoryConfig};
pub use config::{GlobalToolConfig, ToolManagerConfig};
pub use error::{ConfigError, RegistryError, Result, ToolError};
pub use registry::{effective_deadline, CallContext, ToolRegistry};
pub use tool::{Emit, StreamChunk, StreamingTool, Tool, ToolCallResult, ToolContent, ToolInfo};
