//! MCP protocol types and handling

mod types;
mod router;
mod capabilities;

pub use types::*;
pub use router::{registry_error, RequestRouter};
pub use capabilities::{ListCapability, ServerCapabilities};
