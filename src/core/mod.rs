//! The resource orchestrator, discovery responders, authentication guard,
//! and tenant/credential admin operations (spec §4.3–§4.5, §4.9).

pub mod admin;
pub mod auth;
pub mod config_flags;
pub mod discovery;
pub mod orchestrator;

pub use admin::AdminService;
pub use auth::{AuthContext, authenticate};
pub use config_flags::patch_config_from_endpoint;
pub use orchestrator::{ListParams, ListOutcome, Orchestrator};
