//! Repository ports (spec §4.2) and their implementations.
//!
//! The orchestrator depends only on the traits in this module; two
//! implementations satisfy them — an in-memory store for tests and small
//! deployments, and a SQLite-backed store for anything that needs to
//! survive a restart.

pub mod dyn_store;
pub mod in_memory;
pub mod ports;
pub mod sqlite;

pub use dyn_store::DynStore;
pub use in_memory::InMemoryStore;
pub use ports::{
    CredentialRecord, CredentialStore, EndpointRecord, MembershipStore, QueryOptions,
    QueryResult, ResourceInput, ResourceStore, ResourceUpdate, SchemaRecord, SchemaStore,
    TenantStore,
};
pub use sqlite::SqliteStore;
