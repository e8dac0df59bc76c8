//! HTTP surface: the SCIM plane (`/endpoints/{id}/...`) and the admin plane
//! (`/admin/...`), sharing one [`AppState`] and the content-type/correlation
//! middleware in [`middleware`] (spec §6).

pub mod admin;
pub mod error;
pub mod middleware;
pub mod router;
pub mod scim;
pub mod state;

pub use router::build;
pub use state::AppState;
