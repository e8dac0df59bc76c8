use crate::config::AppConfig;
use crate::core::{AdminService, Orchestrator};
use crate::observability::{Logger, RequestLogWriter};
use crate::store::ports::{CredentialStore, MembershipStore, ResourceStore, SchemaStore, TenantStore};
use std::sync::Arc;

/// Everything an HTTP handler needs, generic over the store backend so the
/// same router serves both `InMemoryStore` and `SqliteStore` deployments.
pub struct AppState<S, L> {
    pub orchestrator: Arc<Orchestrator<S>>,
    pub admin: Arc<AdminService<S>>,
    pub store: S,
    pub logger: Arc<Logger>,
    pub request_log: Arc<RequestLogWriter<L>>,
    pub config: Arc<AppConfig>,
}

impl<S, L> Clone for AppState<S, L>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            orchestrator: Arc::clone(&self.orchestrator),
            admin: Arc::clone(&self.admin),
            store: self.store.clone(),
            logger: Arc::clone(&self.logger),
            request_log: Arc::clone(&self.request_log),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S, L> AppState<S, L>
where
    S: ResourceStore + MembershipStore + TenantStore + CredentialStore + SchemaStore + Clone,
{
    pub fn new(store: S, config: AppConfig, logger: Arc<Logger>, request_log: Arc<RequestLogWriter<L>>) -> Self {
        Self {
            orchestrator: Arc::new(Orchestrator::new(store.clone(), config.base_url.clone())),
            admin: Arc::new(AdminService::new(store.clone(), Arc::clone(&logger))),
            store,
            logger,
            request_log,
            config: Arc::new(config),
        }
    }
}
