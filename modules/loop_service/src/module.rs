//! Module declaration and lifecycle: wiring, migrations and REST registration

use crate::config::Config;
use crate::contract::LoopsApi;
use crate::domain::{Repositories, Service, TracingEventPublisher};
use crate::infra::storage::{
    SeaOrmDocumentRepository, SeaOrmLoopRepository, SeaOrmOrganizationRepository,
    SeaOrmTaskRepository, SeaOrmUserDirectory,
};
use crate::infra::FsAttachmentStore;
use anyhow::Result;
use parking_lot::RwLock;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Loop service module
pub struct LoopServiceModule {
    config: RwLock<Config>,
    service: RwLock<Option<Arc<Service>>>,
}

impl Default for LoopServiceModule {
    fn default() -> Self {
        Self {
            config: RwLock::new(Config::default()),
            service: RwLock::new(None),
        }
    }
}

impl LoopServiceModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build repositories, collaborators and the domain service
    pub fn init(&self, db: Arc<DatabaseConnection>, config: Config) -> Result<()> {
        let repos = Repositories {
            loops: Arc::new(SeaOrmLoopRepository::new(db.clone())),
            tasks: Arc::new(SeaOrmTaskRepository::new(db.clone())),
            documents: Arc::new(SeaOrmDocumentRepository::new(db.clone())),
            organizations: Arc::new(SeaOrmOrganizationRepository::new(db.clone())),
            users: Arc::new(SeaOrmUserDirectory::new(db)),
        };
        let attachments = Arc::new(FsAttachmentStore::new(config.attachments_dir.clone()));
        let event_publisher = Arc::new(TracingEventPublisher);

        let service = Arc::new(Service::new(
            repos,
            attachments,
            event_publisher,
            config.clone(),
        ));
        *self.service.write() = Some(service);
        *self.config.write() = config;

        tracing::info!(
            closing_soon_days = self.config.read().closing_soon_days,
            "Loop service initialized"
        );
        Ok(())
    }

    /// Run pending schema migrations
    pub async fn migrate(&self, db: &DatabaseConnection) -> Result<()> {
        use crate::infra::storage::migrations::Migrator;
        use sea_orm_migration::MigratorTrait;

        Migrator::up(db, None).await?;
        tracing::info!("Loop service migrations completed");
        Ok(())
    }

    pub fn config(&self) -> Config {
        self.config.read().clone()
    }

    pub fn service(&self) -> Result<Arc<Service>> {
        self.service
            .read()
            .as_ref()
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Service not initialized"))
    }

    /// In-process client for other modules
    pub fn client(&self) -> Result<Arc<dyn LoopsApi>> {
        Ok(Arc::new(crate::api::native::NativeClient::new(self.service()?)))
    }

    /// Attach the REST routes to `router`
    pub fn register_rest(&self, router: axum::Router) -> Result<axum::Router> {
        let service = self.service()?;
        tracing::info!("Registering loop service REST routes");
        crate::api::rest::routes::register_routes(router, service)
    }
}
