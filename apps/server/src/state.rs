//! Shared application state

use std::sync::Arc;

use crate::{
    auth::AuthManager,
    config::{Config, StorageBackend},
    db::{AuditTrailStore, InMemoryStore, NotificationStore, PostgresStore, RecordStore},
    models::RecordKind,
    services::{AuditService, NotificationService, RecordService, ReportSources},
    Result,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub auth: AuthManager,
    pub record_store: Arc<dyn RecordStore>,
    pub notification_store: Arc<dyn NotificationStore>,
    pub audit_store: Arc<dyn AuditTrailStore>,
    pub notifications: NotificationService,
    pub audit: AuditService,
}

impl AppState {
    /// Build state for the configured storage backend.
    pub async fn new(config: Config) -> Result<Self> {
        match config.storage.backend {
            StorageBackend::Postgres => {
                tracing::info!(
                    pool_max_size = config.database.pool_max_size,
                    "Connecting to PostgreSQL"
                );
                let store = Arc::new(PostgresStore::connect(&config.database).await?);
                Ok(Self::with_stores(
                    config,
                    store.clone(),
                    store.clone(),
                    store,
                ))
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; records are lost on restart");
                Ok(Self::in_memory(config))
            }
        }
    }

    pub fn in_memory(config: Config) -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self::with_stores(config, store.clone(), store.clone(), store)
    }

    pub fn with_stores(
        config: Config,
        record_store: Arc<dyn RecordStore>,
        notification_store: Arc<dyn NotificationStore>,
        audit_store: Arc<dyn AuditTrailStore>,
    ) -> Self {
        Self {
            auth: AuthManager::new(&config.auth),
            config: Arc::new(config),
            notifications: NotificationService::new(notification_store.clone()),
            audit: AuditService::new(audit_store.clone()),
            record_store,
            notification_store,
            audit_store,
        }
    }

    /// Record service for one collection. Cheap: only `Arc`s are cloned.
    pub fn records<K: RecordKind>(&self) -> RecordService<K> {
        RecordService::new(
            self.record_store.clone(),
            self.notifications.clone(),
            self.audit.clone(),
        )
    }

    pub fn report_sources(&self) -> ReportSources {
        ReportSources {
            examinations: self.records(),
            referrals: self.records(),
            prescriptions: self.records(),
            personnel_cards: self.records(),
        }
    }
}
