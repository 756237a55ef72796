use mongodb::Database;
use realtydesk_config::Settings;
use realtydesk_services::{AuthService, CaseLifecycle, CaseNotifier, EmailNotifier};
use std::sync::Arc;

use crate::ws::{dispatcher::WsBroadcaster, storage::WsStorage};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub settings: Settings,
    pub auth: Arc<AuthService>,
    pub cases: Arc<CaseLifecycle>,
    pub ws_storage: Arc<WsStorage>,
}

impl AppState {
    pub fn new(db: Database, settings: Settings) -> Self {
        let notifier = Arc::new(EmailNotifier::new(settings.notifier.clone()));
        Self::with_notifier(db, settings, notifier)
    }

    /// Builds the state around a given notifier. The broadcaster is always
    /// the in-process WebSocket registry.
    pub fn with_notifier(db: Database, settings: Settings, notifier: Arc<dyn CaseNotifier>) -> Self {
        let auth = Arc::new(AuthService::new(settings.jwt.clone()));
        let ws_storage = Arc::new(WsStorage::new());
        let broadcaster = Arc::new(WsBroadcaster::new(ws_storage.clone()));
        let cases = Arc::new(CaseLifecycle::new(&db, broadcaster, notifier));

        Self {
            db,
            settings,
            auth,
            cases,
            ws_storage,
        }
    }
}
