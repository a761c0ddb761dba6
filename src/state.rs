use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{
    config::AppConfig,
    qr::{DataUrlImageStore, ImageStore},
};

#[derive(Clone)]
pub struct AppState {
    pub orm: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub images: Arc<dyn ImageStore>,
}

impl AppState {
    pub fn new(orm: DatabaseConnection, config: AppConfig) -> Self {
        Self {
            orm,
            config: Arc::new(config),
            images: Arc::new(DataUrlImageStore),
        }
    }
}
