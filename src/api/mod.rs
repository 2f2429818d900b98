// API module - HTTP endpoints

pub mod cuts;
pub mod payments;
pub mod students;

use sqlx::PgPool;
use std::sync::Arc;

use crate::config::Config;
use crate::services::mailer::Mailer;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub mailer: Arc<dyn Mailer>,
}
