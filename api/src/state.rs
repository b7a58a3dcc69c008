use std::sync::Arc;

use sqlx::PgPool;

use crate::ai::AiService;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub ai: Arc<AiService>,
}
