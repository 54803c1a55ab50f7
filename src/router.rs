use crate::db::BudgetStorage;
use crate::google::storage::BlobStore;
use crate::google::vision::TextDetector;
use crate::handlers::{bills, categories, expenses, health, reminders};
use crate::middleware::auth::require_api_key;
use crate::service::{Categorizer, Clock};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Uploads (bill images) and JSON bodies share this cap.
pub const BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone)]
pub struct BudgetState {
    pub storage: BudgetStorage,
    pub categorizer: Arc<RwLock<Categorizer>>,
    pub categories_file: Arc<PathBuf>,
    pub ocr: Arc<dyn TextDetector>,
    pub blobs: Arc<dyn BlobStore>,
    pub clock: Clock,
    pub api_key: Option<Arc<str>>,
}

impl BudgetState {
    pub fn new(
        storage: BudgetStorage,
        categorizer: Categorizer,
        categories_file: PathBuf,
        ocr: Arc<dyn TextDetector>,
        blobs: Arc<dyn BlobStore>,
        clock: Clock,
        api_key: Option<String>,
    ) -> Self {
        Self {
            storage,
            categorizer: Arc::new(RwLock::new(categorizer)),
            categories_file: Arc::new(categories_file),
            ocr,
            blobs,
            clock,
            api_key: api_key.map(Arc::from),
        }
    }
}

pub fn budget_router(state: BudgetState) -> Router {
    let api = Router::new()
        .route("/add_expense", post(expenses::add_expense))
        .route("/voice_expense", post(expenses::voice_expense))
        .route("/expenses/{user_id}", get(expenses::get_expenses))
        .route("/insights/{user_id}", get(expenses::get_insights))
        .route("/upload_bill", post(bills::upload_bill))
        .route("/bills/{user_id}", get(bills::get_bills))
        .route(
            "/categories",
            get(categories::list_categories).post(categories::add_category),
        )
        .route("/categories/suggest", post(categories::suggest_categories))
        .route(
            "/reminders/{user_id}",
            get(reminders::list_reminders).post(reminders::add_reminder),
        )
        .route(
            "/reminders/{user_id}/{id}",
            delete(reminders::delete_reminder),
        )
        .route("/push_token/{user_id}", post(reminders::register_push_token))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    Router::new()
        .route("/health", get(health::health))
        .merge(api)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .with_state(state)
}
