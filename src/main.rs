use budgetlytic::config::Config;
use budgetlytic::db::BudgetStorage;
use budgetlytic::google::{
    self, CredentialLoader, FcmClient, FirebaseStorage, GoogleAuth, VisionClient,
};
use budgetlytic::router::{BudgetState, budget_router};
use budgetlytic::service::{Categorizer, Clock, ReminderDeps, reminder_actor};
use mimalloc::MiMalloc;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        listen_addr = %cfg.listen_addr,
        database_url = %cfg.database_url,
        proxy = %cfg.proxy.as_ref().map(|u| u.as_str()).unwrap_or("<none>"),
        loglevel = %cfg.loglevel,
        utc_offset = %cfg.utc_offset,
    );

    let creds = match CredentialLoader::layered(&cfg.env_file).and_then(|l| l.load()) {
        Ok(creds) => creds,
        Err(e) => {
            error!(error = %e, "cloud credentials unavailable; refusing to start");
            return Err(e.into());
        }
    };
    info!(
        credentials = %creds.credentials_path.display(),
        bucket = %creds.storage_bucket,
        "cloud credentials loaded"
    );

    let http = google::build_http_client(&cfg)?;
    let auth = GoogleAuth::new(&creds);
    let ocr = Arc::new(VisionClient::new(http.clone(), auth.clone()));
    let blobs = Arc::new(FirebaseStorage::new(
        http.clone(),
        auth,
        creds.storage_bucket.clone(),
    ));

    let storage = BudgetStorage::connect(&cfg.database_url).await?;
    let categorizer = Categorizer::load(&cfg.categories_file).await?;
    info!(
        count = categorizer.categories().len(),
        path = %cfg.categories_file.display(),
        "categories loaded"
    );

    let clock = Clock::new(cfg.offset()?);
    let push = FcmClient::new(http, cfg.fcm_server_key.clone());
    if !push.is_enabled() {
        warn!("FCM_SERVER_KEY not set; due reminders will stay pending");
    }
    let reminders = reminder_actor::spawn(ReminderDeps {
        storage: storage.clone(),
        push: Arc::new(push),
        clock,
        interval: Duration::from_secs(cfg.reminder_interval_secs),
        concurrency: cfg.push_concurrency,
    })
    .await?;
    // catch up on reminders that fell due while the service was down
    match reminders.process_now().await {
        Ok(delivered) => info!(delivered, "startup reminder sweep finished"),
        Err(e) => warn!(error = %e, "startup reminder sweep failed"),
    }

    if cfg.budgetlytic_key.is_none() {
        warn!("BUDGETLYTIC_KEY not set; API is open to any caller");
    }
    let state = BudgetState::new(
        storage,
        categorizer,
        cfg.categories_file.clone(),
        ocr,
        blobs,
        clock,
        cfg.budgetlytic_key.clone(),
    );
    let app = budget_router(state);

    let listener = TcpListener::bind(&cfg.listen_addr).await?;
    info!("HTTP server listening on {}", cfg.listen_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    reminders.stop();
    Ok(())
}
