//! # Declarant API server
//!
//! Back office for customs declarants and certification companies:
//! companies and members, clients, declarations, certificates, tasks,
//! document storage, partnerships and the in-app notification feed
//! with optional Telegram delivery.
//!
//! Configuration is documented in [`config`]. The platform
//! administrator account is provisioned on startup from
//! `ADMIN_LOGIN`/`ADMIN_PASSWORD`; the one-time code required by
//! `POST /api/auth/admin/login` is printed to the log.
//!
//! ```bash
//! API_PORT=8080 DATABASE_URL=postgres://... JWT_SECRET=... \
//!     ADMIN_LOGIN=admin ADMIN_PASSWORD=... cargo run -p declarant-api
//! ```

mod auth;
mod config;
mod error;
mod handler;
mod state;
mod usecase;

use std::{net::SocketAddr, sync::Arc};

use axum::extract::DefaultBodyLimit;
use chrono::Utc;
use config::ApiConfig;
use declarant_domain::{
    user::{Role, User, UserId},
    value_objects::{ActivityType, Email},
};
use declarant_infra::{
    Argon2PasswordHasher, PasswordHasher, PgTransactionManager, TransactionManager,
    admin_code::AdminCodeCache,
    db,
    repository::{PostgresUserRepository, UserRepository},
    storage::MAX_UPLOAD_SIZE,
    telegram::{NoopNotifier, Notifier, TelegramNotifier},
};
use declarant_shared::observability::{self, LogFormat};
use state::AppState;
use tokio::net::TcpListener;
use tower_http::{services::ServeDir, trace::TraceLayer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    observability::init_tracing("info,declarant=debug", LogFormat::from_env());

    let config = ApiConfig::from_env()?;

    tracing::info!("starting API server on {}:{}", config.host, config.port);

    let pool = db::create_pool(&config.database_url)
        .await
        .expect("database connection failed");
    db::run_migrations(&pool).await?;
    tracing::info!("database ready");

    let hasher: Arc<dyn PasswordHasher> = Arc::new(Argon2PasswordHasher::new());
    ensure_admin_account(&pool, &config, hasher.as_ref()).await?;

    let admin_codes = Arc::new(AdminCodeCache::new());
    let code = admin_codes.issue(Utc::now());
    tracing::info!("admin one-time code: {code}");

    let notifier: Arc<dyn Notifier> = match &config.telegram_bot_token {
        Some(token) => Arc::new(TelegramNotifier::new(token.clone())),
        None => {
            tracing::info!("TELEGRAM_BOT_TOKEN is not set, telegram delivery disabled");
            Arc::new(NoopNotifier)
        }
    };
    if let Some(chat_id) = &config.admin_chat_id {
        if let Err(e) = notifier
            .send(chat_id, &format!("Код администратора: {code}"))
            .await
        {
            tracing::warn!("failed to deliver admin code to telegram: {e}");
        }
    }

    let state = Arc::new(AppState::new(
        pool,
        &config,
        hasher,
        notifier,
        admin_codes,
    ));

    let app = handler::routes()
        .nest_service("/uploads", ServeDir::new(&config.uploads_dir))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("invalid bind address");
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("API server listening on {addr}");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Creates the platform administrator row when it does not exist yet.
/// `ADMIN_LOGIN` is used as the email when it looks like one.
async fn ensure_admin_account(
    pool: &sqlx::PgPool,
    config: &ApiConfig,
    hasher: &dyn PasswordHasher,
) -> anyhow::Result<()> {
    let user_repo = PostgresUserRepository::new(pool.clone());
    if user_repo.find_admin().await?.is_some() {
        return Ok(());
    }

    let email = Email::new(config.admin_login.as_str())
        .or_else(|_| Email::new(format!("{}@declarant.local", config.admin_login)))
        .map_err(|e| anyhow::anyhow!("invalid ADMIN_LOGIN: {e}"))?;
    let now = Utc::now();
    let admin = User::new(
        UserId::new(),
        email,
        hasher.hash(&config.admin_password)?,
        "Администратор платформы".to_string(),
        String::new(),
        ActivityType::Declarant,
        now,
    )
    .map_err(|e| anyhow::anyhow!("admin bootstrap failed: {e}"))?
    .with_role(Role::Admin, now);

    let tx_manager = PgTransactionManager::new(pool.clone());
    let mut tx = tx_manager.begin().await?;
    user_repo.insert(&mut tx, &admin).await?;
    tx.commit().await?;
    tracing::info!("platform administrator account created");

    Ok(())
}
