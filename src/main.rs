//! saas-account server binary.
//!
//! Loads configuration from the environment, connects to PostgreSQL, runs
//! migrations and the optional profile backfill, then serves the API.

use std::error::Error;
use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use saas_account::adapters::auth::{SupabaseAuthProvider, SupabaseSessionValidator};
use saas_account::adapters::cache::{CachingProfileRepository, CachingSubscriptionRepository};
use saas_account::adapters::http::{api_router, AppState};
use saas_account::adapters::postgres::{
    PostgresProfileRepository, PostgresSubscriptionRepository, PostgresUserAccountRepository,
};
use saas_account::adapters::stripe::StripePaymentAdapter;
use saas_account::application::handlers::BackfillProfilesHandler;
use saas_account::config::{AppConfig, ServerConfig};
use saas_account::domain::subscription::PendingSubscriptions;
use saas_account::ports::{ProfileRepository, SubscriptionRepository};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config.server);
    config.validate()?;

    tracing::info!(
        environment = ?config.server.environment,
        stripe_test_mode = config.payment.is_test_mode(),
        "Starting saas-account"
    );

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .idle_timeout(config.database.idle_timeout())
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let profiles_db: Arc<dyn ProfileRepository> =
        Arc::new(PostgresProfileRepository::new(pool.clone()));
    let subscriptions_db: Arc<dyn SubscriptionRepository> =
        Arc::new(PostgresSubscriptionRepository::new(pool.clone()));

    if config.database.backfill_profiles {
        match BackfillProfilesHandler::new(profiles_db.clone()).handle().await {
            Ok(created) => tracing::info!(created, "Profile backfill finished"),
            Err(e) => tracing::error!(error = %e, "Profile backfill failed"),
        }
    }

    let session_validator = Arc::new(SupabaseSessionValidator::new(&config.auth));
    let state = AppState {
        subscription_repository: Arc::new(CachingSubscriptionRepository::new(
            subscriptions_db,
            &config.cache,
        )),
        profile_repository: Arc::new(CachingProfileRepository::new(profiles_db, &config.cache)),
        account_repository: Arc::new(PostgresUserAccountRepository::new(pool.clone())),
        payment_provider: Arc::new(StripePaymentAdapter::new(config.payment.clone())),
        auth_provider: Arc::new(SupabaseAuthProvider::new(config.auth.clone())),
        session_validator,
        pending_subscriptions: Arc::new(PendingSubscriptions::new()),
        stripe_key_prefix: config.payment.key_prefix(),
        site_url: config.auth.site_url.clone(),
        secure_cookies: config.is_production(),
    };

    let app = with_transport_layers(api_router(state), &config.server);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("Shut down cleanly");
    Ok(())
}

/// JSON logs in production, human-readable output otherwise. `RUST_LOG`
/// overrides the configured filter.
fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(server.log_level.as_str()));
    let registry = tracing_subscriber::registry().with(filter);

    if server.is_production() {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn with_transport_layers(router: Router, server: &ServerConfig) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TimeoutLayer::new(server.request_timeout()))
            .layer(CompressionLayer::new())
            .layer(cors_layer(server)),
    )
}

/// Credentialed CORS for the configured origins. Without any, only
/// same-origin requests are served.
fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return CorsLayer::new();
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
