use axum::{
    http::Method,
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use bloggers_backend::{
    config::Config,
    db::connection::create_pool,
    docs::ApiDoc,
    handlers::{auth, devices},
    middleware::{auth as auth_middleware, logging, rate_limit, request_id},
    state::AppState,
    utils::email::{EmailService, Notifier},
};

fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "<empty>".into();
    }
    let prefix = s.chars().take(4).collect::<String>();
    format!("{}*** (len={})", prefix, s.len())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bloggers_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load()?;
    tracing::info!(
        database_url = %config.database_url,
        access_token_secret = %mask_secret(&config.access_token_secret),
        refresh_token_secret = %mask_secret(&config.refresh_token_secret),
        access_token_expiration_minutes = config.access_token_expiration_minutes,
        refresh_token_expiration_days = config.refresh_token_expiration_days,
        rate_limit_window_seconds = config.rate_limit_window_seconds,
        rate_limit_max_attempts = config.rate_limit_max_attempts,
        "Loaded configuration from environment/.env"
    );

    // Initialize database
    let pool = create_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let notifier: Arc<dyn Notifier> = Arc::new(EmailService::new()?);
    let state = AppState::new(pool, config, notifier);

    // Registration endpoints share the ip-keyed rate-limit gate
    let registration_routes = Router::new()
        .route("/api/auth/registration", post(auth::registration))
        .route(
            "/api/auth/registration-confirmation",
            post(auth::registration_confirmation),
        )
        .route(
            "/api/auth/registration-email-resending",
            post(auth::registration_email_resending),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit_by_ip,
        ));

    // Login-sensitive endpoints run their composite rate-limit check inside
    // the handler; refresh-cookie endpoints authenticate themselves
    let public_routes = Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/refresh-token", post(auth::refresh_token))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/password-recovery", post(auth::password_recovery))
        .route("/api/auth/new-password", post(auth::new_password))
        .route(
            "/api/security/devices",
            get(devices::list_devices).delete(devices::terminate_other_devices),
        )
        .route(
            "/api/security/devices/{device_id}",
            delete(devices::terminate_device),
        );

    // Bearer-token protected routes
    let user_routes = Router::new()
        .route("/api/auth/me", get(auth::me))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware::auth,
        ));

    // Compose app with shared layers (CORS/Trace) and shared state
    let app = Router::new()
        .merge(registration_routes)
        .merge(public_routes)
        .merge(user_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(axum_middleware::from_fn(logging::log_error_responses))
        .layer(axum_middleware::from_fn(request_id::request_id))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods([
                            Method::GET,
                            Method::POST,
                            Method::PUT,
                            Method::DELETE,
                            Method::OPTIONS,
                        ])
                        .allow_headers(Any)
                        .max_age(std::time::Duration::from_secs(24 * 60 * 60)),
                ),
        )
        .with_state(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
