use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use appointment_cell::services::BookingService;
use doctor_cell::services::AvailabilityService;
use notification_cell::services::NotificationDispatcher;
use phone_booking_cell::services::{
    spawn_session_sweeper, DynSessionStore, InMemorySessionStore, PhoneBookingFlow,
    RedisSessionStore, TelephonyGateway, TwilioGateway,
};
use shared_config::{AppConfig, DataBackend};
use shared_database::{DynStore, InMemoryStore, SupabaseStore};

use crate::router::Services;

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting EquiHealth API server");

    let config = Arc::new(AppConfig::from_env());
    if !config.is_configured() {
        warn!("Configuration is incomplete; authenticated routes will reject every request");
    }

    let store: DynStore = match config.data_backend {
        DataBackend::Supabase => Arc::new(SupabaseStore::new(&config)),
        DataBackend::Memory => {
            warn!("Using the in-memory store; data is lost on restart");
            Arc::new(InMemoryStore::new())
        }
    };

    // One ledger service, so every writer shares the same day locks.
    let availability = Arc::new(AvailabilityService::new(store));
    let notifier = Arc::new(NotificationDispatcher::from_config(&config));
    let booking = Arc::new(BookingService::new(availability.clone(), notifier));

    let sessions = session_store(&config).await;
    spawn_session_sweeper(sessions.clone(), SESSION_SWEEP_INTERVAL);

    let telephony: Option<Arc<dyn TelephonyGateway>> = match TwilioGateway::new(&config) {
        Ok(gateway) => Some(Arc::new(gateway)),
        Err(e) => {
            warn!("{}; phone booking calls cannot be started", e);
            None
        }
    };

    let phone = Arc::new(PhoneBookingFlow::new(
        config.clone(),
        sessions,
        booking.clone(),
        telephony,
    ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router::create_router(Services {
        config: config.clone(),
        availability,
        booking,
        phone,
    })
    .layer(
        TraceLayer::new_for_http()
            .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
            .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
    )
    .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn session_store(config: &AppConfig) -> DynSessionStore {
    let ttl = Duration::from_secs(config.phone_session_ttl_seconds);

    if let Some(redis_url) = config.redis_url.as_deref() {
        match RedisSessionStore::new(redis_url, ttl).await {
            Ok(store) => return Arc::new(store),
            Err(e) => warn!("{}; keeping call sessions in memory", e),
        }
    }

    Arc::new(InMemorySessionStore::new(ttl))
}
