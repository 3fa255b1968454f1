//! siwe-auth application entry point.
//!
//! Bootstraps the server:
//! 1. Load configuration from environment
//! 2. Select the nonce store and rate limiter (Redis when configured,
//!    in-memory otherwise)
//! 3. Build the login service and router
//! 4. Apply CORS and security headers middleware
//! 5. Start Axum server
//!
//! Also supports `gen-secret` subcommand for generating a session secret.

use rand::RngCore;
use siwe_auth::{
    auth::{middleware::AppState, AuthService},
    cleanup,
    config::Config,
    middleware::{cors_layer, security_headers},
    routes,
    storage::{
        nonce::{MemoryNonceStore, NonceStore},
        rate_limit::{MemoryRateLimiter, RateLimiter},
    },
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use zeroize::Zeroizing;

/// Random 32-byte secret, base64 encoded.
fn gen_secret() -> String {
    let mut bytes = Zeroizing::new([0u8; 32]);
    rand::rng().fill_bytes(&mut bytes[..]);
    base64::Engine::encode(&base64::engine::general_purpose::STANDARD, &bytes[..])
}

fn print_gen_secret_usage() {
    eprintln!("Usage: siwe-auth gen-secret");
    eprintln!();
    eprintln!("Print a random secret suitable for SECRET.");
    eprintln!();
    eprintln!("Then set in .env:");
    eprintln!("  SECRET=<output>");
}

#[tokio::main]
async fn main() {
    // Check for gen-secret subcommand
    let args: Vec<String> = std::env::args().collect();
    if args.len() >= 2 && args[1] == "gen-secret" {
        if args.len() != 2 {
            print_gen_secret_usage();
            std::process::exit(1);
        }
        println!("{}", gen_secret());
        return;
    }

    // Initialize tracing with env filter support (RUST_LOG)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config from environment
    let config = Config::from_env().expect("Failed to load config");
    tracing::info!("Starting siwe-auth on {}", config.bind_addr);

    let (nonces, limiter) = match config.redis_url.as_deref() {
        Some(url) => {
            let client = redis::Client::open(url).expect("Invalid Redis URL");

            // Verify Redis connection
            client
                .get_multiplexed_async_connection()
                .await
                .expect("Failed to connect to Redis");
            tracing::info!("Using Redis nonce store");

            (NonceStore::Redis(client.clone()), RateLimiter::Redis(client))
        }
        None => {
            let store = MemoryNonceStore::with_capacity(config.max_pending_nonces);
            let limiter = MemoryRateLimiter::new();
            tokio::spawn(cleanup::run_sweep_loop(
                store.clone(),
                limiter.clone(),
                Duration::from_secs(config.nonce_sweep_interval_secs),
            ));
            tracing::info!("Using in-memory nonce store");
            (NonceStore::Memory(store), RateLimiter::Memory(limiter))
        }
    };

    let service = AuthService::from_config(&config, nonces).expect("Failed to build auth service");

    // Build shared state
    let state = AppState {
        service: Arc::new(service),
        config: Arc::new(config.clone()),
        limiter,
    };

    let cors = cors_layer(&config).expect("Invalid CORS configuration");

    let app = routes::api_router()
        .layer(cors)
        .layer(axum::middleware::from_fn(security_headers))
        .with_state(state);

    // Bind to configured address
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind");
    tracing::info!("Listening on {}", config.bind_addr);

    // Start server (with_connect_info required for ConnectInfo<SocketAddr> extractors)
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server error");
}
