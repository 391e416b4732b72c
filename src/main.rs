use std::sync::Arc;

use sessiongate::config::AppConfig;
use sessiongate::identity::FirebaseIdentity;
use sessiongate::profiles::PgProfileStore;
use sessiongate::state::AppState;
use sessiongate::{db, routes};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env().expect("invalid configuration");
    let identity = FirebaseIdentity::from_env().expect("identity provider config");

    let pool = db::init_pool(&config.database)
        .await
        .expect("database init failed");
    let profiles = PgProfileStore::new(pool);

    let state = AppState::new(Arc::new(identity), Arc::new(profiles), config.cookies, config.gate.clone());
    let app = routes::app(state, &config.static_dir);

    let port = config.port;
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, verify_tokens = config.gate.verify_tokens, "sessiongate listening");
    axum::serve(listener, app).await.expect("server failed");
}
