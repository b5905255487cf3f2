use rollcall_api::{AppState, build_router};
use rollcall_config::Settings;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "rollcall_api=debug,rollcall_services=debug,rollcall_db=debug,tower_http=debug".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::load()?;
    let db = rollcall_db::connect(&settings).await?;
    rollcall_db::indexes::ensure_indexes(&db).await?;

    let addr = format!("{}:{}", settings.app.host, settings.app.port);
    let state = AppState::new(db, settings);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "rollcall-api listening");
    axum::serve(listener, app).await?;

    Ok(())
}
