use rollcall_api::{AppState, build_router};
use rollcall_config::Settings;
use uuid::Uuid;

/// One running API instance backed by a throwaway database.
///
/// Each test gets its own database name so tests can run in parallel
/// against a shared MongoDB (override the connection string with
/// `ROLLCALL__DATABASE__URL`).
pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    pub db_name: String,
}

impl TestApp {
    pub async fn spawn() -> anyhow::Result<TestApp> {
        let mut settings = Settings::load()?;
        settings.database.name = format!("rollcall_test_{}", Uuid::new_v4().simple());

        let db = rollcall_db::connect(&settings).await?;
        rollcall_db::indexes::ensure_indexes(&db).await?;

        let db_name = settings.database.name.clone();
        let state = AppState::new(db, settings);
        let app = build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "test server exited");
            }
        });

        let client = reqwest::Client::builder().cookie_store(true).build()?;

        Ok(TestApp {
            address: format!("http://{addr}"),
            client,
            db_name,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }
}
