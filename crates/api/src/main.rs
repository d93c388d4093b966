use std::sync::Arc;

use anyhow::Context;

use supplygate_api::app::{AppServices, build_app};
use supplygate_api::config::ApiConfig;
use supplygate_core::UserId;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    supplygate_observability::init();

    let config = ApiConfig::from_env()?;
    let services = Arc::new(AppServices::in_memory());

    if config.seed_demo {
        let owner = UserId::new();
        let id = services.seed_demo(owner).context("failed to seed demo requisition")?;
        tracing::info!(requisition_id = %id, owner = %owner, "seeded demo requisition");
    }

    let _notifications = services.spawn_notification_log();
    let app = build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
