use std::sync::Arc;

use anyhow::Context;

use permgate_api::{authz::Authorization, config::ServerConfig, credentials::MIN_ADMIN_SECRET_LEN};
use permgate_auth::InMemoryAuthorizationStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env().context("load configuration")?;
    permgate_observability::init(config.log_format);

    match config.auth.api_secret.as_deref() {
        None => tracing::warn!(
            "API_SECRET not set; token issuance, token verification and the admin secret are disabled"
        ),
        Some(secret) if secret.chars().count() <= MIN_ADMIN_SECRET_LEN => tracing::warn!(
            "API_SECRET is {MIN_ADMIN_SECRET_LEN} characters or fewer; the admin secret is disabled"
        ),
        Some(_) => {}
    }

    let store = Arc::new(InMemoryAuthorizationStore::new());
    for seed in &config.subjects {
        let subject = store.create_subject(seed.name.clone(), seed.roles.clone());
        tracing::info!(
            subject = %subject.name,
            access_token = %subject.access_token,
            roles = ?subject.roles.iter().map(|r| r.as_str()).collect::<Vec<_>>(),
            "seeded subject"
        );
    }

    let authorization = Arc::new(Authorization::new(&config.auth, store));
    let app = permgate_api::app::build_app(authorization.clone());
    tracing::info!(
        permissions = ?authorization
            .registry()
            .permissions()
            .iter()
            .map(|p| p.as_str().to_string())
            .collect::<Vec<_>>(),
        default_roles = ?config.auth.default_roles.iter().map(|r| r.as_str()).collect::<Vec<_>>(),
        "routes registered"
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
