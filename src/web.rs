//! HTTP server bootstrap for the policy API.
use crate::errors::GateError;
use crate::policy::persist::JsonFileStore;
use crate::policy::web::{router, PolicyState};
use crate::settings::Settings;
use axum::body::Body;
use axum::http::{header, HeaderValue, Request};
use axum::middleware::{self, Next};
use axum::response::IntoResponse;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;

// Decisions depend on configuration that may change at any time.
async fn response_headers(request: Request<Body>, next: Next) -> impl IntoResponse {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    response
}

pub fn app(settings: &Settings) -> Router {
    let store = JsonFileStore::new(&settings.store.path, &settings.store.option_key);
    let state = PolicyState {
        store: Arc::new(store),
        site_url: Arc::from(settings.site.url.as_str()),
        async_prefixes: Arc::from(settings.site.async_prefixes.clone()),
    };
    router(state).layer(middleware::from_fn(response_headers))
}

pub async fn serve(settings: Settings) -> Result<(), GateError> {
    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .map_err(|e| GateError::ListenAddr(format!("{e}")))?;

    tracing::info!(
        store = %settings.store.path.display(),
        key = %settings.store.option_key,
        site = %settings.site.url,
        "Serving policy from settings store"
    );

    let app = app(&settings);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Policy API listening");
    axum::serve(listener, app).await?;
    Ok(())
}
