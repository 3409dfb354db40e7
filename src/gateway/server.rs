//! Gateway HTTP server.
//!
//! # Responsibilities
//! - Build the axum Router (admin routes + catch-all forwarder)
//! - Wire up middleware (request ID, tracing)
//! - Forward every other request through the pipeline
//! - Serve until the shutdown signal, draining in-flight requests

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::response::Response;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::admin;
use crate::gateway::convert::{error_response, into_descriptor, snapshot_response};
use crate::pipeline::Pipeline;

/// State injected into gateway and admin handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Pipeline,
}

/// Build the full router. Admin routes are mounted only when enabled.
pub fn build_router(pipeline: Pipeline) -> Router {
    let state = AppState { pipeline };
    let admin_enabled = state.pipeline.config().admin.enabled;

    let mut router = Router::new();
    if admin_enabled {
        router = router.merge(admin::routes(state.clone()));
    }

    router
        .fallback(gateway_handler)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
}

/// Forward one request through the pipeline.
async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let max_body_bytes = state.pipeline.config().gateway.max_body_bytes;

    let descriptor = match into_descriptor(request, max_body_bytes).await {
        Ok(descriptor) => descriptor,
        Err(rejection) => return rejection,
    };

    match state.pipeline.dispatch(descriptor).await {
        Ok(snapshot) => snapshot_response(snapshot),
        Err(error) => error_response(&error),
    }
}

/// Gateway server bound to one listener.
pub struct GatewayServer {
    router: Router,
}

impl GatewayServer {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            router: build_router(pipeline),
        }
    }

    /// Serve until `shutdown` fires, then finish in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Gateway listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Gateway received shutdown signal, draining");
            })
            .await?;

        tracing::info!("Gateway stopped");
        Ok(())
    }
}
