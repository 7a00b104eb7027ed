use std::{future::Future, net::SocketAddr, sync::Arc};

use anyhow::Result;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::{
    location::{Location, NewLocation},
    message::{AddResponse, LEGACY_LIST_PATH, LEGACY_SAVE_PATH, LOCATIONS_PATH},
    registry::{LocationRegistry, RegistryError},
};

type SharedRegistry = Arc<LocationRegistry>;

pub struct Server {
    listener: TcpListener,
    registry: SharedRegistry,
}

impl Server {
    pub fn new(listener: TcpListener, registry: LocationRegistry) -> Self {
        Self {
            listener,
            registry: Arc::new(registry),
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Server { listener, registry } = self;
        axum::serve(listener, router(registry))
            .with_graceful_shutdown(async move {
                shutdown.await;
                info!("server shutting down");
            })
            .await?;
        Ok(())
    }

    pub async fn run_until_ctrl_c(self) -> Result<()> {
        self.run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = ?err, "failed to install ctrl-c handler");
            }
        })
        .await
    }
}

/// Builds the HTTP surface of the registry.
pub fn router(registry: SharedRegistry) -> Router {
    Router::new()
        .route(LOCATIONS_PATH, get(list_locations).post(add_location))
        .route(LEGACY_LIST_PATH, get(list_locations))
        .route(LEGACY_SAVE_PATH, post(add_location))
        .layer(TraceLayer::new_for_http())
        .with_state(registry)
}

async fn list_locations(State(registry): State<SharedRegistry>) -> Json<Vec<Location>> {
    Json(registry.list().await)
}

async fn add_location(
    State(registry): State<SharedRegistry>,
    payload: Result<Json<NewLocation>, JsonRejection>,
) -> (StatusCode, Json<AddResponse>) {
    let Json(new) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!(error = %rejection, "malformed add request");
            return (StatusCode::UNPROCESSABLE_ENTITY, Json(AddResponse::error()));
        }
    };

    match registry.add(new).await {
        Ok(location) => (StatusCode::OK, Json(AddResponse::success(location.id))),
        Err(RegistryError::Validation(err)) => {
            warn!(error = %err, "rejected add request");
            (StatusCode::UNPROCESSABLE_ENTITY, Json(AddResponse::error()))
        }
        Err(err) => {
            warn!(error = %err, "failed to store location");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(AddResponse::error()))
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request},
    };
    use tower::ServiceExt;

    use super::*;

    fn json_request(method: Method, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("valid request")
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn add_replies_with_assigned_id() {
        let app = router(Arc::new(LocationRegistry::in_memory()));
        let response = app
            .oneshot(json_request(
                Method::POST,
                LOCATIONS_PATH,
                r#"{"name":"Colombo","lat":6.9271,"lng":79.8612}"#,
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"status": "success", "id": 1})
        );
    }

    #[tokio::test]
    async fn malformed_body_is_a_status_error() {
        let registry = Arc::new(LocationRegistry::in_memory());
        let app = router(Arc::clone(&registry));
        let response = app
            .oneshot(json_request(
                Method::POST,
                LOCATIONS_PATH,
                r#"{"name":"Colombo","lat":"north"}"#,
            ))
            .await
            .expect("response");

        assert_eq!(
            body_json(response).await,
            serde_json::json!({"status": "error"})
        );
        assert!(registry.list().await.is_empty());
    }

    #[tokio::test]
    async fn legacy_list_path_serves_the_same_array() {
        let registry = Arc::new(LocationRegistry::in_memory());
        registry
            .add(NewLocation::new("Kandy", 7.2906, 80.6337))
            .await
            .expect("seed");

        let response = router(registry)
            .oneshot(
                Request::builder()
                    .uri(LEGACY_LIST_PATH)
                    .body(Body::empty())
                    .expect("valid request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            serde_json::json!([{"id": 1, "name": "Kandy", "lat": 7.2906, "lng": 80.6337}])
        );
    }
}
