use std::net::SocketAddr;

use axum::{
    Json, Router,
    routing::{get, post},
};
use kube::core::DynamicObject;
use kube::core::admission::AdmissionReview;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::admission;

pub const MUTATE_PATH: &str =
    "/mutate-update-git-ogawa-github-io-v1beta1-docserver";
pub const VALIDATE_PATH: &str =
    "/validate-update-git-ogawa-github-io-v1beta1-docserver";

async fn mutate(
    Json(body): Json<AdmissionReview<DynamicObject>>,
) -> Json<AdmissionReview<DynamicObject>> {
    Json(admission::mutate_review(body))
}

async fn validate(
    Json(body): Json<AdmissionReview<DynamicObject>>,
) -> Json<AdmissionReview<DynamicObject>> {
    Json(admission::validate_review(body))
}

/// Health routes, plus the admission webhooks when enabled.
pub fn build_router(webhook_enabled: bool) -> Router {
    let mut router = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/healthz", get(|| async { "ok" }));
    if webhook_enabled {
        router = router
            .route(MUTATE_PATH, post(mutate))
            .route(VALIDATE_PATH, post(validate));
    }
    router.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

pub async fn run_http_server(
    addr: SocketAddr,
    webhook_enabled: bool,
) -> anyhow::Result<()> {
    let app = build_router(webhook_enabled);
    info!(%addr, webhook_enabled, "docserver HTTP listening");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    #[tokio::test]
    async fn healthz_is_ok() {
        let res = build_router(false)
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn validate_route_absent_when_disabled() {
        let res = build_router(false)
            .oneshot(
                Request::post(VALIDATE_PATH)
                    .header("content-type", "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    fn review(url: &str) -> Value {
        json!({
            "apiVersion": "admission.k8s.io/v1",
            "kind": "AdmissionReview",
            "request": {
                "uid": "req-1",
                "kind": {
                    "group": "update.git-ogawa.github.io",
                    "version": "v1beta1",
                    "kind": "DocServer"
                },
                "resource": {
                    "group": "update.git-ogawa.github.io",
                    "version": "v1beta1",
                    "resource": "docservers"
                },
                "name": "site",
                "namespace": "docs",
                "operation": "CREATE",
                "userInfo": {},
                "dryRun": false,
                "object": {
                    "apiVersion": "update.git-ogawa.github.io/v1beta1",
                    "kind": "DocServer",
                    "metadata": { "name": "site", "namespace": "docs" },
                    "spec": { "target": { "url": url } }
                }
            }
        })
    }

    async fn post_review(path: &str, body: Value) -> Value {
        let res = build_router(true)
            .oneshot(
                Request::post(path)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn validate_route_answers_review() {
        let out =
            post_review(VALIDATE_PATH, review("http://example.com/docs")).await;
        assert_eq!(out["response"]["uid"], "req-1");
        assert_eq!(out["response"]["allowed"], false);
    }

    #[tokio::test]
    async fn mutate_route_returns_defaulting_patch() {
        let out = post_review(
            MUTATE_PATH,
            review("https://github.com/example/docs.git"),
        )
        .await;
        assert_eq!(out["response"]["uid"], "req-1");
        assert_eq!(out["response"]["allowed"], true);
        assert_eq!(out["response"]["patchType"], "JSONPatch");

        // The patch body is the serialized JSON patch as raw bytes.
        let encoded: Vec<u8> =
            serde_json::from_value(out["response"]["patch"].clone()).unwrap();
        let ops: Vec<Value> = serde_json::from_slice(&encoded).unwrap();
        let op = |path: &str| ops.iter().find(|op| op["path"] == path).cloned();
        assert_eq!(
            op("/spec/image").unwrap()["value"],
            "squidfunk/mkdocs-material:latest"
        );
        assert_eq!(op("/spec/target/branch").unwrap()["value"], "main");
        assert_eq!(op("/spec/target/sslVerify").unwrap()["value"], true);
        assert!(op("/spec/target/url").is_none());
    }
}
