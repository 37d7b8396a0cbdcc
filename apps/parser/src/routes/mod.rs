pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::parsing::handlers;
use crate::state::AppState;

/// Uploads carry whole resumes; the Axum default of 2 MB is too small.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/resumes/parse", post(handlers::handle_parse))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        routing::get as stub_get,
        Json,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::llm_client::OllamaClient;
    use crate::parsing::pipeline::{PipelineConfig, ResumePipeline};

    const BOUNDARY: &str = "X-RESUME-BOUNDARY";

    fn state_for(host: String) -> AppState {
        let config = Config {
            ollama_host: host.clone(),
            model: "llama3.1:8b".to_string(),
            port: 0,
            rust_log: "info".to_string(),
        };
        let pipeline = ResumePipeline::new(
            Arc::new(OllamaClient::new(host)),
            PipelineConfig {
                model: config.model.clone(),
            },
        );
        AppState {
            pipeline: Arc::new(pipeline),
            config,
        }
    }

    async fn spawn_stub(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn closed_port() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}")
    }

    fn multipart_body(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, data) in files {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn parse_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/resumes/parse")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_unreachable_endpoint() {
        let app = build_router(state_for(closed_port().await));
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["inference"]["reachable"], false);
        assert!(body["inference"]["detail"].is_string());
    }

    #[tokio::test]
    async fn test_parse_returns_503_when_endpoint_down() {
        let app = build_router(state_for(closed_port().await));
        let response = app
            .oneshot(parse_request(multipart_body(&[("cv.docx", b"zip?".as_slice())])))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "SERVICE_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_parse_without_files_is_rejected() {
        let app = build_router(state_for(closed_port().await));
        let response = app.oneshot(parse_request(multipart_body(&[]))).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_parse_unsupported_upload_becomes_error_row() {
        let ollama = Router::new().route(
            "/api/tags",
            stub_get(|| async { Json(json!({"models": [{"name": "llama3.1:8b"}]})) }),
        );
        let app = build_router(state_for(spawn_stub(ollama).await));

        let response = app
            .oneshot(parse_request(multipart_body(&[("notes.txt", b"Jane Doe".as_slice())])))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["file"], "notes.txt");
        assert_eq!(results[0]["error"], "Unsupported: .txt");
        assert_eq!(results[0]["skills"], json!(["ERROR: Unsupported: .txt"]));
    }
}
