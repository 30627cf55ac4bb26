//! HTTP surface: the parse-email endpoint (plus alias), CORS and health.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{
        HeaderName, HeaderValue, Method, StatusCode,
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN, AUTHORIZATION, CONTENT_TYPE,
        },
    },
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::extraction::{
    ExtractionService, FailureEnvelope, ParseEmailRequest, ParseOutcome, SuccessEnvelope,
};

/// Primary path of the parse endpoint.
pub const PARSE_EMAIL_PATH: &str = "/functions/v1/parse-pharma-email";

/// Alias path serving the same handler.
pub const PARSE_EMAIL_ALIAS_PATH: &str = "/api/parse-email";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ExtractionService>,
}

/// Build the router with the parse endpoints and health check.
pub fn router(service: Arc<ExtractionService>) -> Router {
    let state = AppState { service };

    Router::new()
        .route("/health", get(health))
        .route(PARSE_EMAIL_PATH, post(parse_email).options(preflight))
        .route(PARSE_EMAIL_ALIAS_PATH, post(parse_email).options(preflight))
        .layer(cors_layer())
        .layer(SetResponseHeaderLayer::if_not_present(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("authorization, x-client-info, apikey, content-type"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("POST, OPTIONS"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Permissive CORS for the browser CRM client.
///
/// The `SetResponseHeaderLayer`s in `router` stamp the same headers on
/// responses to requests that carry no `Origin`.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
        ])
}

/// Health check.
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "pharma-inquiry",
    }))
}

/// Bare `OPTIONS` without CORS request headers.
async fn preflight() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn parse_email(
    State(state): State<AppState>,
    payload: Result<Json<ParseEmailRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            error!(error = %rejection.body_text(), "Unreadable parse request body");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(FailureEnvelope::new(rejection.body_text())),
            )
                .into_response();
        }
    };

    match state.service.parse(&request).await {
        Ok(ParseOutcome::Parsed { data, raw }) => {
            (StatusCode::OK, Json(SuccessEnvelope::new(data, raw))).into_response()
        }
        Ok(ParseOutcome::Unavailable { error, fallback }) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(FailureEnvelope::new(error).with_fallback(fallback)),
        )
            .into_response(),
        Err(e) => {
            error!(sender = %request.from_email, error = %e, "Email parsing failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(FailureEnvelope::new(e.to_string())),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::error::LlmError;
    use crate::llm::provider::{CompletionRequest, CompletionResponse, FinishReason, LlmProvider};
    use crate::store::LibSqlBackend;

    struct FixedLlm(Result<&'static str, &'static str>);

    #[async_trait]
    impl LlmProvider for FixedLlm {
        fn model_name(&self) -> &str {
            "fixed"
        }

        async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            match self.0 {
                Ok(content) => Ok(CompletionResponse {
                    content: content.to_string(),
                    input_tokens: 10,
                    output_tokens: 10,
                    finish_reason: FinishReason::Stop,
                    response_id: None,
                }),
                Err(body) => Err(LlmError::Api {
                    provider: "OpenAI".into(),
                    body: body.to_string(),
                }),
            }
        }
    }

    async fn app(llm: Option<FixedLlm>) -> Router {
        let store = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let llm = llm.map(|l| Arc::new(l) as Arc<dyn LlmProvider>);
        router(Arc::new(ExtractionService::new(store, llm)))
    }

    fn post_json(path: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    const EMAIL: &str =
        r#"{"emailSubject":"RFQ","emailBody":"Need 500 KG Paracetamol USP","fromEmail":"buyer@pharmaco.id"}"#;

    #[tokio::test]
    async fn parse_success_envelope() {
        let app = app(Some(FixedLlm(Ok(
            r#"{"isInquiry":true,"productName":"Paracetamol","quantity":"500 KG","confidenceScore":0.9}"#,
        ))))
        .await;

        let response = app.oneshot(post_json(PARSE_EMAIL_PATH, EMAIL)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["productName"], "Paracetamol");
        assert_eq!(json["data"]["purposeIcons"], json!(["price"]));
        assert_eq!(json["rawAiResponse"]["quantity"], "500 KG");
    }

    #[tokio::test]
    async fn alias_path_serves_same_handler() {
        let app = app(Some(FixedLlm(Ok(r#"{"productName":"Lactose"}"#)))).await;
        let response = app
            .oneshot(post_json(PARSE_EMAIL_ALIAS_PATH, EMAIL))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["data"]["productName"], "Lactose");
    }

    #[tokio::test]
    async fn missing_credential_is_503_with_fallback() {
        let app = app(None).await;
        let response = app.oneshot(post_json(PARSE_EMAIL_PATH, EMAIL)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert!(json["error"].as_str().unwrap().contains("OPENAI_API_KEY"));
        assert_eq!(json["fallbackData"]["confidenceScore"], 0.3);
        assert_eq!(json["fallbackData"]["priceRequested"], true);
    }

    #[tokio::test]
    async fn upstream_failure_is_500() {
        let app = app(Some(FixedLlm(Err("rate limited")))).await;
        let response = app.oneshot(post_json(PARSE_EMAIL_PATH, EMAIL)).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "OpenAI API error: rate limited");
        assert!(json.get("fallbackData").is_none());
    }

    #[tokio::test]
    async fn malformed_body_is_500() {
        let app = app(None).await;
        let response = app
            .oneshot(post_json(PARSE_EMAIL_PATH, "not json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert!(!json["error"].as_str().unwrap().is_empty());
        assert!(json.get("fallbackData").is_none());
    }

    #[tokio::test]
    async fn missing_sender_is_500() {
        let app = app(None).await;
        let response = app
            .oneshot(post_json(
                PARSE_EMAIL_PATH,
                r#"{"emailSubject":"x","emailBody":"y"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["success"], false);
    }

    #[tokio::test]
    async fn cors_headers_without_origin() {
        let app = app(None).await;
        let response = app.oneshot(post_json(PARSE_EMAIL_PATH, EMAIL)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let headers = response.headers();
        assert_eq!(headers["access-control-allow-origin"], "*");
        let allowed = headers["access-control-allow-headers"].to_str().unwrap();
        assert!(allowed.contains("apikey"));
        assert!(allowed.contains("x-client-info"));
        assert!(headers["access-control-allow-methods"]
            .to_str()
            .unwrap()
            .contains("POST"));
    }

    #[tokio::test]
    async fn cors_headers_on_upstream_failure() {
        let app = app(Some(FixedLlm(Err("boom")))).await;
        let response = app.oneshot(post_json(PARSE_EMAIL_PATH, EMAIL)).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
    }

    #[tokio::test]
    async fn bare_options_is_ok() {
        let app = app(None).await;
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri(PARSE_EMAIL_PATH)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn cors_preflight_allows_any_origin() {
        let app = app(None).await;
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri(PARSE_EMAIL_ALIAS_PATH)
            .header("origin", "https://crm.example.com")
            .header("access-control-request-method", "POST")
            .header("access-control-request-headers", "content-type,apikey")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers["access-control-allow-origin"], "*");
        let methods = headers["access-control-allow-methods"].to_str().unwrap();
        assert!(methods.contains("POST"));
        let allowed = headers["access-control-allow-headers"]
            .to_str()
            .unwrap()
            .to_ascii_lowercase();
        assert!(allowed.contains("x-client-info"));
        assert!(allowed.contains("apikey"));
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let app = app(None).await;
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"status": "ok", "service": "pharma-inquiry"})
        );
    }
}
