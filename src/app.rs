use std::net::SocketAddr;
use axum::{Router, routing::get};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use crate::config::AppConfig;
use crate::state::AppState;
use crate::users;

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(users::router())
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                req = req.header(header::CONTENT_TYPE, "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let res = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    async fn seeded() -> (Router, String, String) {
        let app = build_app(AppState::in_memory());
        let (_, alice) = send(
            &app,
            Method::POST,
            "/users",
            Some(json!({"name": "Alice", "email": "alice@example.com", "gender": "Female"})),
        )
        .await;
        let (_, bob) = send(
            &app,
            Method::POST,
            "/users",
            Some(json!({"name": "Bob", "email": "bob@example.com", "gender": "Male"})),
        )
        .await;
        let alice_id = alice["id"].as_str().unwrap().to_string();
        let bob_id = bob["id"].as_str().unwrap().to_string();
        (app, alice_id, bob_id)
    }

    fn names(list: &Value) -> Vec<String> {
        list.as_array()
            .unwrap()
            .iter()
            .map(|u| u["name"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let app = build_app(AppState::in_memory());
        let res = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn create_returns_201_with_location() {
        let app = build_app(AppState::in_memory());
        let req = Request::builder()
            .method(Method::POST)
            .uri("/users")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({"name": "Alice", "email": "a@example.com", "gender": "Female"}).to_string(),
            ))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let location = res.headers().get(header::LOCATION).unwrap().to_str().unwrap().to_string();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let user: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(location, format!("/users/{}", user["id"].as_str().unwrap()));
        assert_eq!(user["email"], "a@example.com");
    }

    #[tokio::test]
    async fn create_missing_field_is_400_with_message() {
        let app = build_app(AppState::in_memory());
        let (status, body) = send(
            &app,
            Method::POST,
            "/users",
            Some(json!({"name": "Alice", "gender": "Female"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "email is required");
    }

    #[tokio::test]
    async fn malformed_json_is_400_with_message() {
        let app = build_app(AppState::in_memory());
        let req = Request::builder()
            .method(Method::POST)
            .uri("/users")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["message"].as_str().is_some());
    }

    #[tokio::test]
    async fn list_filters_by_name_substring() {
        let (app, _, _) = seeded().await;
        let (status, list) = send(&app, Method::GET, "/users?name=ali", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(names(&list), ["Alice"]);

        let (_, list) = send(&app, Method::GET, "/users?name=O", None).await;
        assert_eq!(names(&list), ["Bob"]);
    }

    #[tokio::test]
    async fn list_filters_by_gender_and_sorts() {
        let (app, _, _) = seeded().await;
        let (_, list) = send(&app, Method::GET, "/users?gender=Male", None).await;
        assert_eq!(names(&list), ["Bob"]);

        let (_, list) = send(&app, Method::GET, "/users?sort=-name", None).await;
        assert_eq!(names(&list), ["Bob", "Alice"]);

        let (_, list) = send(&app, Method::GET, "/users?sort=name", None).await;
        assert_eq!(names(&list), ["Alice", "Bob"]);
    }

    #[tokio::test]
    async fn list_with_unknown_sort_field_is_400() {
        let (app, _, _) = seeded().await;
        let (status, body) = send(&app, Method::GET, "/users?sort=age", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "unknown sort field: age");
    }

    #[tokio::test]
    async fn empty_query_values_are_ignored() {
        let (app, _, _) = seeded().await;
        let (status, list) = send(&app, Method::GET, "/users?sort=", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(names(&list), ["Alice", "Bob"]);

        let (status, list) = send(&app, Method::GET, "/users?name=&gender=&sort=", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(names(&list), ["Alice", "Bob"]);

        let (status, _) = send(&app, Method::GET, "/users?sort=-", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn patch_changes_only_given_fields() {
        let (app, alice_id, _) = seeded().await;
        let uri = format!("/users/{alice_id}");
        let (status, outcome) =
            send(&app, Method::PATCH, &uri, Some(json!({"gender": "Male"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(outcome["matched_count"], 1);
        assert_eq!(outcome["modified_count"], 1);
        assert_eq!(outcome["user"]["gender"], "Male");

        let (status, user) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(user["name"], "Alice");
        assert_eq!(user["gender"], "Male");
        assert_eq!(user["email"], "alice@example.com");
    }

    #[tokio::test]
    async fn patch_and_delete_with_bad_ids() {
        let (app, _, _) = seeded().await;
        let (status, _) =
            send(&app, Method::PATCH, "/users/xyz", Some(json!({"name": "Z"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, Method::DELETE, "/users/xyz", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let missing = format!("/users/{}", uuid::Uuid::new_v4());
        let (status, body) = send(&app, Method::DELETE, &missing, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "User not found");
    }

    #[tokio::test]
    async fn delete_then_get_is_404() {
        let (app, _, bob_id) = seeded().await;
        let uri = format!("/users/{bob_id}");
        let (status, body) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deleted_count"], 1);

        let (status, body) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "User not found");
    }
}
