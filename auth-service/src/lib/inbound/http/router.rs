use std::sync::Arc;
use std::time::Duration;

use auth::Authenticator;
use axum::body::Body;
use axum::http::header;
use axum::http::HeaderValue;
use axum::http::Method;
use axum::http::Request;
use axum::http::Response;
use axum::middleware;
use axum::routing::get;
use axum::routing::post;
use axum::Router;
use tower_http::cors::AllowOrigin;
use tower_http::cors::Any;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::handlers::get_user::get_user;
use super::handlers::health::health;
use super::handlers::login::login;
use super::handlers::logout::logout;
use super::handlers::profile::profile;
use super::handlers::register::register;
use super::middleware::authenticate;
use super::middleware::require_authentication;
use crate::config::CorsConfig;
use crate::domain::access::gate::RequestGate;
use crate::domain::access::gate::RequestGatePort;
use crate::domain::user::ports::AuthServicePort;
use crate::domain::user::ports::CredentialStore;
use crate::domain::user::service::AuthService;

#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<dyn AuthServicePort>,
    pub request_gate: Arc<dyn RequestGatePort>,
    pub public_paths: Arc<Vec<String>>,
}

impl AppState {
    /// Wire the auth service and request gate over a single credential store.
    pub fn new<S>(store: Arc<S>, authenticator: Arc<Authenticator>, public_paths: Vec<String>) -> Self
    where
        S: CredentialStore,
    {
        let auth_service = AuthService::new(Arc::clone(&store), Arc::clone(&authenticator));
        let request_gate = RequestGate::new(store, authenticator);

        Self {
            auth_service: Arc::new(auth_service),
            request_gate: Arc::new(request_gate),
            public_paths: Arc::new(public_paths),
        }
    }
}

pub fn create_router(state: AppState, cors: &CorsConfig) -> Router {
    let routes = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/health", get(health))
        .route("/auth/profile", get(profile))
        .route("/auth/logout", post(logout))
        .route("/auth/admin/users/:username", get(get_user));

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version(),
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                "Request started"
            );
        })
        .on_response(
            |response: &Response<Body>, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis(),
                    "Request completed"
                );
            },
        );

    routes
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_authentication,
        ))
        .layer(middleware::from_fn_with_state(state.clone(), authenticate))
        .layer(trace_layer)
        .layer(cors_layer(cors))
        .with_state(state)
}

/// Build the CORS policy. `*` in the origin list allows any origin.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
            Method::PATCH,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([header::AUTHORIZATION])
        .max_age(Duration::from_secs(config.max_age_secs));

    if config.allowed_origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use http_body_util::BodyExt;
    use serde_json::json;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::config::SecurityConfig;
    use crate::domain::user::models::Role;
    use crate::domain::user::models::Username;
    use crate::domain::user::service::tests::test_authenticator;
    use crate::outbound::repositories::InMemoryCredentialStore;

    struct TestRouter {
        app: Router,
        store: Arc<InMemoryCredentialStore>,
    }

    fn test_router() -> TestRouter {
        let store = Arc::new(InMemoryCredentialStore::new());
        let state = AppState::new(
            Arc::clone(&store),
            test_authenticator(),
            SecurityConfig::default().public_paths,
        );

        TestRouter {
            app: create_router(state, &CorsConfig::default()),
            store,
        }
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_with_token(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn register_and_login(app: &Router, username: &str) -> String {
        let (status, _) = send(
            app,
            post_json(
                "/auth/register",
                json!({
                    "username": username,
                    "email": format!("{}@x.com", username),
                    "password": "Secr3t!"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(
            app,
            post_json(
                "/auth/login",
                json!({ "username": username, "password": "Secr3t!" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let router = test_router();

        let (status, body) = send(&router.app, get_with_token("/auth/health", None)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "UP");
        assert_eq!(body["service"], "auth-service");
    }

    #[tokio::test]
    async fn test_register_login_profile() {
        let router = test_router();

        let (status, body) = send(
            &router.app,
            post_json(
                "/auth/register",
                json!({ "username": "ana", "email": "ana@x.com", "password": "Secr3t!" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["username"], "ana");

        let (status, body) = send(
            &router.app,
            post_json(
                "/auth/login",
                json!({ "username": "ana", "password": "Secr3t!" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["role"], "USER");
        assert_eq!(body["email"], "ana@x.com");
        assert_eq!(body["expiresInMs"], 86_400_000);
        let token = body["token"].as_str().unwrap().to_string();

        let (status, body) = send(&router.app, get_with_token("/auth/profile", Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "ana");
        assert_eq!(body["email"], "ana@x.com");
        assert_eq!(body["role"], "USER");
        assert!(body["createdAt"].is_string());
        assert!(body["lastLogin"].is_string());
    }

    #[tokio::test]
    async fn test_protected_routes_require_identity() {
        let router = test_router();

        for request in [
            get_with_token("/auth/profile", None),
            get_with_token("/auth/profile", Some("garbage")),
            post_json("/auth/logout", json!({})),
            get_with_token("/auth/admin/users/ana", None),
        ] {
            let (status, body) = send(&router.app, request).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body, json!({ "error": "Authentication required" }));
        }
    }

    #[tokio::test]
    async fn test_profile_of_deleted_subject_is_not_found() {
        let router = test_router();
        let token = test_authenticator()
            .issue_token("ghost", chrono::Utc::now())
            .unwrap()
            .token;

        let (status, body) = send(&router.app, get_with_token("/auth/profile", Some(&token))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("ghost"));

        let (status, _) = send(
            &router.app,
            get_with_token("/auth/admin/users/ghost", Some(&token)),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let logout = Request::builder()
            .method(Method::POST)
            .uri("/auth/logout")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&router.app, logout).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let router = test_router();
        register_and_login(&router.app, "ana").await;

        let wrong_password = send(
            &router.app,
            post_json("/auth/login", json!({ "username": "ana", "password": "nope" })),
        )
        .await;
        let unknown_user = send(
            &router.app,
            post_json("/auth/login", json!({ "username": "ghost", "password": "x" })),
        )
        .await;

        assert_eq!(wrong_password.0, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_password, unknown_user);
        assert_eq!(wrong_password.1, json!({ "error": "Invalid credentials" }));
    }

    #[tokio::test]
    async fn test_login_validation_and_malformed_json() {
        let router = test_router();

        let (status, body) = send(&router.app, post_json("/auth/login", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Validation failed");
        assert_eq!(body["fieldErrors"]["username"], "Username is required");
        assert_eq!(body["fieldErrors"]["password"], "Password is required");

        let request = Request::builder()
            .method(Method::POST)
            .uri("/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(&router.app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_duplicate_registration() {
        let router = test_router();
        register_and_login(&router.app, "ana").await;

        let (status, body) = send(
            &router.app,
            post_json(
                "/auth/register",
                json!({ "username": "ana", "email": "novel@x.com", "password": "Secr3t!" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Username already taken: ana");

        let (status, body) = send(
            &router.app,
            post_json(
                "/auth/register",
                json!({ "username": "novel", "email": "ana@x.com", "password": "Secr3t!" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Email already taken: ana@x.com");
    }

    #[tokio::test]
    async fn test_admin_route_requires_admin_role() {
        let router = test_router();
        let token = register_and_login(&router.app, "ana").await;

        let (status, body) = send(
            &router.app,
            get_with_token("/auth/admin/users/ana", Some(&token)),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body, json!({ "error": "Access denied" }));

        router
            .store
            .update_role(&Username::new("ana".to_string()).unwrap(), Role::Admin)
            .await
            .unwrap();

        let (status, body) = send(
            &router.app,
            get_with_token("/auth/admin/users/ana", Some(&token)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["role"], "ADMIN");
        assert_eq!(body["active"], true);

        let (status, _) = send(
            &router.app,
            get_with_token("/auth/admin/users/ghost", Some(&token)),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_logout_returns_instruction() {
        let router = test_router();
        let token = register_and_login(&router.app, "ana").await;

        let request = Request::builder()
            .method(Method::POST)
            .uri("/auth/logout")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&router.app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["message"].is_string());
        assert!(body["instruction"].is_string());

        let (status, _) = send(&router.app, get_with_token("/auth/profile", Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cors_preflight_for_configured_origin() {
        let router = test_router();

        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/auth/login")
            .header(header::ORIGIN, "http://localhost:3000")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();
        let response = router.app.clone().oneshot(request).await.unwrap();

        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "http://localhost:3000"
        );
    }
}
