//! API Router with Swagger UI

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::application::{AuthService, AuthorizationGate};
use crate::interfaces::http::common::ApiResponse;
use crate::interfaces::http::middleware::{auth_middleware, AuthState};

use super::modules::{auth, health, metrics as metrics_module};

/// Security scheme modifier for OpenAPI
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Session token from /api/v1/auth/login"))
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::get_current_user,
    ),
    components(
        schemas(
            ApiResponse<String>,
            auth::RoleDto,
            auth::RegisterRequest,
            auth::RegisterResponse,
            auth::LoginRequest,
            auth::LoginResponse,
            auth::MeResponse,
            health::HealthResponse,
            health::ComponentHealth,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Authentication", description = "Registration, login and bearer-token identity"),
    ),
    info(
        title = "authgate API",
        version = "0.1.0",
        description = "Credential registration, login and session tokens",
    )
)]
pub struct ApiDoc;

/// Everything the router needs from the running service
#[derive(Clone)]
pub struct RouterDeps {
    pub service: Arc<AuthService>,
    pub gate: AuthorizationGate,
    pub db: DatabaseConnection,
    pub prometheus: Option<PrometheusHandle>,
}

/// Create the API router with all routes
pub fn create_api_router(deps: RouterDeps) -> Router {
    let auth_state = AuthState::new(deps.gate);
    let auth_handler_state = auth::AuthHandlerState {
        service: deps.service,
        auth: auth_state.clone(),
    };

    let public_auth_routes = Router::new()
        .route("/api/v1/auth/register", post(auth::register))
        .route("/api/v1/auth/login", post(auth::login))
        .with_state(auth_handler_state.clone());

    let protected_auth_routes = Router::new()
        .route("/api/v1/auth/me", get(auth::get_current_user))
        .route_layer(middleware::from_fn_with_state(auth_state, auth_middleware))
        .with_state(auth_handler_state);

    let health_routes = Router::new()
        .route("/health", get(health::health_check))
        .with_state(health::HealthState::new(deps.db));

    let mut router = Router::new()
        .merge(public_auth_routes)
        .merge(protected_auth_routes)
        .merge(health_routes);

    if let Some(handle) = deps.prometheus {
        router = router.merge(
            Router::new()
                .route("/metrics", get(metrics_module::prometheus_metrics))
                .with_state(metrics_module::MetricsState { handle }),
        );
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router
        .route_layer(middleware::from_fn(metrics_module::http_metrics_middleware))
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::infrastructure::crypto::jwt::{JwtConfig, SharedSecret, TokenIssuer};
    use crate::infrastructure::crypto::password::{PasswordHasher, MIN_COST};
    use crate::infrastructure::database::{test_database, SeaOrmAccountStore};

    async fn app() -> Router {
        let db = test_database().await;
        let jwt = JwtConfig::new(SharedSecret::new("router-test-secret"));
        let service = AuthService::new(
            Arc::new(SeaOrmAccountStore::new(db.clone())),
            PasswordHasher::new(MIN_COST).unwrap(),
            TokenIssuer::new(jwt.clone()),
        );

        create_api_router(RouterDeps {
            service: Arc::new(service),
            gate: AuthorizationGate::new(&jwt),
            db,
            prometheus: None,
        })
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn me(token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/api/v1/auth/me");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn register_login_me_flow() {
        let app = app().await;

        let (status, body) = send(
            &app,
            post_json(
                "/api/v1/auth/register",
                json!({"username": "alice", "email": "alice@x.com", "password": "password1"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["data"]["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            post_json("/api/v1/auth/login", json!({"username": "alice", "password": "password1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["token_type"], "Bearer");
        assert_eq!(body["data"]["expires_in"], 24 * 3600);
        let token = body["data"]["token"].as_str().unwrap().to_string();

        let (status, body) = send(&app, me(Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], id.as_str());
        assert_eq!(body["data"]["username"], "alice");
        assert_eq!(body["data"]["role"], "member");
    }

    #[tokio::test]
    async fn duplicate_registration_is_409() {
        let app = app().await;
        let payload = json!({"username": "bob", "email": "bob@x.com", "password": "password1"});

        let (first, _) = send(&app, post_json("/api/v1/auth/register", payload.clone())).await;
        let (second, body) = send(&app, post_json("/api/v1/auth/register", payload)).await;

        assert_eq!(first, StatusCode::CREATED);
        assert_eq!(second, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn self_assigned_admin_is_400() {
        let app = app().await;
        let (status, _) = send(
            &app,
            post_json(
                "/api/v1/auth/register",
                json!({"username": "eve", "email": "eve@x.com", "password": "password1", "role": "admin"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn short_password_is_400() {
        let app = app().await;
        let (status, body) = send(
            &app,
            post_json(
                "/api/v1/auth/register",
                json!({"username": "carol", "email": "carol@x.com", "password": "short"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("at least"));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_look_the_same() {
        let app = app().await;
        send(
            &app,
            post_json(
                "/api/v1/auth/register",
                json!({"username": "dave", "email": "dave@x.com", "password": "password1"}),
            ),
        )
        .await;

        let wrong = send(
            &app,
            post_json("/api/v1/auth/login", json!({"username": "dave", "password": "password2"})),
        )
        .await;
        let unknown = send(
            &app,
            post_json("/api/v1/auth/login", json!({"username": "nobody", "password": "password1"})),
        )
        .await;

        assert_eq!(wrong.0, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong, unknown);
    }

    #[tokio::test]
    async fn me_without_or_with_bad_token_is_401() {
        let app = app().await;

        let (missing, missing_body) = send(&app, me(None)).await;
        let (garbage, garbage_body) = send(&app, me(Some("not-a-token"))).await;

        assert_eq!(missing, StatusCode::UNAUTHORIZED);
        assert_eq!(garbage, StatusCode::UNAUTHORIZED);
        assert_eq!(missing_body, garbage_body);
    }

    #[tokio::test]
    async fn token_for_missing_account_is_404() {
        let app = app().await;
        let jwt = JwtConfig::new(SharedSecret::new("router-test-secret"));
        let issued = TokenIssuer::new(jwt)
            .issue(&crate::domain::AccountId::generate(), crate::domain::Role::Member)
            .unwrap();

        let (status, _) = send(&app, me(Some(&issued.token))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn wrong_verb_is_405() {
        let app = app().await;
        let request = Request::builder()
            .method("GET")
            .uri("/api/v1/auth/login")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn empty_body_is_400() {
        let app = app().await;
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn login_without_password_field_is_422() {
        let app = app().await;
        let (status, body) = send(&app, post_json("/api/v1/auth/login", json!({"username": "alice"}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn blank_authorization_header_is_401() {
        let app = app().await;
        let request = Request::builder()
            .uri("/api/v1/auth/me")
            .header(header::AUTHORIZATION, "")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let app = app().await;
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["database"]["status"], "ok");
    }

    #[tokio::test]
    async fn openapi_document_lists_auth_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/auth/register"));
        assert!(doc.paths.paths.contains_key("/api/v1/auth/login"));
        assert!(doc.paths.paths.contains_key("/api/v1/auth/me"));
    }
}
