/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use projectflow_api::{app::AppState, config::Config};
/// use projectflow_shared::auth::clock::SystemClock;
/// use projectflow_shared::service::mail::LogMailer;
/// use projectflow_shared::store::memory::MemoryStore;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::new(
///     Arc::new(MemoryStore::new()),
///     Arc::new(LogMailer),
///     Arc::new(SystemClock),
///     config,
/// );
/// let app = projectflow_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post, put},
    Router,
};
use projectflow_shared::{
    auth::{
        clock::Clock,
        middleware::authenticate,
        tokens::{TokenConfig, TokenService},
    },
    service::{
        auth::{AuthService, AuthSettings},
        mail::Mailer,
        project::ProjectService,
        task::TaskService,
        user::UserService,
    },
    store::Store,
};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::{config::Config, error::ApiError};

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Every field is reference-counted, so clones are cheap.
#[derive(Clone)]
pub struct AppState {
    /// Persistence backend
    pub store: Arc<dyn Store>,

    pub auth: AuthService,
    pub projects: ProjectService,
    pub tasks: TaskService,
    pub users: UserService,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Wires the services over one store
    pub fn new(
        store: Arc<dyn Store>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
        config: Config,
    ) -> Self {
        let tokens = TokenService::new(
            store.clone(),
            TokenConfig {
                jwt_secret: config.jwt.secret.clone(),
                access_ttl: config.jwt.access_ttl(),
                refresh_ttl: config.jwt.refresh_ttl(),
                verification_ttl: config.jwt.verification_ttl(),
            },
            clock,
        );

        let auth = AuthService::new(
            store.clone(),
            tokens,
            mailer,
            AuthSettings {
                require_verification: config.accounts.require_email_verification,
                client_url: config.accounts.client_url.clone(),
            },
        );

        Self {
            projects: ProjectService::new(store.clone()),
            tasks: TaskService::new(store.clone()),
            users: UserService::new(store.clone()),
            auth,
            store,
            config: Arc::new(config),
        }
    }

    /// Token service shared by the auth layer and the auth routes
    pub fn tokens(&self) -> &TokenService {
        self.auth.tokens()
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET /health
/// └── /api/
///     ├── /auth/
///     │   ├── POST /register
///     │   ├── GET  /confirm?token=
///     │   ├── POST /login
///     │   ├── POST /refresh
///     │   ├── POST /logout              (authenticated)
///     │   └── GET  /me                  (authenticated)
///     ├── GET /users/:id                (authenticated)
///     ├── /projects                     (authenticated)
///     │   ├── POST, GET /
///     │   ├── GET, PUT, DELETE /:id
///     │   ├── GET /:id/role
///     │   ├── GET, POST /:id/members
///     │   └── PUT, DELETE /:id/members/:user_id
///     └── /tasks                        (authenticated)
///         ├── POST, GET /
///         ├── GET /dashboard?project_id=
///         ├── GET, PUT, DELETE /:id
///         └── PUT /:id/position
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Authentication (authenticated routes only)
/// 2. Logging (tower-http TraceLayer)
/// 3. CORS (tower-http CorsLayer)
/// 4. Response compression
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let public_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api/auth/register", post(routes::auth::register))
        .route("/api/auth/confirm", get(routes::auth::confirm))
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/refresh", post(routes::auth::refresh));

    let protected_routes = Router::new()
        .route("/api/auth/logout", post(routes::auth::logout))
        .route("/api/auth/me", get(routes::auth::me))
        .route("/api/users/:id", get(routes::users::get_user))
        .route(
            "/api/projects",
            post(routes::projects::create_project).get(routes::projects::list_projects),
        )
        .route(
            "/api/projects/:id",
            get(routes::projects::get_project)
                .put(routes::projects::update_project)
                .delete(routes::projects::delete_project),
        )
        .route("/api/projects/:id/role", get(routes::projects::get_role))
        .route(
            "/api/projects/:id/members",
            get(routes::projects::list_members).post(routes::projects::add_member),
        )
        .route(
            "/api/projects/:id/members/:user_id",
            put(routes::projects::change_role).delete(routes::projects::exclude_member),
        )
        .route(
            "/api/tasks",
            post(routes::tasks::create_task).get(routes::tasks::list_tasks),
        )
        .route("/api/tasks/dashboard", get(routes::tasks::dashboard))
        .route(
            "/api/tasks/:id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/api/tasks/:id/position", put(routes::tasks::move_task))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_layer,
        ));

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(CompressionLayer::new())
        .with_state(state)
}

/// Authentication middleware layer
///
/// Resolves the caller from the Bearer header or the `access_token` cookie,
/// then injects the `AuthContext` into request extensions.
async fn auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_context = authenticate(state.tokens(), req.headers())?;

    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}
