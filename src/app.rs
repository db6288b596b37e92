use axum::{
    extract::DefaultBodyLimit,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::any::Any;
use tower_http::{catch_panic::CatchPanicLayer, services::ServeDir, trace::TraceLayer};

use crate::error::ApiError;
use crate::handlers;
use crate::middleware::{cors_headers, require_auth};
use crate::state::AppState;
use crate::uploads::PUBLIC_PREFIX;

/// Assemble the full application: route tables, static uploads, fallback
/// and the global middleware stack.
pub fn app(state: AppState) -> Router {
    let uploads = ServeDir::new(&state.config.uploads.dir);
    let body_limit = state.config.uploads.max_request_size_bytes;

    Router::new()
        // Public
        .route("/", get(handlers::system::root))
        .route("/health", get(handlers::system::health))
        .merge(article_routes())
        .merge(user_routes())
        // Guarded
        .merge(category_routes(state.clone()))
        .nest_service(&format!("/{}", PUBLIC_PREFIX), uploads)
        .fallback(not_found)
        // Global middleware
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(cors_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn article_routes() -> Router<AppState> {
    use handlers::articles;

    Router::new()
        .route("/articles", get(articles::list).post(articles::create))
        .route(
            "/articles/:articleId",
            get(articles::show)
                .put(articles::update)
                .patch(articles::update)
                .delete(articles::delete),
        )
}

fn category_routes(state: AppState) -> Router<AppState> {
    use handlers::categories;

    Router::new()
        .route("/categories", get(categories::list).post(categories::create))
        .route(
            "/categories/:categoryId",
            get(categories::show)
                .put(categories::update)
                .patch(categories::update)
                .delete(categories::delete),
        )
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

fn user_routes() -> Router<AppState> {
    use axum::routing::post;
    use handlers::users;

    Router::new()
        .route("/users", get(users::list))
        .route("/users/signup", post(users::signup))
        .route("/users/login", post(users::login))
        .route(
            "/users/:userId",
            get(users::show)
                .put(users::update)
                .patch(users::update)
                .delete(users::delete),
        )
}

async fn not_found() -> ApiError {
    ApiError::RouteNotFound
}

/// Last-resort translator: a panicking handler still answers with JSON
fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    tracing::error!("Handler panicked: {}", detail);
    ApiError::internal_server_error("Internal Server Error").into_response()
}
