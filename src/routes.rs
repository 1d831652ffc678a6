// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{
    handlers::{auth, category, question, quiz, subject},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Public read routes for categories, subjects and questions.
/// * Authenticated quiz, history, stats and review routes.
/// * Admin-only mutations under `/api/admin`.
/// * Global middleware (Trace, CORS) and an optional static fallback.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);
    let require_auth = || middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .merge(
            Router::new()
                .route("/me", get(auth::me))
                .layer(require_auth()),
        );

    let category_routes = Router::new()
        .route("/", get(category::list_categories))
        .route("/{id}", get(category::get_category));

    let subject_routes = Router::new()
        .route("/", get(subject::list_subjects))
        .route("/{id}", get(subject::get_subject));

    let question_routes = Router::new()
        .route("/", get(question::list_questions))
        .route("/{id}", get(question::get_question));

    let quiz_routes = Router::new()
        .route("/start", post(quiz::start_quiz))
        .route("/{id}", get(quiz::get_attempt))
        .route("/{id}/answer", post(quiz::submit_answer))
        .route("/{id}/finish", post(quiz::finish_quiz))
        .layer(require_auth());

    let user_routes = Router::new()
        .route("/api/attempts", get(quiz::list_attempts))
        .route("/api/user/stats", get(quiz::get_user_stats))
        .route("/api/reviews", get(quiz::list_reviews))
        .layer(require_auth());

    let admin_routes = Router::new()
        .route("/categories", post(category::create_category))
        .route(
            "/categories/{id}",
            put(category::update_category).delete(category::delete_category),
        )
        .route("/subjects", post(subject::create_subject))
        .route(
            "/subjects/{id}",
            put(subject::update_subject).delete(subject::delete_subject),
        )
        .route("/questions", post(question::create_question))
        .route("/questions/import", post(question::import_questions))
        .route(
            "/questions/{id}",
            put(question::update_question).delete(question::delete_question),
        )
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(require_auth());

    let mut router = Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/categories", category_routes)
        .nest("/api/subjects", subject_routes)
        .nest("/api/questions", question_routes)
        .nest("/api/quiz", quiz_routes)
        .nest("/api/admin", admin_routes)
        .merge(user_routes);

    if let Some(dir) = &state.config.static_dir {
        tracing::info!("Serving static files from {}", dir.display());
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
