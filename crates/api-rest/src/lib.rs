//! # API REST
//!
//! REST API implementation for CardCrafter.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (bearer authentication, JSON serialization, CORS, status codes)
//!
//! Uses `api-shared` for request/response bodies and `cardcrafter-core` for everything else.

#![warn(rust_2018_idioms)]

mod convert;
pub mod error;
mod handlers;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use cardcrafter_core::{FlashcardGenerationService, FlashcardStore, IdentityProvider, UserProfileStore};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use error::{ApiError, ApiResult};

/// Application state shared across REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub generation: Arc<FlashcardGenerationService>,
    pub identity: Arc<dyn IdentityProvider>,
    pub flashcards: Arc<dyn FlashcardStore>,
    pub profiles: Arc<dyn UserProfileStore>,
    /// Customer portal of the payment provider, if subscriptions are enabled.
    pub billing_portal_url: Option<Arc<str>>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::generate_flashcards,
        handlers::register,
        handlers::sign_in,
        handlers::password_reset,
        handlers::sign_out,
        handlers::me,
        handlers::list_flashcards,
        handlers::create_flashcards,
        handlers::get_flashcard,
        handlers::update_flashcard,
        handlers::delete_flashcard,
        handlers::subscription,
    ),
    components(schemas(
        api_shared::HealthRes,
        api_shared::ErrorRes,
        api_shared::CategoryDto,
        api_shared::FlashcardDto,
        api_shared::StoredFlashcardRes,
        api_shared::StoredFlashcardsRes,
        api_shared::CreateFlashcardsReq,
        api_shared::RegisterReq,
        api_shared::SignInReq,
        api_shared::PasswordResetReq,
        api_shared::SessionRes,
        api_shared::ProfileRes,
    ))
)]
pub struct ApiDoc;

/// Builds the REST router with Swagger UI mounted at `/swagger-ui`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // Source text has no local size cap.
        .route(
            "/api",
            post(handlers::generate_flashcards).layer(DefaultBodyLimit::disable()),
        )
        .route(
            "/api/generate",
            post(handlers::generate_flashcards).layer(DefaultBodyLimit::disable()),
        )
        .route("/auth/register", post(handlers::register))
        .route("/auth/sign-in", post(handlers::sign_in))
        .route("/auth/password-reset", post(handlers::password_reset))
        .route("/auth/sign-out", post(handlers::sign_out))
        .route("/auth/me", get(handlers::me))
        .route(
            "/flashcards",
            get(handlers::list_flashcards).post(handlers::create_flashcards),
        )
        .route(
            "/flashcards/:id",
            get(handlers::get_flashcard)
                .put(handlers::update_flashcard)
                .delete(handlers::delete_flashcard),
        )
        .route("/subscription", get(handlers::subscription))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
