//! Request handlers.

use crate::convert::{
    flashcard_from_dto, flashcard_to_dto, profile_to_res, session_to_res, stored_to_res,
};
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use api_shared::{
    parse_bearer_token, CreateFlashcardsReq, FlashcardDto, HealthRes, HealthService,
    PasswordResetReq, ProfileRes, RegisterReq, SessionRes, SignInReq, StoredFlashcardRes,
    StoredFlashcardsRes,
};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{Json, Redirect},
};
use cardcrafter_core::{billing, IdentityUser, NonEmptyText, ShardableUuid, UserProfile};

/// Resolves the user behind the request's bearer token.
pub(crate) async fn authenticate(state: &AppState, headers: &HeaderMap) -> ApiResult<IdentityUser> {
    let header = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    let token = parse_bearer_token(header)?;
    Ok(state.identity.current_user(token).await?)
}

fn parse_flashcard_id(id: &str) -> ApiResult<ShardableUuid> {
    ShardableUuid::parse(id).map_err(|_| ApiError::BadRequest(format!("invalid flashcard id '{id}'")))
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for monitoring and load balancers.
#[axum::debug_handler]
pub(crate) async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/api",
    request_body(content = String, content_type = "text/plain", description = "Source text"),
    responses(
        (status = 200, description = "Generated flashcards", body = [FlashcardDto]),
        (status = 400, description = "Blank input or unusable model output", body = api_shared::ErrorRes),
        (status = 500, description = "Completion provider unavailable", body = api_shared::ErrorRes)
    )
)]
/// Generate flashcards from the raw request body.
///
/// The body is the source text as-is, of any length. Invalid UTF-8 sequences are replaced with
/// U+FFFD. The response is a JSON array of at most ten cards. `POST /api/generate` is an alias.
#[axum::debug_handler]
pub(crate) async fn generate_flashcards(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<Vec<FlashcardDto>>> {
    let source_text = String::from_utf8_lossy(&body);
    let set = state.generation.generate(&source_text).await?;
    Ok(Json(set.iter().map(flashcard_to_dto).collect()))
}

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "Account created and signed in", body = SessionRes),
        (status = 400, description = "Bad request", body = api_shared::ErrorRes),
        (status = 409, description = "Email already registered", body = api_shared::ErrorRes)
    )
)]
/// Create an account and its profile.
#[axum::debug_handler]
pub(crate) async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterReq>,
) -> ApiResult<(StatusCode, Json<SessionRes>)> {
    let first_name = NonEmptyText::new(&req.first_name)
        .map_err(|e| ApiError::BadRequest(format!("first_name: {e}")))?;
    let last_name = NonEmptyText::new(&req.last_name)
        .map_err(|e| ApiError::BadRequest(format!("last_name: {e}")))?;

    let session = state.identity.register(&req.email, &req.password).await?;

    let profile = UserProfile::new(
        session.user_id.clone(),
        session.email.clone(),
        first_name,
        last_name,
    );
    if let Err(e) = state.profiles.put(&profile) {
        tracing::error!(user_id = %session.user_id, "account created without a profile: {e}");
        return Err(e.into());
    }

    tracing::info!(user_id = %session.user_id, "registered user");
    Ok((StatusCode::CREATED, Json(session_to_res(session))))
}

#[utoipa::path(
    post,
    path = "/auth/sign-in",
    request_body = SignInReq,
    responses(
        (status = 200, description = "Signed in", body = SessionRes),
        (status = 401, description = "Invalid email or password", body = api_shared::ErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn sign_in(
    State(state): State<AppState>,
    Json(req): Json<SignInReq>,
) -> ApiResult<Json<SessionRes>> {
    let session = state.identity.sign_in(&req.email, &req.password).await?;
    Ok(Json(session_to_res(session)))
}

#[utoipa::path(
    post,
    path = "/auth/password-reset",
    request_body = PasswordResetReq,
    responses(
        (status = 204, description = "Reset email requested"),
        (status = 400, description = "Bad request", body = api_shared::ErrorRes)
    )
)]
/// Ask the identity provider to email a password reset link.
#[axum::debug_handler]
pub(crate) async fn password_reset(
    State(state): State<AppState>,
    Json(req): Json<PasswordResetReq>,
) -> ApiResult<StatusCode> {
    state.identity.send_password_reset(&req.email).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/auth/sign-out",
    responses(
        (status = 204, description = "Signed out"),
        (status = 401, description = "Missing or invalid token", body = api_shared::ErrorRes)
    )
)]
/// End the current session. Clients discard their token afterwards.
#[axum::debug_handler]
pub(crate) async fn sign_out(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    let header = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    let token = parse_bearer_token(header)?;
    state.identity.sign_out(token).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Profile of the signed-in user", body = ProfileRes),
        (status = 401, description = "Missing or invalid token", body = api_shared::ErrorRes),
        (status = 404, description = "No profile recorded", body = api_shared::ErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<ProfileRes>> {
    let user = authenticate(&state, &headers).await?;
    let profile = state.profiles.get(&user.user_id)?;
    Ok(Json(profile_to_res(profile)))
}

#[utoipa::path(
    get,
    path = "/flashcards",
    responses(
        (status = 200, description = "Saved flashcards, newest first", body = StoredFlashcardsRes),
        (status = 401, description = "Missing or invalid token", body = api_shared::ErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn list_flashcards(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<StoredFlashcardsRes>> {
    let user = authenticate(&state, &headers).await?;
    let flashcards = state.flashcards.list(&user.user_id)?;

    Ok(Json(StoredFlashcardsRes {
        flashcards: flashcards.iter().map(stored_to_res).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/flashcards",
    request_body = CreateFlashcardsReq,
    responses(
        (status = 201, description = "Flashcards saved", body = StoredFlashcardsRes),
        (status = 400, description = "Bad request", body = api_shared::ErrorRes),
        (status = 401, description = "Missing or invalid token", body = api_shared::ErrorRes)
    )
)]
/// Save a batch of flashcards, typically a generated set the user chose to keep.
///
/// Every card is validated before any is written.
#[axum::debug_handler]
pub(crate) async fn create_flashcards(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateFlashcardsReq>,
) -> ApiResult<(StatusCode, Json<StoredFlashcardsRes>)> {
    let user = authenticate(&state, &headers).await?;

    if req.flashcards.is_empty() {
        return Err(ApiError::BadRequest("flashcards cannot be empty".into()));
    }
    let cards = req
        .flashcards
        .into_iter()
        .enumerate()
        .map(|(index, dto)| flashcard_from_dto(dto, index))
        .collect::<ApiResult<Vec<_>>>()?;

    let stored = state.flashcards.create_many(&user.user_id, cards)?;
    tracing::info!(user_id = %user.user_id, count = stored.len(), "saved flashcards");

    Ok((
        StatusCode::CREATED,
        Json(StoredFlashcardsRes {
            flashcards: stored.iter().map(stored_to_res).collect(),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/flashcards/{id}",
    params(("id" = String, Path, description = "Flashcard id")),
    responses(
        (status = 200, description = "Saved flashcard", body = StoredFlashcardRes),
        (status = 400, description = "Bad request", body = api_shared::ErrorRes),
        (status = 401, description = "Missing or invalid token", body = api_shared::ErrorRes),
        (status = 404, description = "No such flashcard", body = api_shared::ErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn get_flashcard(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<StoredFlashcardRes>> {
    let user = authenticate(&state, &headers).await?;
    let id = parse_flashcard_id(&id)?;

    let stored = state.flashcards.get(&user.user_id, &id)?;
    Ok(Json(stored_to_res(&stored)))
}

#[utoipa::path(
    put,
    path = "/flashcards/{id}",
    request_body = FlashcardDto,
    params(("id" = String, Path, description = "Flashcard id")),
    responses(
        (status = 200, description = "Flashcard updated", body = StoredFlashcardRes),
        (status = 400, description = "Bad request", body = api_shared::ErrorRes),
        (status = 401, description = "Missing or invalid token", body = api_shared::ErrorRes),
        (status = 404, description = "No such flashcard", body = api_shared::ErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn update_flashcard(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<FlashcardDto>,
) -> ApiResult<Json<StoredFlashcardRes>> {
    let user = authenticate(&state, &headers).await?;
    let id = parse_flashcard_id(&id)?;
    let card = flashcard_from_dto(req, 0)?;

    let stored = state.flashcards.update(&user.user_id, &id, card)?;
    Ok(Json(stored_to_res(&stored)))
}

#[utoipa::path(
    delete,
    path = "/flashcards/{id}",
    params(("id" = String, Path, description = "Flashcard id")),
    responses(
        (status = 204, description = "Flashcard deleted"),
        (status = 401, description = "Missing or invalid token", body = api_shared::ErrorRes),
        (status = 404, description = "No such flashcard", body = api_shared::ErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn delete_flashcard(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    let user = authenticate(&state, &headers).await?;
    let id = parse_flashcard_id(&id)?;

    state.flashcards.delete(&user.user_id, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/subscription",
    responses(
        (status = 303, description = "Redirect to the billing portal"),
        (status = 404, description = "No billing portal configured", body = api_shared::ErrorRes)
    )
)]
/// Redirect to the payment provider's customer portal.
///
/// When the request carries a valid bearer token the user's email is pre-filled. A missing or
/// invalid token still redirects, without the email.
#[axum::debug_handler]
pub(crate) async fn subscription(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Redirect> {
    let portal = state
        .billing_portal_url
        .as_deref()
        .ok_or_else(|| ApiError::NotFound("no billing portal is configured".into()))?;

    let email = match authenticate(&state, &headers).await {
        Ok(user) => Some(user.email),
        Err(_) => None,
    };

    let url = billing::portal_redirect_url(portal, email.as_deref())?;
    Ok(Redirect::to(&url))
}
