//! Bearer-token middleware for the `/v1` routes.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use super::error::AppError;
use super::state::AppState;

/// Reject the request unless its bearer token belongs to an allowed email.
///
/// On success the verified [`Identity`](crate::auth::Identity) is stored in the
/// request extensions for downstream handlers.
pub async fn require_authorization(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let identity = state.authorizer.authorize(header.as_deref()).await?;
    tracing::debug!("Authorized {} for {}", identity.email, req.uri().path());

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}
