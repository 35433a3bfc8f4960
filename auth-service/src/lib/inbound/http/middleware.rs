use axum::extract::Request;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;
use chrono::Utc;

use super::handlers::ApiError;
use crate::domain::access::authorization::is_public_path;
use crate::domain::access::errors::AccessDenied;
use crate::domain::access::errors::Unauthenticated;
use crate::domain::access::models::AuthenticatedIdentity;
use crate::domain::access::models::DeletedSubject;
use crate::inbound::http::router::AppState;

/// Resolve the request's identity and attach it to request extensions.
///
/// Never rejects: a request without a usable identity simply proceeds
/// without one, and the reason is logged. A valid token whose subject is
/// gone attaches a `DeletedSubject` instead.
pub async fn authenticate(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .map(|value| value.to_str().map(str::to_owned));

    let header = match header {
        None => None,
        Some(Ok(value)) => Some(value),
        Some(Err(_)) => {
            log_rejection(&req, &Unauthenticated::MalformedHeader);
            return next.run(req).await;
        }
    };

    match state
        .request_gate
        .authenticate(header.as_deref(), Utc::now())
        .await
    {
        Ok(identity) => {
            tracing::debug!(
                username = %identity.username,
                role = %identity.role,
                "Request authenticated"
            );
            req.extensions_mut().insert(identity);
        }
        Err(Unauthenticated::MissingCredentials) => {}
        Err(Unauthenticated::UnknownSubject(subject)) => {
            tracing::debug!(subject = %subject, "Token subject no longer exists");
            req.extensions_mut().insert(DeletedSubject(subject));
        }
        Err(reason) => log_rejection(&req, &reason),
    }

    next.run(req).await
}

/// Reject requests without a verified token unless the path is public.
///
/// A `DeletedSubject` passes through; handlers decide between 401 and 404.
pub async fn require_authentication(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let has_identity = req.extensions().get::<AuthenticatedIdentity>().is_some()
        || req.extensions().get::<DeletedSubject>().is_some();

    if has_identity || is_public_path(req.uri().path(), &state.public_paths) {
        return next.run(req).await;
    }

    tracing::debug!(path = %req.uri().path(), "Rejected request without identity");
    ApiError::from(AccessDenied::Unauthenticated).into_response()
}

fn log_rejection(req: &Request, reason: &Unauthenticated) {
    match reason {
        Unauthenticated::StoreUnavailable(_) => tracing::error!(
            path = %req.uri().path(),
            reason = %reason,
            "Identity lookup failed"
        ),
        _ => tracing::debug!(
            path = %req.uri().path(),
            reason = %reason,
            "Request carries no valid identity"
        ),
    }
}
