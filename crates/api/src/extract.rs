//! Request extractors whose rejections use the API's JSON error shape.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::generate::Outcome;

/// `Json<T>`, but a body that fails to parse is answered with
/// `{"status": "warning", "message": ...}` and the rejection's status code.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => {
                let status = rejection.status();
                let message = rejection.body_text();
                warn!(%status, error = %message, "Rejected request body");
                Err((status, Json(Outcome::Warning { message })).into_response())
            }
        }
    }
}
