//! Error responses - axum integration
//!
//! Renders [`AppError`] as an RFC 7807 Problem Details body.

use super::app_error::AppError;

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::Json;
        use axum::http::StatusCode;

        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // RFC 7807 Problem Details for HTTP APIs
        let mut body = serde_json::json!({
            "type": format!("https://httpstatuses.io/{}", self.status_code()),
            "title": self.kind().as_str(),
            "status": self.status_code(),
            "detail": self.message(),
        });
        if let Some(obj) = body.as_object_mut() {
            if let Some(field) = self.field() {
                obj.insert("field".into(), field.into());
            }
            if let Some(action) = self.action() {
                obj.insert("action".into(), action.into());
            }
            if let Some(details) = self.details() {
                obj.insert("details".into(), details.clone());
            }
        }

        (status, Json(body)).into_response()
    }
}
