//! The `Response` value the executor produces: status, headers, fully
//! decoded body, and the redirect chain traversed to reach it.

use crate::error::HttpError;
use crate::headers::HeaderMap;
use crate::security::ERROR_BODY_PREVIEW_LIMIT;
use bytes::Bytes;

/// A completed HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub reason: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// URLs visited via redirects, in traversal order; empty if none were
    /// followed. The final URL the body was read from is the last entry
    /// if the chain is nonempty, or the original request URL otherwise.
    pub redirects: Vec<String>,
}

impl Response {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    #[must_use]
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    #[must_use]
    pub fn text(&self) -> Result<String, HttpError> {
        String::from_utf8(self.body.to_vec()).map_err(|e| HttpError::protocol(format!("body is not valid utf-8: {e}")))
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, HttpError> {
        serde_json::from_slice(&self.body).map_err(HttpError::Json)
    }

    /// If the status is not in 2xx, build an `HttpError`-shaped preview of
    /// the body for diagnostics (truncated to `ERROR_BODY_PREVIEW_LIMIT`
    /// bytes so a large error page does not blow up a log line).
    #[must_use]
    pub fn error_body_preview(&self) -> Option<String> {
        if self.is_success() {
            return None;
        }
        let limit = ERROR_BODY_PREVIEW_LIMIT.min(self.body.len());
        Some(String::from_utf8_lossy(&self.body[..limit]).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16) -> Response {
        Response {
            status,
            reason: "".into(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            redirects: Vec::new(),
        }
    }

    #[test]
    fn is_success_and_is_redirect_classify_by_range() {
        assert!(response(200).is_success());
        assert!(!response(200).is_redirect());
        assert!(response(301).is_redirect());
        assert!(!response(301).is_success());
        assert!(!response(404).is_success());
    }

    #[test]
    fn error_body_preview_is_none_for_success() {
        assert!(response(200).error_body_preview().is_none());
    }

    #[test]
    fn error_body_preview_truncates_to_limit() {
        let mut r = response(500);
        r.body = Bytes::from(vec![b'x'; ERROR_BODY_PREVIEW_LIMIT + 100]);
        let preview = r.error_body_preview().unwrap();
        assert_eq!(preview.len(), ERROR_BODY_PREVIEW_LIMIT);
    }
}
