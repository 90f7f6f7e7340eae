//! Adapter between the gate and `http` request/response types.
//!
//! Reads the token cookie from one or more `Cookie` headers and the header
//! copy from the configured header, runs the gate, and writes the resulting
//! cookie or a 403 rejection back.

use crate::cookie::find_cookie;
use crate::error::{GateError, Result};
use crate::exclusion::RouteInfo;
use crate::gate::{CsrfDecision, CsrfGate, HandlerToken};
use http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use http::{HeaderMap, HeaderValue, Request, Response, StatusCode};
use tracing::{trace, warn};

/// Request extension that opts a route out of CSRF checking
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkipCsrf;

/// Value of cookie `cookie_name` across all `Cookie` headers
pub fn cookie_token<'a>(headers: &'a HeaderMap, cookie_name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|value| find_cookie(value, cookie_name))
}

/// Value of header `header_name`, looked up case-insensitively
pub fn header_token<'a>(headers: &'a HeaderMap, header_name: &str) -> Option<&'a str> {
    headers
        .get(header_name.to_ascii_lowercase().as_str())
        .and_then(|value| value.to_str().ok())
}

impl CsrfGate {
    /// Evaluate an `http` request
    pub fn check_request<B>(&self, request: &Request<B>) -> CsrfDecision {
        let mut route = RouteInfo::new(request.uri().path());
        if request.extensions().get::<SkipCsrf>().is_some() {
            route = route.skip_csrf();
        }

        let headers = request.headers();
        self.evaluate(
            &route,
            cookie_token(headers, &self.options().cookie_name),
            header_token(headers, &self.options().header_name),
        )
    }

    /// Token for a handler to embed, taken from the request's cookie
    pub fn handler_token_for(&self, headers: &HeaderMap) -> Result<HandlerToken> {
        self.handler_token(cookie_token(headers, &self.options().cookie_name))
    }
}

impl CsrfDecision {
    /// Render the decision's cookie, if any, as a `Set-Cookie` header value
    pub fn set_cookie_value(&self) -> Result<Option<HeaderValue>> {
        self.cookie()
            .map(|cookie| {
                HeaderValue::from_str(&cookie.to_header_value()).map_err(|e| {
                    GateError::config(format!("CSRF cookie is not a valid header value: {}", e))
                })
            })
            .transpose()
    }

    /// Append the decision's cookie, if any, as a `Set-Cookie` header
    pub fn apply<B>(&self, response: &mut Response<B>) -> Result<()> {
        if let Some(value) = self.set_cookie_value()? {
            response.headers_mut().append(SET_COOKIE, value);
            trace!("CSRF cookie written");
        }
        Ok(())
    }
}

impl GateError {
    /// Build the JSON error response for this rejection
    pub fn to_response(&self) -> Response<String> {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = serde_json::json!({
            "error": status.canonical_reason().unwrap_or("Error"),
            "message": self.to_string(),
        })
        .to_string();

        let mut response = Response::new(body);
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }
}

/// Run the gate around a handler.
///
/// The handler only runs for allowed requests; rejections become the JSON
/// error response, carrying the replacement cookie when there is one. The
/// cookie is rendered before the handler runs, so a cookie that cannot be
/// written fails the request without side effects.
pub fn protect<B, F>(gate: &CsrfGate, request: Request<B>, handler: F) -> Response<String>
where
    F: FnOnce(Request<B>) -> Response<String>,
{
    let decision = gate.check_request(&request);

    let set_cookie = match decision.set_cookie_value() {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "Failed to write CSRF cookie");
            return e.to_response();
        }
    };

    let mut response = match decision.error() {
        Some(error) => error.to_response(),
        None => handler(request),
    };

    if let Some(value) = set_cookie {
        response.headers_mut().append(SET_COOKIE, value);
        trace!("CSRF cookie written");
    }

    response
}
