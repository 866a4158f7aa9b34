//! Request plumbing shared by every page: body collection, the error
//! page, redirects, and flash messages.
//!
//! Flash messages ride a short-lived cookie: set (base64-encoded) on a
//! redirect, read and expired on the next rendered page. They carry
//! human-readable notices only, never anything sensitive.

use askama::Template;
use cookie::{Cookie, CookieJar};
use futures::{future, Future, Stream};
use gotham::{
    handler::{HandlerFuture, IntoHandlerError},
    helpers::http::response::create_temporary_redirect,
    state::{FromState, State},
};
use http::{header, Response, StatusCode};
use hyper::Body;

use crate::document::TemplateExt;
use crate::user::{Identity, Session};

const FLASH_COOKIE: &str = "flash";

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorTemplate {
    error: String,
}

/// Creates a `HandlerFuture` that runs the given function
pub fn body_handler<F>(mut state: State, op: F) -> Box<HandlerFuture>
where
    F: FnOnce(&State, Vec<u8>) -> Response<Body> + Send + 'static,
{
    let f = Body::take_from(&mut state)
        .concat2()
        .then(|result| match result {
            Ok(body) => {
                let response = op(&state, body.to_vec());
                future::ok((state, response))
            }
            Err(e) => future::err((state, e.into_handler_error())),
        });

    Box::new(f)
}

pub fn error_response(state: &State, error: impl std::fmt::Display) -> Response<Body> {
    let template = ErrorTemplate {
        error: error.to_string(),
    };
    let mut response = template.to_response(state);
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

pub fn response(state: &State, result: Result<Response<Body>, failure::Error>) -> Response<Body> {
    match result {
        Ok(response) => response,
        Err(error) => error_response(state, error),
    }
}

/// A redirect that forces the follow-up request to be a GET.
pub fn see_other(state: &State, location: String) -> Response<Body> {
    let mut response = create_temporary_redirect(state, location);
    *response.status_mut() = StatusCode::SEE_OTHER;
    response
}

/// Redirects and queues a flash message for the next rendered page.
pub fn see_other_with_flash(state: &State, location: String, message: &str) -> Response<Body> {
    let mut response = see_other(state, location);
    let encoded = base64::encode_config(message, base64::URL_SAFE_NO_PAD);
    let cookie = Cookie::build(FLASH_COOKIE, encoded).path("/").finish();
    if let Ok(value) = cookie.to_string().parse() {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    response
}

/// Reads the pending flash message, if any.
pub fn take_flash(state: &State) -> Option<String> {
    let jar = CookieJar::borrow_from(state);
    let value = jar.get(FLASH_COOKIE)?.value();
    let bytes = base64::decode_config(value, base64::URL_SAFE_NO_PAD).ok()?;
    String::from_utf8(bytes).ok()
}

/// Expires the flash cookie so the message shows only once.
pub fn clear_flash(response: &mut Response<Body>) {
    let cookie = Cookie::build(FLASH_COOKIE, "")
        .path("/")
        .max_age(time::Duration::zero())
        .finish();
    if let Ok(value) = cookie.to_string().parse() {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
}

/// The identity of the requesting user, if a valid session is present.
pub fn identity(state: &State) -> Option<Identity> {
    Session::try_borrow_from(state).and_then(|session| session.identity().ok())
}

#[macro_export]
macro_rules! handler {
    ($handler_fn:path) => {
        |state| {
            let r = crate::handler::response(&state, $handler_fn(&state));
            (state, r)
        }
    };
}

#[macro_export]
macro_rules! body_handler {
    ($handler_fn:path) => {
        |state| {
            crate::handler::body_handler(state, |state, post| {
                crate::handler::response(&state, $handler_fn(state, post))
            })
        }
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn flash_encoding_round_trips() {
        let message = "Invalid email or password.";
        let encoded = base64::encode_config(message, base64::URL_SAFE_NO_PAD);
        // The cookie value must stay free of separators and whitespace.
        assert!(!encoded.contains(' '));
        assert!(!encoded.contains(';'));
        let decoded = base64::decode_config(&encoded, base64::URL_SAFE_NO_PAD).unwrap();
        assert_eq!(String::from_utf8(decoded).unwrap(), message);
    }
}
