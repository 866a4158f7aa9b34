use gotham::helpers::http::response::create_response;
use gotham::state::State;
use http::StatusCode;
use hyper::{Body, Response};

use crate::handler;

pub mod admin;
pub mod auth;
pub mod home;

pub type DocumentResult = Result<Response<Body>, failure::Error>;

pub trait TemplateExt {
    fn to_response(&self, state: &State) -> Response<Body>;
}

impl<T: askama::Template> TemplateExt for T {
    fn to_response(&self, state: &State) -> Response<Body> {
        match self.render() {
            Ok(string) => create_response(state, StatusCode::OK, mime::TEXT_HTML, string),
            Err(e) => create_response(
                state,
                StatusCode::INTERNAL_SERVER_ERROR,
                mime::TEXT_PLAIN,
                format!("Template error: {}", e),
            ),
        }
    }
}

/// Renders a page, expiring the flash cookie when a message was shown.
fn render<T: askama::Template>(state: &State, template: T, had_flash: bool) -> Response<Body> {
    let mut response = template.to_response(state);
    if had_flash {
        handler::clear_flash(&mut response);
    }
    response
}

/// Empty form fields mean "no value" for nullable columns.
fn optional(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// HTML checkboxes submit "on" when ticked and nothing otherwise.
fn checked(value: &str) -> bool {
    value == "on"
}

#[cfg(test)]
mod tests {
    use super::{checked, optional};

    #[test]
    fn empty_fields_become_none() {
        assert_eq!(optional(String::new()), None);
        assert_eq!(optional(String::from("x")), Some(String::from("x")));
    }

    #[test]
    fn checkbox_values() {
        assert!(checked("on"));
        assert!(!checked(""));
        assert!(!checked("off"));
    }
}
