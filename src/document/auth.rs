use askama::Template;
use cookie::Cookie;
use gotham::state::{FromState, State};
use http::header;
use log::{info, warn};

use super::{optional, render, DocumentResult};
use crate::{
    blog_config::{self, BlogConfig},
    config::Settings,
    db::DbPool,
    error::Error,
    handler::{self, see_other_with_flash},
    user::{self, Identity, Login, NewUser, Session},
};

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    config: BlogConfig,
    identity: Option<Identity>,
    flash: Option<String>,
}

pub fn login(state: &State) -> DocumentResult {
    let connection = DbPool::from_state(state)?;
    let config = blog_config::get(&connection)?;
    let flash = handler::take_flash(state);
    let had_flash = flash.is_some();
    let template = LoginTemplate {
        config,
        identity: handler::identity(state),
        flash,
    };
    Ok(render(state, template, had_flash))
}

pub fn login_post(state: &State, post: Vec<u8>) -> DocumentResult {
    let credentials: Login = serde_urlencoded::from_bytes(&post)?;
    let connection = DbPool::from_state(state)?;

    match credentials.login(&connection) {
        Ok(session) => {
            let mut response =
                see_other_with_flash(state, String::from("/"), "Welcome to your blog!");
            let cookie = session_cookie(Settings::borrow_from(state), &session.id);
            response
                .headers_mut()
                .append(header::SET_COOKIE, cookie.to_string().parse()?);
            Ok(response)
        }
        Err(error @ Error::MissingCredentials) | Err(error @ Error::InvalidCredentials) => {
            warn!("rejected login attempt");
            Ok(see_other_with_flash(
                state,
                String::from("/login"),
                &error.to_string(),
            ))
        }
        Err(error) => Err(error.into()),
    }
}

#[derive(Template)]
#[template(path = "logout.html")]
struct LogoutTemplate {
    config: BlogConfig,
    identity: Option<Identity>,
    flash: Option<String>,
}

pub fn logout(state: &State) -> DocumentResult {
    let connection = DbPool::from_state(state)?;

    if let Some(session) = Session::try_borrow_from(state) {
        user::logout(&connection, &session.id)?;
    }

    let config = blog_config::get(&connection)?;
    let mut response = render(
        state,
        LogoutTemplate {
            config,
            identity: None,
            flash: None,
        },
        false,
    );

    // Delete session cookie with Max-Age=0
    let cookie = Cookie::build("session", "")
        .path("/")
        .max_age(time::Duration::zero())
        .finish();
    response
        .headers_mut()
        .append(header::SET_COOKIE, cookie.to_string().parse()?);

    Ok(response)
}

#[derive(Template)]
#[template(path = "initial-setup.html")]
struct InitSetupTemplate {
    config: BlogConfig,
    identity: Option<Identity>,
    flash: Option<String>,
}

pub fn init_setup(state: &State) -> DocumentResult {
    let connection = DbPool::from_state(state)?;
    let config = blog_config::get(&connection)?;
    let flash = handler::take_flash(state);
    let had_flash = flash.is_some();
    let template = InitSetupTemplate {
        config,
        identity: handler::identity(state),
        flash,
    };
    Ok(render(state, template, had_flash))
}

#[derive(Deserialize)]
struct SetupForm {
    email: String,
    password: String,
    #[serde(default)]
    name: String,
}

/// Creates the first administrator account. Only available while the
/// user table is empty.
pub fn init_setup_post(state: &State, post: Vec<u8>) -> DocumentResult {
    let form: SetupForm = serde_urlencoded::from_bytes(&post)?;
    let connection = DbPool::from_state(state)?;

    if user::count(&connection)? > 0 {
        return Err(failure::err_msg("Initial setup already complete"));
    }

    let new = NewUser {
        email: form.email.clone(),
        password: form.password.clone(),
        is_admin: true,
        is_author: true,
        name: optional(form.name),
        bio: None,
    };
    user::create(&connection, new.into_insert()?)?;
    info!("initial administrator account created");

    let credentials = Login {
        email: form.email,
        password: form.password,
    };
    let session = credentials.login(&connection)?;

    let mut response = see_other_with_flash(state, String::from("/"), "Welcome to your blog!");
    let cookie = session_cookie(Settings::borrow_from(state), &session.id);
    response
        .headers_mut()
        .append(header::SET_COOKIE, cookie.to_string().parse()?);
    Ok(response)
}

fn session_cookie(settings: &Settings, id: &str) -> Cookie<'static> {
    let mut builder = Cookie::build("session", id.to_owned())
        .path("/")
        .http_only(true)
        .secure(settings.cookie.secure);
    if let Some(ref domain) = settings.cookie.domain {
        builder = builder.domain(domain.clone());
    }
    builder.finish()
}
