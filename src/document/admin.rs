//! Administrative pages. Every handler passes the authorization gate
//! before reading form input or touching the database; visitors who
//! fail it are sent to the login page with a notice.

use askama::Template;
use gotham::state::{FromState, State};
use gotham::helpers::http::response::create_empty_response;
use gotham_derive::{StateData, StaticResponseExtender};
use http::{Response, StatusCode};
use hyper::Body;

use super::{checked, optional, render, DocumentResult};
use crate::{
    blog_config::{self, BlogConfig, ConfigChanges},
    db::DbPool,
    error::Error,
    handler::{self, see_other_with_flash},
    post::{self, NewPost, PostChanges},
    user::{self, Identity, NewUser, Session, UserChanges},
};

#[derive(Deserialize, StateData, StaticResponseExtender)]
pub struct PostIdPath {
    pub id: i32,
}

#[derive(Deserialize, StateData, StaticResponseExtender)]
pub struct UserIdPath {
    pub id: i32,
}

/// Admits administrators; everyone else gets a redirect to the login
/// page, built here so handlers can return it as-is.
fn gate(state: &State) -> Result<Identity, Response<Body>> {
    user::authorize(Session::try_borrow_from(state))
        .map_err(|error| see_other_with_flash(state, String::from("/login"), &error.to_string()))
}

#[derive(Template)]
#[template(path = "edit-post.html")]
struct EditPostTemplate {
    config: BlogConfig,
    identity: Option<Identity>,
    flash: Option<String>,
    action: String,
    title: String,
    description: String,
    content: String,
    image_url: String,
    created_by_user_id: String,
}

pub fn create_post(state: &State) -> DocumentResult {
    let identity = match gate(state) {
        Ok(identity) => identity,
        Err(response) => return Ok(response),
    };
    let connection = DbPool::from_state(state)?;
    let config = blog_config::get(&connection)?;
    let flash = handler::take_flash(state);
    let had_flash = flash.is_some();
    let template = EditPostTemplate {
        config,
        flash,
        action: String::from("/admin/create-post"),
        title: String::new(),
        description: String::new(),
        content: String::new(),
        image_url: String::new(),
        created_by_user_id: identity.user_id.to_string(),
        identity: Some(identity),
    };
    Ok(render(state, template, had_flash))
}

#[derive(Deserialize)]
struct PostForm {
    title: String,
    description: String,
    content: String,
    #[serde(default)]
    image_url: String,
    created_by_user_id: i32,
}

pub fn create_post_post(state: &State, body: Vec<u8>) -> DocumentResult {
    if let Err(response) = gate(state) {
        return Ok(response);
    }
    let form: PostForm = serde_urlencoded::from_bytes(&body)?;
    let connection = DbPool::from_state(state)?;

    let new = NewPost {
        title: form.title,
        description: form.description,
        content: form.content,
        created_by_user_id: form.created_by_user_id,
        image_url: optional(form.image_url),
    };
    match post::create(&connection, &new) {
        Ok(()) => Ok(see_other_with_flash(
            state,
            String::from("/"),
            "Post published.",
        )),
        Err(error @ Error::ForeignKeyViolation) => Ok(see_other_with_flash(
            state,
            String::from("/admin/create-post"),
            &error.to_string(),
        )),
        Err(error) => Err(error.into()),
    }
}

pub fn edit_post(state: &State) -> DocumentResult {
    let identity = match gate(state) {
        Ok(identity) => identity,
        Err(response) => return Ok(response),
    };
    let id = PostIdPath::borrow_from(state).id;
    let connection = DbPool::from_state(state)?;

    let entry = match post::get(&connection, id)? {
        Some(entry) => entry,
        None => return Ok(create_empty_response(state, StatusCode::NOT_FOUND)),
    };

    let config = blog_config::get(&connection)?;
    let flash = handler::take_flash(state);
    let had_flash = flash.is_some();
    let template = EditPostTemplate {
        config,
        flash,
        action: format!("/admin/edit-post/{}", id),
        title: entry.post.title,
        description: entry.post.description,
        content: entry.post.content,
        image_url: entry.post.image_url.unwrap_or_default(),
        created_by_user_id: entry.post.created_by_user_id.to_string(),
        identity: Some(identity),
    };
    Ok(render(state, template, had_flash))
}

#[derive(Deserialize)]
struct EditPostForm {
    title: String,
    description: String,
    content: String,
    #[serde(default)]
    image_url: String,
}

pub fn edit_post_post(state: &State, body: Vec<u8>) -> DocumentResult {
    if let Err(response) = gate(state) {
        return Ok(response);
    }
    let id = PostIdPath::borrow_from(state).id;
    let form: EditPostForm = serde_urlencoded::from_bytes(&body)?;
    let connection = DbPool::from_state(state)?;

    let changes = PostChanges {
        title: form.title,
        description: form.description,
        content: form.content,
        image_url: optional(form.image_url),
    };
    post::edit(&connection, id, &changes)?;
    Ok(see_other_with_flash(
        state,
        format!("/post/{}", id),
        "Post updated.",
    ))
}

#[derive(Template)]
#[template(path = "edit-user.html")]
struct EditUserTemplate {
    config: BlogConfig,
    identity: Option<Identity>,
    flash: Option<String>,
    action: String,
    email: String,
    name: String,
    bio: String,
    is_admin: bool,
    is_author: bool,
}

pub fn create_user(state: &State) -> DocumentResult {
    let identity = match gate(state) {
        Ok(identity) => identity,
        Err(response) => return Ok(response),
    };
    let connection = DbPool::from_state(state)?;
    let config = blog_config::get(&connection)?;
    let flash = handler::take_flash(state);
    let had_flash = flash.is_some();
    let template = EditUserTemplate {
        config,
        flash,
        action: String::from("/admin/create-user"),
        email: String::new(),
        name: String::new(),
        bio: String::new(),
        is_admin: false,
        is_author: false,
        identity: Some(identity),
    };
    Ok(render(state, template, had_flash))
}

#[derive(Deserialize)]
struct UserForm {
    email: String,
    password: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    bio: String,
    #[serde(default)]
    is_admin: String,
    #[serde(default)]
    is_author: String,
}

pub fn create_user_post(state: &State, body: Vec<u8>) -> DocumentResult {
    if let Err(response) = gate(state) {
        return Ok(response);
    }
    let form: UserForm = serde_urlencoded::from_bytes(&body)?;
    let connection = DbPool::from_state(state)?;

    let new = NewUser {
        email: form.email,
        password: form.password,
        is_admin: checked(&form.is_admin),
        is_author: checked(&form.is_author),
        name: optional(form.name),
        bio: optional(form.bio),
    };
    match user::create(&connection, new.into_insert()?) {
        Ok(()) => Ok(see_other_with_flash(
            state,
            String::from("/"),
            "New user created.",
        )),
        Err(error @ Error::DuplicateEmail) => Ok(see_other_with_flash(
            state,
            String::from("/admin/create-user"),
            &error.to_string(),
        )),
        Err(error) => Err(error.into()),
    }
}

pub fn edit_user(state: &State) -> DocumentResult {
    let identity = match gate(state) {
        Ok(identity) => identity,
        Err(response) => return Ok(response),
    };
    let id = UserIdPath::borrow_from(state).id;
    let connection = DbPool::from_state(state)?;

    let target = match user::get(&connection, id)? {
        Some(user) => user,
        None => return Ok(create_empty_response(state, StatusCode::NOT_FOUND)),
    };

    let config = blog_config::get(&connection)?;
    let flash = handler::take_flash(state);
    let had_flash = flash.is_some();
    let template = EditUserTemplate {
        config,
        flash,
        action: format!("/admin/edit-user/{}", id),
        email: target.email.clone(),
        name: target.name.clone().unwrap_or_default(),
        bio: target.bio.clone().unwrap_or_default(),
        is_admin: target.is_admin,
        is_author: target.is_author,
        identity: Some(identity),
    };
    Ok(render(state, template, had_flash))
}

pub fn edit_user_post(state: &State, body: Vec<u8>) -> DocumentResult {
    if let Err(response) = gate(state) {
        return Ok(response);
    }
    let id = UserIdPath::borrow_from(state).id;
    let form: UserForm = serde_urlencoded::from_bytes(&body)?;
    let connection = DbPool::from_state(state)?;

    let changes = UserChanges {
        email: form.email,
        password: user::hash(&form.password)?,
        is_admin: checked(&form.is_admin),
        is_author: checked(&form.is_author),
        name: optional(form.name),
        bio: optional(form.bio),
    };
    match user::update(&connection, id, &changes) {
        Ok(()) => Ok(see_other_with_flash(
            state,
            String::from("/"),
            "User updated.",
        )),
        Err(error @ Error::DuplicateEmail) => Ok(see_other_with_flash(
            state,
            format!("/admin/edit-user/{}", id),
            &error.to_string(),
        )),
        Err(error) => Err(error.into()),
    }
}

#[derive(Template)]
#[template(path = "config.html")]
struct ConfigTemplate {
    config: BlogConfig,
    identity: Option<Identity>,
    flash: Option<String>,
}

pub fn config(state: &State) -> DocumentResult {
    let identity = match gate(state) {
        Ok(identity) => identity,
        Err(response) => return Ok(response),
    };
    let connection = DbPool::from_state(state)?;
    let config = blog_config::get(&connection)?;
    let flash = handler::take_flash(state);
    let had_flash = flash.is_some();
    let template = ConfigTemplate {
        config,
        flash,
        identity: Some(identity),
    };
    Ok(render(state, template, had_flash))
}

pub fn config_post(state: &State, body: Vec<u8>) -> DocumentResult {
    if let Err(response) = gate(state) {
        return Ok(response);
    }
    let changes: ConfigChanges = serde_urlencoded::from_bytes(&body)?;
    let connection = DbPool::from_state(state)?;

    blog_config::update(&connection, &changes)?;
    Ok(see_other_with_flash(
        state,
        String::from("/admin/config"),
        "Configuration updated.",
    ))
}
