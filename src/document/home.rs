use askama::Template;
use gotham::{
    helpers::http::response::{
        create_empty_response, create_permanent_redirect, create_temporary_redirect,
    },
    state::{FromState, State},
};
use gotham_derive::{StateData, StaticResponseExtender};
use http::StatusCode;

use super::{render, DocumentResult};
use crate::{
    blog_config::{self, BlogConfig},
    db::DbPool,
    handler,
    post::{self, Post, PostWithAuthor},
    user::{self, Identity},
};

#[derive(Deserialize, StateData, StaticResponseExtender)]
pub struct PagePath {
    pub page: i64,
}

#[derive(Deserialize, StateData, StaticResponseExtender)]
pub struct PostPath {
    pub id: i32,
}

/// A listing entry with its author's name resolved for display.
pub struct Entry {
    pub post: Post,
    pub author_name: String,
}

fn entries(rows: Vec<PostWithAuthor>) -> Vec<Entry> {
    rows.into_iter()
        .map(|row| Entry {
            author_name: row.author.display_name().to_owned(),
            post: row.post,
        })
        .collect()
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    config: BlogConfig,
    identity: Option<Identity>,
    flash: Option<String>,
    posts: Vec<Entry>,
    page: i64,
    has_older: bool,
}

pub fn index(state: &State) -> DocumentResult {
    page_document(state, 1)
}

pub fn page(state: &State) -> DocumentResult {
    let page = PagePath::borrow_from(state).page;
    // The first page's canonical address is the site root.
    if page <= 1 {
        return Ok(create_permanent_redirect(state, "/"));
    }
    page_document(state, page)
}

fn page_document(state: &State, page: i64) -> DocumentResult {
    let connection = DbPool::from_state(state)?;

    // If there are no users, redirect to initial setup.
    if user::count(&connection)? == 0 {
        return Ok(create_temporary_redirect(state, "/initial-setup"));
    }

    let config = blog_config::get(&connection)?;
    let posts = post::page(&connection, page)?;
    let has_older = posts.len() as i64 == post::PAGE_SIZE;

    let flash = handler::take_flash(state);
    let had_flash = flash.is_some();
    let template = IndexTemplate {
        config,
        identity: handler::identity(state),
        flash,
        posts: entries(posts),
        page,
        has_older,
    };
    Ok(render(state, template, had_flash))
}

#[derive(Template)]
#[template(path = "post.html")]
struct PostTemplate {
    config: BlogConfig,
    identity: Option<Identity>,
    flash: Option<String>,
    post: Post,
    author_name: String,
}

pub fn post(state: &State) -> DocumentResult {
    let id = PostPath::borrow_from(state).id;
    let connection = DbPool::from_state(state)?;

    let entry = match post::get(&connection, id)? {
        Some(entry) => entry,
        None => return Ok(create_empty_response(state, StatusCode::NOT_FOUND)),
    };

    let config = blog_config::get(&connection)?;
    let flash = handler::take_flash(state);
    let had_flash = flash.is_some();
    let template = PostTemplate {
        config,
        identity: handler::identity(state),
        flash,
        author_name: entry.author.display_name().to_owned(),
        post: entry.post,
    };
    Ok(render(state, template, had_flash))
}
