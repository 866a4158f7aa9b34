//! A server-rendered blogging engine.
//!
//! It has the following address scheme:
//! * `/` - Paginated list of posts, newest first
//! * `/page/<n>` - Later listing pages; page 1 redirects back to `/`
//! * `/post/<id>` - A single post
//! * `/login`, `/logout` - Session handling
//! * `/initial-setup` - First-run administrator creation
//! * `/admin` - Administrative pages, admins only
//!     * `/create-post`, `/edit-post/<id>` - Post editor
//!     * `/create-user`, `/edit-user/<id>` - User management
//!     * `/config` - Site-wide settings
//! * `/file/*` - Static assets

#[macro_use]
extern crate diesel;
#[macro_use]
extern crate diesel_migrations;
#[macro_use]
extern crate serde;

pub mod blog_config;
pub mod config;
pub mod date_format;
pub mod db;
pub mod document;
pub mod error;
pub mod handler;
pub mod normalize;
pub mod post;
pub mod schema;
pub mod user;

use gotham::{
    middleware::cookie::CookieParser,
    middleware::state::StateMiddleware,
    pipeline::new_pipeline,
    pipeline::single::single_pipeline,
    router::builder::{build_router, DefineSingleRoute, DrawRoutes},
    router::response::extender::ResponseExtender,
    router::Router,
    state::State,
};
use http::status::StatusCode;
use hyper::{Body, Response};
use log::info;

use std::{borrow::Cow, path::Path};

use crate::{config::Settings, db::DbPool, user::SessionMiddleware};

/// Response extender for 404 errors
pub struct NotFound;

impl ResponseExtender<Body> for NotFound {
    fn extend(&self, _state: &mut State, res: &mut Response<Body>) {
        let body = res.body_mut();
        *body = "404 File not found".into();
    }
}

/// Builds the request router
fn router(settings: Settings, pool: DbPool) -> Router {
    // The directory static assets are served from. Is:
    // STATIC_DIR environment varible if defined, otherwise
    // STATIC_DIR compile-time environment variable if defined, otherwise
    // local directory 'static'
    let assets_dir: Cow<str> = if Path::new("/usr/share/quill").is_dir() {
        "/usr/share/quill".into()
    } else if let Some(compile_env) = option_env!("STATIC_DIR") {
        compile_env.into()
    } else {
        "static".into()
    };

    // Build pipeline
    let (chain, pipelines) = single_pipeline(
        new_pipeline()
            .add(StateMiddleware::new(pool))
            .add(StateMiddleware::new(settings))
            .add(CookieParser)
            .add(SessionMiddleware)
            .build(),
    );

    build_router(chain, pipelines, |route| {
        use crate::document::{admin, auth, home};

        route.get("/").to(handler!(home::index));
        route
            .get("/page/:page")
            .with_path_extractor::<home::PagePath>()
            .to(handler!(home::page));
        route
            .get("/post/:id")
            .with_path_extractor::<home::PostPath>()
            .to(handler!(home::post));

        route.get("/login").to(handler!(auth::login));
        route.post("/login").to(body_handler!(auth::login_post));
        route.get("/logout").to(handler!(auth::logout));

        route.get("/initial-setup").to(handler!(auth::init_setup));
        route
            .post("/initial-setup")
            .to(body_handler!(auth::init_setup_post));

        route.scope("/admin", |route| {
            route.get("/create-post").to(handler!(admin::create_post));
            route
                .post("/create-post")
                .to(body_handler!(admin::create_post_post));
            route
                .get("/edit-post/:id")
                .with_path_extractor::<admin::PostIdPath>()
                .to(handler!(admin::edit_post));
            route
                .post("/edit-post/:id")
                .with_path_extractor::<admin::PostIdPath>()
                .to(body_handler!(admin::edit_post_post));

            route.get("/create-user").to(handler!(admin::create_user));
            route
                .post("/create-user")
                .to(body_handler!(admin::create_user_post));
            route
                .get("/edit-user/:id")
                .with_path_extractor::<admin::UserIdPath>()
                .to(handler!(admin::edit_user));
            route
                .post("/edit-user/:id")
                .with_path_extractor::<admin::UserIdPath>()
                .to(body_handler!(admin::edit_user_post));

            route.get("/config").to(handler!(admin::config));
            route.post("/config").to(body_handler!(admin::config_post));
        });

        route.get("/file/*").to_dir(&*assets_dir);

        // Error responders
        route.add_response_extender(StatusCode::NOT_FOUND, NotFound);
    })
}

fn main() -> Result<(), failure::Error> {
    env_logger::init();

    // Read settings
    let path = if Path::new("/etc/quill/quill.toml").is_file() {
        Path::new("/etc/quill/quill.toml")
    } else {
        Path::new("quill.toml")
    };
    let data = std::fs::read(path)?;
    let settings = Settings::from_slice(&data)?;
    let address = settings.host_address.clone();

    let pool = DbPool::new(&settings.database)?;

    info!("running at {}", address);
    gotham::start(address, router(settings, pool));
    Ok(())
}
