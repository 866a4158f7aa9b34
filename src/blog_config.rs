use diesel::prelude::*;
use diesel::Connection as _;

use crate::{db::Connection, error::Error, schema::blog_config};

/// The fixed id of the singleton configuration row.
pub const BLOG_CONFIG_ID: i32 = 1;

/// Site-wide presentation settings. Exactly one row exists; it is
/// seeded by the initial migration and only ever updated in place.
#[derive(Clone, Debug, Serialize, Queryable, Identifiable)]
#[table_name = "blog_config"]
#[primary_key(blog_config_id)]
pub struct BlogConfig {
    pub blog_config_id: i32,
    pub navbar_title: String,
    pub homepage_heading: String,
    pub homepage_subheading: String,
    pub banner_image_url: String,
    pub about: String,
}

#[derive(AsChangeset, Deserialize)]
#[table_name = "blog_config"]
pub struct ConfigChanges {
    pub navbar_title: String,
    pub homepage_heading: String,
    pub homepage_subheading: String,
    pub banner_image_url: String,
    pub about: String,
}

/// Fetches the singleton configuration row.
pub fn get(connection: &Connection) -> Result<BlogConfig, Error> {
    use crate::schema::blog_config::dsl;

    dsl::blog_config
        .find(BLOG_CONFIG_ID)
        .first(connection)
        .optional()?
        .ok_or(Error::NotProvisioned)
}

/// Updates the singleton row in place. Never inserts: if the row is
/// missing the store was never provisioned and the update fails.
pub fn update(connection: &Connection, changes: &ConfigChanges) -> Result<(), Error> {
    use crate::schema::blog_config::dsl;

    connection.transaction(|| {
        let affected = diesel::update(dsl::blog_config.find(BLOG_CONFIG_ID))
            .set(changes)
            .execute(connection)
            .map_err(Error::from)?;
        if affected == 0 {
            return Err(Error::NotProvisioned);
        }
        Ok(())
    })
}
