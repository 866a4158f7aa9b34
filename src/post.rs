use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::Connection as _;

use crate::{db::Connection, error::Error, schema::posts, user::User};

/// Number of posts per listing page.
pub const PAGE_SIZE: i64 = 10;
/// Post ids at or above this bound are treated as not found.
const MAX_POST_ID: i32 = 10_000_000;

#[derive(Debug, Serialize, Queryable, Identifiable)]
#[primary_key(post_id)]
pub struct Post {
    /// The post's numeric id
    pub post_id: i32,
    /// The time of publishing (server-assigned)
    #[serde(with = "crate::date_format")]
    pub date_created: NaiveDateTime,
    /// The title of the post
    pub title: String,
    /// A short summary shown in listings
    pub description: String,
    /// The post's body content
    pub content: String,
    /// The user who wrote the post
    pub created_by_user_id: i32,
    /// Optional cover image
    pub image_url: Option<String>,
}

/// A post joined with the user who wrote it.
#[derive(Debug)]
pub struct PostWithAuthor {
    pub post: Post,
    pub author: User,
}

#[derive(Insertable, Deserialize)]
#[table_name = "posts"]
pub struct NewPost {
    pub title: String,
    pub description: String,
    pub content: String,
    pub created_by_user_id: i32,
    pub image_url: Option<String>,
}

/// A full replacement of a post's mutable fields. `None` writes NULL.
#[derive(AsChangeset, Deserialize)]
#[table_name = "posts"]
#[changeset_options(treat_none_as_null = "true")]
pub struct PostChanges {
    pub title: String,
    pub description: String,
    pub content: String,
    pub image_url: Option<String>,
}

/// Fetches a post and its author by id.
pub fn get(connection: &Connection, id: i32) -> Result<Option<PostWithAuthor>, Error> {
    use crate::schema::posts::dsl;
    use crate::schema::users;

    if id <= 0 || id >= MAX_POST_ID {
        return Ok(None);
    }

    let row: Option<(Post, User)> = dsl::posts
        .inner_join(users::table)
        .filter(dsl::post_id.eq(id))
        .first(connection)
        .optional()?;
    Ok(row.map(|(post, author)| PostWithAuthor { post, author }))
}

/// Offset for a 1-indexed listing page. Saturates so an absurd page
/// number from the URL stays a valid (if astronomically large) offset.
pub fn page_offset(page: i64) -> i64 {
    (page.max(1) - 1).saturating_mul(PAGE_SIZE)
}

/// Fetches one page of posts with their authors, newest first. An
/// offset past the end of the table yields an empty page.
pub fn page(connection: &Connection, page: i64) -> Result<Vec<PostWithAuthor>, Error> {
    use crate::schema::posts::dsl;
    use crate::schema::users;

    let rows: Vec<(Post, User)> = dsl::posts
        .inner_join(users::table)
        .order(dsl::date_created.desc())
        .limit(PAGE_SIZE)
        .offset(page_offset(page))
        .load(connection)?;
    Ok(rows
        .into_iter()
        .map(|(post, author)| PostWithAuthor { post, author })
        .collect())
}

/// Creates a post. A dangling author reference is rejected by the
/// store's foreign key and surfaces as `ForeignKeyViolation`.
pub fn create(connection: &Connection, post: &NewPost) -> Result<(), Error> {
    connection.transaction(|| {
        diesel::insert_into(posts::table)
            .values(post)
            .execute(connection)
            .map_err(Error::from)?;
        Ok(())
    })
}

pub fn edit(connection: &Connection, id: i32, changes: &PostChanges) -> Result<(), Error> {
    use crate::schema::posts::dsl;

    connection.transaction(|| {
        let affected = diesel::update(dsl::posts.find(id))
            .set(changes)
            .execute(connection)
            .map_err(Error::from)?;
        if affected == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::{page_offset, PAGE_SIZE};

    #[test]
    fn first_page_starts_at_zero() {
        assert_eq!(page_offset(1), 0);
    }

    #[test]
    fn pages_advance_by_page_size() {
        assert_eq!(page_offset(2), PAGE_SIZE);
        assert_eq!(page_offset(3), 2 * PAGE_SIZE);
    }

    #[test]
    fn nonsense_pages_clamp_to_the_first() {
        assert_eq!(page_offset(0), 0);
        assert_eq!(page_offset(-4), 0);
    }

    #[test]
    fn huge_pages_saturate_instead_of_overflowing() {
        assert_eq!(page_offset(i64::MAX), i64::MAX);
        assert!(page_offset(i64::MAX / PAGE_SIZE) >= 0);
    }
}
