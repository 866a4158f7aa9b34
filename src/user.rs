use bcrypt::BcryptError;
use chrono::{Duration, NaiveDateTime, Utc};
use cookie::CookieJar;
use diesel::prelude::*;
use diesel::Connection as _;
use futures::future;
use gotham::{
    handler::HandlerFuture,
    helpers::http::response::create_response,
    middleware::Middleware,
    state::{FromState, State},
};
use gotham_derive::{NewMiddleware, StateData};
use rand::prelude::*;
use sha2::{Digest, Sha256};

use crate::{
    db::{Connection, DbPool},
    error::Error,
    normalize,
    schema::{sessions, users},
};

const SESSION_LEN: usize = 24;
const SESSION_TTL_DAYS: i64 = 30;

#[derive(Debug, Serialize, Queryable, Identifiable)]
#[primary_key(user_id)]
pub struct User {
    /// The user's numeric id
    pub user_id: i32,
    /// When the account was created (server-assigned)
    #[serde(with = "crate::date_format")]
    pub date_created: NaiveDateTime,
    /// The unique email address used to log in
    pub email: String,
    /// The hashed password
    password: String,
    /// Whether the user may perform administrative mutations
    pub is_admin: bool,
    /// Whether the user is listed as a post author
    pub is_author: bool,
    /// The user's display name
    pub name: Option<String>,
    /// A short biography
    pub bio: Option<String>,
    pub organization: Option<String>,
    pub social_media_link: Option<String>,
}

impl User {
    /// Verify the supplied password matches the user's
    pub fn verify(&self, password: &str) -> Result<bool, BcryptError> {
        verify(password, &self.password)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }
}

/// A to be created user.
///
/// NOTE: This structure contains the user's unencrypted password, handle it with great care!
#[derive(Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    /// The user's raw password
    pub password: String,
    pub is_admin: bool,
    pub is_author: bool,
    pub name: Option<String>,
    pub bio: Option<String>,
}

impl NewUser {
    /// Converts the structure into an insertable row, hashing the password.
    pub fn into_insert(self) -> Result<UserInsert, BcryptError> {
        Ok(UserInsert {
            email: self.email,
            password: hash(&self.password)?,
            is_admin: self.is_admin,
            is_author: self.is_author,
            name: self.name,
            bio: self.bio,
        })
    }
}

/// A user row ready for insertion; the password is already hashed.
#[derive(Insertable)]
#[table_name = "users"]
pub struct UserInsert {
    pub email: String,
    pub password: String,
    pub is_admin: bool,
    pub is_author: bool,
    pub name: Option<String>,
    pub bio: Option<String>,
}

/// A full replacement of a user's mutable fields. `None` writes NULL.
#[derive(AsChangeset)]
#[table_name = "users"]
#[changeset_options(treat_none_as_null = "true")]
pub struct UserChanges {
    pub email: String,
    /// The new password, already hashed
    pub password: String,
    pub is_admin: bool,
    pub is_author: bool,
    pub name: Option<String>,
    pub bio: Option<String>,
}

/// Login credentials
#[derive(Deserialize)]
pub struct Login {
    pub email: String,
    pub password: String,
}

impl Login {
    /// Rejects blank credentials before any database work happens.
    pub fn validate(&self) -> Result<(), Error> {
        if self.email.is_empty() || self.password.is_empty() {
            Err(Error::MissingCredentials)
        } else {
            Ok(())
        }
    }

    /// Create a session if email and password are valid.
    ///
    /// An unknown email and a wrong password produce the same error so
    /// the response doesn't reveal which emails are registered.
    pub fn login(&self, connection: &Connection) -> Result<Session, Error> {
        self.validate()?;

        let user = get_by_email(connection, &self.email)?;
        match user {
            Some(ref user) if user.verify(&self.password).unwrap_or(false) => {
                let session = Session::new(user)?;
                diesel::insert_into(sessions::table)
                    .values(&session)
                    .execute(connection)?;
                Ok(session)
            }
            _ => Err(Error::InvalidCredentials),
        }
    }
}

/// An authenticated session, stored server-side and keyed by an opaque
/// cookie token. `identity` holds the normalized user record (minus
/// the password hash) as JSON.
#[derive(Clone, Queryable, Insertable, Serialize, StateData)]
#[table_name = "sessions"]
pub struct Session {
    pub id: String,
    identity: String,
    pub expires: NaiveDateTime,
}

impl Session {
    /// Generates a new session for the given user.
    ///
    /// NB: Must be inserted into the database for the session to be valid.
    pub fn new(user: &User) -> Result<Session, Error> {
        let mut record = normalize::row_to_map(user);
        record.remove("password");
        let identity = serde_json::to_string(&record)
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?;

        let mut id = [0u8; SESSION_LEN];
        StdRng::from_entropy().fill(&mut id[..]);
        Ok(Session {
            id: base64::encode(&id),
            identity,
            expires: Utc::now().naive_utc() + Duration::days(SESSION_TTL_DAYS),
        })
    }

    /// Get the unexpired session with the specified id
    pub fn from_id(id: &str, connection: &Connection) -> Result<Option<Session>, Error> {
        use crate::schema::sessions::dsl;

        dsl::sessions
            .find(id)
            .filter(dsl::expires.gt(diesel::dsl::now))
            .first(connection)
            .optional()
            .map_err(Error::from)
    }

    /// The identity this session authenticates.
    pub fn identity(&self) -> Result<Identity, Error> {
        serde_json::from_str(&self.identity).map_err(|_| Error::Unauthorized)
    }
}

/// The authenticated identity carried by a session.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Identity {
    pub user_id: i32,
    pub email: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_author: bool,
}

/// The gate in front of every administrative mutation: requires a
/// session whose identity is an administrator. It only ever returns a
/// value or `Unauthorized`; what to show the visitor is the route
/// layer's decision.
pub fn authorize(session: Option<&Session>) -> Result<Identity, Error> {
    let identity = match session {
        Some(session) => session.identity()?,
        None => return Err(Error::Unauthorized),
    };
    if identity.is_admin {
        Ok(identity)
    } else {
        Err(Error::Unauthorized)
    }
}

/// Loads the session named by the request's session cookie, if any,
/// into the request state.
#[derive(Clone, NewMiddleware)]
pub struct SessionMiddleware;

impl Middleware for SessionMiddleware {
    fn call<C>(self, mut state: State, chain: C) -> Box<HandlerFuture>
    where
        C: FnOnce(State) -> Box<HandlerFuture>,
    {
        let put_session = |state: &mut State| -> Result<(), Error> {
            let connection = DbPool::borrow_from(state).get()?;
            let cookie = CookieJar::borrow_from(state)
                .get("session")
                .map(|cookie| cookie.value().to_owned());
            if let Some(id) = cookie {
                if let Some(session) = Session::from_id(&id, &connection)? {
                    state.put(session);
                }
            }
            Ok(())
        };
        match put_session(&mut state) {
            Ok(()) => Box::new(chain(state)),
            Err(e) => {
                let response = create_response(
                    &state,
                    http::StatusCode::INTERNAL_SERVER_ERROR,
                    mime::TEXT_PLAIN,
                    e.to_string(),
                );
                Box::new(future::ok((state, response)))
            }
        }
    }
}

/// Password hashing. The password is digested with SHA-256 before
/// bcrypt so inputs of any length stay within bcrypt's 72-byte limit;
/// bcrypt supplies and embeds the per-record salt.
pub fn hash(password: &str) -> Result<String, BcryptError> {
    let digest = Sha256::new().chain(password).finalize();
    bcrypt::hash(base64::encode(&digest), bcrypt::DEFAULT_COST)
}

pub fn verify(password: &str, hash: &str) -> Result<bool, BcryptError> {
    let digest = Sha256::new().chain(password).finalize();
    bcrypt::verify(base64::encode(&digest), hash)
}

/// Creates a user. A duplicate email is rejected by the store's unique
/// constraint and surfaces as `DuplicateEmail`.
pub fn create(connection: &Connection, user: UserInsert) -> Result<(), Error> {
    connection.transaction(|| {
        diesel::insert_into(users::table)
            .values(&user)
            .execute(connection)
            .map_err(Error::from)?;
        Ok(())
    })
}

pub fn get(connection: &Connection, id: i32) -> Result<Option<User>, Error> {
    use crate::schema::users::dsl;

    dsl::users.find(id).first(connection).optional().map_err(Error::from)
}

pub fn get_by_email(connection: &Connection, email: &str) -> Result<Option<User>, Error> {
    use crate::schema::users::dsl;

    dsl::users
        .filter(dsl::email.eq(email))
        .first(connection)
        .optional()
        .map_err(Error::from)
}

pub fn update(connection: &Connection, id: i32, changes: &UserChanges) -> Result<(), Error> {
    use crate::schema::users::dsl;

    connection.transaction(|| {
        let affected = diesel::update(dsl::users.find(id))
            .set(changes)
            .execute(connection)
            .map_err(Error::from)?;
        if affected == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    })
}

pub fn count(connection: &Connection) -> Result<i64, Error> {
    use crate::schema::users::dsl;

    dsl::users.count().first(connection).map_err(Error::from)
}

pub fn logout(connection: &Connection, session: &str) -> Result<(), Error> {
    use crate::schema::sessions::dsl;

    diesel::delete(dsl::sessions.find(session)).execute(connection)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::Value;

    use super::{authorize, hash, verify, Login, NewUser, Session, User};
    use crate::error::Error;

    fn user(is_admin: bool) -> User {
        User {
            user_id: 3,
            date_created: Utc::now().naive_utc(),
            email: String::from("writer@example.org"),
            password: hash("hunter2").unwrap(),
            is_admin,
            is_author: true,
            name: Some(String::from("A. Writer")),
            bio: None,
            organization: None,
            social_media_link: None,
        }
    }

    #[test]
    fn hash_verifies_and_rejects() {
        let hashed = hash("correct horse battery staple").unwrap();
        assert_ne!(hashed, "correct horse battery staple");
        assert!(verify("correct horse battery staple", &hashed).unwrap());
        assert!(!verify("incorrect horse", &hashed).unwrap());
    }

    #[test]
    fn new_user_password_is_hashed() {
        let new = NewUser {
            email: String::from("writer@example.org"),
            password: String::from("hunter2"),
            is_admin: false,
            is_author: true,
            name: None,
            bio: None,
        };
        let insert = new.into_insert().unwrap();
        assert_ne!(insert.password, "hunter2");
        assert!(verify("hunter2", &insert.password).unwrap());
    }

    #[test]
    fn blank_credentials_are_rejected_before_lookup() {
        let login = Login {
            email: String::new(),
            password: String::from("hunter2"),
        };
        assert_eq!(login.validate(), Err(Error::MissingCredentials));

        let login = Login {
            email: String::from("writer@example.org"),
            password: String::new(),
        };
        assert_eq!(login.validate(), Err(Error::MissingCredentials));
    }

    #[test]
    fn session_identity_carries_user_fields() {
        let user = user(true);
        let session = Session::new(&user).unwrap();
        let identity = session.identity().unwrap();
        assert_eq!(identity.user_id, 3);
        assert_eq!(identity.email, "writer@example.org");
        assert!(identity.is_admin);
        assert!(identity.is_author);
    }

    #[test]
    fn session_identity_never_contains_the_password_hash() {
        let user = user(false);
        let hashed = user.password.clone();
        let session = Session::new(&user).unwrap();
        assert!(!session.identity.contains(&hashed));
        let record: Value = serde_json::from_str(&session.identity).unwrap();
        assert!(record.get("password").is_none());
    }

    #[test]
    fn sessions_expire_in_the_future() {
        let session = Session::new(&user(false)).unwrap();
        assert!(session.expires > Utc::now().naive_utc());
    }

    #[test]
    fn gate_denies_anonymous_requests() {
        assert_eq!(authorize(None).unwrap_err(), Error::Unauthorized);
    }

    #[test]
    fn gate_denies_non_admins() {
        let session = Session::new(&user(false)).unwrap();
        assert_eq!(authorize(Some(&session)).unwrap_err(), Error::Unauthorized);
    }

    #[test]
    fn gate_permits_admins() {
        let session = Session::new(&user(true)).unwrap();
        let identity = authorize(Some(&session)).unwrap();
        assert!(identity.is_admin);
    }
}
