use diesel::result::{DatabaseErrorKind, Error as DieselError};
use failure::Fail;

/// The errors the data access and authentication layers can produce.
///
/// Store-level failures are always surfaced as one of these variants;
/// a failed write is never swallowed. The two authentication failure
/// causes (unknown email, wrong password) intentionally collapse into
/// a single `InvalidCredentials` so callers can't probe which emails
/// are registered.
#[derive(Clone, Debug, PartialEq, Eq, Fail)]
pub enum Error {
    #[fail(display = "record not found")]
    NotFound,
    #[fail(display = "the blog configuration has not been provisioned")]
    NotProvisioned,
    #[fail(display = "a user with this email address already exists")]
    DuplicateEmail,
    #[fail(display = "the referenced record does not exist")]
    ForeignKeyViolation,
    #[fail(display = "please enter your email and password before proceeding")]
    MissingCredentials,
    #[fail(display = "invalid email or password")]
    InvalidCredentials,
    #[fail(display = "you must be logged in as an administrator to do that")]
    Unauthorized,
    #[fail(display = "the database operation timed out")]
    Timeout,
    #[fail(display = "the database is unavailable: {}", _0)]
    StoreUnavailable(String),
}

impl From<DieselError> for Error {
    fn from(error: DieselError) -> Error {
        match error {
            DieselError::NotFound => Error::NotFound,
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                // The only application-level unique constraint is users.email.
                Error::DuplicateEmail
            }
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                Error::ForeignKeyViolation
            }
            DieselError::DatabaseError(_, ref info)
                if info.message().contains("statement timeout") =>
            {
                Error::Timeout
            }
            other => Error::StoreUnavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    use super::Error;

    fn db_error(kind: DatabaseErrorKind, message: &str) -> DieselError {
        DieselError::DatabaseError(kind, Box::new(String::from(message)))
    }

    #[test]
    fn not_found_maps() {
        assert_eq!(Error::from(DieselError::NotFound), Error::NotFound);
    }

    #[test]
    fn unique_violation_is_duplicate_email() {
        let error = db_error(
            DatabaseErrorKind::UniqueViolation,
            "duplicate key value violates unique constraint \"users_email_key\"",
        );
        assert_eq!(Error::from(error), Error::DuplicateEmail);
    }

    #[test]
    fn foreign_key_violation_maps() {
        let error = db_error(
            DatabaseErrorKind::ForeignKeyViolation,
            "insert or update on table \"posts\" violates foreign key constraint",
        );
        assert_eq!(Error::from(error), Error::ForeignKeyViolation);
    }

    #[test]
    fn statement_timeout_maps_to_timeout() {
        let error = db_error(
            DatabaseErrorKind::SerializationFailure,
            "canceling statement due to statement timeout",
        );
        assert_eq!(Error::from(error), Error::Timeout);
    }

    #[test]
    fn other_database_errors_are_store_unavailable() {
        let error = db_error(
            DatabaseErrorKind::UnableToSendCommand,
            "server closed the connection",
        );
        match Error::from(error) {
            Error::StoreUnavailable(_) => (),
            other => panic!("unexpected mapping: {:?}", other),
        }
    }
}
