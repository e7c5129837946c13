//! Database helpers for the users table.

use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

/// Full user row, including the password hash. Stays server-side; responses
/// go through [`super::types::UserResponse`].
#[derive(Clone, Debug)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub profile_picture: Option<String>,
    pub is_admin: bool,
}

/// Outcome when attempting to create a user.
#[derive(Debug)]
pub(super) enum InsertOutcome {
    Created(UserRecord),
    Conflict,
}

const USER_COLUMNS: &str = "id, username, email, password_hash, profile_picture, is_admin";

fn row_to_user(row: &sqlx::postgres::PgRow) -> UserRecord {
    UserRecord {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        profile_picture: row.get("profile_picture"),
        is_admin: row.get("is_admin"),
    }
}

pub(super) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

pub(super) async fn lookup_user_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRecord>> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by email")?;
    Ok(row.as_ref().map(row_to_user))
}

pub(super) async fn lookup_user_by_username(
    pool: &PgPool,
    username: &str,
) -> Result<Option<UserRecord>> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(username)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by username")?;
    Ok(row.as_ref().map(row_to_user))
}

pub(super) async fn lookup_user_by_id(pool: &PgPool, id: Uuid) -> Result<Option<UserRecord>> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by id")?;
    Ok(row.as_ref().map(row_to_user))
}

/// Insert a user; a duplicate email or username maps to `Conflict` instead of
/// an error.
pub(super) async fn insert_user(
    pool: &PgPool,
    username: &str,
    email: &str,
    password_hash: &str,
    profile_picture: Option<&str>,
    is_admin: bool,
) -> Result<InsertOutcome> {
    let query = format!(
        r"
        INSERT INTO users
            (username, email, password_hash, profile_picture, is_admin)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {USER_COLUMNS}
    "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(profile_picture)
        .bind(is_admin)
        .fetch_one(pool)
        .instrument(span)
        .await;

    match row {
        Ok(row) => Ok(InsertOutcome::Created(row_to_user(&row))),
        Err(err) if is_unique_violation(&err) => Ok(InsertOutcome::Conflict),
        Err(err) => Err(err).context("failed to insert user"),
    }
}

/// Fields a user may change on their own account. `None` leaves the column
/// untouched.
#[derive(Debug, Default)]
pub(super) struct ProfileChanges<'a> {
    pub username: Option<&'a str>,
    pub email: Option<&'a str>,
    pub password_hash: Option<&'a str>,
    pub profile_picture: Option<&'a str>,
}

/// Apply profile changes; a duplicate username or email maps to `Conflict`.
/// Returns `Ok(None)` when the user does not exist.
pub(super) async fn update_user_profile(
    pool: &PgPool,
    id: Uuid,
    changes: &ProfileChanges<'_>,
) -> Result<Option<InsertOutcome>> {
    let query = format!(
        r"
        UPDATE users SET
            username        = COALESCE($2, username),
            email           = COALESCE($3, email),
            password_hash   = COALESCE($4, password_hash),
            profile_picture = COALESCE($5, profile_picture)
        WHERE id = $1
        RETURNING {USER_COLUMNS}
    "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(id)
        .bind(changes.username)
        .bind(changes.email)
        .bind(changes.password_hash)
        .bind(changes.profile_picture)
        .fetch_optional(pool)
        .instrument(span)
        .await;

    match row {
        Ok(Some(row)) => Ok(Some(InsertOutcome::Created(row_to_user(&row)))),
        Ok(None) => Ok(None),
        Err(err) if is_unique_violation(&err) => Ok(Some(InsertOutcome::Conflict)),
        Err(err) => Err(err).context("failed to update user profile"),
    }
}

/// Set the admin flag; returns the updated record when the user exists.
pub(super) async fn update_admin_flag(
    pool: &PgPool,
    id: Uuid,
    is_admin: bool,
) -> Result<Option<UserRecord>> {
    let query = format!("UPDATE users SET is_admin = $2 WHERE id = $1 RETURNING {USER_COLUMNS}");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(id)
        .bind(is_admin)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to update admin flag")?;
    Ok(row.as_ref().map(row_to_user))
}

/// Delete a user row; `true` when a row was removed.
pub(super) async fn delete_user(pool: &PgPool, id: Uuid) -> Result<bool> {
    let query = "DELETE FROM users WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete user")?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    #[derive(Debug)]
    struct TestDbError {
        code: Option<&'static str>,
    }

    impl std::fmt::Display for TestDbError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "test db error")
        }
    }

    impl std::error::Error for TestDbError {}

    impl sqlx::error::DatabaseError for TestDbError {
        fn message(&self) -> &str {
            "test db error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.map(Cow::Borrowed)
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::Other
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }
    }

    #[test]
    fn is_unique_violation_matches_sqlstate() {
        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("23505"),
        }));
        assert!(is_unique_violation(&err));

        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("99999"),
        }));
        assert!(!is_unique_violation(&err));

        let err = sqlx::Error::RowNotFound;
        assert!(!is_unique_violation(&err));
    }
}
