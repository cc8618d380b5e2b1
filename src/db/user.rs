use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};

use crate::db::{Database, invalid_column};
use crate::models::{Profile, Session, User};

/// A user row together with its stored password hash.
pub struct Credentials {
    pub user: User,
    pub password_hash: String,
}

fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get("id")?,
        email: row.get("email")?,
        created_at: row.get("created_at")?,
    })
}

fn row_to_profile(row: &Row) -> rusqlite::Result<Profile> {
    Ok(Profile {
        id: row.get("id")?,
        email: row.get("email")?,
        name: row.get("name")?,
    })
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| invalid_column(idx, e.into()))
}

/// Emails are stored lower-cased; lookups normalise the same way.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn create_user(db: &Database, email: &str, password_hash: &str) -> Result<User> {
    let id = ulid::Ulid::new().to_string();
    db.conn()
        .execute(
            "INSERT INTO users (id, email, password_hash) VALUES (?1, ?2, ?3)",
            params![id, normalize_email(email), password_hash],
        )
        .context("failed to insert user")?;

    get_user(db, &id)?.context("user not found after insert")
}

pub fn get_user(db: &Database, id: &str) -> Result<Option<User>> {
    db.conn()
        .prepare("SELECT id, email, created_at FROM users WHERE id = ?1")?
        .query_row([id], row_to_user)
        .optional()
        .context("failed to query user")
}

pub fn find_credentials(db: &Database, email: &str) -> Result<Option<Credentials>> {
    db.conn()
        .prepare("SELECT id, email, created_at, password_hash FROM users WHERE email = ?1")?
        .query_row([normalize_email(email)], |row| {
            Ok(Credentials {
                user: row_to_user(row)?,
                password_hash: row.get("password_hash")?,
            })
        })
        .optional()
        .context("failed to query user credentials")
}

pub fn update_password_hash(db: &Database, user_id: &str, password_hash: &str) -> Result<bool> {
    let rows_affected = db
        .conn()
        .execute(
            "UPDATE users SET password_hash = ?1 WHERE id = ?2",
            [password_hash, user_id],
        )
        .context("failed to update password")?;
    Ok(rows_affected > 0)
}

pub fn upsert_profile(db: &Database, user_id: &str, email: &str, name: &str) -> Result<Profile> {
    db.conn()
        .execute(
            "INSERT INTO profiles (id, email, name) VALUES (?1, ?2, ?3) \
             ON CONFLICT(id) DO UPDATE SET email = excluded.email, name = excluded.name",
            params![user_id, normalize_email(email), name],
        )
        .context("failed to upsert profile")?;

    db.conn()
        .prepare("SELECT id, email, name FROM profiles WHERE id = ?1")?
        .query_row([user_id], row_to_profile)
        .context("profile not found after upsert")
}

/// Creates the user and its empty-named profile in one transaction; neither
/// row is kept if the other fails.
pub fn register_user(db: &Database, email: &str, password_hash: &str) -> Result<User> {
    let tx = db
        .conn()
        .unchecked_transaction()
        .context("failed to begin transaction for sign-up")?;

    let user = create_user(db, email, password_hash)?;
    upsert_profile(db, &user.id, &user.email, "")?;

    tx.commit().context("failed to commit sign-up")?;
    Ok(user)
}

pub fn find_profile_by_email(db: &Database, email: &str) -> Result<Option<Profile>> {
    db.conn()
        .prepare("SELECT id, email, name FROM profiles WHERE email = ?1")?
        .query_row([normalize_email(email)], row_to_profile)
        .optional()
        .context("failed to query profile")
}

pub fn create_session(
    db: &Database,
    token: &str,
    user_id: &str,
    expires_at: DateTime<Utc>,
) -> Result<()> {
    db.conn()
        .execute(
            "INSERT INTO sessions (token, user_id, expires_at) VALUES (?1, ?2, ?3)",
            params![token, user_id, expires_at.to_rfc3339()],
        )
        .context("failed to insert session")?;
    Ok(())
}

/// Looks a session up by token. Expired sessions are returned as-is; callers decide.
pub fn get_session(db: &Database, token: &str) -> Result<Option<Session>> {
    db.conn()
        .prepare(
            "SELECT s.token AS token, s.expires_at AS expires_at, u.id AS id, u.email AS email, u.created_at AS created_at \
             FROM sessions s JOIN users u ON u.id = s.user_id WHERE s.token = ?1",
        )?
        .query_row([token], |row| {
            let expires_raw: String = row.get("expires_at")?;
            Ok(Session {
                access_token: row.get("token")?,
                expires_at: parse_timestamp(1, &expires_raw)?,
                user: row_to_user(row)?,
            })
        })
        .optional()
        .context("failed to query session")
}

pub fn delete_session(db: &Database, token: &str) -> Result<bool> {
    let rows_affected = db
        .conn()
        .execute("DELETE FROM sessions WHERE token = ?1", [token])
        .context("failed to delete session")?;
    Ok(rows_affected > 0)
}

pub fn create_password_reset(
    db: &Database,
    token: &str,
    user_id: &str,
    expires_at: DateTime<Utc>,
) -> Result<()> {
    db.conn()
        .execute(
            "INSERT INTO password_resets (token, user_id, expires_at) VALUES (?1, ?2, ?3)",
            params![token, user_id, expires_at.to_rfc3339()],
        )
        .context("failed to insert password reset")?;
    Ok(())
}

/// Consumes a reset token. Returns the user id when the token existed and had
/// not expired at `now`; the token is deleted either way.
pub fn take_password_reset(db: &Database, token: &str, now: DateTime<Utc>) -> Result<Option<String>> {
    let tx = db
        .conn()
        .unchecked_transaction()
        .context("failed to begin transaction for password reset")?;

    let found = tx
        .query_row(
            "SELECT user_id, expires_at FROM password_resets WHERE token = ?1",
            [token],
            |row| {
                let expires_raw: String = row.get(1)?;
                Ok((row.get::<_, String>(0)?, parse_timestamp(1, &expires_raw)?))
            },
        )
        .optional()
        .context("failed to query password reset")?;

    tx.execute("DELETE FROM password_resets WHERE token = ?1", [token])
        .context("failed to delete password reset")?;
    tx.commit().context("failed to commit password reset")?;

    Ok(found.and_then(|(user_id, expires_at)| (expires_at > now).then_some(user_id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::open_temp_db;
    use chrono::Duration;

    #[test]
    fn test_create_user_lowercases_email() {
        let (db, _dir) = open_temp_db();
        let user = create_user(&db, "  Ada@Example.COM ", "hash").unwrap();
        assert_eq!(user.id.len(), 26);
        assert_eq!(user.email, "ada@example.com");

        let creds = find_credentials(&db, "ADA@example.com").unwrap().unwrap();
        assert_eq!(creds.user.id, user.id);
        assert_eq!(creds.password_hash, "hash");
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let (db, _dir) = open_temp_db();
        create_user(&db, "ada@example.com", "hash").unwrap();
        assert!(create_user(&db, "ADA@example.com", "hash").is_err());
    }

    #[test]
    fn test_upsert_profile_overwrites() {
        let (db, _dir) = open_temp_db();
        let user = create_user(&db, "ada@example.com", "hash").unwrap();
        upsert_profile(&db, &user.id, "ada@example.com", "").unwrap();
        let profile = upsert_profile(&db, &user.id, "ada@example.com", "Ada").unwrap();
        assert_eq!(profile.name, "Ada");

        let found = find_profile_by_email(&db, "Ada@Example.com").unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert!(find_profile_by_email(&db, "nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn test_register_user_creates_profile() {
        let (db, _dir) = open_temp_db();
        let user = register_user(&db, "Ada@Example.com", "hash").unwrap();
        let profile = find_profile_by_email(&db, "ada@example.com").unwrap().unwrap();
        assert_eq!(profile.id, user.id);
        assert_eq!(profile.name, "");
    }

    #[test]
    fn test_register_user_rolls_back_without_profile() {
        let (db, _dir) = open_temp_db();
        db.conn()
            .execute_batch(
                "CREATE TRIGGER no_profiles BEFORE INSERT ON profiles \
                 BEGIN SELECT RAISE(ABORT, 'profiles disabled'); END;",
            )
            .unwrap();

        assert!(register_user(&db, "ada@example.com", "hash").is_err());
        assert!(find_credentials(&db, "ada@example.com").unwrap().is_none());
    }

    #[test]
    fn test_session_roundtrip_and_delete() {
        let (db, _dir) = open_temp_db();
        let user = create_user(&db, "ada@example.com", "hash").unwrap();
        let expires = Utc::now() + Duration::hours(1);
        create_session(&db, "tok", &user.id, expires).unwrap();

        let session = get_session(&db, "tok").unwrap().unwrap();
        assert_eq!(session.user.id, user.id);
        assert_eq!(session.expires_at.timestamp(), expires.timestamp());

        assert!(delete_session(&db, "tok").unwrap());
        assert!(get_session(&db, "tok").unwrap().is_none());
        assert!(!delete_session(&db, "tok").unwrap());
    }

    #[test]
    fn test_password_reset_is_single_use() {
        let (db, _dir) = open_temp_db();
        let user = create_user(&db, "ada@example.com", "hash").unwrap();
        let now = Utc::now();
        create_password_reset(&db, "reset", &user.id, now + Duration::hours(1)).unwrap();

        assert_eq!(take_password_reset(&db, "reset", now).unwrap(), Some(user.id));
        assert_eq!(take_password_reset(&db, "reset", now).unwrap(), None);
    }

    #[test]
    fn test_expired_password_reset_rejected() {
        let (db, _dir) = open_temp_db();
        let user = create_user(&db, "ada@example.com", "hash").unwrap();
        let now = Utc::now();
        create_password_reset(&db, "old", &user.id, now - Duration::minutes(1)).unwrap();
        assert_eq!(take_password_reset(&db, "old", now).unwrap(), None);
    }

    #[test]
    fn test_update_password_hash() {
        let (db, _dir) = open_temp_db();
        let user = create_user(&db, "ada@example.com", "old").unwrap();
        assert!(update_password_hash(&db, &user.id, "new").unwrap());
        let creds = find_credentials(&db, "ada@example.com").unwrap().unwrap();
        assert_eq!(creds.password_hash, "new");
        assert!(!update_password_hash(&db, "nobody", "new").unwrap());
    }
}
