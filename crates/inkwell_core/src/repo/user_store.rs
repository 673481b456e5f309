//! User store contract and SQLite implementation.
//!
//! The article core only reads users. Seeding helpers (`create_user`,
//! `follow_user`) live on the SQLite type itself so tests and the CLI can
//! prepare data without widening the read-only contract.

use crate::model::user::{NewUser, User, UserId};
use crate::repo::{id_values, placeholders, RepoError, RepoResult};
use rusqlite::{params, params_from_iter, Connection, Row};

/// Read capability for user accounts.
pub trait UserStore {
    /// Gets one user by id.
    fn get_user(&self, conn: &Connection, user_id: UserId) -> RepoResult<Option<User>>;
    /// Gets every existing user among `user_ids`. Missing ids are skipped.
    fn get_users_by_ids(&self, conn: &Connection, user_ids: &[UserId]) -> RepoResult<Vec<User>>;
}

/// SQLite-backed user store.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteUserStore;

impl SqliteUserStore {
    /// Inserts one user account and returns it as persisted.
    pub fn create_user(&self, conn: &Connection, user: &NewUser) -> RepoResult<User> {
        if user.username.trim().is_empty() {
            return Err(RepoError::InvalidData(
                "username must not be blank".to_string(),
            ));
        }

        conn.execute(
            "INSERT INTO users (username, bio, image) VALUES (?1, ?2, ?3);",
            params![
                user.username.as_str(),
                user.bio.as_deref(),
                user.image.as_deref()
            ],
        )?;
        let id = conn.last_insert_rowid();
        self.get_user(conn, id)?
            .ok_or_else(|| RepoError::InvalidData(format!("user {id} missing right after insert")))
    }

    /// Records that `follower_id` follows `followee_id`. Idempotent.
    pub fn follow_user(
        &self,
        conn: &Connection,
        follower_id: UserId,
        followee_id: UserId,
    ) -> RepoResult<()> {
        conn.execute(
            "INSERT OR IGNORE INTO follows (follower_id, followee_id) VALUES (?1, ?2);",
            params![follower_id, followee_id],
        )?;
        Ok(())
    }
}

impl UserStore for SqliteUserStore {
    fn get_user(&self, conn: &Connection, user_id: UserId) -> RepoResult<Option<User>> {
        let mut stmt = conn.prepare("SELECT id, username, bio, image FROM users WHERE id = ?1;")?;
        let mut rows = stmt.query([user_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_user_row(row)?));
        }
        Ok(None)
    }

    fn get_users_by_ids(&self, conn: &Connection, user_ids: &[UserId]) -> RepoResult<Vec<User>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT id, username, bio, image FROM users WHERE id IN ({});",
            placeholders(user_ids.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(id_values(user_ids)))?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(parse_user_row(row)?);
        }
        Ok(users)
    }
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    Ok(User {
        id: row.get("id")?,
        username: row.get("username")?,
        bio: row.get("bio")?,
        image: row.get("image")?,
    })
}
