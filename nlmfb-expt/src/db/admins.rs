//! Administrator accounts

use nlmfb_common::auth::{generate_salt, hash_password};
use nlmfb_common::Result;
use sqlx::{FromRow, SqlitePool};

/// Stored administrator credentials
#[derive(Debug, Clone, FromRow)]
pub struct Admin {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub password_salt: String,
    pub is_superuser: bool,
}

/// Create a superuser, or reset the password of an existing one
pub async fn upsert_admin(pool: &SqlitePool, username: &str, password: &str) -> Result<()> {
    let salt = generate_salt();
    let hash = hash_password(password, &salt);

    sqlx::query(
        r#"
        INSERT INTO admins (username, password_hash, password_salt, is_superuser)
        VALUES (?, ?, ?, 1)
        ON CONFLICT(username) DO UPDATE SET
            password_hash = excluded.password_hash,
            password_salt = excluded.password_salt,
            is_superuser = 1
        "#,
    )
    .bind(username)
    .bind(&hash)
    .bind(&salt)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn find_admin(pool: &SqlitePool, username: &str) -> Result<Option<Admin>> {
    let admin = sqlx::query_as::<_, Admin>(
        "SELECT id, username, password_hash, password_salt, is_superuser FROM admins WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    Ok(admin)
}
