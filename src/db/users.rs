use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    error::{ForumError, ForumResult},
    forms::FormErrors,
};

use super::stamp;

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub created: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub username: String,
    pub email: String,
    pub avatar: Option<String>,
    pub bio: Option<String>,
}

pub(crate) const USER_COLUMNS: &str = "u.id, u.email, u.username, u.password_hash, u.avatar, u.bio, u.created";

async fn hash_password(password: String) -> ForumResult<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ForumError::PasswordHash(e.to_string()))
    })
    .await
    .map_err(|e| ForumError::PasswordHash(e.to_string()))?
}

async fn verify_password(password: String, password_hash: String) -> ForumResult<bool> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&password_hash).map_err(|e| ForumError::PasswordHash(e.to_string()))?;
        Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
    })
    .await
    .map_err(|e| ForumError::PasswordHash(e.to_string()))?
}

/// Records which of username/email already belong to an account other than `except`.
async fn check_taken(
    db_pool: &SqlitePool,
    username: &str,
    email: &str,
    except: Option<Uuid>,
) -> ForumResult<FormErrors> {
    let mut errors = FormErrors::new();

    let owner: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE username=?")
        .bind(username)
        .fetch_optional(db_pool)
        .await?;
    if owner.is_some_and(|id| Some(id) != except) {
        errors.add("username", "Username already exists");
    }

    let owner: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE email=?")
        .bind(email)
        .fetch_optional(db_pool)
        .await?;
    if owner.is_some_and(|id| Some(id) != except) {
        errors.add("email", "Email is already registered");
    }

    Ok(errors)
}

/// Maps a lost uniqueness race to the field whose constraint failed.
/// SQLite names it in the message, e.g. `UNIQUE constraint failed: users.email`.
fn unique_violation(err: sqlx::Error) -> ForumError {
    match err.as_database_error() {
        Some(db_err) if db_err.is_unique_violation() => {
            if db_err.message().contains("users.email") {
                FormErrors::single("email", "Email is already registered").into()
            } else {
                FormErrors::single("username", "Username already exists").into()
            }
        }
        _ => err.into(),
    }
}

#[instrument(skip(db_pool, new_user), fields(username = %new_user.username))]
pub async fn register(db_pool: &SqlitePool, new_user: NewUser) -> ForumResult<User> {
    let NewUser { email, username, password } = new_user;

    let errors = check_taken(db_pool, &username, &email, None).await?;
    if !errors.is_empty() {
        return Err(errors.into());
    }

    let user = User {
        id: Uuid::now_v7(),
        email,
        username,
        password_hash: hash_password(password).await?,
        avatar: None,
        bio: None,
        created: OffsetDateTime::now_utc(),
    };

    sqlx::query("INSERT INTO users (id,email,username,password_hash,avatar,bio,created) VALUES (?,?,?,?,?,?,?)")
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.avatar)
        .bind(&user.bio)
        .bind(stamp(user.created))
        .execute(db_pool)
        .await
        .map_err(unique_violation)?;

    info!(user_id = %user.id, "registered user");
    Ok(user)
}

/// Checks an email/password pair. Failures are reported as form errors so the
/// login page can show them.
#[instrument(skip(db_pool, password))]
pub async fn authenticate(db_pool: &SqlitePool, email: &str, password: String) -> ForumResult<User> {
    let Some(user) = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users u WHERE u.email=?"))
        .bind(email)
        .fetch_optional(db_pool)
        .await?
    else {
        return Err(FormErrors::single("email", "User does not exist").into());
    };

    if !verify_password(password, user.password_hash.clone()).await? {
        return Err(FormErrors::single("password", "Incorrect password").into());
    }

    Ok(user)
}

pub async fn find_optional<'e>(
    executor: impl Executor<'e, Database = Sqlite>,
    id: Uuid,
) -> ForumResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id=?"))
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(user)
}

pub async fn find<'e>(executor: impl Executor<'e, Database = Sqlite>, id: Uuid) -> ForumResult<User> {
    find_optional(executor, id).await?.ok_or(ForumError::NotFound("user"))
}

#[instrument(skip(db_pool, update))]
pub async fn update_profile(db_pool: &SqlitePool, user_id: Uuid, update: ProfileUpdate) -> ForumResult<User> {
    let errors = check_taken(db_pool, &update.username, &update.email, Some(user_id)).await?;
    if !errors.is_empty() {
        return Err(errors.into());
    }

    let updated = sqlx::query("UPDATE users SET username=?, email=?, avatar=?, bio=? WHERE id=?")
        .bind(&update.username)
        .bind(&update.email)
        .bind(&update.avatar)
        .bind(&update.bio)
        .bind(user_id)
        .execute(db_pool)
        .await
        .map_err(unique_violation)?
        .rows_affected();
    if updated == 0 {
        return Err(ForumError::NotFound("user"));
    }

    find(db_pool, user_id).await
}
