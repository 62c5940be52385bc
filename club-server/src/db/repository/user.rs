//! User Repository
//!
//! Password hashes never leave this module except through
//! [`UserRecord`], which the auth handler uses to verify a login.

use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::models::{Role, User, UserCreate, UserUpdate};

use super::{RepoError, RepoResult};
use crate::auth::password;
use crate::db::storage::{
    ClubStorage, USERNAMES, USERS, all_records, get_record, next_sequence, put_record, seq,
};
use redb::ReadableTable;

/// Stored user: the public [`User`] plus its argon2 hash
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(flatten)]
    pub user: User,
    pub password_hash: String,
}

/// Usernames are matched case-insensitively
fn username_key(username: &str) -> String {
    username.trim().to_lowercase()
}

fn not_found(id: u64) -> RepoError {
    RepoError::not_found(ErrorCode::UserNotFound, "User", id)
}

fn hash(password: &str) -> RepoResult<String> {
    password::hash_password(password)
        .map_err(|e| RepoError::Rule(AppError::internal(format!("Password hashing failed: {}", e))))
}

pub fn find_all(storage: &ClubStorage) -> RepoResult<Vec<User>> {
    let txn = storage.begin_read()?;
    let records: Vec<UserRecord> = all_records(&txn.open_table(USERS)?)?;
    Ok(records.into_iter().map(|r| r.user).collect())
}

pub fn find_by_id(storage: &ClubStorage, id: u64) -> RepoResult<User> {
    let txn = storage.begin_read()?;
    let record: UserRecord = get_record(&txn.open_table(USERS)?, id)?.ok_or_else(|| not_found(id))?;
    Ok(record.user)
}

/// Stored record for a login attempt
pub fn find_by_username(storage: &ClubStorage, username: &str) -> RepoResult<Option<UserRecord>> {
    let txn = storage.begin_read()?;
    let id = match txn.open_table(USERNAMES)?.get(username_key(username).as_str())? {
        Some(guard) => guard.value(),
        None => return Ok(None),
    };
    Ok(get_record(&txn.open_table(USERS)?, id)?)
}

pub fn create(storage: &ClubStorage, data: UserCreate) -> RepoResult<User> {
    let password_hash = hash(&data.password)?;
    let key = username_key(&data.username);

    let txn = storage.begin_write()?;
    let user = {
        let mut names = txn.open_table(USERNAMES)?;
        if names.get(key.as_str())?.is_some() {
            return Err(RepoError::Duplicate(
                ErrorCode::UsernameExists,
                format!("Username {} is already taken", key),
            ));
        }
        let id = next_sequence(&txn, seq::USERS)?;
        let record = UserRecord {
            user: User {
                id,
                username: key.clone(),
                display_name: data.display_name.trim().to_string(),
                role: data.role,
                active: true,
                created_at: shared::util::now_millis(),
            },
            password_hash,
        };
        names.insert(key.as_str(), id)?;
        put_record(&mut txn.open_table(USERS)?, id, &record)?;
        record.user
    };
    txn.commit()?;

    tracing::info!(user_id = user.id, username = %user.username, role = %user.role, "User created");
    Ok(user)
}

pub fn update(storage: &ClubStorage, id: u64, data: UserUpdate) -> RepoResult<User> {
    modify(storage, id, |record| {
        if let Some(v) = data.display_name {
            record.user.display_name = v.trim().to_string();
        }
        if let Some(v) = data.role {
            record.user.role = v;
        }
        if let Some(v) = data.active {
            record.user.active = v;
        }
        Ok(())
    })
}

/// Replace a user's password
pub fn reset_password(storage: &ClubStorage, id: u64, new_password: &str) -> RepoResult<User> {
    let password_hash = hash(new_password)?;
    let user = modify(storage, id, |record| {
        record.password_hash = password_hash;
        Ok(())
    })?;
    tracing::info!(user_id = id, "Password reset");
    Ok(user)
}

/// Delete a user. Users cannot delete themselves.
pub fn delete(storage: &ClubStorage, id: u64, current_user_id: u64) -> RepoResult<()> {
    if id == current_user_id {
        return Err(RepoError::InvalidState(
            ErrorCode::UserCannotDeleteSelf,
            "You cannot delete your own account".to_string(),
        ));
    }
    let txn = storage.begin_write()?;
    {
        let mut users = txn.open_table(USERS)?;
        let record: UserRecord = get_record(&users, id)?.ok_or_else(|| not_found(id))?;
        users.remove(id)?;
        txn.open_table(USERNAMES)?
            .remove(record.user.username.as_str())?;
    }
    txn.commit()?;

    tracing::info!(user_id = id, "User deleted");
    Ok(())
}

/// Create the initial administrator when no user exists yet.
///
/// Returns whether a user was created.
pub fn seed_admin(storage: &ClubStorage, username: &str, password: &str) -> RepoResult<bool> {
    {
        let txn = storage.begin_read()?;
        if txn.open_table(USERS)?.first()?.is_some() {
            return Ok(false);
        }
    }
    create(
        storage,
        UserCreate {
            username: username.to_string(),
            display_name: "Administrador".to_string(),
            password: password.to_string(),
            role: Role::Admin,
        },
    )?;
    tracing::warn!(username = %username, "Seeded initial admin user; change its password");
    Ok(true)
}

fn modify(
    storage: &ClubStorage,
    id: u64,
    apply: impl FnOnce(&mut UserRecord) -> RepoResult<()>,
) -> RepoResult<User> {
    let txn = storage.begin_write()?;
    let user = {
        let mut users = txn.open_table(USERS)?;
        let mut record: UserRecord = get_record(&users, id)?.ok_or_else(|| not_found(id))?;
        apply(&mut record)?;
        put_record(&mut users, id, &record)?;
        record.user
    };
    txn.commit()?;
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operador(username: &str) -> UserCreate {
        UserCreate {
            username: username.to_string(),
            display_name: "Operador".to_string(),
            password: "clave123".to_string(),
            role: Role::Operador,
        }
    }

    #[test]
    fn test_seed_admin_only_once() {
        let storage = ClubStorage::open_in_memory().unwrap();
        assert!(seed_admin(&storage, "admin", "admin").unwrap());
        assert!(!seed_admin(&storage, "admin", "admin").unwrap());

        let record = find_by_username(&storage, "ADMIN").unwrap().unwrap();
        assert_eq!(record.user.role, Role::Admin);
        assert!(password::verify_password("admin", &record.password_hash));
    }

    #[test]
    fn test_username_is_unique_case_insensitive() {
        let storage = ClubStorage::open_in_memory().unwrap();
        create(&storage, operador("maria")).unwrap();
        let err = create(&storage, operador(" Maria ")).unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(ErrorCode::UsernameExists, _)));
    }

    #[test]
    fn test_password_reset() {
        let storage = ClubStorage::open_in_memory().unwrap();
        let user = create(&storage, operador("maria")).unwrap();
        reset_password(&storage, user.id, "nueva-clave").unwrap();

        let record = find_by_username(&storage, "maria").unwrap().unwrap();
        assert!(password::verify_password("nueva-clave", &record.password_hash));
        assert!(!password::verify_password("clave123", &record.password_hash));
    }

    #[test]
    fn test_cannot_delete_self() {
        let storage = ClubStorage::open_in_memory().unwrap();
        let user = create(&storage, operador("maria")).unwrap();
        let err = delete(&storage, user.id, user.id).unwrap_err();
        assert!(matches!(err, RepoError::InvalidState(ErrorCode::UserCannotDeleteSelf, _)));

        delete(&storage, user.id, 99).unwrap();
        assert!(find_by_username(&storage, "maria").unwrap().is_none());
        // Username is free again
        create(&storage, operador("maria")).unwrap();
    }

    #[test]
    fn test_hash_is_not_serialized_in_user() {
        let storage = ClubStorage::open_in_memory().unwrap();
        let user = create(&storage, operador("maria")).unwrap();
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
    }
}
