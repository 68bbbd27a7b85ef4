use chrono::Utc;

use adminhub_auth::{PasswordHasher, Role};
use adminhub_core::{DomainError, DomainResult, EntityId};
use adminhub_infra::{Ctx, Repository, Storage};

use crate::user::{User, by_username};

pub const SUPERADMIN_USERNAME: &str = "superadmin";

/// Create the initial `superadmin` account unless it already exists.
///
/// Returns `true` when a row was inserted.
pub async fn seed_superadmin<S: Storage>(
    ctx: &Ctx,
    storage: S,
    hasher: &dyn PasswordHasher,
    password: &str,
) -> DomainResult<bool> {
    if password.chars().count() < crate::dto::MIN_PASSWORD_LEN {
        return Err(DomainError::validation(
            "superadmin_password",
            "superadmin password is too short",
        ));
    }

    let repo: Repository<User, S> = Repository::new(storage);
    let exists = repo
        .exist(ctx, by_username(SUPERADMIN_USERNAME))
        .await
        .map_err(|e| e.into_domain("Error seeding superadmin"))?;
    if exists {
        tracing::info!("superadmin already present");
        return Ok(false);
    }

    let now = Utc::now();
    let user = User {
        id: EntityId::UNASSIGNED,
        first_name: "Super".into(),
        last_name: "Admin".into(),
        username: SUPERADMIN_USERNAME.into(),
        password: hasher
            .hash(password)
            .map_err(|e| DomainError::internal("Error seeding superadmin", e))?,
        email: "superadmin@example.com".into(),
        mobile: "+10000000000".into(),
        role: Role::SuperAdmin,
        blocked: false,
        refresh_token: None,
        last_login: None,
        created_at: now,
        updated_at: now,
    };
    repo.create(ctx, &user)
        .await
        .map_err(|e| e.into_domain("Error seeding superadmin"))?;
    tracing::info!("superadmin created");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use adminhub_auth::Argon2Hasher;
    use adminhub_infra::InMemoryStorage;

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let storage = Arc::new(InMemoryStorage::new());
        let hasher = Argon2Hasher::with_cost(8, 1, 1).unwrap();
        let ctx = Ctx::background();

        assert!(seed_superadmin(&ctx, Arc::clone(&storage), &hasher, "superadmin123!").await.unwrap());
        assert!(!seed_superadmin(&ctx, Arc::clone(&storage), &hasher, "superadmin123!").await.unwrap());

        let repo: Repository<User, _> = Repository::new(storage);
        let root = repo.view(&ctx, by_username(SUPERADMIN_USERNAME)).await.unwrap();
        assert_eq!(root.role, Role::SuperAdmin);
        assert!(hasher.verify(&root.password, "superadmin123!"));
    }

    #[tokio::test]
    async fn short_password_is_rejected() {
        let storage = Arc::new(InMemoryStorage::new());
        let hasher = Argon2Hasher::with_cost(8, 1, 1).unwrap();
        let err = seed_superadmin(&Ctx::background(), storage, &hasher, "short")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
    }
}
