//! Authorization-gated user management.

use std::sync::Arc;

use chrono::Utc;

use adminhub_auth::{
    Action, AuthUser, PasswordHasher, PolicyEngine, ResourceObject, authorize, hash_password,
    verify_password,
};
use adminhub_core::{DomainError, DomainResult, EntityId};
use adminhub_infra::{Changeset, Ctx, ListQuery, Page, RepoError, Repository, Storage};

use crate::dto::{NewUser, PasswordChange, UserUpdate};
use crate::user::{PASSWORD, User, by_username};

/// User CRUD plus the caller's self-service operations.
///
/// Every non-self operation checks the policy before touching storage.
pub struct UserService<S> {
    repo: Repository<User, S>,
    policy: Arc<PolicyEngine>,
    hasher: Arc<dyn PasswordHasher>,
}

impl<S: Clone> Clone for UserService<S> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            policy: Arc::clone(&self.policy),
            hasher: Arc::clone(&self.hasher),
        }
    }
}

impl<S: Storage> UserService<S> {
    pub fn new(storage: S, policy: Arc<PolicyEngine>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self {
            repo: Repository::new(storage),
            policy,
            hasher,
        }
    }

    fn gate(&self, caller: &AuthUser, action: Action) -> DomainResult<()> {
        authorize(&self.policy, caller, ResourceObject::User, action)?;
        Ok(())
    }

    pub async fn create(&self, ctx: &Ctx, caller: &AuthUser, req: NewUser) -> DomainResult<User> {
        self.gate(caller, Action::CreateAll)?;

        let taken = self
            .repo
            .exist(ctx, by_username(&req.username))
            .await
            .map_err(|e| e.into_domain("Error creating user"))?;
        if taken {
            return Err(DomainError::conflict("Username already existed"));
        }

        let password = hash_password(&self.hasher, &req.password)
            .await
            .map_err(|e| DomainError::internal("Error creating user", e))?;
        let now = Utc::now();
        let user = User {
            id: EntityId::UNASSIGNED,
            first_name: req.first_name,
            last_name: req.last_name,
            username: req.username,
            password,
            email: req.email,
            mobile: req.mobile,
            role: req.role,
            blocked: req.blocked,
            refresh_token: None,
            last_login: None,
            created_at: now,
            updated_at: now,
        };

        let created = self.repo.create(ctx, &user).await.map_err(|e| match e {
            // Lost a race with a concurrent create of the same username.
            RepoError::Conflict { .. } => DomainError::conflict("Username already existed"),
            other => other.into_domain("Error creating user"),
        })?;
        tracing::info!(user_id = %created.id, username = %created.username, "user created");
        Ok(created)
    }

    pub async fn view(&self, ctx: &Ctx, caller: &AuthUser, id: EntityId) -> DomainResult<User> {
        self.gate(caller, Action::ViewAll)?;
        self.repo
            .view(ctx, id)
            .await
            .map_err(|e| e.into_domain("Error viewing user"))
    }

    pub async fn list(
        &self,
        ctx: &Ctx,
        caller: &AuthUser,
        query: &ListQuery,
    ) -> DomainResult<Page<User>> {
        self.gate(caller, Action::ViewAll)?;
        self.repo
            .list(ctx, query)
            .await
            .map_err(|e| e.into_domain("Error listing user"))
    }

    /// Apply the present fields, then return the stored user.
    pub async fn update(
        &self,
        ctx: &Ctx,
        caller: &AuthUser,
        id: EntityId,
        update: UserUpdate,
    ) -> DomainResult<User> {
        self.gate(caller, Action::UpdateAll)?;
        self.repo
            .update(ctx, id, update.changeset())
            .await
            .map_err(|e| e.into_domain("Error updating user"))?;
        self.repo
            .view(ctx, id)
            .await
            .map_err(|e| e.into_domain("Error updating user"))
    }

    pub async fn delete(&self, ctx: &Ctx, caller: &AuthUser, id: EntityId) -> DomainResult<()> {
        self.gate(caller, Action::DeleteAll)?;
        let found = self
            .repo
            .exist(ctx, id)
            .await
            .map_err(|e| e.into_domain("Error deleting user"))?;
        if !found {
            return Err(DomainError::not_found("User not found"));
        }
        self.repo
            .delete(ctx, id)
            .await
            .map_err(|e| e.into_domain("Error deleting user"))?;
        tracing::info!(user_id = %id, deleted_by = %caller.id, "user deleted");
        Ok(())
    }

    /// The caller's own record. The id comes from the session only.
    pub async fn me(&self, ctx: &Ctx, caller: &AuthUser) -> DomainResult<User> {
        self.repo
            .view(ctx, caller.id)
            .await
            .map_err(|e| e.into_domain("Error viewing user"))
    }

    /// Replace the caller's password after checking the current one.
    pub async fn change_password(
        &self,
        ctx: &Ctx,
        caller: &AuthUser,
        change: PasswordChange,
    ) -> DomainResult<()> {
        let user = self.me(ctx, caller).await?;
        let matches = verify_password(&self.hasher, &user.password, &change.old_password)
            .await
            .map_err(|e| DomainError::internal("Error changing password", e))?;
        if !matches {
            return Err(DomainError::IncorrectPassword);
        }

        let hash = hash_password(&self.hasher, &change.new_password)
            .await
            .map_err(|e| DomainError::internal("Error changing password", e))?;
        self.repo
            .update(ctx, user.id, Changeset::new().set(&PASSWORD, hash))
            .await
            .map_err(|e| e.into_domain("Error changing password"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use adminhub_auth::{Argon2Hasher, Role};
    use adminhub_infra::{FaultyStorage, InMemoryStorage, StorageOp};
    use adminhub_infra::query::Pagination;

    type Svc = UserService<Arc<InMemoryStorage>>;

    fn service() -> Svc {
        let storage = Arc::new(InMemoryStorage::new());
        let policy = Arc::new(PolicyEngine::with_default_rules(true).unwrap());
        let hasher: Arc<dyn PasswordHasher> = Arc::new(Argon2Hasher::with_cost(8, 1, 1).unwrap());
        UserService::new(storage, policy, hasher)
    }

    fn caller(role: Role) -> AuthUser {
        AuthUser {
            id: EntityId::new(1),
            username: "root".into(),
            email: "root@example.com".into(),
            role,
        }
    }

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.into(),
            password: "password123".into(),
            first_name: "Test".into(),
            last_name: "User".into(),
            email: format!("{username}@example.com"),
            mobile: "+84912345678".into(),
            role: Role::User,
            blocked: false,
        }
    }

    #[tokio::test]
    async fn superadmin_creates_and_password_is_hashed() {
        let svc = service();
        let ctx = Ctx::background();
        let user = svc
            .create(&ctx, &caller(Role::SuperAdmin), new_user("alice"))
            .await
            .unwrap();

        assert!(user.id.is_assigned());
        assert_ne!(user.password, "password123");
        assert!(user.password.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn duplicate_username_is_a_conflict() {
        let svc = service();
        let ctx = Ctx::background();
        let root = caller(Role::SuperAdmin);
        svc.create(&ctx, &root, new_user("alice")).await.unwrap();

        let err = svc.create(&ctx, &root, new_user("alice")).await.unwrap_err();
        assert_eq!(err, DomainError::conflict("Username already existed"));
    }

    #[tokio::test]
    async fn forbidden_caller_never_reaches_storage() {
        let svc = service();
        let ctx = Ctx::background();

        let err = svc
            .create(&ctx, &caller(Role::Admin), new_user("alice"))
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::Forbidden);
        let all = svc
            .list(&ctx, &caller(Role::SuperAdmin), &ListQuery::new())
            .await
            .unwrap();
        assert_eq!(all.total_count, 0);

        let err = svc
            .list(&ctx, &caller(Role::User), &ListQuery::new())
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::Forbidden);
    }

    #[tokio::test]
    async fn admin_may_list_but_not_delete() {
        let svc = service();
        let ctx = Ctx::background();
        let root = caller(Role::SuperAdmin);
        for name in ["alice", "bob", "carol"] {
            svc.create(&ctx, &root, new_user(name)).await.unwrap();
        }

        let admin = caller(Role::Admin);
        let query = ListQuery::new().paginate(Pagination::new(Some(2), None));
        let page = svc.list(&ctx, &admin, &query).await.unwrap();
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.total_count, 3);

        let err = svc.delete(&ctx, &admin, page.records[0].id).await.unwrap_err();
        assert_eq!(err, DomainError::Forbidden);
    }

    #[tokio::test]
    async fn update_leaves_absent_fields_untouched() {
        let svc = service();
        let ctx = Ctx::background();
        let root = caller(Role::SuperAdmin);
        let alice = svc.create(&ctx, &root, new_user("alice")).await.unwrap();

        let update = UserUpdate {
            last_name: Some("Liddell".into()),
            blocked: Some(true),
            ..Default::default()
        };
        let after = svc.update(&ctx, &root, alice.id, update).await.unwrap();

        assert_eq!(after.last_name, "Liddell");
        assert!(after.blocked);
        assert_eq!(after.first_name, alice.first_name);
        assert_eq!(after.email, alice.email);
        assert_eq!(after.mobile, alice.mobile);
        assert_eq!(after.password, alice.password);
    }

    #[tokio::test]
    async fn delete_twice_is_not_found() {
        let svc = service();
        let ctx = Ctx::background();
        let root = caller(Role::SuperAdmin);
        let alice = svc.create(&ctx, &root, new_user("alice")).await.unwrap();

        svc.delete(&ctx, &root, alice.id).await.unwrap();
        let err = svc.delete(&ctx, &root, alice.id).await.unwrap_err();
        assert_eq!(err, DomainError::not_found("User not found"));
    }

    #[tokio::test]
    async fn change_password_checks_the_old_one() {
        let svc = service();
        let ctx = Ctx::background();
        let root = caller(Role::SuperAdmin);
        let alice = svc.create(&ctx, &root, new_user("alice")).await.unwrap();
        let me = alice.auth_user();

        let wrong = PasswordChange {
            old_password: "not-my-password".into(),
            new_password: "brand-new-pass".into(),
        };
        assert_eq!(
            svc.change_password(&ctx, &me, wrong).await,
            Err(DomainError::IncorrectPassword)
        );
        assert_eq!(svc.me(&ctx, &me).await.unwrap().password, alice.password);

        let right = PasswordChange {
            old_password: "password123".into(),
            new_password: "brand-new-pass".into(),
        };
        svc.change_password(&ctx, &me, right).await.unwrap();
        assert_ne!(svc.me(&ctx, &me).await.unwrap().password, alice.password);
    }

    #[tokio::test]
    async fn delete_surfaces_a_failing_existence_check() {
        let storage = Arc::new(FaultyStorage::new(InMemoryStorage::new()));
        let policy = Arc::new(PolicyEngine::with_default_rules(true).unwrap());
        let hasher: Arc<dyn PasswordHasher> = Arc::new(Argon2Hasher::with_cost(8, 1, 1).unwrap());
        let svc = UserService::new(Arc::clone(&storage), policy, hasher);
        let ctx = Ctx::background();
        let root = caller(Role::SuperAdmin);
        let alice = svc.create(&ctx, &root, new_user("alice")).await.unwrap();

        storage.fail(StorageOp::Count);
        let err = svc.delete(&ctx, &root, alice.id).await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::Internal { ref context, .. } if context == "Error deleting user"
        ));

        storage.heal(StorageOp::Count);
        assert_eq!(svc.view(&ctx, &root, alice.id).await.unwrap().id, alice.id);
    }
}
