//! Authorization-gated country management.

use std::sync::Arc;

use chrono::Utc;

use adminhub_auth::{Action, AuthUser, PolicyEngine, ResourceObject, authorize};
use adminhub_core::{DomainError, DomainResult, EntityId};
use adminhub_infra::{Ctx, ListQuery, Page, RepoError, Repository, Storage};

use crate::country::{Country, name_taken};
use crate::dto::{CountryUpdate, NewCountry};

const NAME_EXISTS: &str = "Country name already exists";
const NOT_FOUND: &str = "Country not found";

pub struct CountryService<S> {
    repo: Repository<Country, S>,
    policy: Arc<PolicyEngine>,
}

impl<S: Clone> Clone for CountryService<S> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            policy: Arc::clone(&self.policy),
        }
    }
}

/// Unique-name violations from storage surface with the same message as the
/// pre-check.
fn name_conflict(context: &'static str) -> impl Fn(RepoError) -> DomainError {
    move |err| match err {
        RepoError::Conflict { .. } => DomainError::conflict(NAME_EXISTS),
        other => other.into_domain(context),
    }
}

impl<S: Storage> CountryService<S> {
    pub fn new(storage: S, policy: Arc<PolicyEngine>) -> Self {
        Self {
            repo: Repository::new(storage),
            policy,
        }
    }

    fn gate(&self, caller: &AuthUser, action: Action) -> DomainResult<()> {
        authorize(&self.policy, caller, ResourceObject::Country, action)?;
        Ok(())
    }

    pub async fn create(
        &self,
        ctx: &Ctx,
        caller: &AuthUser,
        req: NewCountry,
    ) -> DomainResult<Country> {
        self.gate(caller, Action::CreateAll)?;

        let taken = self
            .repo
            .exist(ctx, name_taken(&req.name, None))
            .await
            .map_err(|e| e.into_domain("Error creating country"))?;
        if taken {
            return Err(DomainError::conflict(NAME_EXISTS));
        }

        let now = Utc::now();
        let country = Country {
            id: EntityId::UNASSIGNED,
            name: req.name,
            code: req.code,
            phone_code: req.phone_code,
            created_at: now,
            updated_at: now,
        };
        self.repo
            .create(ctx, &country)
            .await
            .map_err(name_conflict("Error creating country"))
    }

    pub async fn view(&self, ctx: &Ctx, caller: &AuthUser, id: EntityId) -> DomainResult<Country> {
        self.gate(caller, Action::ViewAll)?;
        self.repo
            .view(ctx, id)
            .await
            .map_err(|e| e.into_domain("Error viewing country"))
    }

    pub async fn list(
        &self,
        ctx: &Ctx,
        caller: &AuthUser,
        query: &ListQuery,
    ) -> DomainResult<Page<Country>> {
        self.gate(caller, Action::ViewAll)?;
        self.repo
            .list(ctx, query)
            .await
            .map_err(|e| e.into_domain("Error listing country"))
    }

    /// Renaming to a name held by another country is a conflict; keeping the
    /// record's own name is not.
    pub async fn update(
        &self,
        ctx: &Ctx,
        caller: &AuthUser,
        id: EntityId,
        update: CountryUpdate,
    ) -> DomainResult<Country> {
        self.gate(caller, Action::UpdateAll)?;

        if let Some(name) = update.name.as_deref() {
            let taken = self
                .repo
                .exist(ctx, name_taken(name, Some(id)))
                .await
                .map_err(|e| e.into_domain("Error updating country"))?;
            if taken {
                return Err(DomainError::conflict(NAME_EXISTS));
            }
        }

        self.repo
            .update(ctx, id, update.changeset())
            .await
            .map_err(name_conflict("Error updating country"))?;
        self.repo
            .view(ctx, id)
            .await
            .map_err(|e| e.into_domain("Error updating country"))
    }

    pub async fn delete(&self, ctx: &Ctx, caller: &AuthUser, id: EntityId) -> DomainResult<()> {
        self.gate(caller, Action::DeleteAll)?;
        let found = self
            .repo
            .exist(ctx, id)
            .await
            .map_err(|e| e.into_domain("Error deleting country"))?;
        if !found {
            return Err(DomainError::not_found(NOT_FOUND));
        }
        self.repo
            .delete(ctx, id)
            .await
            .map_err(|e| e.into_domain("Error deleting country"))
    }
}
