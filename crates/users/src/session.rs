//! Login and refresh-token exchange.
//!
//! Both paths end in [`SessionService::issue`]: sign an access token, mint a
//! fresh refresh token, and persist it with the login time. A token is only
//! returned once the new refresh value is stored.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::OnceCell;

use adminhub_auth::{
    PasswordHasher, RefreshTokenGenerator, TokenSigner, hash_password, verify_password,
};
use adminhub_core::{DomainError, DomainResult};
use adminhub_infra::{Changeset, Ctx, RepoError, Repository, Storage};

use crate::dto::Credentials;
use crate::user::{LAST_LOGIN, REFRESH_TOKEN, User, by_refresh_token, by_username};

const DECOY_PASSWORD: &str = "adminhub-decoy-password";

/// Access + refresh token pair returned to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthToken {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub refresh_token: String,
}

pub struct SessionService<S> {
    repo: Repository<User, S>,
    hasher: Arc<dyn PasswordHasher>,
    signer: Arc<dyn TokenSigner>,
    tokens: Arc<dyn RefreshTokenGenerator>,
    /// Hash checked for unknown usernames, made with `hasher` on first use.
    decoy_hash: Arc<OnceCell<String>>,
}

impl<S: Clone> Clone for SessionService<S> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            hasher: Arc::clone(&self.hasher),
            signer: Arc::clone(&self.signer),
            tokens: Arc::clone(&self.tokens),
            decoy_hash: Arc::clone(&self.decoy_hash),
        }
    }
}

impl<S: Storage> SessionService<S> {
    pub fn new(
        storage: S,
        hasher: Arc<dyn PasswordHasher>,
        signer: Arc<dyn TokenSigner>,
        tokens: Arc<dyn RefreshTokenGenerator>,
    ) -> Self {
        Self {
            repo: Repository::new(storage),
            hasher,
            signer,
            tokens,
            decoy_hash: Arc::new(OnceCell::new()),
        }
    }

    /// Verify credentials and issue a token pair.
    ///
    /// Unknown usernames and wrong passwords are indistinguishable to the
    /// caller, in outcome and in cost: both pay one password verification.
    /// The blocked check runs only after the password matched.
    pub async fn authenticate(&self, ctx: &Ctx, creds: Credentials) -> DomainResult<AuthToken> {
        let user = match self.repo.view(ctx, by_username(creds.username.trim())).await {
            Ok(user) => user,
            Err(RepoError::NotFound { .. }) => {
                self.verify_decoy(&creds.password).await?;
                return Err(DomainError::InvalidCredentials);
            }
            Err(e) => return Err(e.into_domain("Error logging in")),
        };

        let matches = verify_password(&self.hasher, &user.password, &creds.password)
            .await
            .map_err(|e| DomainError::internal("Error logging in", e))?;
        if !matches {
            tracing::warn!(target: "security", username = %user.username, "login rejected: bad password");
            return Err(DomainError::InvalidCredentials);
        }
        if user.blocked {
            tracing::warn!(target: "security", user_id = %user.id, "login rejected: user blocked");
            return Err(DomainError::UserBlocked);
        }

        self.issue(ctx, &user).await
    }

    /// Exchange a stored refresh token for a new pair, rotating the token.
    pub async fn refresh(&self, ctx: &Ctx, refresh_token: &str) -> DomainResult<AuthToken> {
        if refresh_token.is_empty() {
            return Err(DomainError::InvalidRefreshToken);
        }

        let user = match self.repo.view(ctx, by_refresh_token(refresh_token)).await {
            Ok(user) => user,
            Err(RepoError::NotFound { .. }) => return Err(DomainError::InvalidRefreshToken),
            Err(e) => return Err(e.into_domain("Error refreshing token")),
        };
        if user.blocked {
            return Err(DomainError::UserBlocked);
        }

        self.issue(ctx, &user).await
    }

    async fn verify_decoy(&self, plain: &str) -> DomainResult<()> {
        let decoy = self
            .decoy_hash
            .get_or_try_init(|| hash_password(&self.hasher, DECOY_PASSWORD))
            .await
            .map_err(|e| DomainError::internal("Error logging in", e))?;
        verify_password(&self.hasher, decoy, plain)
            .await
            .map_err(|e| DomainError::internal("Error logging in", e))?;
        Ok(())
    }

    async fn issue(&self, ctx: &Ctx, user: &User) -> DomainResult<AuthToken> {
        let signed = self
            .signer
            .sign(&user.auth_user())
            .map_err(|e| DomainError::internal("Error generating token", e))?;
        let refresh_token = self.tokens.generate();

        let changes = Changeset::new()
            .set(&REFRESH_TOKEN, refresh_token.as_str())
            .set(&LAST_LOGIN, Utc::now());
        self.repo
            .update(ctx, user.id, changes)
            .await
            .map_err(|e| e.into_domain("Error updating user"))?;

        tracing::info!(user_id = %user.id, "session issued");
        Ok(AuthToken {
            access_token: signed.token,
            token_type: "bearer",
            expires_in: signed.expires_in,
            refresh_token,
        })
    }
}
