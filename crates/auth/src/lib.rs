//! `adminhub-auth`: authentication/authorization boundary.
//!
//! Policy enforcement, access-token signing and password hashing. This crate is
//! decoupled from HTTP and storage.

pub mod authorize;
pub mod claims;
pub mod password;
pub mod permissions;
pub mod principal;
pub mod roles;
pub mod token;

pub use authorize::{
    AuthorizationExplanation, AuthzError, PolicyEngine, PolicyError, PolicyFile, PolicyRule,
    authorize, default_rules,
};
pub use claims::{AccessClaims, TokenValidationError, validate_claims};
pub use password::{
    Argon2Hasher, PasswordError, PasswordHasher, hash_password, verify_password,
};
pub use permissions::{Action, Effect, ResourceObject};
pub use principal::AuthUser;
pub use roles::{InvalidRole, Role};
pub use token::{
    JwtSigner, RefreshTokenGenerator, SignedToken, TokenError, TokenSigner, UuidTokenGenerator,
};
