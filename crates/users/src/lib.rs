//! `adminhub-users`: user accounts and sessions.
//!
//! The `User` entity and its schema, authorization-gated management
//! (`UserService`), login/refresh (`SessionService`) and request DTOs.

pub mod dto;
pub mod seed;
pub mod service;
pub mod session;
pub mod user;

pub use dto::{
    CreateUserRequest, Credentials, NewUser, PasswordChange, PasswordChangeRequest,
    RefreshTokenRequest, UpdateUserRequest, UserUpdate,
};
pub use seed::{SUPERADMIN_USERNAME, seed_superadmin};
pub use service::UserService;
pub use session::{AuthToken, SessionService};
pub use user::{USER_SCHEMA, User};
