//! Role → resource → action policy enforcement.
//!
//! The rule set is loaded once at startup and never mutated afterwards; share
//! the engine behind an `Arc` and call [`PolicyEngine::enforce`] freely from
//! concurrent requests.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use adminhub_core::DomainError;

use crate::{Action, AuthUser, Effect, ResourceObject, Role};

/// A single policy rule: `(role, object, action) -> effect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyRule {
    pub role: Role,
    pub object: ResourceObject,
    pub action: Action,
    #[serde(default)]
    pub effect: Effect,
}

impl PolicyRule {
    pub fn allow(role: Role, object: ResourceObject, action: Action) -> Self {
        Self {
            role,
            object,
            action,
            effect: Effect::Allow,
        }
    }

    pub fn deny(role: Role, object: ResourceObject, action: Action) -> Self {
        Self {
            role,
            object,
            action,
            effect: Effect::Deny,
        }
    }

    fn key(&self) -> (Role, ResourceObject, Action) {
        (self.role, self.object, self.action)
    }
}

/// Shape of a policy file (`[[rules]]` tables).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyFile {
    #[serde(default)]
    pub rules: Vec<PolicyRule>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("duplicate policy rule: {role} {object} {action}")]
    Duplicate {
        role: Role,
        object: ResourceObject,
        action: Action,
    },

    #[error("contradictory policy rules (allow and deny): {role} {object} {action}")]
    Contradictory {
        role: Role,
        object: ResourceObject,
        action: Action,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: {role} may not {action} on {object}")]
    Forbidden {
        role: Role,
        object: ResourceObject,
        action: Action,
    },
}

impl From<AuthzError> for DomainError {
    fn from(_: AuthzError) -> Self {
        DomainError::Forbidden
    }
}

/// Immutable policy rule set.
///
/// In strict mode (enabled by the debug flag) duplicate or contradictory rules
/// abort construction. Otherwise a `deny` rule for a triple always overrides an
/// `allow` for the same triple, regardless of order.
#[derive(Debug, Clone)]
pub struct PolicyEngine {
    rules: Vec<PolicyRule>,
    decisions: HashMap<(Role, ResourceObject, Action), Effect>,
}

impl PolicyEngine {
    pub fn new(rules: Vec<PolicyRule>, strict: bool) -> Result<Self, PolicyError> {
        let mut decisions: HashMap<(Role, ResourceObject, Action), Effect> = HashMap::new();

        for rule in &rules {
            let key = rule.key();
            match decisions.get(&key).copied() {
                None => {
                    decisions.insert(key, rule.effect);
                }
                Some(existing) if strict => {
                    let (role, object, action) = key;
                    return Err(if existing == rule.effect {
                        PolicyError::Duplicate { role, object, action }
                    } else {
                        PolicyError::Contradictory { role, object, action }
                    });
                }
                Some(_) => {
                    if rule.effect == Effect::Deny {
                        decisions.insert(key, Effect::Deny);
                    }
                }
            }
        }

        Ok(Self { rules, decisions })
    }

    /// Engine built from [`default_rules`].
    pub fn with_default_rules(strict: bool) -> Result<Self, PolicyError> {
        Self::new(default_rules(), strict)
    }

    /// `true` only when a rule explicitly allows the triple (default deny).
    pub fn enforce(&self, role: Role, object: ResourceObject, action: Action) -> bool {
        matches!(
            self.decisions.get(&(role, object, action)),
            Some(Effect::Allow)
        )
    }

    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }

    /// Explain why a decision was made.
    pub fn explain(&self, role: Role, object: ResourceObject, action: Action) -> AuthorizationExplanation {
        let matched: Vec<PolicyRule> = self
            .rules
            .iter()
            .filter(|r| r.key() == (role, object, action))
            .copied()
            .collect();
        let granted = self.enforce(role, object, action);

        let reason = if matched.is_empty() {
            format!("no rule grants '{action}' on '{object}' to role '{role}' (default deny)")
        } else if granted {
            format!("role '{role}' is allowed '{action}' on '{object}'")
        } else {
            format!("a deny rule for role '{role}' covers '{action}' on '{object}'")
        };

        AuthorizationExplanation {
            role,
            object,
            action,
            granted,
            reason,
            matched_rules: matched,
        }
    }
}

/// Detailed explanation of an authorization decision.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub role: Role,
    pub object: ResourceObject,
    pub action: Action,
    pub granted: bool,
    pub reason: String,
    pub matched_rules: Vec<PolicyRule>,
}

/// Built-in rule set.
///
/// - `superadmin`: everything on users and countries
/// - `admin`: view users, everything on countries
/// - `user`: view countries
pub fn default_rules() -> Vec<PolicyRule> {
    let mut rules = Vec::new();
    for object in ResourceObject::ALL {
        for action in Action::ALL {
            rules.push(PolicyRule::allow(Role::SuperAdmin, object, action));
        }
    }
    rules.push(PolicyRule::allow(Role::Admin, ResourceObject::User, Action::ViewAll));
    for action in Action::ALL {
        rules.push(PolicyRule::allow(Role::Admin, ResourceObject::Country, action));
    }
    rules.push(PolicyRule::allow(Role::User, ResourceObject::Country, Action::ViewAll));
    rules
}

/// Gate an operation for the authenticated caller.
///
/// - No IO
/// - Denials are logged on the `security` target
pub fn authorize(
    policy: &PolicyEngine,
    caller: &AuthUser,
    object: ResourceObject,
    action: Action,
) -> Result<(), AuthzError> {
    if policy.enforce(caller.role, object, action) {
        return Ok(());
    }

    tracing::warn!(
        target: "security",
        user_id = %caller.id,
        role = %caller.role,
        object = %object,
        action = %action,
        "forbidden action"
    );
    Err(AuthzError::Forbidden {
        role: caller.role,
        object,
        action,
    })
}
