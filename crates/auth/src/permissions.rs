use serde::{Deserialize, Serialize};

/// A protectable resource category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceObject {
    User,
    Country,
}

impl ResourceObject {
    pub const ALL: [ResourceObject; 2] = [ResourceObject::User, ResourceObject::Country];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceObject::User => "user",
            ResourceObject::Country => "country",
        }
    }
}

impl core::fmt::Display for ResourceObject {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation class subject to authorization.
///
/// All actions are "all" scoped: there is no row-level ownership here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    CreateAll,
    ViewAll,
    UpdateAll,
    DeleteAll,
}

impl Action {
    pub const ALL: [Action; 4] = [
        Action::CreateAll,
        Action::ViewAll,
        Action::UpdateAll,
        Action::DeleteAll,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::CreateAll => "create_all",
            Action::ViewAll => "view_all",
            Action::UpdateAll => "update_all",
            Action::DeleteAll => "delete_all",
        }
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome a policy rule grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    #[default]
    Allow,
    Deny,
}
