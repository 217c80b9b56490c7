//! Principal profiles. The identity provider owns authentication; the
//! engine stores the role and the active flag it enforces.

use dca_core::{Principal, Role, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// Stored record for an admin, manager, agent or viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub department: Option<String>,
    pub is_active: bool,
    pub last_login_at: Option<Timestamp>,
}

impl UserProfile {
    /// The engine-facing principal for this profile.
    pub fn principal(&self) -> Principal {
        Principal {
            id: self.id,
            role: self.role,
            is_active: self.is_active,
        }
    }

    /// Active and holding `role`.
    pub fn is_active_as(&self, role: Role) -> bool {
        self.is_active && self.role == role
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn principal_mirrors_profile() {
        let p = UserProfile {
            id: UserId::new(),
            email: "lead@agency.test".into(),
            full_name: "Team Lead".into(),
            role: Role::Manager,
            department: Some("Recovery".into()),
            is_active: false,
            last_login_at: None,
        };
        let principal = p.principal();
        assert_eq!(principal.id, p.id);
        assert_eq!(principal.role, Role::Manager);
        assert!(!principal.is_active);
        assert!(!p.is_active_as(Role::Manager));
    }
}
