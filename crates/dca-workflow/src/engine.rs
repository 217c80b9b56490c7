//! # Case Engine
//!
//! [`CaseEngine`] is the facade every caller goes through. Each concern
//! lives in its own module as an `impl` block on this type:
//!
//! | Module        | Operations                                         |
//! |---------------|----------------------------------------------------|
//! | `lifecycle`   | `transition`, `get_case`                           |
//! | `assignment`  | `allocate`, `assign`                               |
//! | `payment`     | `apply_payment`                                    |
//! | `compliance`  | `record_action`, `compliance_rate`, violations     |
//! | `allocation`  | allocation rules, `auto_allocate`                  |
//! | `intake`      | debtors, `create_case`, `import_rows`              |
//! | `worklist`    | `list_cases`, `worklist_summary`                   |
//!
//! Every operation re-reads the case from the store before validating and
//! commits with the version it read, so a concurrent writer makes it fail
//! with `ConcurrentModification` instead of acting on stale state.

use std::sync::Arc;

use dca_core::{CaseId, Clock, Principal, Role, Timestamp, UserId};
use dca_state::{Case, UserProfile};

use crate::error::WorkflowError;
use crate::policy::PolicyConfig;
use crate::store::CaseStore;

/// Facade over the workflow engines.
pub struct CaseEngine<S: CaseStore> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    policy: PolicyConfig,
}

impl<S: CaseStore> Clone for CaseEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            policy: self.policy.clone(),
        }
    }
}

impl<S: CaseStore> std::fmt::Debug for CaseEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaseEngine")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl<S: CaseStore> CaseEngine<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, policy: PolicyConfig) -> Self {
        Self {
            store,
            clock,
            policy,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    pub(crate) fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub(crate) fn load_case(&self, id: CaseId) -> Result<Case, WorkflowError> {
        self.store
            .case(id)?
            .ok_or_else(|| WorkflowError::not_found("case", id))
    }

    pub(crate) fn load_profile(
        &self,
        kind: &'static str,
        id: UserId,
    ) -> Result<UserProfile, WorkflowError> {
        self.store
            .profile(id)?
            .ok_or_else(|| WorkflowError::not_found(kind, id))
    }

    /// Resolve the principal for `id` from its stored profile.
    /// Unknown users come back inactive, so every operation refuses them.
    pub fn principal_for(&self, id: UserId, role: Role) -> Result<Principal, WorkflowError> {
        let is_active = self
            .store
            .profile(id)?
            .is_some_and(|p| p.is_active && p.role == role);
        Ok(Principal { id, role, is_active })
    }

    /// Create or replace a profile. ADMIN only.
    pub fn put_profile(
        &self,
        profile: UserProfile,
        actor: &Principal,
    ) -> Result<UserProfile, WorkflowError> {
        require_roles(actor, &[Role::Admin])?;
        dca_core::error::require_non_empty("email", &profile.email)?;
        dca_core::error::require_non_empty("full_name", &profile.full_name)?;
        let saved = self.store.put_profile(profile)?;
        tracing::info!(user = %saved.id, role = %saved.role, active = saved.is_active, "profile saved");
        Ok(saved)
    }
}

// ── Access checks ───────────────────────────────────────────────────

/// Refuse inactive principals.
pub(crate) fn require_active(actor: &Principal) -> Result<(), WorkflowError> {
    if actor.is_active {
        Ok(())
    } else {
        Err(WorkflowError::Unauthorized(format!("{} is inactive", actor.id)))
    }
}

/// Refuse inactive principals and viewers.
pub(crate) fn require_writer(actor: &Principal) -> Result<(), WorkflowError> {
    require_active(actor)?;
    if actor.role.can_write() {
        Ok(())
    } else {
        Err(WorkflowError::Unauthorized(format!(
            "{} is read-only",
            actor.role
        )))
    }
}

/// Refuse inactive principals and any role outside `allowed`.
pub(crate) fn require_roles(actor: &Principal, allowed: &[Role]) -> Result<(), WorkflowError> {
    require_active(actor)?;
    if allowed.contains(&actor.role) {
        Ok(())
    } else {
        Err(WorkflowError::Unauthorized(format!(
            "{} may not perform this operation",
            actor.role
        )))
    }
}

/// Whether `actor` may see `case` at all.
///
/// ADMIN and VIEWER see everything; a MANAGER sees their own portfolio
/// plus unallocated PENDING cases; an AGENT sees cases assigned to them.
pub fn can_view(actor: &Principal, case: &Case) -> bool {
    match actor.role {
        Role::Admin | Role::Viewer => true,
        Role::Manager => {
            case.assigned_manager_id == Some(actor.id) || case.assigned_manager_id.is_none()
        }
        Role::Agent => case.assigned_agent_id == Some(actor.id),
    }
}

/// Whether `actor` may change `case`.
///
/// Stricter than [`can_view`]: a MANAGER must own the case.
pub fn can_modify(actor: &Principal, case: &Case) -> bool {
    match actor.role {
        Role::Admin => true,
        Role::Viewer => false,
        Role::Manager => case.assigned_manager_id == Some(actor.id),
        Role::Agent => case.assigned_agent_id == Some(actor.id),
    }
}

pub(crate) fn require_visible(actor: &Principal, case: &Case) -> Result<(), WorkflowError> {
    require_active(actor)?;
    if can_view(actor, case) {
        Ok(())
    } else {
        Err(WorkflowError::Unauthorized(format!(
            "{} is outside the caller's scope",
            case.id
        )))
    }
}

pub(crate) fn require_modifiable(actor: &Principal, case: &Case) -> Result<(), WorkflowError> {
    require_active(actor)?;
    if can_modify(actor, case) {
        Ok(())
    } else {
        Err(WorkflowError::Unauthorized(format!(
            "{} is outside the caller's scope",
            case.id
        )))
    }
}
