//! # Worklists
//!
//! Filtered, role-scoped case listings and the per-caller summary
//! counters shown at the top of a worklist.

use dca_core::{Principal, Priority, Role, Timestamp, UserId};
use dca_state::{Case, CaseStatus};
use serde::{Deserialize, Serialize};

use crate::engine::{can_view, require_active, CaseEngine};
use crate::error::WorkflowError;
use crate::store::CaseStore;

/// Filters for [`CaseEngine::list_cases`]. Empty vectors match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaseQuery {
    pub agent_id: Option<UserId>,
    pub manager_id: Option<UserId>,
    pub statuses: Vec<CaseStatus>,
    pub priorities: Vec<Priority>,
    pub sla_due_before: Option<Timestamp>,
    /// Only HIGH and CRITICAL.
    pub high_priority_only: bool,
    pub limit: Option<usize>,
}

impl CaseQuery {
    fn matches(&self, case: &Case) -> bool {
        self.agent_id.map_or(true, |a| case.assigned_agent_id == Some(a))
            && self.manager_id.map_or(true, |m| case.assigned_manager_id == Some(m))
            && (self.statuses.is_empty() || self.statuses.contains(&case.status))
            && (self.priorities.is_empty() || self.priorities.contains(&case.priority))
            && self
                .sla_due_before
                .map_or(true, |cutoff| case.sla_due_date.is_some_and(|due| due < cutoff))
            && (!self.high_priority_only || case.priority.is_high())
    }
}

/// Counters over the caller's scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorklistSummary {
    pub total: usize,
    pub high_priority: usize,
    /// Unsettled cases whose SLA falls on today's UTC date.
    pub due_today: usize,
    pub sla_breached: usize,
}

/// Priority descending, then SLA ascending with undated cases last,
/// then oldest first.
fn worklist_order(a: &Case, b: &Case) -> std::cmp::Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| match (a.sla_due_date, b.sla_due_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        })
        .then_with(|| a.created_at.cmp(&b.created_at))
}

impl<S: CaseStore> CaseEngine<S> {
    /// Cases matching `query` within the caller's scope, in worklist order.
    ///
    /// An AGENT is pinned to their own cases. A MANAGER sees their own
    /// portfolio plus the unallocated queue. Naming another user in the
    /// query is refused.
    pub fn list_cases(
        &self,
        mut query: CaseQuery,
        actor: &Principal,
    ) -> Result<Vec<Case>, WorkflowError> {
        require_active(actor)?;
        match actor.role {
            Role::Agent => {
                pin(&mut query.agent_id, actor)?;
            }
            Role::Manager => {
                refuse_other(query.manager_id, actor)?;
            }
            Role::Admin | Role::Viewer => {}
        }

        let mut cases: Vec<_> = self
            .store()
            .cases()?
            .into_iter()
            .filter(|c| can_view(actor, c) && query.matches(c))
            .collect();
        cases.sort_by(worklist_order);
        if let Some(limit) = query.limit {
            cases.truncate(limit);
        }
        tracing::debug!(role = %actor.role, returned = cases.len(), "worklist queried");
        Ok(cases)
    }

    /// Summary counters over everything [`CaseEngine::list_cases`] would
    /// return for an unfiltered query.
    pub fn worklist_summary(&self, actor: &Principal) -> Result<WorklistSummary, WorkflowError> {
        let cases = self.list_cases(CaseQuery::default(), actor)?;
        let now = self.now();
        let today = now.date();
        Ok(cases.iter().fold(WorklistSummary::default(), |mut s, c| {
            s.total += 1;
            if c.priority.is_high() {
                s.high_priority += 1;
            }
            if !c.status.is_settled() && c.sla_due_date.is_some_and(|due| due.date() == today) {
                s.due_today += 1;
            }
            if c.is_sla_breached(now) {
                s.sla_breached += 1;
            }
            s
        }))
    }
}

fn pin(slot: &mut Option<UserId>, actor: &Principal) -> Result<(), WorkflowError> {
    refuse_other(*slot, actor)?;
    *slot = Some(actor.id);
    Ok(())
}

fn refuse_other(named: Option<UserId>, actor: &Principal) -> Result<(), WorkflowError> {
    match named {
        Some(id) if id != actor.id => Err(WorkflowError::Unauthorized(format!(
            "{} may not list cases for {id}",
            actor.role
        ))),
        _ => Ok(()),
    }
}
