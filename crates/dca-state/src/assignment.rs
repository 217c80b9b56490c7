//! Manager→agent handoff records. At most one active record per case;
//! the assignment engine deactivates the previous one before inserting.

use dca_core::{AssignmentId, CaseId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// Audit record of a case being handed to an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseAssignment {
    pub id: AssignmentId,
    pub case_id: CaseId,
    /// The agent receiving the case.
    pub assigned_to: UserId,
    /// The manager or admin making the handoff.
    pub assigned_by: UserId,
    pub assignment_date: Timestamp,
    pub is_active: bool,
    pub deactivated_at: Option<Timestamp>,
}

impl CaseAssignment {
    /// A new active assignment.
    pub fn new(case_id: CaseId, assigned_to: UserId, assigned_by: UserId, at: Timestamp) -> Self {
        Self {
            id: AssignmentId::new(),
            case_id,
            assigned_to,
            assigned_by,
            assignment_date: at,
            is_active: true,
            deactivated_at: None,
        }
    }

    /// Retire this assignment. Records are never deleted.
    pub fn deactivate(&mut self, at: Timestamp) {
        if self.is_active {
            self.is_active = false;
            self.deactivated_at = Some(at);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deactivate_is_sticky() {
        let at = Timestamp::parse("2026-04-01T00:00:00Z").unwrap();
        let mut a = CaseAssignment::new(CaseId::new(), UserId::new(), UserId::new(), at);
        assert!(a.is_active);
        a.deactivate(at.plus_secs(10));
        a.deactivate(at.plus_secs(20));
        assert!(!a.is_active);
        assert_eq!(a.deactivated_at, Some(at.plus_secs(10)));
    }
}
