//! # Agent Action Ledger Entries
//!
//! Every contact attempt, note and payment is an immutable [`AgentAction`].
//! Entries are hash-chained: each stores the previous entry's hash and its
//! own SHA-256 over the previous hash plus its identifying fields, so a
//! rewritten or removed entry breaks every link after it.

use std::str::FromStr;

use dca_core::{
    sha256_hex, ActionId, CaseId, Money, Timestamp, UserId, ValidationError, GENESIS_HASH,
};
use serde::{Deserialize, Serialize};

/// Kind of work recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Call,
    Email,
    Sms,
    Contact,
    Payment,
    Note,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "CALL",
            Self::Email => "EMAIL",
            Self::Sms => "SMS",
            Self::Contact => "CONTACT",
            Self::Payment => "PAYMENT",
            Self::Note => "NOTE",
        }
    }
}

impl FromStr for ActionType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CALL" => Ok(Self::Call),
            "EMAIL" => Ok(Self::Email),
            "SMS" => Ok(Self::Sms),
            "CONTACT" => Ok(Self::Contact),
            "PAYMENT" => Ok(Self::Payment),
            "NOTE" => Ok(Self::Note),
            other => Err(ValidationError::invalid("action_type", format!("unknown {other:?}"))),
        }
    }
}

/// Result of a contact attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionOutcome {
    /// Right party contact.
    Rpc,
    /// Promise to pay.
    Ptp,
    PaymentReceived,
    NoContact,
    LeftMessage,
    CallbackRequested,
    Dispute,
    BrokenPromise,
}

impl ActionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rpc => "RPC",
            Self::Ptp => "PTP",
            Self::PaymentReceived => "PAYMENT_RECEIVED",
            Self::NoContact => "NO_CONTACT",
            Self::LeftMessage => "LEFT_MESSAGE",
            Self::CallbackRequested => "CALLBACK_REQUESTED",
            Self::Dispute => "DISPUTE",
            Self::BrokenPromise => "BROKEN_PROMISE",
        }
    }

    /// Whether the attempt actually reached the debtor.
    pub fn is_contact(&self) -> bool {
        !matches!(self, Self::NoContact | Self::LeftMessage)
    }
}

/// How a payment was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    BankTransfer,
    Upi,
    Check,
    Cash,
    Card,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BankTransfer => "BANK_TRANSFER",
            Self::Upi => "UPI",
            Self::Check => "CHECK",
            Self::Cash => "CASH",
            Self::Card => "CARD",
        }
    }
}

/// Caller-supplied content of an action, before it is sealed into the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDraft {
    pub case_id: CaseId,
    pub agent_id: UserId,
    pub action_type: ActionType,
    pub outcome: Option<ActionOutcome>,
    pub compliant: bool,
    pub compliance_notes: Option<String>,
    pub notes: Option<String>,
    pub duration_seconds: Option<u32>,
    pub payment_amount: Option<Money>,
    pub payment_method: Option<PaymentMethod>,
    pub transaction_ref: Option<String>,
    pub promise_amount: Option<Money>,
    pub promise_date: Option<Timestamp>,
    pub next_follow_up: Option<Timestamp>,
}

impl ActionDraft {
    /// A bare draft; optional fields empty, marked compliant.
    pub fn new(case_id: CaseId, agent_id: UserId, action_type: ActionType) -> Self {
        Self {
            case_id,
            agent_id,
            action_type,
            outcome: None,
            compliant: true,
            compliance_notes: None,
            notes: None,
            duration_seconds: None,
            payment_amount: None,
            payment_method: None,
            transaction_ref: None,
            promise_amount: None,
            promise_date: None,
            next_follow_up: None,
        }
    }

    /// Reject drafts whose amounts make no sense.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(amount) = self.payment_amount {
            amount.require_positive("payment_amount")?;
        }
        if let Some(amount) = self.promise_amount {
            amount.require_positive("promise_amount")?;
        }
        if self.action_type == ActionType::Payment && self.payment_amount.is_none() {
            return Err(ValidationError::EmptyField("payment_amount"));
        }
        Ok(())
    }
}

/// A sealed, immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentAction {
    pub id: ActionId,
    /// Position in the ledger, starting at 1.
    pub sequence: u64,
    #[serde(flatten)]
    pub draft: ActionDraft,
    pub created_at: Timestamp,
    pub previous_hash: String,
    pub entry_hash: String,
}

impl AgentAction {
    /// Seal `draft` as entry number `sequence`, chained to `previous_hash`.
    pub fn seal(draft: ActionDraft, sequence: u64, previous_hash: &str, at: Timestamp) -> Self {
        let id = ActionId::new();
        let entry_hash = entry_hash(previous_hash, &id, &draft, at);
        Self {
            id,
            sequence,
            draft,
            created_at: at,
            previous_hash: previous_hash.to_string(),
            entry_hash,
        }
    }

    /// Recompute this entry's hash from its content.
    pub fn recompute_hash(&self) -> String {
        entry_hash(&self.previous_hash, &self.id, &self.draft, self.created_at)
    }

    pub fn case_id(&self) -> CaseId {
        self.draft.case_id
    }

    pub fn agent_id(&self) -> UserId {
        self.draft.agent_id
    }

    pub fn compliant(&self) -> bool {
        self.draft.compliant
    }
}

fn entry_hash(previous_hash: &str, id: &ActionId, draft: &ActionDraft, at: Timestamp) -> String {
    let input = format!(
        "{}|{}|{}|{}|{}|{}|{}|{}|{}",
        previous_hash,
        id.0,
        draft.case_id.0,
        draft.agent_id.0,
        draft.action_type.as_str(),
        draft.outcome.map(|o| o.as_str()).unwrap_or(""),
        draft.payment_amount.map(|m| m.minor()).unwrap_or(0),
        draft.compliant,
        at.epoch_secs(),
    );
    sha256_hex(input.as_bytes())
}

/// Result of walking the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainVerification {
    pub total_entries: usize,
    pub broken_links: usize,
    pub tampered_entries: usize,
    pub chain_valid: bool,
}

/// Check hash continuity and per-entry integrity over `entries` in ledger order.
pub fn verify_chain(entries: &[AgentAction]) -> ChainVerification {
    let mut broken_links = 0;
    let mut tampered_entries = 0;
    let mut expected_prev: &str = GENESIS_HASH;
    for entry in entries {
        if entry.previous_hash != expected_prev {
            broken_links += 1;
        }
        if entry.recompute_hash() != entry.entry_hash {
            tampered_entries += 1;
        }
        expected_prev = entry.entry_hash.as_str();
    }
    ChainVerification {
        total_entries: entries.len(),
        broken_links,
        tampered_entries,
        chain_valid: broken_links == 0 && tampered_entries == 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at() -> Timestamp {
        Timestamp::parse("2026-03-03T03:03:03Z").unwrap()
    }

    fn chain(n: usize) -> Vec<AgentAction> {
        let case_id = CaseId::new();
        let agent = UserId::new();
        let mut out: Vec<AgentAction> = Vec::new();
        for i in 0..n {
            let prev = out.last().map(|a| a.entry_hash.clone()).unwrap_or_else(|| GENESIS_HASH.into());
            let draft = ActionDraft::new(case_id, agent, ActionType::Call);
            out.push(AgentAction::seal(draft, i as u64 + 1, &prev, at()));
        }
        out
    }

    #[test]
    fn intact_chain_verifies() {
        let v = verify_chain(&chain(4));
        assert_eq!(v.total_entries, 4);
        assert!(v.chain_valid);
    }

    #[test]
    fn empty_chain_is_valid() {
        assert!(verify_chain(&[]).chain_valid);
    }

    #[test]
    fn edited_entry_is_detected() {
        let mut entries = chain(3);
        entries[1].draft.compliant = false;
        let v = verify_chain(&entries);
        assert_eq!(v.tampered_entries, 1);
        assert!(!v.chain_valid);
    }

    #[test]
    fn removed_entry_breaks_link() {
        let mut entries = chain(3);
        entries.remove(1);
        let v = verify_chain(&entries);
        assert_eq!(v.broken_links, 1);
    }

    #[test]
    fn payment_draft_needs_amount() {
        let mut d = ActionDraft::new(CaseId::new(), UserId::new(), ActionType::Payment);
        assert!(d.validate().is_err());
        d.payment_amount = Some(Money::from_major(10));
        assert!(d.validate().is_ok());
        d.promise_amount = Some(Money::ZERO);
        assert!(d.validate().is_err());
    }

    #[test]
    fn no_contact_outcomes() {
        assert!(!ActionOutcome::NoContact.is_contact());
        assert!(!ActionOutcome::LeftMessage.is_contact());
        assert!(ActionOutcome::Rpc.is_contact());
    }

    #[test]
    fn flattened_serialization_exposes_fields() {
        let entries = chain(1);
        let json = serde_json::to_value(&entries[0]).unwrap();
        assert_eq!(json["action_type"], "CALL");
        assert_eq!(json["sequence"], 1);
        assert!(json["case_id"].is_string());
    }
}
