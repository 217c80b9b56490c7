//! Debtor identity and contact record.

use dca_core::{DebtorId, Timestamp, ValidationError};
use serde::{Deserialize, Serialize};

/// A person or business owing money on one or more cases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Debtor {
    pub id: DebtorId,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Mutable contact fields. `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDetails {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
}

impl Debtor {
    /// New debtor. The name is required; blank contact fields are dropped.
    pub fn new(
        full_name: &str,
        contact: ContactDetails,
        at: Timestamp,
    ) -> Result<Self, ValidationError> {
        dca_core::error::require_non_empty("full_name", full_name)?;
        let mut debtor = Self {
            id: DebtorId::new(),
            full_name: full_name.trim().to_string(),
            email: None,
            phone: None,
            address: None,
            city: None,
            state: None,
            postal_code: None,
            created_at: at,
            updated_at: at,
        };
        debtor.apply_contact(contact, at);
        Ok(debtor)
    }

    /// Overwrite contact fields that carry a non-blank value.
    pub fn apply_contact(&mut self, contact: ContactDetails, at: Timestamp) {
        fn set(slot: &mut Option<String>, value: Option<String>) {
            if let Some(v) = clean(value) {
                *slot = Some(v);
            }
        }
        set(&mut self.email, contact.email.map(|e| e.to_ascii_lowercase()));
        set(&mut self.phone, contact.phone);
        set(&mut self.address, contact.address);
        set(&mut self.city, contact.city);
        set(&mut self.state, contact.state);
        set(&mut self.postal_code, contact.postal_code);
        self.updated_at = at;
    }

    /// De-duplication match: same email (case-insensitive) or same phone.
    pub fn matches_contact(&self, email: Option<&str>, phone: Option<&str>) -> bool {
        let email_hit = match (self.email.as_deref(), email.map(str::trim)) {
            (Some(mine), Some(theirs)) if !theirs.is_empty() => mine.eq_ignore_ascii_case(theirs),
            _ => false,
        };
        let phone_hit = match (self.phone.as_deref(), phone.map(str::trim)) {
            (Some(mine), Some(theirs)) if !theirs.is_empty() => mine == theirs,
            _ => false,
        };
        email_hit || phone_hit
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> Timestamp {
        Timestamp::parse("2026-01-10T08:00:00Z").unwrap()
    }

    #[test]
    fn name_is_required() {
        let err = Debtor::new(" ", ContactDetails::default(), now()).unwrap_err();
        assert_eq!(err, ValidationError::EmptyField("full_name"));
    }

    #[test]
    fn blank_contact_fields_are_dropped() {
        let d = Debtor::new(
            "Asha Rao",
            ContactDetails {
                email: Some("  ".into()),
                phone: Some("+91 98450 00000".into()),
                ..Default::default()
            },
            now(),
        )
        .unwrap();
        assert!(d.email.is_none());
        assert_eq!(d.phone.as_deref(), Some("+91 98450 00000"));
    }

    #[test]
    fn contact_match_by_email_or_phone() {
        let d = Debtor::new(
            "Asha Rao",
            ContactDetails {
                email: Some("Asha@Example.com".into()),
                phone: Some("555-0101".into()),
                ..Default::default()
            },
            now(),
        )
        .unwrap();
        assert!(d.matches_contact(Some("asha@example.com"), None));
        assert!(d.matches_contact(None, Some("555-0101")));
        assert!(!d.matches_contact(Some("other@example.com"), Some("555-0199")));
        assert!(!d.matches_contact(Some(""), Some("")));
    }

    #[test]
    fn update_keeps_unspecified_fields() {
        let mut d = Debtor::new(
            "Asha Rao",
            ContactDetails {
                city: Some("Pune".into()),
                ..Default::default()
            },
            now(),
        )
        .unwrap();
        d.apply_contact(
            ContactDetails {
                phone: Some("555-0101".into()),
                ..Default::default()
            },
            now().plus_secs(5),
        );
        assert_eq!(d.city.as_deref(), Some("Pune"));
        assert_eq!(d.phone.as_deref(), Some("555-0101"));
        assert_eq!(d.updated_at, now().plus_secs(5));
    }
}
