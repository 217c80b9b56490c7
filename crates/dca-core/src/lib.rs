//! # dca-core: Foundational Types for the Case Engine
//!
//! Leaf crate of the workspace. Every other `dca-*` crate depends on it;
//! it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype identifiers.** `CaseId`, `DebtorId`, `UserId` and friends
//!    wrap a `Uuid` so a debtor id can never be passed where a case id is
//!    expected.
//!
//! 2. **Integer money.** [`Money`] holds minor currency units in an `i64`.
//!    No floating point touches an amount.
//!
//! 3. **UTC-only timestamps.** [`Timestamp`] is UTC, seconds precision.
//!    Engines read time through the [`Clock`] trait so tests can pin it.
//!
//! 4. **One role enum.** [`Role`] is the single source of the four
//!    principal roles; [`Principal`] is what every engine operation receives.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `dca-*` crates.
//! - No `unsafe` code.
//! - No `.unwrap()` outside tests.

pub mod digest;
pub mod error;
pub mod identity;
pub mod money;
pub mod priority;
pub mod role;
pub mod temporal;

pub use digest::{sha256_hex, GENESIS_HASH};
pub use error::ValidationError;
pub use identity::{ActionId, AssignmentId, CaseId, DebtorId, RuleId, UserId, ViolationId};
pub use money::Money;
pub use priority::Priority;
pub use role::{Actor, Principal, Role};
pub use temporal::{Clock, ManualClock, SystemClock, Timestamp};
