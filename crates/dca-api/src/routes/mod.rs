//! # API Route Modules
//!
//! Each module exposes `router() -> Router<AppState>`; [`crate::app`]
//! merges them behind the auth and metrics layers.

pub mod actions;
pub mod allocation;
pub mod assignments;
pub mod cases;
pub mod compliance;
pub mod debtors;
pub mod import;
pub mod payments;
pub mod profiles;
pub mod worklist;
