//! # dca-cli: Operator CLI for the Case Engine
//!
//! Offline tooling around the engine's fixed tables and policy files:
//!
//! - `dca transitions`: print the case lifecycle table.
//! - `dca rules check <file.yaml>`: validate a policy and rule file
//!   before loading it into a deployment.
//! - `dca score`: compute a recovery probability without a running
//!   service.
//!
//! Each `run_*` returns the process exit code: 0 on success, 1 when the
//! input was checked and found wanting.

pub mod rules;
pub mod score;
pub mod transitions;
