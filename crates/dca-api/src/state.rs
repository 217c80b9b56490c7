//! # Application State
//!
//! Shared state for the Axum application: the case engine over the
//! in-memory store, the optional Postgres pool the store is written
//! through to, configuration, and the Prometheus render handle.

use std::path::PathBuf;
use std::sync::Arc;

use dca_core::{CaseId, Clock, Role, SystemClock, UserId};
use dca_state::{AgentAction, Debtor, UserProfile};
use dca_workflow::{AllocationRule, CaseEngine, CaseStore, MemoryStore, PolicyConfig};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;

use crate::error::AppError;

/// Environment-driven configuration.
///
/// Custom `Debug` redacts the auth token.
#[derive(Clone, Default)]
pub struct AppConfig {
    pub port: u16,
    /// Shared bearer secret. `None` runs in development mode.
    pub auth_token: Option<String>,
    pub policy_file: Option<PathBuf>,
    /// Seeded as an active ADMIN profile at startup.
    pub bootstrap_admin: Option<UserId>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("policy_file", &self.policy_file)
            .field("bootstrap_admin", &self.bootstrap_admin)
            .finish()
    }
}

impl AppConfig {
    /// Read `PORT`, `AUTH_TOKEN`, `POLICY_FILE` and `DCA_BOOTSTRAP_ADMIN`.
    pub fn from_env() -> Result<Self, String> {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);
        let auth_token = std::env::var("AUTH_TOKEN").ok().filter(|t| !t.is_empty());
        let policy_file = std::env::var("POLICY_FILE").ok().map(PathBuf::from);
        let bootstrap_admin = match std::env::var("DCA_BOOTSTRAP_ADMIN") {
            Ok(raw) => Some(
                raw.parse::<UserId>()
                    .map_err(|e| format!("DCA_BOOTSTRAP_ADMIN: {e}"))?,
            ),
            Err(_) => None,
        };
        Ok(Self {
            port,
            auth_token,
            policy_file,
            bootstrap_admin,
        })
    }

    /// The workflow policy from `POLICY_FILE`, or defaults.
    pub fn load_policy(&self) -> Result<PolicyConfig, String> {
        match &self.policy_file {
            Some(path) => PolicyConfig::load(path).map_err(|e| e.to_string()),
            None => Ok(PolicyConfig::default()),
        }
    }
}

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: CaseEngine<MemoryStore>,
    pub db_pool: Option<PgPool>,
    pub config: AppConfig,
    pub metrics: Option<PrometheusHandle>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("db", &self.db_pool.is_some())
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// In-memory state with the system clock.
    pub fn new(config: AppConfig, policy: PolicyConfig) -> Self {
        Self::with_clock(config, policy, Arc::new(SystemClock))
    }

    pub fn with_clock(config: AppConfig, policy: PolicyConfig, clock: Arc<dyn Clock>) -> Self {
        let engine = CaseEngine::new(Arc::new(MemoryStore::new()), Arc::clone(&clock), policy);
        Self {
            engine,
            db_pool: None,
            config,
            metrics: None,
            clock,
        }
    }

    pub fn with_db(mut self, pool: Option<PgPool>) -> Self {
        self.db_pool = pool;
        self
    }

    pub fn with_metrics(mut self, handle: Option<PrometheusHandle>) -> Self {
        self.metrics = handle;
        self
    }

    /// Replace the in-memory store with the database contents.
    ///
    /// No-op without a pool.
    pub async fn hydrate_from_db(&mut self) -> Result<(), String> {
        let pool = match &self.db_pool {
            Some(pool) => pool,
            None => return Ok(()),
        };
        let snapshot = crate::db::load_snapshot(pool)
            .await
            .map_err(|e| format!("failed to load snapshot: {e}"))?;
        tracing::info!(
            cases = snapshot.cases.len(),
            debtors = snapshot.debtors.len(),
            actions = snapshot.actions.len(),
            profiles = snapshot.profiles.len(),
            "hydrated in-memory store from database"
        );
        let policy = self.engine.policy().clone();
        self.engine = CaseEngine::new(
            Arc::new(MemoryStore::from_snapshot(snapshot)),
            Arc::clone(&self.clock),
            policy,
        );
        Ok(())
    }

    /// Make sure `id` has an active ADMIN profile.
    pub async fn bootstrap_admin(&self, id: UserId) -> Result<(), AppError> {
        let store = self.engine.store();
        let existing = store.profile(id).map_err(dca_workflow::WorkflowError::from)?;
        if existing.as_ref().is_some_and(|p| p.is_active_as(Role::Admin)) {
            return Ok(());
        }
        let profile = UserProfile {
            id,
            email: existing
                .as_ref()
                .map_or_else(|| "admin@localhost".to_string(), |p| p.email.clone()),
            full_name: existing
                .as_ref()
                .map_or_else(|| "Bootstrap Administrator".to_string(), |p| p.full_name.clone()),
            role: Role::Admin,
            department: None,
            is_active: true,
            last_login_at: None,
        };
        let saved = store.put_profile(profile).map_err(dca_workflow::WorkflowError::from)?;
        self.persist_profile(&saved).await?;
        tracing::warn!(user = %id, "bootstrap admin profile activated");
        Ok(())
    }

    // ── Write-through ───────────────────────────────────────────────
    //
    // Failure is surfaced to the client: the in-memory change stands but
    // would be lost on restart.

    /// Persist the current row of `case_id`, its assignment history and
    /// any ledger entries the operation appended.
    pub async fn persist_case(
        &self,
        case_id: CaseId,
        appended: &[AgentAction],
    ) -> Result<(), AppError> {
        let Some(pool) = &self.db_pool else {
            return Ok(());
        };
        let store = self.engine.store();
        let case = store.case(case_id).map_err(dca_workflow::WorkflowError::from)?;
        let assignments = store
            .assignments_for(case_id)
            .map_err(dca_workflow::WorkflowError::from)?;
        let result = async {
            if let Some(case) = &case {
                crate::db::cases::upsert(pool, case).await?;
            }
            for a in &assignments {
                crate::db::cases::upsert_assignment(pool, a).await?;
            }
            crate::db::ledger::append(pool, appended).await
        }
        .await;
        result.map_err(|e| {
            tracing::error!(case = %case_id, error = %e, "failed to persist case to database");
            AppError::Internal("case updated in-memory but database persist failed".to_string())
        })
    }

    pub async fn persist_debtor(&self, debtor: &Debtor) -> Result<(), AppError> {
        let Some(pool) = &self.db_pool else {
            return Ok(());
        };
        crate::db::parties::upsert_debtor(pool, debtor).await.map_err(|e| {
            tracing::error!(debtor = %debtor.id, error = %e, "failed to persist debtor");
            AppError::Internal("debtor saved in-memory but database persist failed".to_string())
        })
    }

    pub async fn persist_profile(&self, profile: &UserProfile) -> Result<(), AppError> {
        let Some(pool) = &self.db_pool else {
            return Ok(());
        };
        crate::db::parties::upsert_profile(pool, profile).await.map_err(|e| {
            tracing::error!(user = %profile.id, error = %e, "failed to persist profile");
            AppError::Internal("profile saved in-memory but database persist failed".to_string())
        })
    }

    pub async fn persist_violation(
        &self,
        violation: &dca_state::ComplianceViolation,
    ) -> Result<(), AppError> {
        let Some(pool) = &self.db_pool else {
            return Ok(());
        };
        crate::db::parties::upsert_violation(pool, violation).await.map_err(|e| {
            tracing::error!(violation = %violation.id, error = %e, "failed to persist violation");
            AppError::Internal("violation saved in-memory but database persist failed".to_string())
        })
    }

    pub async fn persist_rule(&self, rule: &AllocationRule) -> Result<(), AppError> {
        let Some(pool) = &self.db_pool else {
            return Ok(());
        };
        crate::db::parties::upsert_rule(pool, rule).await.map_err(|e| {
            tracing::error!(rule = %rule.id, error = %e, "failed to persist allocation rule");
            AppError::Internal("rule saved in-memory but database persist failed".to_string())
        })
    }
}
