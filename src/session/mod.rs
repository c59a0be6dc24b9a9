//! Session Store - per-caller analysis state
//!
//! A session owns one validated [`AnalysisPlan`] and the report of its most
//! recent run. Engine instances are never stored: every analysis builds
//! fresh ones, so sessions cannot leak state into each other or into a
//! later run of the same session.
//!
//! The store is `Sync` and meant to be owned by whatever layer serves
//! callers (an HTTP handler, a batch driver); there is no global instance.

use crate::config::{AnalysisConfig, AnalysisPlan, ConfigError};
use crate::report::{analyze, RunReport};
use crate::types::Sample;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(Uuid),

    #[error("Invalid session config: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub plan: AnalysisPlan,
    pub last_report: Option<RunReport>,
}

#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a validated plan. Returns the new session id.
    pub fn create(&self, plan: AnalysisPlan) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        info!(session = %id, run = %plan.run.name, "Session created");
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id,
                Session {
                    id,
                    created_at: now,
                    updated_at: now,
                    plan,
                    last_report: None,
                },
            );
        id
    }

    /// Validate `config` and register it.
    pub fn create_from_config(&self, config: &AnalysisConfig) -> Result<Uuid, SessionError> {
        Ok(self.create(config.validate()?))
    }

    pub fn get(&self, id: Uuid) -> Option<Session> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    /// Swap the plan of an existing session. The previous report is dropped.
    pub fn replace_config(&self, id: Uuid, plan: AnalysisPlan) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let session = sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;
        session.plan = plan;
        session.last_report = None;
        session.updated_at = Utc::now();
        info!(session = %id, "Session config replaced");
        Ok(())
    }

    pub fn remove(&self, id: Uuid) -> Option<Session> {
        let removed = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        if removed.is_some() {
            info!(session = %id, "Session removed");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Analyse `samples` with the session's plan and keep the report.
    ///
    /// The lock is not held while the engines run.
    pub fn analyze(&self, id: Uuid, samples: &[Sample]) -> Result<RunReport, SessionError> {
        let plan = self
            .get(id)
            .map(|session| session.plan)
            .ok_or(SessionError::NotFound(id))?;

        debug!(session = %id, samples = samples.len(), "Session analysis started");
        plan.check_channel_coverage(samples);
        let report = analyze(&plan, samples);

        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let session = sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;
        session.last_report = Some(report.clone());
        session.updated_at = Utc::now();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_get_remove() {
        let store = SessionStore::new();
        assert!(store.is_empty());
        let id = store.create(AnalysisPlan::default());
        assert_eq!(store.len(), 1);

        let session = store.get(id).expect("session exists");
        assert_eq!(session.id, id);
        assert!(session.last_report.is_none());
        assert!(session.updated_at >= session.created_at);

        assert!(store.remove(id).is_some());
        assert!(store.remove(id).is_none());
        assert!(store.get(id).is_none());
    }

    #[test]
    fn test_unknown_session_errors() {
        let store = SessionStore::new();
        let id = Uuid::new_v4();
        assert!(matches!(
            store.replace_config(id, AnalysisPlan::default()),
            Err(SessionError::NotFound(missing)) if missing == id
        ));
        assert!(matches!(store.analyze(id, &[]), Err(SessionError::NotFound(_))));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let store = SessionStore::new();
        let config = AnalysisConfig::from_toml_str(
            r#"
[[evaluation.items]]
id = "x"
condition_logic = "OR"
conditions = [{ channel = "T45", threshold = 1.0 }]
"#,
        )
        .expect("config parses");
        assert!(matches!(
            store.create_from_config(&config),
            Err(SessionError::Config(ConfigError::Validation(_)))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_analyze_stores_report() {
        let store = SessionStore::new();
        let id = store.create(AnalysisPlan::default());
        let report = store
            .analyze(id, &[Sample::new(0.0).with("Ng", 1.0)])
            .expect("session exists");
        let stored = store.get(id).and_then(|s| s.last_report);
        assert_eq!(stored, Some(report));

        store
            .replace_config(id, AnalysisPlan::default())
            .expect("session exists");
        assert!(store.get(id).and_then(|s| s.last_report).is_none());
    }
}
