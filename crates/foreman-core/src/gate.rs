//! Human-in-the-loop approval gates.
//!
//! A gate pairs a static template (what to review, what it blocks) with a
//! decision obtained from an external source. Artifacts and a generated
//! summary are persisted before the decision is requested, so a reviewer
//! can inspect them out-of-band and any front-end can re-present them.

use crate::error::{ForemanError, Result};
use crate::io::atomic_write;
use crate::paths;
use crate::types::{GateDecision, GateState, Phase};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// GateConfig
// ---------------------------------------------------------------------------

/// Static gate template. The blocking/non-blocking lists are declarative
/// hints supplied by the template author, not derived at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateConfig {
    pub gate_id: String,
    pub gate_name: String,
    pub phase: Phase,
    pub description: String,
    pub artifacts_to_review: Vec<String>,
    pub approval_criteria: Vec<String>,
    /// Work that cannot proceed until this gate is approved.
    pub blocking_dependencies: Vec<String>,
    /// Work that may continue in parallel while the gate is pending.
    pub non_blocking_work: Vec<String>,
}

// ---------------------------------------------------------------------------
// GateFeedback
// ---------------------------------------------------------------------------

/// Append-only log entry, one per human decision instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateFeedback {
    pub decision: GateDecision,
    pub feedback_text: Option<String>,
    pub specific_issues: Vec<String>,
    pub approved_aspects: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub reviewer: String,
}

// ---------------------------------------------------------------------------
// DecisionSource
// ---------------------------------------------------------------------------

/// External collaborator asked to decide a gate. In production this is a
/// human-interaction surface; in tests, any stub. The returned string is
/// parsed case-insensitively into a [`GateDecision`].
pub trait DecisionSource {
    fn decide(&self, config: &GateConfig, artifacts: &BTreeMap<String, serde_json::Value>)
        -> String;
}

impl<F> DecisionSource for F
where
    F: Fn(&GateConfig, &BTreeMap<String, serde_json::Value>) -> String,
{
    fn decide(
        &self,
        config: &GateConfig,
        artifacts: &BTreeMap<String, serde_json::Value>,
    ) -> String {
        self(config, artifacts)
    }
}

/// What to do when a gate is triggered with no decision source attached.
///
/// The fail-open `Approve` variant exists for demos and scripted runs; it
/// must be opted into explicitly and logs a warning whenever exercised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingDecisionPolicy {
    #[default]
    Pause,
    Approve,
}

// ---------------------------------------------------------------------------
// GateManager
// ---------------------------------------------------------------------------

pub struct GateManager {
    root: PathBuf,
    policy: MissingDecisionPolicy,
    gates: BTreeMap<String, GateConfig>,
    statuses: BTreeMap<String, GateState>,
    feedback: BTreeMap<String, Vec<GateFeedback>>,
}

impl GateManager {
    pub fn new(root: impl Into<PathBuf>, policy: MissingDecisionPolicy) -> Self {
        Self {
            root: root.into(),
            policy,
            gates: BTreeMap::new(),
            statuses: BTreeMap::new(),
            feedback: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, config: GateConfig) {
        info!(gate_id = %config.gate_id, name = %config.gate_name, "gate registered");
        self.statuses
            .insert(config.gate_id.clone(), GateState::Pending);
        self.gates.insert(config.gate_id.clone(), config);
    }

    /// Trigger a gate: persist artifacts and a summary, obtain a decision,
    /// and update the gate's status.
    pub fn trigger(
        &mut self,
        gate_id: &str,
        artifacts: &BTreeMap<String, serde_json::Value>,
        source: Option<&dyn DecisionSource>,
    ) -> Result<GateDecision> {
        let config = self
            .gates
            .get(gate_id)
            .cloned()
            .ok_or_else(|| ForemanError::GateNotRegistered(gate_id.to_string()))?;

        info!(gate_id, name = %config.gate_name, "gate triggered");
        self.persist_artifacts(&config, artifacts)?;

        let decision = match source {
            Some(source) => GateDecision::parse(&source.decide(&config, artifacts))?,
            None => match self.policy {
                MissingDecisionPolicy::Pause => {
                    warn!(gate_id, "no decision source attached, pausing (fail-closed)");
                    GateDecision::Pause
                }
                MissingDecisionPolicy::Approve => {
                    warn!(
                        gate_id,
                        "no decision source attached, auto-approving (fail-open policy)"
                    );
                    GateDecision::Approve
                }
            },
        };

        self.statuses
            .insert(gate_id.to_string(), GateState::from(decision));
        info!(gate_id, %decision, "gate decision recorded");

        self.record_feedback(
            gate_id,
            GateFeedback {
                decision,
                feedback_text: None,
                specific_issues: Vec::new(),
                approved_aspects: Vec::new(),
                timestamp: Utc::now(),
                reviewer: "decision_source".to_string(),
            },
        )?;

        Ok(decision)
    }

    /// Append a structured feedback entry and persist the gate's log.
    pub fn record_feedback(&mut self, gate_id: &str, feedback: GateFeedback) -> Result<()> {
        if !self.gates.contains_key(gate_id) {
            return Err(ForemanError::GateNotRegistered(gate_id.to_string()));
        }
        let entries = self.feedback.entry(gate_id.to_string()).or_default();
        entries.push(feedback);

        let path = paths::gate_dir(&self.root, gate_id).join("feedback.json");
        atomic_write(&path, &serde_json::to_vec_pretty(entries)?)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn status(&self, gate_id: &str) -> Option<GateState> {
        self.statuses.get(gate_id).copied()
    }

    pub fn is_approved(&self, gate_id: &str) -> bool {
        self.status(gate_id) == Some(GateState::Approved)
    }

    pub fn needs_revision(&self, gate_id: &str) -> bool {
        self.status(gate_id) == Some(GateState::RevisionRequested)
    }

    pub fn non_blocking_work(&self, gate_id: &str) -> &[String] {
        self.gates
            .get(gate_id)
            .map(|c| c.non_blocking_work.as_slice())
            .unwrap_or(&[])
    }

    pub fn blocking_dependencies(&self, gate_id: &str) -> &[String] {
        self.gates
            .get(gate_id)
            .map(|c| c.blocking_dependencies.as_slice())
            .unwrap_or(&[])
    }

    pub fn feedback(&self, gate_id: &str) -> &[GateFeedback] {
        self.feedback
            .get(gate_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Counts per state plus a per-gate listing, for observability.
    pub fn status_report(&self) -> GateStatusReport {
        let count = |s: GateState| self.statuses.values().filter(|v| **v == s).count();
        GateStatusReport {
            total_gates: self.gates.len(),
            approved: count(GateState::Approved),
            pending: count(GateState::Pending),
            revision_requested: count(GateState::RevisionRequested),
            paused: count(GateState::Paused),
            aborted: count(GateState::Aborted),
            gates: self
                .gates
                .values()
                .map(|c| GateStatusLine {
                    gate_id: c.gate_id.clone(),
                    name: c.gate_name.clone(),
                    phase: c.phase,
                    status: self.statuses[&c.gate_id],
                })
                .collect(),
        }
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    fn persist_artifacts(
        &self,
        config: &GateConfig,
        artifacts: &BTreeMap<String, serde_json::Value>,
    ) -> Result<()> {
        let dir = paths::gate_dir(&self.root, &config.gate_id);
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        atomic_write(
            &dir.join(format!("artifacts_{stamp}.json")),
            &serde_json::to_vec_pretty(artifacts)?,
        )?;
        atomic_write(
            &dir.join("summary.md"),
            summary(config, artifacts).as_bytes(),
        )?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GateStatusReport {
    pub total_gates: usize,
    pub approved: usize,
    pub pending: usize,
    pub revision_requested: usize,
    pub paused: usize,
    pub aborted: usize,
    pub gates: Vec<GateStatusLine>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GateStatusLine {
    pub gate_id: String,
    pub name: String,
    pub phase: Phase,
    pub status: GateState,
}

// ---------------------------------------------------------------------------
// Summary rendering
// ---------------------------------------------------------------------------

fn summary(config: &GateConfig, artifacts: &BTreeMap<String, serde_json::Value>) -> String {
    use std::fmt::Write as _;

    let mut out = String::new();
    let _ = writeln!(out, "# {}\n", config.gate_name);
    let _ = writeln!(out, "## Phase: {}\n", config.phase);
    let _ = writeln!(out, "{}\n", config.description);

    let _ = writeln!(out, "## Artifacts for Review\n");
    for name in &config.artifacts_to_review {
        if let Some(value) = artifacts.get(name) {
            let _ = writeln!(out, "### {name}\n");
            match value.as_str() {
                Some(text) => {
                    let _ = writeln!(out, "{text}\n");
                }
                None => {
                    let _ = writeln!(out, "```json\n{value:#}\n```\n");
                }
            }
        }
    }

    let _ = writeln!(out, "## Approval Criteria\n");
    for criterion in &config.approval_criteria {
        let _ = writeln!(out, "- [ ] {criterion}");
    }

    let _ = writeln!(
        out,
        "\n## Decision Required\n\n\
         1. **Approve** - Proceed to next phase\n\
         2. **Revise** - Request changes\n\
         3. **Pause** - Save and exit\n\
         4. **Abort** - Cancel project\n\n\
         ---\n\nGenerated: {}",
        Utc::now().to_rfc3339()
    );
    out
}

// ---------------------------------------------------------------------------
// Standard gates
// ---------------------------------------------------------------------------

/// The stock SDLC gate templates. Actual gates are customized per project.
pub fn standard_gates() -> Vec<GateConfig> {
    vec![
        GateConfig {
            gate_id: "requirements_prd_approval".into(),
            gate_name: "PRD Approval Gate".into(),
            phase: Phase::Requirements,
            description: "Review and approve the Product Requirements Document".into(),
            artifacts_to_review: vec![
                "PRD".into(),
                "Technical Specifications".into(),
                "Implementation Plan".into(),
            ],
            approval_criteria: vec![
                "All requirements are clear and testable".into(),
                "Technical specifications are complete".into(),
                "Implementation plan is realistic".into(),
                "No conflicting requirements".into(),
            ],
            blocking_dependencies: vec!["design".into(), "implementation".into()],
            non_blocking_work: vec!["team onboarding".into(), "environment setup".into()],
        },
        GateConfig {
            gate_id: "design_architecture_approval".into(),
            gate_name: "Architecture Approval Gate".into(),
            phase: Phase::Design,
            description: "Review and approve system architecture and design".into(),
            artifacts_to_review: vec![
                "Architecture Diagrams".into(),
                "Database Schema".into(),
                "API Contracts".into(),
            ],
            approval_criteria: vec![
                "Architecture is scalable and maintainable".into(),
                "Database schema supports all requirements".into(),
                "API contracts are well-defined".into(),
                "Security considerations addressed".into(),
            ],
            blocking_dependencies: vec!["implementation".into()],
            non_blocking_work: vec![
                "development environment setup".into(),
                "CI/CD configuration".into(),
            ],
        },
        GateConfig {
            gate_id: "implementation_code_review".into(),
            gate_name: "Code Review Gate".into(),
            phase: Phase::Implementation,
            description: "Review and approve implemented code".into(),
            artifacts_to_review: vec![
                "Code Changes".into(),
                "Unit Tests".into(),
                "Documentation".into(),
            ],
            approval_criteria: vec![
                "Code follows project standards".into(),
                "Unit tests have >80% coverage".into(),
                "Documentation is complete".into(),
                "No critical security issues".into(),
            ],
            blocking_dependencies: vec!["testing".into(), "deployment".into()],
            non_blocking_work: vec!["test environment preparation".into()],
        },
        GateConfig {
            gate_id: "testing_coverage_approval".into(),
            gate_name: "Testing Approval Gate".into(),
            phase: Phase::Testing,
            description: "Review and approve test results".into(),
            artifacts_to_review: vec![
                "Test Results".into(),
                "Coverage Report".into(),
                "Security Audit".into(),
            ],
            approval_criteria: vec![
                "All tests passing".into(),
                "Coverage meets threshold".into(),
                "No high-severity security issues".into(),
                "Performance tests pass".into(),
            ],
            blocking_dependencies: vec!["deployment".into()],
            non_blocking_work: vec!["deployment documentation".into()],
        },
        GateConfig {
            gate_id: "deployment_production_approval".into(),
            gate_name: "Production Deployment Gate".into(),
            phase: Phase::Deployment,
            description: "Approve production deployment".into(),
            artifacts_to_review: vec![
                "Deployment Plan".into(),
                "Rollback Plan".into(),
                "Smoke Test Results".into(),
            ],
            approval_criteria: vec![
                "Deployment plan is complete".into(),
                "Rollback plan tested".into(),
                "Staging deployment successful".into(),
                "All stakeholders notified".into(),
            ],
            blocking_dependencies: vec!["production access".into()],
            non_blocking_work: vec!["monitoring setup".into()],
        },
        GateConfig {
            gate_id: "monitoring_client_acceptance".into(),
            gate_name: "Client Acceptance Gate".into(),
            phase: Phase::Monitoring,
            description: "Final client acceptance".into(),
            artifacts_to_review: vec![
                "Documentation".into(),
                "Runbooks".into(),
                "Training Materials".into(),
            ],
            approval_criteria: vec![
                "All deliverables complete".into(),
                "Documentation comprehensive".into(),
                "Training conducted".into(),
                "Client satisfied".into(),
            ],
            blocking_dependencies: vec![],
            non_blocking_work: vec![],
        },
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
