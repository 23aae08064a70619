//! Agent registry: capability routing, priority ordering, and health
//! accounting.
//!
//! The health map is the only shared mutable state touched by concurrent
//! strategy executions (the parallel strategy records outcomes from several
//! tasks at once), so it sits behind a mutex and updates are serialized.
//! Locks are never held across an await point.

use crate::types::{AgentDescriptor, AgentHealth, Capability};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Mutex, RwLock};
use tracing::{info, warn};

// ─── AgentRegistry ────────────────────────────────────────────────────────

/// One registry per orchestrator/session, passed explicitly — there is no
/// process-global instance.
#[derive(Debug, Default)]
pub struct AgentRegistry {
    agents: RwLock<BTreeMap<String, AgentDescriptor>>,
    health: Mutex<BTreeMap<String, AgentHealth>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent, overwriting any previous entry with the same name
    /// and resetting its health to healthy zero counts. Last write wins;
    /// the reset doubles as the operator's path to reinstate an agent that
    /// was marked unhealthy.
    pub fn register(&self, descriptor: AgentDescriptor) {
        let name = descriptor.name.clone();
        let replaced = {
            let mut agents = self.agents.write().expect("agents lock poisoned");
            agents.insert(name.clone(), descriptor).is_some()
        };
        {
            let mut health = self.health.lock().expect("health lock poisoned");
            health.insert(name.clone(), AgentHealth::healthy());
        }
        if replaced {
            info!(agent = %name, "re-registered agent, health reset");
        } else {
            info!(agent = %name, "registered agent");
        }
    }

    /// Select the best agent for `capability`: enabled, healthy, not
    /// excluded, highest priority, ties broken by lowest error rate.
    pub fn select(&self, capability: Capability, excluded: &[String]) -> Option<AgentDescriptor> {
        let agents = self.agents.read().expect("agents lock poisoned");
        let health = self.health.lock().expect("health lock poisoned");

        let mut candidates: Vec<&AgentDescriptor> = agents
            .values()
            .filter(|a| {
                a.capabilities.contains(&capability)
                    && a.enabled
                    && !excluded.contains(&a.name)
                    && health.get(&a.name).is_some_and(|h| h.is_healthy)
            })
            .collect();

        if candidates.is_empty() {
            warn!(%capability, "no healthy agents available");
            return None;
        }

        candidates.sort_by(|a, b| {
            b.priority.cmp(&a.priority).then_with(|| {
                let ea = health.get(&a.name).map(|h| h.error_rate).unwrap_or(0.0);
                let eb = health.get(&b.name).map(|h| h.error_rate).unwrap_or(0.0);
                ea.total_cmp(&eb)
            })
        });

        let selected = candidates[0].clone();
        info!(agent = %selected.name, %capability, "selected agent");
        Some(selected)
    }

    /// Every enabled agent with `capability`, regardless of health. Used by
    /// the parallel strategy, which wants all opinions.
    pub fn all_with(&self, capability: Capability) -> Vec<AgentDescriptor> {
        let agents = self.agents.read().expect("agents lock poisoned");
        agents
            .values()
            .filter(|a| a.capabilities.contains(&capability) && a.enabled)
            .cloned()
            .collect()
    }

    /// Record one execution outcome. Unknown names are ignored (the agent
    /// may have been re-registered under a different roster mid-run).
    pub fn record_outcome(&self, name: &str, success: bool) {
        let mut health = self.health.lock().expect("health lock poisoned");
        if let Some(entry) = health.get_mut(name) {
            let was_healthy = entry.is_healthy;
            entry.record(success);
            if was_healthy && !entry.is_healthy {
                warn!(
                    agent = name,
                    error_rate = entry.error_rate,
                    "agent marked unhealthy"
                );
            }
        }
    }

    pub fn set_enabled(&self, name: &str, enabled: bool) -> bool {
        let mut agents = self.agents.write().expect("agents lock poisoned");
        match agents.get_mut(name) {
            Some(agent) => {
                agent.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn set_priority(&self, name: &str, priority: i32) -> bool {
        let mut agents = self.agents.write().expect("agents lock poisoned");
        match agents.get_mut(name) {
            Some(agent) => {
                agent.priority = priority;
                true
            }
            None => false,
        }
    }

    pub fn health_of(&self, name: &str) -> Option<AgentHealth> {
        let health = self.health.lock().expect("health lock poisoned");
        health.get(name).cloned()
    }

    /// Read-only snapshot for observability.
    pub fn health_report(&self) -> HealthReport {
        let agents = self.agents.read().expect("agents lock poisoned");
        let health = self.health.lock().expect("health lock poisoned");
        let entries: Vec<HealthLine> = agents
            .values()
            .map(|a| {
                let h = health.get(&a.name).cloned().unwrap_or_else(AgentHealth::healthy);
                HealthLine {
                    name: a.name.clone(),
                    provider: a.provider.as_str().to_string(),
                    enabled: a.enabled,
                    healthy: h.is_healthy,
                    success_count: h.success_count,
                    failure_count: h.failure_count,
                    error_rate: h.error_rate,
                    last_check: h.last_check,
                }
            })
            .collect();
        HealthReport {
            timestamp: Utc::now(),
            total_agents: entries.len(),
            healthy_agents: entries.iter().filter(|e| e.healthy).count(),
            agents: entries,
        }
    }
}

// ─── HealthReport ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub timestamp: DateTime<Utc>,
    pub total_agents: usize,
    pub healthy_agents: usize,
    pub agents: Vec<HealthLine>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthLine {
    pub name: String,
    pub provider: String,
    pub enabled: bool,
    pub healthy: bool,
    pub success_count: u64,
    pub failure_count: u64,
    pub error_rate: f64,
    pub last_check: DateTime<Utc>,
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Provider;

    fn agent(name: &str, priority: i32, caps: &[Capability]) -> AgentDescriptor {
        AgentDescriptor::new(name, Provider::Custom)
            .with_priority(priority)
            .with_capabilities(caps.iter().copied())
    }

    #[test]
    fn select_prefers_priority_then_error_rate() {
        let registry = AgentRegistry::new();
        registry.register(agent("a", 10, &[Capability::Security]));
        registry.register(agent("b", 10, &[Capability::Security]));
        registry.register(agent("c", 5, &[Capability::Security]));

        // give b a worse error rate (1 failure / 10 attempts)
        registry.record_outcome("b", false);
        for _ in 0..9 {
            registry.record_outcome("b", true);
        }

        let selected = registry.select(Capability::Security, &[]).unwrap();
        assert_eq!(selected.name, "a");
    }

    #[test]
    fn select_respects_exclusions() {
        let registry = AgentRegistry::new();
        registry.register(agent("a", 10, &[Capability::Security]));
        registry.register(agent("b", 5, &[Capability::Security]));

        let selected = registry
            .select(Capability::Security, &["a".to_string()])
            .unwrap();
        assert_eq!(selected.name, "b");
    }

    #[test]
    fn select_skips_disabled_and_unhealthy() {
        let registry = AgentRegistry::new();
        registry.register(agent("disabled", 10, &[Capability::Testing]).disabled());
        registry.register(agent("flaky", 9, &[Capability::Testing]));
        registry.register(agent("steady", 1, &[Capability::Testing]));

        registry.record_outcome("flaky", false); // 100% error rate → unhealthy

        let selected = registry.select(Capability::Testing, &[]).unwrap();
        assert_eq!(selected.name, "steady");
    }

    #[test]
    fn select_none_when_capability_unmet() {
        let registry = AgentRegistry::new();
        registry.register(agent("a", 10, &[Capability::Frontend]));
        assert!(registry.select(Capability::Security, &[]).is_none());
    }

    #[test]
    fn all_with_includes_unhealthy_but_not_disabled() {
        let registry = AgentRegistry::new();
        registry.register(agent("sick", 10, &[Capability::CodeReview]));
        registry.register(agent("off", 10, &[Capability::CodeReview]).disabled());
        registry.register(agent("fine", 10, &[Capability::CodeReview]));

        registry.record_outcome("sick", false);

        let names: Vec<String> = registry
            .all_with(Capability::CodeReview)
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert!(names.contains(&"sick".to_string()));
        assert!(names.contains(&"fine".to_string()));
        assert!(!names.contains(&"off".to_string()));
    }

    #[test]
    fn reregistration_resets_health() {
        let registry = AgentRegistry::new();
        registry.register(agent("a", 10, &[Capability::Devops]));
        registry.record_outcome("a", false);
        assert!(!registry.health_of("a").unwrap().is_healthy);

        registry.register(agent("a", 10, &[Capability::Devops]));
        let health = registry.health_of("a").unwrap();
        assert!(health.is_healthy);
        assert_eq!(health.failure_count, 0);
    }

    #[test]
    fn health_report_snapshot() {
        let registry = AgentRegistry::new();
        registry.register(agent("a", 10, &[Capability::Backend]));
        registry.register(agent("b", 10, &[Capability::Backend]));
        registry.record_outcome("a", false);

        let report = registry.health_report();
        assert_eq!(report.total_agents, 2);
        assert_eq!(report.healthy_agents, 1);
        let a = report.agents.iter().find(|l| l.name == "a").unwrap();
        assert_eq!(a.failure_count, 1);
        assert!((a.error_rate - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn reconfiguration_hooks() {
        let registry = AgentRegistry::new();
        registry.register(agent("a", 1, &[Capability::Backend]));
        assert!(registry.set_priority("a", 20));
        assert!(registry.set_enabled("a", false));
        assert!(!registry.set_priority("ghost", 5));

        assert!(registry.select(Capability::Backend, &[]).is_none());
        registry.set_enabled("a", true);
        assert_eq!(
            registry.select(Capability::Backend, &[]).unwrap().priority,
            20
        );
    }

    #[test]
    fn concurrent_outcomes_are_not_lost() {
        use std::sync::Arc;
        let registry = Arc::new(AgentRegistry::new());
        registry.register(agent("a", 10, &[Capability::Backend]));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let reg = Arc::clone(&registry);
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    reg.record_outcome("a", true);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.health_of("a").unwrap().success_count, 800);
    }
}
