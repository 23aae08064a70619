//! Multi-agent task execution.
//!
//! Strategies never propagate agent failures as `Err`: every execution
//! produces a `TaskResult`, and a failed one carries the error text so the
//! caller can gate, retry, or surface it. Health outcomes are recorded for
//! every attempt, including the losing legs of a parallel run.

use crate::adapter::AdapterSet;
use crate::registry::AgentRegistry;
use crate::types::{
    AgentDescriptor, GenerateRequest, StepOutput, TaskResult, TaskSpec,
};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

// ─── Strategy ─────────────────────────────────────────────────────────────

/// How a single task is routed across the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Route to the single best-ranked agent; no retry.
    #[default]
    BestAgent,
    /// Fan out to every enabled agent with the capability and keep the
    /// strongest successful response.
    Parallel,
    /// Try agents in rank order, excluding each failure, up to the attempt
    /// limit.
    Fallback,
}

// ─── TaskOrchestrator ─────────────────────────────────────────────────────

pub struct TaskOrchestrator {
    registry: Arc<AgentRegistry>,
    adapters: AdapterSet,
    max_fallback_attempts: usize,
}

impl TaskOrchestrator {
    pub fn new(registry: Arc<AgentRegistry>, adapters: AdapterSet) -> Self {
        Self {
            registry,
            adapters,
            max_fallback_attempts: 3,
        }
    }

    pub fn with_max_fallback_attempts(mut self, attempts: usize) -> Self {
        self.max_fallback_attempts = attempts.max(1);
        self
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// Execute one task with the given strategy. Always returns a
    /// `TaskResult`; inspect `success` and `error`.
    pub async fn execute(&self, task: &TaskSpec, strategy: Strategy) -> TaskResult {
        match strategy {
            Strategy::BestAgent => self.execute_best(task).await,
            Strategy::Parallel => self.execute_parallel(task).await,
            Strategy::Fallback => self.execute_fallback(task).await,
        }
    }

    /// Run `tasks` in order, feeding each success into the context of every
    /// later step (keyed by 1-based step number). Each step uses the
    /// fallback strategy. The first failed step halts the pipeline; the
    /// returned vec is truncated at the failure, so its length tells the
    /// caller how far it got.
    pub async fn execute_pipeline(&self, tasks: Vec<TaskSpec>) -> Vec<TaskResult> {
        let mut results = Vec::with_capacity(tasks.len());
        let mut carry: std::collections::BTreeMap<usize, StepOutput> = Default::default();

        for (index, mut task) in tasks.into_iter().enumerate() {
            let step = index + 1;
            task.context.pipeline = carry.clone();

            info!(step, kind = %task.kind, "pipeline step starting");
            let result = self.execute_fallback(&task).await;

            if result.success {
                if let Some(response) = &result.response {
                    carry.insert(
                        step,
                        StepOutput {
                            task_kind: result.task_kind.clone(),
                            content: response.content.clone(),
                            agent: result.agent_name.clone(),
                        },
                    );
                }
                results.push(result);
            } else {
                warn!(step, kind = %task.kind, error = ?result.error, "pipeline halted");
                results.push(result);
                break;
            }
        }
        results
    }

    // ─── Strategies ───────────────────────────────────────────────────────

    async fn execute_best(&self, task: &TaskSpec) -> TaskResult {
        match self.registry.select(task.required_capability, &[]) {
            Some(agent) => self.attempt(task, &agent).await,
            None => TaskResult::failure(
                task,
                "none",
                format!(
                    "no healthy agent with capability {}",
                    task.required_capability
                ),
            ),
        }
    }

    async fn execute_fallback(&self, task: &TaskSpec) -> TaskResult {
        let mut excluded: Vec<String> = Vec::new();
        let mut last_error = format!(
            "no healthy agent with capability {}",
            task.required_capability
        );

        for attempt in 1..=self.max_fallback_attempts {
            let Some(agent) = self.registry.select(task.required_capability, &excluded) else {
                break;
            };
            debug!(attempt, agent = %agent.name, "fallback attempt");
            let result = self.attempt(task, &agent).await;
            if result.success {
                return result;
            }
            last_error = result.error.unwrap_or_else(|| "unknown failure".into());
            excluded.push(agent.name);
        }
        TaskResult::failure(task, "none", last_error)
    }

    async fn execute_parallel(&self, task: &TaskSpec) -> TaskResult {
        let agents = self.registry.all_with(task.required_capability);
        if agents.is_empty() {
            return TaskResult::failure(
                task,
                "none",
                format!(
                    "no enabled agent with capability {}",
                    task.required_capability
                ),
            );
        }

        let attempts = agents.iter().map(|agent| self.attempt(task, agent));
        let mut results = join_all(attempts).await;

        // keep the success whose completion consumed the most tokens,
        // treating token volume as a proxy for thoroughness
        let winner = results
            .iter()
            .enumerate()
            .filter(|(_, r)| r.success)
            .max_by_key(|(_, r)| r.response.as_ref().map(|resp| resp.tokens_used).unwrap_or(0))
            .map(|(i, _)| i);

        match winner {
            Some(index) => {
                let result = results.swap_remove(index);
                info!(
                    agent = %result.agent_name,
                    contenders = results.len() + 1,
                    "parallel consensus winner"
                );
                result
            }
            None => {
                let errors: Vec<String> = results
                    .into_iter()
                    .filter_map(|r| r.error)
                    .collect();
                TaskResult::failure(
                    task,
                    "none",
                    format!("all {} parallel attempts failed: {}", agents.len(), errors.join("; ")),
                )
            }
        }
    }

    // ─── Single attempt ───────────────────────────────────────────────────

    /// Run `task` on `agent`, timing the call and recording the outcome in
    /// the health map. Adapter errors become a failed `TaskResult`.
    async fn attempt(&self, task: &TaskSpec, agent: &AgentDescriptor) -> TaskResult {
        let adapter = match self.adapters.get(agent.provider) {
            Ok(adapter) => adapter,
            Err(e) => {
                self.registry.record_outcome(&agent.name, false);
                return TaskResult::failure(task, agent.name.clone(), e.to_string());
            }
        };

        let request = GenerateRequest::for_task(task, agent);
        let started = Instant::now();
        let outcome = adapter.generate(&request).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(response) => {
                self.registry.record_outcome(&agent.name, true);
                debug!(agent = %agent.name, elapsed_ms, tokens = response.tokens_used, "task completed");
                TaskResult {
                    task_kind: task.kind.clone(),
                    response: Some(response),
                    agent_name: agent.name.clone(),
                    execution_time_ms: elapsed_ms,
                    success: true,
                    error: None,
                }
            }
            Err(e) => {
                self.registry.record_outcome(&agent.name, false);
                warn!(agent = %agent.name, elapsed_ms, error = %e, "task failed");
                TaskResult {
                    task_kind: task.kind.clone(),
                    response: None,
                    agent_name: agent.name.clone(),
                    execution_time_ms: elapsed_ms,
                    success: false,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::Generator;
    use crate::error::{AgentError, Result};
    use crate::types::{Capability, GenerateResponse, Provider, TaskContext};
    use async_trait::async_trait;
    use std::collections::BTreeMap;

    /// Adapter scripted per model name: maps each model to a canned reply
    /// or an error, so one adapter can stand in for a whole roster.
    struct ScriptedAdapter {
        by_model: BTreeMap<String, std::result::Result<(String, u64), String>>,
    }

    impl ScriptedAdapter {
        fn new() -> Self {
            Self {
                by_model: BTreeMap::new(),
            }
        }

        fn ok(mut self, model: &str, content: &str, tokens: u64) -> Self {
            self.by_model
                .insert(model.to_string(), Ok((content.to_string(), tokens)));
            self
        }

        fn fail(mut self, model: &str, message: &str) -> Self {
            self.by_model
                .insert(model.to_string(), Err(message.to_string()));
            self
        }
    }

    #[async_trait]
    impl Generator for ScriptedAdapter {
        async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
            let model = request.model.as_deref().unwrap_or("");
            match self.by_model.get(model) {
                Some(Ok((content, tokens))) => Ok(GenerateResponse {
                    content: content.clone(),
                    tokens_used: *tokens,
                    finish_reason: "stop".into(),
                }),
                Some(Err(message)) => Err(AgentError::Api {
                    status: 500,
                    message: message.clone(),
                }),
                None => Err(AgentError::InvalidResponse(format!(
                    "unscripted model {model}"
                ))),
            }
        }

        fn provider(&self) -> Provider {
            Provider::Custom
        }
    }

    fn agent(name: &str, priority: i32, cap: Capability) -> AgentDescriptor {
        AgentDescriptor::new(name, Provider::Custom)
            .with_model(name)
            .with_priority(priority)
            .with_capabilities([cap])
    }

    fn orchestrator(adapter: ScriptedAdapter, agents: Vec<AgentDescriptor>) -> TaskOrchestrator {
        let registry = Arc::new(AgentRegistry::new());
        for a in agents {
            registry.register(a);
        }
        let adapters = AdapterSet::new().with(Arc::new(adapter));
        TaskOrchestrator::new(registry, adapters)
    }

    #[tokio::test]
    async fn best_agent_routes_to_highest_priority() {
        let orch = orchestrator(
            ScriptedAdapter::new().ok("alpha", "from alpha", 10).ok("beta", "from beta", 10),
            vec![
                agent("alpha", 10, Capability::CodeReview),
                agent("beta", 5, Capability::CodeReview),
            ],
        );

        let task = TaskSpec::new("review", "review this diff", Capability::CodeReview);
        let result = orch.execute(&task, Strategy::BestAgent).await;

        assert!(result.success);
        assert_eq!(result.agent_name, "alpha");
        assert_eq!(result.response.unwrap().content, "from alpha");
    }

    #[tokio::test]
    async fn best_agent_with_no_candidates_fails_cleanly() {
        let orch = orchestrator(ScriptedAdapter::new(), vec![]);
        let task = TaskSpec::new("audit", "audit the auth flow", Capability::Security);
        let result = orch.execute(&task, Strategy::BestAgent).await;

        assert!(!result.success);
        assert_eq!(result.agent_name, "none");
        assert!(result.error.unwrap().contains("security"));
    }

    #[tokio::test]
    async fn fallback_excludes_failed_agents_and_recovers() {
        let orch = orchestrator(
            ScriptedAdapter::new()
                .fail("flaky", "internal error")
                .ok("backup", "from backup", 5),
            vec![
                agent("flaky", 10, Capability::Backend),
                agent("backup", 5, Capability::Backend),
            ],
        );

        let task = TaskSpec::new("impl", "implement the endpoint", Capability::Backend);
        let result = orch.execute(&task, Strategy::Fallback).await;

        assert!(result.success);
        assert_eq!(result.agent_name, "backup");
        // the failure was recorded against the first agent
        let flaky = orch.registry().health_of("flaky").unwrap();
        assert_eq!(flaky.failure_count, 1);
    }

    #[tokio::test]
    async fn fallback_exhausts_attempt_limit() {
        let orch = orchestrator(
            ScriptedAdapter::new()
                .fail("a", "down")
                .fail("b", "down")
                .fail("c", "down")
                .ok("d", "never reached", 1),
            vec![
                agent("a", 10, Capability::Backend),
                agent("b", 9, Capability::Backend),
                agent("c", 8, Capability::Backend),
                agent("d", 7, Capability::Backend),
            ],
        );

        let task = TaskSpec::new("impl", "implement", Capability::Backend);
        let result = orch.execute(&task, Strategy::Fallback).await;

        assert!(!result.success);
        assert_eq!(result.agent_name, "none");
        // the fourth agent was never tried
        assert_eq!(orch.registry().health_of("d").unwrap().success_count, 0);
    }

    #[tokio::test]
    async fn parallel_picks_most_thorough_success() {
        let orch = orchestrator(
            ScriptedAdapter::new()
                .ok("terse", "short answer", 100)
                .ok("thorough", "long answer", 900)
                .fail("broken", "timeout"),
            vec![
                agent("terse", 10, Capability::Architecture),
                agent("thorough", 5, Capability::Architecture),
                agent("broken", 8, Capability::Architecture),
            ],
        );

        let task = TaskSpec::new("design", "design the system", Capability::Architecture);
        let result = orch.execute(&task, Strategy::Parallel).await;

        assert!(result.success);
        assert_eq!(result.agent_name, "thorough");
        assert_eq!(result.response.unwrap().tokens_used, 900);
        // every leg recorded an outcome
        assert_eq!(orch.registry().health_of("broken").unwrap().failure_count, 1);
        assert_eq!(orch.registry().health_of("terse").unwrap().success_count, 1);
    }

    #[tokio::test]
    async fn parallel_fails_when_all_legs_fail() {
        let orch = orchestrator(
            ScriptedAdapter::new().fail("a", "boom").fail("b", "bust"),
            vec![
                agent("a", 10, Capability::Testing),
                agent("b", 5, Capability::Testing),
            ],
        );

        let task = TaskSpec::new("test", "write tests", Capability::Testing);
        let result = orch.execute(&task, Strategy::Parallel).await;

        assert!(!result.success);
        let error = result.error.unwrap();
        assert!(error.contains("boom"));
        assert!(error.contains("bust"));
    }

    #[tokio::test]
    async fn pipeline_carries_prior_output_forward() {
        let orch = orchestrator(
            ScriptedAdapter::new()
                .ok("architect", "schema: users table", 50)
                .ok("builder", "CREATE TABLE users", 60),
            vec![
                agent("architect", 10, Capability::Architecture),
                agent("builder", 10, Capability::Backend),
            ],
        );

        let tasks = vec![
            TaskSpec::new("design", "design the schema", Capability::Architecture),
            TaskSpec::new("implement", "write the migration", Capability::Backend),
        ];
        let results = orch.execute_pipeline(tasks).await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.success));
        assert_eq!(results[0].agent_name, "architect");
        assert_eq!(results[1].agent_name, "builder");
    }

    #[tokio::test]
    async fn pipeline_halts_and_truncates_on_failure() {
        let orch = orchestrator(
            ScriptedAdapter::new()
                .ok("architect", "schema", 50)
                .fail("builder", "quota exceeded"),
            vec![
                agent("architect", 10, Capability::Architecture),
                agent("builder", 10, Capability::Backend),
                agent("tester", 10, Capability::Testing),
            ],
        );

        let tasks = vec![
            TaskSpec::new("design", "design", Capability::Architecture),
            TaskSpec::new("implement", "implement", Capability::Backend),
            TaskSpec::new("test", "test", Capability::Testing),
        ];
        let results = orch.execute_pipeline(tasks).await;

        // halted at step 2; step 3 never ran
        assert_eq!(results.len(), 2);
        assert!(results[0].success);
        assert!(!results[1].success);
        assert_eq!(orch.registry().health_of("tester").unwrap().success_count, 0);
    }

    #[tokio::test]
    async fn pipeline_context_reaches_later_steps() {
        // verify the request assembly itself, not just the result chain
        let task_one = TaskSpec::new("design", "design", Capability::Architecture);
        let mut task_two = TaskSpec::new("implement", "implement", Capability::Backend);
        task_two.context = TaskContext::default();
        task_two.context.pipeline.insert(
            1,
            StepOutput {
                task_kind: "design".into(),
                content: "schema: users table".into(),
                agent: "architect".into(),
            },
        );

        let agent = agent("builder", 10, Capability::Backend);
        let request = GenerateRequest::for_task(&task_two, &agent);
        assert!(request.prompt.contains("schema: users table"));
        assert!(request.prompt.contains("Step 1"));

        let bare = GenerateRequest::for_task(&task_one, &agent);
        assert!(!bare.prompt.contains("Prior pipeline output"));
    }
}
