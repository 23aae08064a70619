use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ─── Provider ─────────────────────────────────────────────────────────────

/// Supported AI agent providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Claude,
    Gemini,
    Copilot,
    Openai,
    Custom,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Claude => "claude",
            Provider::Gemini => "gemini",
            Provider::Copilot => "copilot",
            Provider::Openai => "openai",
            Provider::Custom => "custom",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Provider {
    type Err = crate::error::AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "claude" => Ok(Provider::Claude),
            "gemini" => Ok(Provider::Gemini),
            "copilot" => Ok(Provider::Copilot),
            "openai" => Ok(Provider::Openai),
            "custom" => Ok(Provider::Custom),
            _ => Err(crate::error::AgentError::NotConfigured(format!(
                "unknown provider: {s}"
            ))),
        }
    }
}

// ─── Capability ───────────────────────────────────────────────────────────

/// Capability tags used for task routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    CodeGeneration,
    CodeReview,
    Architecture,
    Security,
    Frontend,
    Backend,
    Devops,
    Testing,
    Documentation,
    Multimodal,
    LongContext,
    RealTime,
    CodeCompletion,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::CodeGeneration => "code_generation",
            Capability::CodeReview => "code_review",
            Capability::Architecture => "architecture",
            Capability::Security => "security",
            Capability::Frontend => "frontend",
            Capability::Backend => "backend",
            Capability::Devops => "devops",
            Capability::Testing => "testing",
            Capability::Documentation => "documentation",
            Capability::Multimodal => "multimodal",
            Capability::LongContext => "long_context",
            Capability::RealTime => "real_time",
            Capability::CodeCompletion => "code_completion",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Capability {
    type Err = crate::error::AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "code_generation" => Ok(Capability::CodeGeneration),
            "code_review" => Ok(Capability::CodeReview),
            "architecture" => Ok(Capability::Architecture),
            "security" => Ok(Capability::Security),
            "frontend" => Ok(Capability::Frontend),
            "backend" => Ok(Capability::Backend),
            "devops" => Ok(Capability::Devops),
            "testing" => Ok(Capability::Testing),
            "documentation" => Ok(Capability::Documentation),
            "multimodal" => Ok(Capability::Multimodal),
            "long_context" => Ok(Capability::LongContext),
            "real_time" => Ok(Capability::RealTime),
            "code_completion" => Ok(Capability::CodeCompletion),
            _ => Err(crate::error::AgentError::NotConfigured(format!(
                "unknown capability: {s}"
            ))),
        }
    }
}

// ─── AgentDescriptor ──────────────────────────────────────────────────────

/// Registry entry for one agent. Immutable once registered except for the
/// `enabled`/`priority` reconfiguration hooks on the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub name: String,
    pub provider: Provider,
    #[serde(default)]
    pub model: Option<String>,
    pub capabilities: BTreeSet<Capability>,
    pub max_tokens: u64,
    /// Higher = preferred for routing.
    pub priority: i32,
    pub enabled: bool,
}

impl AgentDescriptor {
    pub fn new(name: impl Into<String>, provider: Provider) -> Self {
        Self {
            name: name.into(),
            provider,
            model: None,
            capabilities: BTreeSet::new(),
            max_tokens: 100_000,
            priority: 1,
            enabled: true,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_capabilities(mut self, caps: impl IntoIterator<Item = Capability>) -> Self {
        self.capabilities = caps.into_iter().collect();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u64) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

// ─── AgentHealth ──────────────────────────────────────────────────────────

/// Per-agent health record, updated after every execution attempt.
///
/// There is no automatic recovery: once `error_rate` exceeds 0.5 the agent
/// stays unhealthy until it is re-registered. Operator intervention is the
/// intended path back for a flaky agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentHealth {
    pub is_healthy: bool,
    pub success_count: u64,
    pub failure_count: u64,
    pub error_rate: f64,
    pub last_check: DateTime<Utc>,
}

impl AgentHealth {
    pub fn healthy() -> Self {
        Self {
            is_healthy: true,
            success_count: 0,
            failure_count: 0,
            error_rate: 0.0,
            last_check: Utc::now(),
        }
    }

    /// Record one outcome, recomputing the error rate exactly as
    /// failures / (successes + failures).
    pub fn record(&mut self, success: bool) {
        if success {
            self.success_count += 1;
        } else {
            self.failure_count += 1;
        }
        self.error_rate =
            self.failure_count as f64 / (self.success_count + self.failure_count) as f64;
        self.last_check = Utc::now();
        if self.error_rate > 0.5 {
            self.is_healthy = false;
        }
    }
}

// ─── TaskSpec / TaskContext ───────────────────────────────────────────────

/// Output of one completed pipeline step, carried into later steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutput {
    pub task_kind: String,
    pub content: String,
    pub agent: String,
}

/// Key-value options sent along with a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskContext {
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Prior pipeline outputs, keyed by 1-based step index. Populated by
    /// the pipeline combinator before each step executes.
    #[serde(default)]
    pub pipeline: BTreeMap<usize, StepOutput>,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    8192
}

impl Default for TaskContext {
    fn default() -> Self {
        Self {
            system: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            pipeline: BTreeMap::new(),
        }
    }
}

/// A unit of work routed to an agent. Created per work item, immutable,
/// consumed once by an execution strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Free-form task tag (e.g. "code_generation", "security_audit").
    pub kind: String,
    /// Prompt text sent to the agent.
    pub description: String,
    pub context: TaskContext,
    pub required_capability: Capability,
    #[serde(default = "default_task_priority")]
    pub priority: i32,
}

fn default_task_priority() -> i32 {
    1
}

impl TaskSpec {
    pub fn new(
        kind: impl Into<String>,
        description: impl Into<String>,
        required_capability: Capability,
    ) -> Self {
        Self {
            kind: kind.into(),
            description: description.into(),
            context: TaskContext::default(),
            required_capability,
            priority: 1,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.context.system = Some(system.into());
        self
    }
}

// ─── GenerateRequest / GenerateResponse ───────────────────────────────────

/// Wire-level adapter request, derived from a `TaskSpec`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(default)]
    pub system_instruction: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    #[serde(default)]
    pub model: Option<String>,
}

impl GenerateRequest {
    /// Build the adapter request for `task` as executed by `agent`,
    /// flattening any pipeline carry-over into the prompt.
    pub fn for_task(task: &TaskSpec, agent: &AgentDescriptor) -> Self {
        let mut prompt = task.description.clone();
        if !task.context.pipeline.is_empty() {
            prompt.push_str("\n\n## Prior pipeline output\n");
            for (step, output) in &task.context.pipeline {
                prompt.push_str(&format!(
                    "\n### Step {step} ({}) by {}\n{}\n",
                    output.task_kind, output.agent, output.content
                ));
            }
        }
        Self {
            prompt,
            system_instruction: task.context.system.clone(),
            temperature: task.context.temperature,
            max_tokens: task.context.max_tokens,
            model: agent.model.clone(),
        }
    }
}

/// Adapter response. Adapters must return `Err` on any transport or API
/// failure — never a sentinel value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub content: String,
    pub tokens_used: u64,
    pub finish_reason: String,
}

// ─── TaskResult ───────────────────────────────────────────────────────────

/// Outcome of executing a `TaskSpec`. Never mutated after creation; passed
/// forward into pipeline context or gate artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_kind: String,
    pub response: Option<GenerateResponse>,
    pub agent_name: String,
    pub execution_time_ms: u64,
    pub success: bool,
    pub error: Option<String>,
}

impl TaskResult {
    pub fn failure(task: &TaskSpec, agent_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            task_kind: task.kind.clone(),
            response: None,
            agent_name: agent_name.into(),
            execution_time_ms: 0,
            success: false,
            error: Some(error.into()),
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
