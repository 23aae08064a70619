use crate::context::DEFAULT_MAX_TOKENS;
use crate::error::Result;
use crate::gate::MissingDecisionPolicy;
use crate::io::atomic_write;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// AgentEntry
// ---------------------------------------------------------------------------

/// One agent in the workflow roster. Provider and capabilities are kept as
/// plain strings here so the core crate stays decoupled from the agent
/// layer; `foreman-agents` parses them into its typed enums at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentEntry {
    pub name: String,
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    pub capabilities: Vec<String>,
    #[serde(default = "default_agent_max_tokens")]
    pub max_tokens: u64,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Name of the environment variable holding the API key.
    #[serde(default)]
    pub api_key_env: Option<String>,
}

fn default_agent_max_tokens() -> u64 {
    100_000
}

fn default_priority() -> i32 {
    1
}

fn default_enabled() -> bool {
    true
}

// ---------------------------------------------------------------------------
// WorkflowConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    pub project_name: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u64,
    #[serde(default)]
    pub missing_decision_policy: MissingDecisionPolicy,
    #[serde(default)]
    pub agents: Vec<AgentEntry>,
}

fn default_max_tokens() -> u64 {
    DEFAULT_MAX_TOKENS
}

impl WorkflowConfig {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            missing_decision_policy: MissingDecisionPolicy::default(),
            agents: default_roster(),
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(crate::error::ForemanError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        Ok(serde_yaml::from_str(&data)?)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        atomic_write(&path, data.as_bytes())
    }
}

/// The stock multi-agent roster. Priorities follow the routing preference
/// order; the OpenAI entry ships disabled and is enabled per project.
pub fn default_roster() -> Vec<AgentEntry> {
    vec![
        AgentEntry {
            name: "claude-sonnet".into(),
            provider: "claude".into(),
            model: Some("claude-sonnet-4-5".into()),
            capabilities: vec![
                "code_generation".into(),
                "code_review".into(),
                "architecture".into(),
                "security".into(),
                "frontend".into(),
                "backend".into(),
                "devops".into(),
                "testing".into(),
                "documentation".into(),
                "long_context".into(),
            ],
            max_tokens: 200_000,
            priority: 10,
            enabled: true,
            endpoint: None,
            api_key_env: Some("ANTHROPIC_API_KEY".into()),
        },
        AgentEntry {
            name: "gemini-pro".into(),
            provider: "gemini".into(),
            model: Some("gemini-2.0-flash-exp".into()),
            capabilities: vec![
                "code_generation".into(),
                "multimodal".into(),
                "long_context".into(),
                "real_time".into(),
            ],
            max_tokens: 1_000_000,
            priority: 8,
            enabled: true,
            endpoint: Some("https://generativelanguage.googleapis.com/v1beta".into()),
            api_key_env: Some("GOOGLE_API_KEY".into()),
        },
        AgentEntry {
            name: "copilot".into(),
            provider: "copilot".into(),
            model: Some("gpt-4".into()),
            capabilities: vec![
                "code_completion".into(),
                "code_generation".into(),
                "code_review".into(),
            ],
            max_tokens: 8_000,
            priority: 7,
            enabled: true,
            endpoint: None,
            api_key_env: Some("GITHUB_TOKEN".into()),
        },
        AgentEntry {
            name: "gpt-4".into(),
            provider: "openai".into(),
            model: Some("gpt-4-turbo".into()),
            capabilities: vec![
                "code_generation".into(),
                "code_review".into(),
                "documentation".into(),
            ],
            max_tokens: 128_000,
            priority: 6,
            enabled: false,
            endpoint: None,
            api_key_env: Some("OPENAI_API_KEY".into()),
        },
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
