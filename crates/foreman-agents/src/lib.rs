//! `foreman-agents` — multi-agent task routing for the foreman workspace.
//!
//! # Architecture
//!
//! ```text
//! TaskSpec
//!     │
//!     ▼
//! TaskOrchestrator  ← picks a Strategy (best agent / fallback / parallel)
//!     │                and a pipeline combinator for chained tasks
//!     ▼
//! AgentRegistry     ← capability routing, priority ordering, health
//!     │                accounting (error rate > 50% marks unhealthy)
//!     ▼
//! Generator trait   ← one adapter per provider; failures are values,
//!                     never panics, never leaked exceptions
//! ```
//!
//! Agent-level errors never propagate out of the orchestrator: every
//! attempt is captured into a [`TaskResult`], and callers branch on
//! `result.success`.

pub mod adapter;
pub mod error;
pub mod orchestrator;
pub mod registry;
pub mod types;

pub use adapter::{AdapterSet, Generator, HttpGenerator, HttpGeneratorConfig};
pub use error::{AgentError, Result};
pub use orchestrator::{Strategy, TaskOrchestrator};
pub use registry::{AgentRegistry, HealthReport};
pub use types::{
    AgentDescriptor, AgentHealth, Capability, GenerateRequest, GenerateResponse, Provider,
    StepOutput, TaskContext, TaskResult, TaskSpec,
};
