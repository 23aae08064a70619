use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{error, info, warn};

// ---------------------------------------------------------------------------
// ContextAction
// ---------------------------------------------------------------------------

/// Recommended action at the current token-usage ratio.
///
/// `as_str` yields the legacy action strings embedded in checkpoint resume
/// instructions, so any front-end can act on them without knowing this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextAction {
    ContinueNormal,
    OptimizeContextClearCache,
    TriggerGracefulHandoff,
    ForceCheckpointAndExit,
}

impl ContextAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ContextAction::ContinueNormal => "CONTINUE_NORMAL",
            ContextAction::OptimizeContextClearCache => "OPTIMIZE_CONTEXT_CLEAR_CACHE",
            ContextAction::TriggerGracefulHandoff => "TRIGGER_GRACEFUL_HANDOFF",
            ContextAction::ForceCheckpointAndExit => "FORCE_CHECKPOINT_AND_EXIT",
        }
    }
}

impl fmt::Display for ContextAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ContextManager
// ---------------------------------------------------------------------------

/// Tracks cumulative token usage against a budget. The decision is a pure
/// function of `current_usage / max_tokens`; `update_usage` is the only
/// mutator.
#[derive(Debug, Clone)]
pub struct ContextManager {
    max_tokens: u64,
    current_usage: u64,
}

pub const WARNING_RATIO: f64 = 0.75;
pub const CRITICAL_RATIO: f64 = 0.85;
pub const EMERGENCY_RATIO: f64 = 0.95;

pub const DEFAULT_MAX_TOKENS: u64 = 200_000;

impl ContextManager {
    pub fn new(max_tokens: u64) -> Self {
        Self {
            max_tokens,
            current_usage: 0,
        }
    }

    pub fn update_usage(&mut self, tokens: u64) {
        self.current_usage = tokens;
    }

    pub fn current_usage(&self) -> u64 {
        self.current_usage
    }

    pub fn max_tokens(&self) -> u64 {
        self.max_tokens
    }

    pub fn usage_ratio(&self) -> f64 {
        if self.max_tokens == 0 {
            return 0.0;
        }
        self.current_usage as f64 / self.max_tokens as f64
    }

    pub fn check(&self) -> ContextAction {
        let ratio = self.usage_ratio();
        if ratio >= EMERGENCY_RATIO {
            error!(usage_pct = ratio * 100.0, "token budget emergency");
            ContextAction::ForceCheckpointAndExit
        } else if ratio >= CRITICAL_RATIO {
            warn!(usage_pct = ratio * 100.0, "token budget critical");
            ContextAction::TriggerGracefulHandoff
        } else if ratio >= WARNING_RATIO {
            info!(usage_pct = ratio * 100.0, "token budget warning");
            ContextAction::OptimizeContextClearCache
        } else {
            ContextAction::ContinueNormal
        }
    }
}

impl Default for ContextManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TOKENS)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn at(usage: u64) -> ContextAction {
        let mut mgr = ContextManager::new(200_000);
        mgr.update_usage(usage);
        mgr.check()
    }

    #[test]
    fn threshold_actions() {
        assert_eq!(at(100_000), ContextAction::ContinueNormal); // 50%
        assert_eq!(at(150_000), ContextAction::OptimizeContextClearCache); // 75%
        assert_eq!(at(170_000), ContextAction::TriggerGracefulHandoff); // 85%
        assert_eq!(at(190_000), ContextAction::ForceCheckpointAndExit); // 95%
    }

    #[test]
    fn boundaries_are_inclusive() {
        assert_eq!(at(149_999), ContextAction::ContinueNormal);
        assert_eq!(at(169_999), ContextAction::OptimizeContextClearCache);
        assert_eq!(at(189_999), ContextAction::TriggerGracefulHandoff);
        assert_eq!(at(200_000), ContextAction::ForceCheckpointAndExit);
    }

    #[test]
    fn zero_budget_continues() {
        let mgr = ContextManager::new(0);
        assert_eq!(mgr.check(), ContextAction::ContinueNormal);
    }

    #[test]
    fn action_strings() {
        assert_eq!(
            ContextAction::ForceCheckpointAndExit.as_str(),
            "FORCE_CHECKPOINT_AND_EXIT"
        );
        assert_eq!(
            ContextAction::OptimizeContextClearCache.as_str(),
            "OPTIMIZE_CONTEXT_CLEAR_CACHE"
        );
        assert_eq!(ContextAction::ContinueNormal.as_str(), "CONTINUE_NORMAL");
    }
}
