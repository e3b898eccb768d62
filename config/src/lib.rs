//! Configuration for Converge.
//!
//! A single TOML file describes the promotion gate, its validation policy and
//! the execution budget of a run:
//!
//! ```toml
//! [gate]
//! id = "truth-gate"
//! require_evidence = true
//! grant_resolution = "most_restrictive"
//!
//! [policy]
//! name = "claims"
//! [[policy.checks]]
//! rule = "non_empty_content"
//! [[policy.checks]]
//! rule = "max_content_length"
//! max_bytes = 8192
//!
//! [budget]
//! cycles = 16
//! facts = 8
//! tokens = 100000
//! ```
//!
//! Every section is optional. Nothing in the file can grant authority: grants
//! are minted in code through a gate's issuer.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::{env, fs, io};

use serde::Deserialize;
use thiserror::Error;

use converge_core::{
    AuthorityIssuer, CheckRule, ExecutionBudget, GateConfig, GateId, GrantResolution,
    PromotionGate, Timestamp, TypeError, ValidationPolicy,
};

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV: &str = "CONVERGE_CONFIG";

pub const DEFAULT_GATE_ID: &str = "truth-gate";
pub const DEFAULT_POLICY_NAME: &str = "default";
pub const DEFAULT_CYCLES: u64 = 16;
pub const DEFAULT_FACTS: u64 = 8;
pub const DEFAULT_TOKENS: u64 = 100_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse config: {source}")]
    Parse {
        path: Option<PathBuf>,
        source: toml::de::Error,
    },
    #[error("invalid `{field}`: {message}")]
    Invalid { field: &'static str, message: String },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Read { path, .. } => Some(path),
            Self::Parse { path, .. } => path.as_deref(),
            Self::Invalid { .. } => None,
        }
    }
}

impl From<TypeError> for ConfigError {
    fn from(err: TypeError) -> Self {
        Self::Invalid {
            field: "policy",
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ConvergeConfig {
    pub gate: Option<GateSection>,
    pub policy: Option<PolicySection>,
    pub budget: Option<BudgetSection>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GateSection {
    /// Defaults to `truth-gate`.
    pub id: Option<String>,
    #[serde(default)]
    pub require_evidence: bool,
    #[serde(default)]
    pub require_replayable_trace: bool,
    #[serde(default)]
    pub grant_resolution: GrantResolution,
}

#[derive(Debug, Default, Deserialize)]
pub struct PolicySection {
    pub name: Option<String>,
    #[serde(default)]
    pub checks: Vec<CheckRule>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BudgetSection {
    pub cycles: Option<u64>,
    pub facts: Option<u64>,
    pub tokens: Option<u64>,
    /// Absolute deadline in unix milliseconds.
    pub deadline_ms: Option<i64>,
}

impl ConvergeConfig {
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse { path: None, source })
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "Failed to read config");
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };
        match toml::from_str(&content) {
            Ok(config) => {
                tracing::debug!(path = %path.display(), "Loaded config");
                Ok(config)
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "Failed to parse config");
                Err(ConfigError::Parse {
                    path: Some(path.to_path_buf()),
                    source: err,
                })
            }
        }
    }

    /// Load from [`config_path`]. `Ok(None)` when no file exists.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let Some(path) = config_path() else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from(&path).map(Some)
    }

    pub fn gate_config(&self) -> Result<GateConfig, ConfigError> {
        let section = self.gate.as_ref();
        let id = section
            .and_then(|gate| gate.id.as_deref())
            .unwrap_or(DEFAULT_GATE_ID);
        let gate_id = GateId::new(id).map_err(|err| ConfigError::Invalid {
            field: "gate.id",
            message: err.to_string(),
        })?;

        let mut config = GateConfig::new(gate_id);
        if let Some(section) = section {
            config.require_evidence = section.require_evidence;
            config.require_replayable_trace = section.require_replayable_trace;
            config.grant_resolution = section.grant_resolution;
        }
        Ok(config)
    }

    /// The configured policy, or `[non_empty_content]` when the section is
    /// absent.
    pub fn validation_policy(&self) -> Result<ValidationPolicy, ConfigError> {
        let Some(section) = self.policy.as_ref() else {
            return Ok(ValidationPolicy::builder(DEFAULT_POLICY_NAME)
                .rule(CheckRule::NonEmptyContent)
                .build()?);
        };
        let name = section.name.as_deref().unwrap_or(DEFAULT_POLICY_NAME);
        for check in &section.checks {
            if let CheckRule::MinConfidence { min } = check
                && !(0.0..=1.0).contains(min)
            {
                tracing::warn!(
                    policy = name,
                    min = *min,
                    "min_confidence outside [0, 1]; confidence is clamped to that range"
                );
            }
        }
        Ok(ValidationPolicy::builder(name)
            .rules(section.checks.iter().cloned())
            .build()?)
    }

    pub fn execution_budget(&self) -> ExecutionBudget {
        let section = self.budget.as_ref();
        let cycles = section.and_then(|b| b.cycles).unwrap_or(DEFAULT_CYCLES);
        let facts = section.and_then(|b| b.facts).unwrap_or(DEFAULT_FACTS);
        let tokens = section.and_then(|b| b.tokens).unwrap_or(DEFAULT_TOKENS);
        if cycles == 0 {
            tracing::warn!("budget.cycles is 0; every run stops before its first cycle");
        }

        let budget = ExecutionBudget::new(cycles, facts, tokens);
        match section.and_then(|b| b.deadline_ms) {
            Some(deadline) => budget.with_deadline(Timestamp::from_unix_millis(deadline)),
            None => budget,
        }
    }

    /// Build the gate described by the `[gate]` and `[policy]` sections,
    /// together with the issuer whose grants it accepts.
    pub fn build_gate(&self) -> Result<(PromotionGate, AuthorityIssuer), ConfigError> {
        Ok(PromotionGate::new(
            self.gate_config()?,
            self.validation_policy()?,
        ))
    }
}

/// `$CONVERGE_CONFIG` if set, otherwise `~/.converge/config.toml`.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    resolve_path(env::var_os(CONFIG_ENV))
}

fn resolve_path(override_path: Option<OsString>) -> Option<PathBuf> {
    match override_path {
        Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
        _ => dirs::home_dir().map(|home| home.join(".converge").join("config.toml")),
    }
}
