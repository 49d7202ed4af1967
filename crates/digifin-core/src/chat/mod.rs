//! Chatbot query resolution
//!
//! A query is first checked against an ordered table of keyword rules that
//! answer from the expense snapshot. The first matching rule wins. Anything
//! no rule claims goes to the generative backend with the snapshot embedded
//! in the prompt; if that fails for any reason the user gets a fixed apology.
//!
//! # Configuration
//!
//! Environment variables:
//! - `DIGIFIN_CURRENCY`: Symbol prefixed to amounts (default: ₹)
//! - `DIGIFIN_FOOD_MATCH`: `exact` (default) or `ignore_case`
//! - `DIGIFIN_AI_TIMEOUT_SECS`: Bound on a model call (default: 30)

mod rules;
mod transcript;

pub use rules::{default_rules, format_amount, Answer, Rule};
pub use transcript::Transcript;

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::ai::{AIBackend, AIClient};
use crate::error::Error;
use crate::models::Expense;

/// Reply used whenever the generative fallback cannot produce an answer
pub const FALLBACK_REPLY: &str = "⚠️ Sorry, I couldn’t process that right now.";

/// First bot message of every transcript
pub const GREETING: &str = "👋 Hi! I'm your multilingual finance assistant. Ask me anything!";

pub const DEFAULT_CURRENCY_SYMBOL: &str = "₹";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// How the food rule compares categories against "Food"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryMatch {
    /// Only "Food" counts
    #[default]
    Exact,
    /// "Food", "food", "FOOD" all count
    IgnoreCase,
}

impl CategoryMatch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::IgnoreCase => "ignore_case",
        }
    }
}

impl FromStr for CategoryMatch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "ignore_case" | "ignorecase" | "insensitive" => Ok(Self::IgnoreCase),
            _ => Err(format!("Unknown category match mode: {}", s)),
        }
    }
}

/// Knobs for the resolver
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverConfig {
    pub currency_symbol: String,
    pub food_match: CategoryMatch,
    /// Upper bound on a single model call
    pub timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            currency_symbol: DEFAULT_CURRENCY_SYMBOL.to_string(),
            food_match: CategoryMatch::Exact,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ResolverConfig {
    /// Read overrides from the environment, keeping defaults for anything
    /// unset or unparseable
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(symbol) = std::env::var("DIGIFIN_CURRENCY") {
            if !symbol.trim().is_empty() {
                config.currency_symbol = symbol.trim().to_string();
            }
        }

        if let Ok(mode) = std::env::var("DIGIFIN_FOOD_MATCH") {
            match mode.parse() {
                Ok(m) => config.food_match = m,
                Err(e) => warn!(error = %e, "Ignoring DIGIFIN_FOOD_MATCH"),
            }
        }

        if let Ok(secs) = std::env::var("DIGIFIN_AI_TIMEOUT_SECS") {
            match secs.trim().parse::<u64>() {
                Ok(s) if s > 0 => config.timeout = Duration::from_secs(s),
                _ => warn!(value = %secs, "Ignoring DIGIFIN_AI_TIMEOUT_SECS"),
            }
        }

        config
    }
}

/// Which path produced a reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "rule")]
pub enum ReplySource {
    /// A keyword rule, by name
    Rule(String),
    /// The generative backend answered
    Model,
    /// The backend failed, timed out, or is not configured
    Fallback,
}

/// A reply plus the path that produced it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub reply: String,
    pub source: ReplySource,
}

impl Resolution {
    fn fallback() -> Self {
        Self {
            reply: FALLBACK_REPLY.to_string(),
            source: ReplySource::Fallback,
        }
    }
}

/// Build the prompt sent to the generative backend
pub fn build_prompt(query: &str, expenses: &[Expense]) -> serde_json::Result<String> {
    let snapshot = serde_json::to_string(expenses)?;
    Ok(format!(
        "You are a multilingual financial assistant. \
         Answer the following user query in the same language: \"{}\". \
         The user’s expenses are: {}",
        query, snapshot
    ))
}

/// Maps a query and an expense snapshot to a reply
///
/// Holds no per-conversation state; one resolver can serve every session.
#[derive(Clone)]
pub struct QueryResolver {
    ai: Option<AIClient>,
    config: ResolverConfig,
    rules: Vec<Rule>,
}

impl QueryResolver {
    pub fn new(ai: Option<AIClient>, config: ResolverConfig) -> Self {
        Self {
            ai,
            config,
            rules: default_rules(),
        }
    }

    /// Backend from `AIClient::from_env`, config from `ResolverConfig::from_env`
    pub fn from_env() -> Self {
        Self::new(AIClient::from_env(), ResolverConfig::from_env())
    }

    /// Add a rule below the built-in ones
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Rules in the order they are tried
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn ai(&self) -> Option<&AIClient> {
        self.ai.as_ref()
    }

    /// Answer a query
    ///
    /// Never fails: backend trouble turns into `FALLBACK_REPLY`.
    pub async fn resolve(&self, query: &str, expenses: &[Expense]) -> Resolution {
        let lowered = query.to_lowercase();

        if let Some(rule) = self.rules.iter().find(|r| r.matches(&lowered)) {
            debug!(rule = rule.name, "Query answered by rule");
            return Resolution {
                reply: rule.answer(expenses, &self.config),
                source: ReplySource::Rule(rule.name.to_string()),
            };
        }

        self.ask_model(query, expenses).await
    }

    async fn ask_model(&self, query: &str, expenses: &[Expense]) -> Resolution {
        let Some(ai) = &self.ai else {
            warn!("No generative backend configured, using fallback reply");
            return Resolution::fallback();
        };

        let prompt = match build_prompt(query, expenses) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "Failed to serialize expenses for prompt");
                return Resolution::fallback();
            }
        };

        match tokio::time::timeout(self.config.timeout, ai.generate(&prompt)).await {
            Ok(Ok(text)) if !text.trim().is_empty() => {
                debug!(model = %ai.model(), chars = text.len(), "Query answered by model");
                Resolution {
                    reply: text,
                    source: ReplySource::Model,
                }
            }
            Ok(Ok(_)) => {
                warn!(model = %ai.model(), "Model returned empty text");
                Resolution::fallback()
            }
            Ok(Err(e)) => {
                warn!(model = %ai.model(), host = %ai.host(), error = %e, "Model call failed");
                Resolution::fallback()
            }
            Err(_) => {
                let err = Error::Timeout(self.config.timeout.as_secs());
                warn!(model = %ai.model(), error = %err, "Model call timed out");
                Resolution::fallback()
            }
        }
    }
}
