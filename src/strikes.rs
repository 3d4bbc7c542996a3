//! Strike and violation tracking for delivery agents.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    LateStockPhoto,
    UndeclaredMismatch,
    UnconfirmedAssignment,
    UnreportedFailedDelivery,
    Other(String),
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViolationKind::LateStockPhoto => write!(f, "Late stock photo"),
            ViolationKind::UndeclaredMismatch => write!(f, "Undeclared mismatch"),
            ViolationKind::UnconfirmedAssignment => write!(f, "Assignment not confirmed in time"),
            ViolationKind::UnreportedFailedDelivery => write!(f, "Failed delivery not reported"),
            ViolationKind::Other(text) => write!(f, "{text}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Strike,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub date: NaiveDate,
    pub severity: Severity,
    #[serde(default)]
    pub notes: String,
}

/// Where an agent stands given their strike count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Standing {
    Clean,
    Warned,
    /// One strike away from blacklist; guarantors are notified
    Critical,
    Blacklisted,
}

/// Raised when recording a violation moves the agent into a worse standing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrikeAlert {
    NotifyGuarantors { strikes: u32 },
    Blacklist { strikes: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrikeLedger {
    agent_id: String,
    max_strikes: u32,
    violations: Vec<Violation>,
}

impl StrikeLedger {
    pub fn new(agent_id: impl Into<String>, max_strikes: u32) -> Self {
        Self {
            agent_id: agent_id.into(),
            max_strikes: max_strikes.max(1),
            violations: Vec::new(),
        }
    }

    pub fn with_history(agent_id: impl Into<String>, max_strikes: u32, violations: Vec<Violation>) -> Self {
        let mut ledger = Self::new(agent_id, max_strikes);
        ledger.violations = violations;
        ledger
    }

    pub fn strikes(&self) -> u32 {
        self.violations
            .iter()
            .filter(|v| v.severity == Severity::Strike)
            .count() as u32
    }

    pub fn standing(&self) -> Standing {
        Self::standing_for(self.strikes(), self.max_strikes)
    }

    fn standing_for(strikes: u32, max_strikes: u32) -> Standing {
        if strikes >= max_strikes {
            Standing::Blacklisted
        } else if strikes + 1 == max_strikes {
            Standing::Critical
        } else if strikes > 0 {
            Standing::Warned
        } else {
            Standing::Clean
        }
    }

    /// Record a violation and report any escalation it causes.
    pub fn record(&mut self, violation: Violation) -> Option<StrikeAlert> {
        let before = self.standing();
        self.violations.push(violation);
        let after = self.standing();
        let strikes = self.strikes();

        if before == after {
            return None;
        }

        match after {
            Standing::Blacklisted => {
                error!(agent_id = %self.agent_id, strikes, "Agent reached strike limit");
                Some(StrikeAlert::Blacklist { strikes })
            }
            Standing::Critical => {
                warn!(agent_id = %self.agent_id, strikes, "Agent one strike from blacklist");
                Some(StrikeAlert::NotifyGuarantors { strikes })
            }
            Standing::Warned | Standing::Clean => None,
        }
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn max_strikes(&self) -> u32 {
        self.max_strikes
    }
}
