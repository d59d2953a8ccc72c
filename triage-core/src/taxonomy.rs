use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Incident urgency. Declared most urgent first, so `P1 < P2 < P3` under `Ord`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Complete outage, revenue impact or data-loss risk.
    P1,
    /// Significant degradation or partial outage.
    P2,
    /// Minor issue with no immediate user impact.
    P3,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::P1, Severity::P2, Severity::P3];

    /// Total parse of untrusted text. Anything unrecognised is `P3`.
    pub fn parse_or_default(value: &str) -> Self {
        value.parse().unwrap_or(Severity::P3)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::P1 => "P1",
            Severity::P2 => "P2",
            Severity::P3 => "P3",
        }
    }

    pub fn is_critical(&self) -> bool {
        matches!(self, Severity::P1)
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "P1" => Ok(Severity::P1),
            "P2" => Ok(Severity::P2),
            "P3" => Ok(Severity::P3),
            other => Err(format!("invalid severity '{other}'")),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Incident category. Selects the escalation team and the runbook template.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Infra,
    App,
    Database,
    Network,
    Security,
    Unknown,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Infra,
        Category::App,
        Category::Database,
        Category::Network,
        Category::Security,
        Category::Unknown,
    ];

    /// Total parse of untrusted text. Anything unrecognised is `Unknown`.
    pub fn parse_or_default(value: &str) -> Self {
        value.parse().unwrap_or(Category::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Infra => "infra",
            Category::App => "app",
            Category::Database => "database",
            Category::Network => "network",
            Category::Security => "security",
            Category::Unknown => "unknown",
        }
    }

    pub fn escalation_team(&self) -> &'static str {
        match self {
            Category::Infra => "Platform",
            Category::App => "Backend",
            Category::Database => "Database",
            Category::Network => "Network",
            Category::Security => "Security",
            Category::Unknown => "On-Call",
        }
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "infra" => Ok(Category::Infra),
            "app" => Ok(Category::App),
            "database" => Ok(Category::Database),
            "network" => Ok(Category::Network),
            "security" => Ok(Category::Security),
            "unknown" => Ok(Category::Unknown),
            other => Err(format!("invalid category '{other}'")),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
