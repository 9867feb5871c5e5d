//! Codex subscription plans and their published usage limits.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Codex subscription plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    Unknown,
    Free,
    Go,
    Plus,
    Pro,
    Team,
    Business,
    Enterprise,
    Edu,
    ApiKey,
}

impl Plan {
    /// Parse a plan name as reported by tokens or the app-server.
    ///
    /// Case-insensitive; unrecognised names map to `Unknown`.
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "free" => Plan::Free,
            "go" => Plan::Go,
            "plus" => Plan::Plus,
            "pro" => Plan::Pro,
            "team" => Plan::Team,
            "business" => Plan::Business,
            "enterprise" => Plan::Enterprise,
            "edu" => Plan::Edu,
            "api_key" => Plan::ApiKey,
            _ => Plan::Unknown,
        }
    }

    /// Human-readable name for headers.
    pub fn display_name(&self) -> &'static str {
        match self {
            Plan::Unknown => "Unknown",
            Plan::Free => "Free",
            Plan::Go => "Go",
            Plan::Plus => "Plus",
            Plan::Pro => "Pro",
            Plan::Team => "Team",
            Plan::Business => "Business",
            Plan::Enterprise => "Enterprise",
            Plan::Edu => "Edu",
            Plan::ApiKey => "API key",
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A usage allowance, either a numeric range or a qualitative state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitRange {
    Range { min: u32, max: u32 },
    Unlimited,
    UsageBased,
    NotAvailable,
}

impl fmt::Display for LimitRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            LimitRange::Unlimited => f.write_str("No fixed limits"),
            LimitRange::UsageBased => f.write_str("Usage-based"),
            LimitRange::NotAvailable => f.write_str("Not available"),
            LimitRange::Range { min, max } if min > 0 && max > 0 => {
                if min == max {
                    write!(f, "{}", min)
                } else {
                    write!(f, "{}-{}", min, max)
                }
            }
            LimitRange::Range { .. } => f.write_str("Unknown"),
        }
    }
}

/// Published limits for one plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanLimits {
    pub plan: Plan,
    pub local_messages_5h: LimitRange,
    pub cloud_tasks_5h: LimitRange,
    pub code_reviews_week: LimitRange,
    pub notes: &'static [&'static str],
}

const STANDARD_NOTES: &[&str] = &[
    "Limits depend on task size, complexity, and model.",
    "Local and cloud share a five-hour window.",
    "Additional weekly limits may apply.",
    "GPT-5.1-Codex-Mini can provide up to 4x more local messages.",
];

const BUSINESS_NOTES: &[&str] = &[
    "Limits depend on task size, complexity, and model.",
    "Local and cloud share a five-hour window.",
    "Additional weekly limits may apply.",
    "GPT-5.1-Codex-Mini can provide up to 4x more local messages.",
    "Cloud features may require flexible pricing.",
];

const CREDIT_NOTES: &[&str] = &[
    "No fixed limits; usage scales with credits.",
    "Non-flexible plans may follow Plus limits.",
];

const fn range(min: u32, max: u32) -> LimitRange {
    LimitRange::Range { min, max }
}

/// Known limits in display order.
const PLAN_LIMITS: &[PlanLimits] = &[
    PlanLimits {
        plan: Plan::Plus,
        local_messages_5h: range(45, 225),
        cloud_tasks_5h: range(10, 60),
        code_reviews_week: range(10, 25),
        notes: STANDARD_NOTES,
    },
    PlanLimits {
        plan: Plan::Pro,
        local_messages_5h: range(300, 1500),
        cloud_tasks_5h: range(50, 400),
        code_reviews_week: range(100, 250),
        notes: STANDARD_NOTES,
    },
    PlanLimits {
        plan: Plan::Business,
        local_messages_5h: range(45, 225),
        cloud_tasks_5h: range(10, 60),
        code_reviews_week: range(10, 25),
        notes: BUSINESS_NOTES,
    },
    PlanLimits {
        plan: Plan::Enterprise,
        local_messages_5h: LimitRange::Unlimited,
        cloud_tasks_5h: LimitRange::Unlimited,
        code_reviews_week: LimitRange::Unlimited,
        notes: CREDIT_NOTES,
    },
    PlanLimits {
        plan: Plan::Edu,
        local_messages_5h: LimitRange::Unlimited,
        cloud_tasks_5h: LimitRange::Unlimited,
        code_reviews_week: LimitRange::Unlimited,
        notes: CREDIT_NOTES,
    },
    PlanLimits {
        plan: Plan::ApiKey,
        local_messages_5h: LimitRange::UsageBased,
        cloud_tasks_5h: LimitRange::NotAvailable,
        code_reviews_week: LimitRange::NotAvailable,
        notes: &["Usage billed at standard API rates."],
    },
];

/// Limits for `plan`, or `None` when no limits are published for it.
pub fn plan_limits_for(plan: Plan) -> Option<&'static PlanLimits> {
    PLAN_LIMITS.iter().find(|limits| limits.plan == plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(Plan::normalize("plus"), Plan::Plus);
        assert_eq!(Plan::normalize("  PRO "), Plan::Pro);
        assert_eq!(Plan::normalize("api_key"), Plan::ApiKey);
        assert_eq!(Plan::normalize(""), Plan::Unknown);
        assert_eq!(Plan::normalize("platinum"), Plan::Unknown);
    }

    #[test]
    fn test_display_name() {
        assert_eq!(Plan::Plus.to_string(), "Plus");
        assert_eq!(Plan::ApiKey.to_string(), "API key");
        assert_eq!(Plan::Unknown.to_string(), "Unknown");
    }

    #[test]
    fn test_limit_range_display() {
        assert_eq!(range(45, 225).to_string(), "45-225");
        assert_eq!(range(10, 10).to_string(), "10");
        assert_eq!(range(0, 0).to_string(), "Unknown");
        assert_eq!(LimitRange::Unlimited.to_string(), "No fixed limits");
        assert_eq!(LimitRange::UsageBased.to_string(), "Usage-based");
        assert_eq!(LimitRange::NotAvailable.to_string(), "Not available");
    }

    #[test]
    fn test_plan_limits_for_plus() {
        let limits = plan_limits_for(Plan::Plus).expect("Plus has limits");
        assert_eq!(limits.local_messages_5h, range(45, 225));
        assert_eq!(limits.cloud_tasks_5h, range(10, 60));
        assert_eq!(limits.code_reviews_week, range(10, 25));
    }

    #[test]
    fn test_plan_limits_missing_for_free() {
        assert!(plan_limits_for(Plan::Free).is_none());
    }

    #[test]
    fn test_plan_limits_order() {
        let plans: Vec<Plan> = PLAN_LIMITS.iter().map(|l| l.plan).collect();
        assert_eq!(
            plans,
            vec![
                Plan::Plus,
                Plan::Pro,
                Plan::Business,
                Plan::Enterprise,
                Plan::Edu,
                Plan::ApiKey
            ]
        );
    }
}
