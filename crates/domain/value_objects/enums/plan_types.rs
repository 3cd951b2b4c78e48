use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PlanType {
    #[default]
    Free,
    Monthly,
    Annual,
}

impl Display for PlanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let plan_type = match self {
            PlanType::Free => "free",
            PlanType::Monthly => "monthly",
            PlanType::Annual => "annual",
        };
        write!(f, "{}", plan_type)
    }
}

impl PlanType {
    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "free" => Some(PlanType::Free),
            "monthly" => Some(PlanType::Monthly),
            "annual" => Some(PlanType::Annual),
            _ => None,
        }
    }

    /// Paid term length in days; `None` for the free plan, which has no term.
    pub fn period_days(self) -> Option<i64> {
        match self {
            PlanType::Free => None,
            PlanType::Monthly => Some(30),
            PlanType::Annual => Some(365),
        }
    }
}
