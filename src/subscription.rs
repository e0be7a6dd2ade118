use crate::errors::ServiceError;
use crate::models::{SubscriptionResponse, UserProfile};
use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// Task cap for the free plan, counted against lifetime completions.
pub const BASIC_TASK_LIMIT: u64 = 50;

pub const MAX_PLAN_MONTHS: u32 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Basic,
    Premium,
}

impl Plan {
    pub fn info(self) -> &'static PlanInfo {
        match self {
            Self::Basic => &PLANS[0],
            Self::Premium => &PLANS[1],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Planner,
    Finance,
    Rewards,
    AdvancedGamification,
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Planner => "planner",
            Self::Finance => "finance",
            Self::Rewards => "rewards",
            Self::AdvancedGamification => "advanced gamification",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanInfo {
    pub id: Plan,
    pub name: &'static str,
    pub price: &'static str,
    pub price_cents: u32,
    pub features: &'static [&'static str],
    pub highlight: bool,
}

pub static PLANS: [PlanInfo; 2] = [
    PlanInfo {
        id: Plan::Basic,
        name: "Basic",
        price: "Free",
        price_cents: 0,
        features: &[
            "Seiton Planner",
            "Basic agenda",
            "Up to 50 tasks/month",
            "Points and achievements",
            "Email support",
        ],
        highlight: false,
    },
    PlanInfo {
        id: Plan::Premium,
        name: "Premium",
        price: "R$ 29,90/month",
        price_cents: 2990,
        features: &[
            "Everything in Basic",
            "Finance and inventory module",
            "Full financial management",
            "Stock control",
            "Unlimited tasks",
            "Advanced gamification",
            "Priority support",
            "Analytics and reports",
        ],
        highlight: true,
    },
];

pub fn is_subscription_active(profile: &UserProfile, now: DateTime<Utc>) -> bool {
    match profile.subscription_plan {
        Plan::Basic => true,
        Plan::Premium => profile.subscription_end_date.is_some_and(|end| end > now),
    }
}

pub fn has_feature_access(profile: &UserProfile, feature: Feature, now: DateTime<Utc>) -> bool {
    match profile.subscription_plan {
        Plan::Basic => matches!(feature, Feature::Planner | Feature::Rewards),
        Plan::Premium => is_subscription_active(profile, now),
    }
}

pub fn require_feature(profile: &UserProfile, feature: Feature, now: DateTime<Utc>) -> Result<(), ServiceError> {
    if has_feature_access(profile, feature, now) {
        Ok(())
    } else {
        Err(ServiceError::FeatureLocked(feature))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEligibility {
    Allowed,
    Denied { limit: u64 },
}

impl TaskEligibility {
    pub fn into_result(self) -> Result<(), ServiceError> {
        match self {
            Self::Allowed => Ok(()),
            Self::Denied { limit } => Err(ServiceError::TaskLimitReached { limit }),
        }
    }
}

pub fn can_create_task(profile: &UserProfile, now: DateTime<Utc>) -> TaskEligibility {
    if profile.subscription_plan == Plan::Premium && is_subscription_active(profile, now) {
        return TaskEligibility::Allowed;
    }
    if profile.completed_tasks < BASIC_TASK_LIMIT {
        TaskEligibility::Allowed
    } else {
        TaskEligibility::Denied {
            limit: BASIC_TASK_LIMIT,
        }
    }
}

/// Overwrites the plan and its validity window. No proration or billing.
pub fn change_plan(
    profile: &mut UserProfile,
    plan: Plan,
    months: u32,
    now: DateTime<Utc>,
) -> Result<(), ServiceError> {
    if months == 0 || months > MAX_PLAN_MONTHS {
        return Err(ServiceError::validation(format!(
            "months must be between 1 and {MAX_PLAN_MONTHS}"
        )));
    }
    let end = now
        .checked_add_months(Months::new(months))
        .ok_or_else(|| ServiceError::validation("subscription end date out of range"))?;

    profile.subscription_plan = plan;
    profile.subscription_start_date = Some(now);
    profile.subscription_end_date = Some(end);
    profile.updated_at = now;
    info!(user_id = %profile.user_id, ?plan, months, "subscription plan changed");
    Ok(())
}

pub fn days_remaining(end: Option<DateTime<Utc>>, now: DateTime<Utc>) -> i64 {
    let Some(end) = end else {
        return 0;
    };
    let seconds = (end - now).num_seconds();
    if seconds <= 0 {
        return 0;
    }
    (seconds + 86_399) / 86_400
}

pub fn format_renewal_date(end: Option<DateTime<Utc>>) -> String {
    match end {
        Some(end) => end.format("%d/%m/%Y").to_string(),
        None => "N/A".to_string(),
    }
}

pub fn subscription_view(profile: &UserProfile, now: DateTime<Utc>) -> SubscriptionResponse {
    SubscriptionResponse {
        plan: profile.subscription_plan,
        active: is_subscription_active(profile, now),
        start_date: profile.subscription_start_date,
        end_date: profile.subscription_end_date,
        renewal_date: format_renewal_date(profile.subscription_end_date),
        days_remaining: days_remaining(profile.subscription_end_date, now),
        plans: PLANS.to_vec(),
    }
}
