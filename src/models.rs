use crate::gamification::{AchievementId, AchievementStatus, LevelProgress};
use crate::stats::MonthlyCashFlow;
use crate::subscription::{Plan, PlanInfo};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Version of the on-disk document layout. Bumped on incompatible changes.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppData {
    pub schema_version: u32,
    #[serde(default)]
    pub accounts: BTreeMap<String, Account>,
    #[serde(default)]
    pub sessions: BTreeMap<String, Session>,
    #[serde(default)]
    pub profiles: BTreeMap<String, UserProfile>,
    #[serde(default)]
    pub tasks: BTreeMap<String, Task>,
    #[serde(default)]
    pub transactions: BTreeMap<String, Transaction>,
    #[serde(default)]
    pub inventory: BTreeMap<String, InventoryItem>,
}

impl Default for AppData {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            accounts: BTreeMap::new(),
            sessions: BTreeMap::new(),
            profiles: BTreeMap::new(),
            tasks: BTreeMap::new(),
            transactions: BTreeMap::new(),
            inventory: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub user_id: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalDetails {
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    #[serde(default)]
    pub details: PersonalDetails,
    pub total_points: u64,
    pub level: u32,
    pub completed_tasks: u64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_task_date: Option<NaiveDate>,
    #[serde(default)]
    pub unlocked_achievements: BTreeSet<AchievementId>,
    pub subscription_plan: Plan,
    pub subscription_start_date: Option<DateTime<Utc>>,
    pub subscription_end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            details: PersonalDetails::default(),
            total_points: 0,
            level: 1,
            completed_tasks: 0,
            current_streak: 0,
            longest_streak: 0,
            last_task_date: None,
            unlocked_achievements: BTreeSet::new(),
            subscription_plan: Plan::Basic,
            subscription_start_date: None,
            subscription_end_date: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub completed: bool,
    pub date: NaiveDate,
    pub points: u32,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: f64,
    pub description: String,
    pub category: String,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    pub min_quantity: f64,
    pub created_at: DateTime<Utc>,
}

impl InventoryItem {
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.min_quantity
    }
}

// Requests

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileUpdateRequest {
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EmailChangeRequest {
    pub current_password: String,
    pub new_email: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordChangeRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
pub struct NewTaskRequest {
    pub title: String,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct TaskQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct NewTransactionRequest {
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: f64,
    pub description: String,
    #[serde(default)]
    pub category: String,
}

#[derive(Debug, Deserialize)]
pub struct NewInventoryItemRequest {
    pub name: String,
    pub quantity: f64,
    pub unit: Option<String>,
    #[serde(default)]
    pub min_quantity: f64,
}

#[derive(Debug, Deserialize)]
pub struct PlanChangeRequest {
    pub plan: Plan,
    pub months: Option<u32>,
}

// Responses

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub backend_configured: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user_id: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct InventoryItemView {
    #[serde(flatten)]
    pub item: InventoryItem,
    pub low_stock: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FinanceTotals {
    pub total_income: f64,
    pub total_expense: f64,
    pub balance: f64,
}

#[derive(Debug, Serialize)]
pub struct FinanceOverview {
    pub totals: FinanceTotals,
    pub monthly: Vec<MonthlyCashFlow>,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub date: NaiveDate,
    pub profile: UserProfile,
    pub progress: LevelProgress,
    pub upcoming_tasks: Vec<Task>,
    pub finance: Option<FinanceOverview>,
}

#[derive(Debug, Serialize)]
pub struct RewardsResponse {
    pub total_points: u64,
    pub level: u32,
    pub progress: LevelProgress,
    pub completed_tasks: u64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub achievements: Vec<AchievementStatus>,
    pub unlocked_count: usize,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub plan: Plan,
    pub active: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub renewal_date: String,
    pub days_remaining: i64,
    pub plans: Vec<PlanInfo>,
}
