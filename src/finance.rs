use crate::errors::ServiceError;
use crate::models::{
    AppData, FinanceTotals, InventoryItem, InventoryItemView, NewInventoryItemRequest,
    NewTransactionRequest, Transaction, TransactionKind,
};
use crate::profile;
use crate::subscription::{self, Feature};
use chrono::{DateTime, Utc};
use uuid::Uuid;

const MAX_TEXT_LEN: usize = 200;
const DEFAULT_UNIT: &str = "kg";

fn required_text(value: &str, label: &str) -> Result<String, ServiceError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ServiceError::validation(format!("{label} is required")));
    }
    optional_text(value, label)
}

fn optional_text(value: &str, label: &str) -> Result<String, ServiceError> {
    let value = value.trim();
    if value.chars().count() > MAX_TEXT_LEN {
        return Err(ServiceError::validation(format!(
            "{label} must be at most {MAX_TEXT_LEN} characters"
        )));
    }
    Ok(value.to_string())
}

fn require_finance(data: &mut AppData, user_id: &str, now: DateTime<Utc>) -> Result<(), ServiceError> {
    let profile = profile::get_or_create(data, user_id, now);
    subscription::require_feature(profile, Feature::Finance, now)
}

pub fn add_transaction(
    data: &mut AppData,
    user_id: &str,
    request: NewTransactionRequest,
    now: DateTime<Utc>,
) -> Result<Transaction, ServiceError> {
    require_finance(data, user_id, now)?;
    if !request.amount.is_finite() || request.amount <= 0.0 {
        return Err(ServiceError::validation("amount must be a positive number"));
    }

    let transaction = Transaction {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        kind: request.kind,
        amount: request.amount,
        description: required_text(&request.description, "description")?,
        category: optional_text(&request.category, "category")?,
        date: now,
        created_at: now,
    };
    data.transactions
        .insert(transaction.id.clone(), transaction.clone());
    Ok(transaction)
}

pub fn add_inventory_item(
    data: &mut AppData,
    user_id: &str,
    request: NewInventoryItemRequest,
    now: DateTime<Utc>,
) -> Result<InventoryItem, ServiceError> {
    require_finance(data, user_id, now)?;
    for (value, label) in [(request.quantity, "quantity"), (request.min_quantity, "minimum quantity")] {
        if !value.is_finite() || value < 0.0 {
            return Err(ServiceError::validation(format!("{label} must be zero or more")));
        }
    }
    let unit = match request.unit.as_deref().map(str::trim) {
        None | Some("") => DEFAULT_UNIT.to_string(),
        Some(unit) => optional_text(unit, "unit")?,
    };

    let item = InventoryItem {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        name: required_text(&request.name, "name")?,
        quantity: request.quantity,
        unit,
        min_quantity: request.min_quantity,
        created_at: now,
    };
    data.inventory.insert(item.id.clone(), item.clone());
    Ok(item)
}

/// Newest first.
pub fn transactions_for(data: &AppData, user_id: &str) -> Vec<Transaction> {
    let mut transactions: Vec<Transaction> = data
        .transactions
        .values()
        .filter(|transaction| transaction.user_id == user_id)
        .cloned()
        .collect();
    transactions.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.created_at.cmp(&a.created_at)));
    transactions
}

pub fn inventory_for(data: &AppData, user_id: &str) -> Vec<InventoryItemView> {
    let mut items: Vec<InventoryItem> = data
        .inventory
        .values()
        .filter(|item| item.user_id == user_id)
        .cloned()
        .collect();
    items.sort_by_key(|item| item.name.to_lowercase());
    items
        .into_iter()
        .map(|item| InventoryItemView {
            low_stock: item.is_low_stock(),
            item,
        })
        .collect()
}

pub fn totals(transactions: &[Transaction]) -> FinanceTotals {
    let (income, expense) = transactions
        .iter()
        .fold((0.0, 0.0), |(income, expense), transaction| match transaction.kind {
            TransactionKind::Income => (income + transaction.amount, expense),
            TransactionKind::Expense => (income, expense + transaction.amount),
        });
    FinanceTotals {
        total_income: income,
        total_expense: expense,
        balance: income - expense,
    }
}
