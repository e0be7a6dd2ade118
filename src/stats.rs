use crate::finance;
use crate::gamification::LevelProgress;
use crate::models::{
    AppData, DashboardResponse, FinanceOverview, Transaction, TransactionKind, UserProfile,
};
use crate::planner;
use crate::subscription::{self, Feature};
use chrono::{DateTime, Datelike, Local, Months, NaiveDate, TimeZone, Utc};
use serde::Serialize;

const MONTH_COUNT: u32 = 6;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyCashFlow {
    pub month: String,
    pub income: f64,
    pub expense: f64,
    pub net: f64,
}

pub fn build_dashboard(data: &AppData, profile: &UserProfile) -> DashboardResponse {
    build_dashboard_at(&Local, Utc::now(), data, profile)
}

/// `today` and the monthly buckets are both taken in `tz`.
pub fn build_dashboard_at<Tz: TimeZone>(
    tz: &Tz,
    now: DateTime<Utc>,
    data: &AppData,
    profile: &UserProfile,
) -> DashboardResponse {
    let today = now.with_timezone(tz).date_naive();
    let finance = subscription::has_feature_access(profile, Feature::Finance, now).then(|| {
        let transactions = finance::transactions_for(data, &profile.user_id);
        FinanceOverview {
            totals: finance::totals(&transactions),
            monthly: monthly_cash_flow(tz, today, &transactions),
        }
    });

    DashboardResponse {
        date: today,
        profile: profile.clone(),
        progress: LevelProgress::for_points(profile.total_points),
        upcoming_tasks: planner::upcoming_tasks(data, &profile.user_id, today),
        finance,
    }
}

/// Income and expense per calendar month of `tz`, oldest first, ending with
/// the month of `today`. Older transactions are ignored.
pub fn monthly_cash_flow<Tz: TimeZone>(
    tz: &Tz,
    today: NaiveDate,
    transactions: &[Transaction],
) -> Vec<MonthlyCashFlow> {
    let current = month_start(today);
    let mut months = Vec::with_capacity(MONTH_COUNT as usize);

    for offset in (0..MONTH_COUNT).rev() {
        let start = current
            .checked_sub_months(Months::new(offset))
            .unwrap_or(current);
        let mut income = 0.0;
        let mut expense = 0.0;
        for transaction in transactions {
            let date = transaction.date.with_timezone(tz).date_naive();
            if month_start(date) != start {
                continue;
            }
            match transaction.kind {
                TransactionKind::Income => income += transaction.amount,
                TransactionKind::Expense => expense += transaction.amount,
            }
        }
        months.push(MonthlyCashFlow {
            month: month_label(start),
            income,
            expense,
            net: income - expense,
        });
    }

    months
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn month_label(date: NaiveDate) -> String {
    format!("{}-{:02}", date.year(), date.month())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile;
    use chrono::FixedOffset;

    fn transaction(kind: TransactionKind, amount: f64, y: i32, m: u32, d: u32) -> Transaction {
        let date = Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap();
        Transaction {
            id: format!("{y}-{m}-{d}-{amount}"),
            user_id: "u1".into(),
            kind,
            amount,
            description: "x".into(),
            category: String::new(),
            date,
            created_at: date,
        }
    }

    #[test]
    fn six_months_ending_with_current() {
        let today = NaiveDate::from_ymd_opt(2026, 2, 14).unwrap();
        let months = monthly_cash_flow(&Utc, today, &[]);
        let labels: Vec<_> = months.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(labels, ["2025-09", "2025-10", "2025-11", "2025-12", "2026-01", "2026-02"]);
    }

    #[test]
    fn sums_by_month_and_ignores_old_entries() {
        let today = NaiveDate::from_ymd_opt(2026, 2, 14).unwrap();
        let transactions = [
            transaction(TransactionKind::Income, 100.0, 2026, 2, 1),
            transaction(TransactionKind::Expense, 30.0, 2026, 2, 10),
            transaction(TransactionKind::Income, 50.0, 2025, 12, 31),
            transaction(TransactionKind::Income, 999.0, 2025, 8, 31),
        ];
        let months = monthly_cash_flow(&Utc, today, &transactions);
        let feb = months.last().unwrap();
        assert_eq!((feb.income, feb.expense, feb.net), (100.0, 30.0, 70.0));
        assert_eq!(months[3].income, 50.0);
        assert_eq!(months.iter().map(|m| m.income).sum::<f64>(), 150.0);
    }

    #[test]
    fn months_follow_the_given_timezone() {
        // 23:30 UTC on Jan 31st is already February in UTC+3.
        let late = Utc.with_ymd_and_hms(2026, 1, 31, 23, 30, 0).unwrap();
        let mut sale = transaction(TransactionKind::Income, 40.0, 2026, 1, 31);
        sale.date = late;
        let today = NaiveDate::from_ymd_opt(2026, 2, 14).unwrap();

        let plus_three = FixedOffset::east_opt(3 * 3600).unwrap();
        let shifted = monthly_cash_flow(&plus_three, today, std::slice::from_ref(&sale));
        assert_eq!(shifted[5].income, 40.0);
        assert_eq!(shifted[4].income, 0.0);

        let utc = monthly_cash_flow(&Utc, today, std::slice::from_ref(&sale));
        assert_eq!(utc[4].income, 40.0);
        assert_eq!(utc[5].income, 0.0);
    }

    #[test]
    fn dashboard_hides_finance_for_basic_plan() {
        let mut data = AppData::default();
        let now = Utc.with_ymd_and_hms(2026, 2, 14, 9, 0, 0).unwrap();
        let today = now.date_naive();
        let profile = profile::get_or_create(&mut data, "u1", now).clone();
        planner::create_task(&mut data, "u1", "Order supplies", today, now).unwrap();

        let dashboard = build_dashboard_at(&Utc, now, &data, &profile);
        assert_eq!(dashboard.date, today);
        assert!(dashboard.finance.is_none());
        assert_eq!(dashboard.upcoming_tasks.len(), 1);
        assert_eq!(dashboard.progress.level, 1);
    }

    #[test]
    fn dashboard_includes_finance_for_premium() {
        let mut data = AppData::default();
        let now = Utc.with_ymd_and_hms(2026, 2, 14, 9, 0, 0).unwrap();
        let profile = profile::get_or_create(&mut data, "u1", now);
        subscription::change_plan(profile, subscription::Plan::Premium, 1, now).unwrap();
        let profile = profile.clone();

        let dashboard = build_dashboard_at(&Utc, now, &data, &profile);
        let finance = dashboard.finance.expect("premium sees finance");
        assert_eq!(finance.monthly.len(), 6);
        assert_eq!(finance.totals.balance, 0.0);
    }
}
