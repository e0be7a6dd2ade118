use crate::gamification::POINTS_PER_LEVEL;
use crate::models::{
    DashboardResponse, FinanceTotals, InventoryItemView, RewardsResponse, SubscriptionResponse,
    Task, Transaction, TransactionKind, UserProfile,
};
use crate::subscription::{Feature, PLANS, Plan};
use chrono::{Duration, NaiveDate};
use std::fmt::Write;

pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Text and tone for a `?notice=` code. Unknown codes render nothing.
pub fn notice_message(code: &str) -> Option<(&'static str, &'static str)> {
    let notice = match code {
        "task-added" => ("ok", "Task added."),
        "task-completed" => ("ok", "Task completed. +10 points!"),
        "task-reopened" => ("ok", "Task reopened; its points were removed."),
        "achievement-unlocked" => ("ok", "Task completed and a new achievement unlocked!"),
        "transaction-added" => ("ok", "Transaction saved."),
        "item-added" => ("ok", "Inventory item saved."),
        "profile-saved" => ("ok", "Profile updated."),
        "email-changed" => ("ok", "Email updated."),
        "password-changed" => ("ok", "Password updated."),
        "plan-changed" => ("ok", "Subscription updated."),
        "logged-out" => ("ok", "You have been signed out."),
        "backend-unavailable" => ("error", "The backend is not configured. Try again later."),
        "signed-out" => ("error", "Your session has ended. Please sign in again."),
        "invalid-credentials" => ("error", "Invalid email or password."),
        "email-taken" => ("error", "An account with this email already exists."),
        "invalid-input" => ("error", "Some fields are invalid. Check the form and try again."),
        "not-found" => ("error", "That item no longer exists."),
        "task-limit" => ("error", "You reached the Basic plan task limit. Upgrade to Premium for unlimited tasks."),
        "feature-locked" => ("error", "This feature is not included in your plan."),
        "failed" => ("error", "Something went wrong. Please try again."),
        _ => return None,
    };
    Some(notice)
}

fn render_notice(code: Option<&str>) -> String {
    match code.and_then(notice_message) {
        Some((tone, text)) => format!(r#"<p class="status" data-type="{tone}">{text}</p>"#),
        None => String::new(),
    }
}

fn render_nav(email: Option<&str>) -> String {
    match email {
        Some(email) => format!(
            r#"<nav>
        <a href="/dashboard">Dashboard</a>
        <a href="/planner">Planner</a>
        <a href="/finance">Finance</a>
        <a href="/rewards">Rewards</a>
        <a href="/settings">Settings</a>
        <form method="post" action="/logout"><button class="btn-ghost" type="submit">Sign out</button></form>
        <span class="hint">{}</span>
      </nav>"#,
            escape_html(email)
        ),
        None => r#"<nav><a href="/">Seiton</a><a href="/login">Sign in</a></nav>"#.to_string(),
    }
}

/// Substitutes `{{KEY}}` slots in one pass. Inserted values are never
/// scanned again, so user text cannot expand into another slot.
fn fill_template(template: &str, slots: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        match slots.iter().find(|(key, _)| tail.starts_with(key)) {
            Some((key, value)) => {
                out.push_str(value);
                rest = &tail[key.len()..];
            }
            None => {
                out.push_str("{{");
                rest = &tail[2..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn layout(title: &str, email: Option<&str>, notice: Option<&str>, body: &str) -> String {
    let title = escape_html(title);
    let nav = render_nav(email);
    let notice = render_notice(notice);
    fill_template(
        LAYOUT_HTML,
        &[
            ("{{TITLE}}", title.as_str()),
            ("{{NAV}}", nav.as_str()),
            ("{{NOTICE}}", notice.as_str()),
            ("{{BODY}}", body),
        ],
    )
}

fn stat(label: &str, value: &str) -> String {
    format!(
        r#"<div class="stat"><span class="label">{label}</span><span class="value">{}</span></div>"#,
        escape_html(value)
    )
}

fn money(value: f64) -> String {
    format!("R$ {value:.2}")
}

fn progress_bar(percent: f64) -> String {
    format!(r#"<div class="bar"><div class="fill" style="width: {percent:.0}%"></div></div>"#)
}

pub fn render_landing(email: Option<&str>, notice: Option<&str>) -> String {
    let call_to_action = if email.is_some() {
        r#"<a class="button btn-add" href="/dashboard">Open your dashboard</a>"#
    } else {
        r#"<a class="button btn-add" href="/login">Start for free</a>"#
    };
    let mut plans = String::new();
    for plan in &PLANS {
        let features: String = plan
            .features
            .iter()
            .map(|feature| format!("<li>{}</li>", escape_html(feature)))
            .collect();
        let _ = write!(
            plans,
            r#"<div class="stat{}"><span class="label">{}</span><span class="value">{}</span><ul>{features}</ul></div>"#,
            if plan.highlight { " highlight" } else { "" },
            escape_html(plan.name),
            escape_html(plan.price),
        );
    }
    let body = format!(
        r#"<header>
      <h1>Organize your day, your cash and your stock</h1>
      <p class="subtitle">Plan tasks, track income and inventory, and earn points and achievements as you go.</p>
    </header>
    <section class="actions">{call_to_action}</section>
    <section class="panel">{plans}</section>"#
    );
    layout("Seiton", email, notice, &body)
}

pub fn render_login(notice: Option<&str>) -> String {
    let body = r#"<header>
      <h1>Welcome back</h1>
      <p class="subtitle">Sign in to continue, or create a free account.</p>
    </header>
    <section class="panel">
      <form class="card" method="post" action="/login">
        <h2>Sign in</h2>
        <label>Email <input type="email" name="email" required /></label>
        <label>Password <input type="password" name="password" required /></label>
        <button class="btn-add" type="submit">Sign in</button>
      </form>
      <form class="card" method="post" action="/signup">
        <h2>Create account</h2>
        <label>Email <input type="email" name="email" required /></label>
        <label>Password <input type="password" name="password" minlength="6" required /></label>
        <button class="btn-sub" type="submit">Sign up</button>
      </form>
    </section>"#;
    layout("Sign in", None, notice, body)
}

fn render_task_rows(tasks: &[Task], toggle: bool) -> String {
    if tasks.is_empty() {
        return r#"<p class="hint">No tasks here yet.</p>"#.to_string();
    }
    let mut rows = String::from(r#"<ul class="tasks">"#);
    for task in tasks {
        let state = if task.completed { "done" } else { "open" };
        let action = if toggle {
            format!(
                r#"<form method="post" action="/planner/tasks/{}/toggle"><button class="tab" type="submit">{}</button></form>"#,
                escape_html(&task.id),
                if task.completed { "Reopen" } else { "Complete" }
            )
        } else {
            format!(r#"<span class="hint">{}</span>"#, task.date.format("%d/%m/%Y"))
        };
        let _ = write!(
            rows,
            r#"<li class="{state}"><span>{}</span><span class="hint">+{} pts</span>{action}</li>"#,
            escape_html(&task.title),
            task.points
        );
    }
    rows.push_str("</ul>");
    rows
}

pub fn render_dashboard(email: &str, dashboard: &DashboardResponse, notice: Option<&str>) -> String {
    let profile = &dashboard.profile;
    let name = profile.details.display_name.as_deref().unwrap_or(email);
    let mut body = format!(
        r#"<header>
      <h1>Hello, {}</h1>
      <p class="subtitle">{} &middot; {} plan</p>
    </header>
    <section class="panel">{}{}{}{}</section>
    <section class="card">
      <h2>Level {}</h2>
      {}
      <p class="hint">{} points to level {}</p>
    </section>
    <section class="card">
      <h2>Upcoming tasks</h2>
      {}
    </section>"#,
        escape_html(name),
        dashboard.date.format("%d/%m/%Y"),
        profile.subscription_plan.info().name,
        stat("Points", &profile.total_points.to_string()),
        stat("Completed", &profile.completed_tasks.to_string()),
        stat("Streak", &format!("{} days", profile.current_streak)),
        stat("Achievements", &profile.unlocked_achievements.len().to_string()),
        dashboard.progress.level,
        progress_bar(dashboard.progress.percent),
        dashboard.progress.points_to_next_level,
        dashboard.progress.level + 1,
        render_task_rows(&dashboard.upcoming_tasks, false),
    );

    match &dashboard.finance {
        Some(finance) => {
            let mut months = String::new();
            for month in &finance.monthly {
                let _ = write!(
                    months,
                    "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                    month.month,
                    money(month.income),
                    money(month.expense),
                    money(month.net)
                );
            }
            let _ = write!(
                body,
                r#"<section class="panel">{}{}{}</section>
    <section class="card">
      <h2>Last six months</h2>
      <table><thead><tr><th>Month</th><th>Income</th><th>Expense</th><th>Net</th></tr></thead><tbody>{months}</tbody></table>
    </section>"#,
                stat("Income", &money(finance.totals.total_income)),
                stat("Expenses", &money(finance.totals.total_expense)),
                stat("Balance", &money(finance.totals.balance)),
            );
        }
        None => body.push_str(
            r#"<section class="card"><h2>Finance</h2><p class="hint">Upgrade to Premium to track income, expenses and stock.</p><a class="button btn-sub" href="/settings">See plans</a></section>"#,
        ),
    }

    layout("Dashboard", Some(email), notice, &body)
}

pub fn render_planner(
    email: &str,
    date: NaiveDate,
    tasks: &[Task],
    profile: &UserProfile,
    notice: Option<&str>,
) -> String {
    let previous = date - Duration::days(1);
    let next = date + Duration::days(1);
    let body = format!(
        r#"<header>
      <h1>Planner</h1>
      <p class="subtitle">{} &middot; {} points &middot; streak {} days</p>
    </header>
    <section class="tabs">
      <a class="tab" href="/planner?date={previous}">&larr; Previous</a>
      <a class="tab active" href="/planner">Today</a>
      <a class="tab" href="/planner?date={next}">Next &rarr;</a>
    </section>
    <section class="card">
      <form class="inline" method="post" action="/planner/tasks">
        <input type="text" name="title" maxlength="200" placeholder="New task" required />
        <input type="date" name="date" value="{date}" />
        <button class="btn-add" type="submit">Add</button>
      </form>
      {}
    </section>"#,
        date.format("%A, %d/%m/%Y"),
        profile.total_points,
        profile.current_streak,
        render_task_rows(tasks, true),
    );
    layout("Planner", Some(email), notice, &body)
}

pub fn render_finance(
    email: &str,
    transactions: &[Transaction],
    inventory: &[InventoryItemView],
    totals: &FinanceTotals,
    notice: Option<&str>,
) -> String {
    let mut transaction_rows = String::new();
    for transaction in transactions {
        let (class, sign) = match transaction.kind {
            TransactionKind::Income => ("income", "+"),
            TransactionKind::Expense => ("expense", "-"),
        };
        let _ = write!(
            transaction_rows,
            r#"<tr class="{class}"><td>{}</td><td>{}</td><td>{}</td><td>{sign}{}</td></tr>"#,
            transaction.date.format("%d/%m/%Y"),
            escape_html(&transaction.description),
            escape_html(&transaction.category),
            money(transaction.amount)
        );
    }

    let mut inventory_rows = String::new();
    for view in inventory {
        let item = &view.item;
        let _ = write!(
            inventory_rows,
            r#"<tr class="{}"><td>{}</td><td>{} {}</td><td>{} {}</td><td>{}</td></tr>"#,
            if view.low_stock { "low" } else { "" },
            escape_html(&item.name),
            item.quantity,
            escape_html(&item.unit),
            item.min_quantity,
            escape_html(&item.unit),
            if view.low_stock { "Low stock" } else { "OK" }
        );
    }

    let body = format!(
        r#"<header>
      <h1>Finance &amp; inventory</h1>
      <p class="subtitle">Cash flow and stock at a glance.</p>
    </header>
    <section class="panel">{}{}{}</section>
    <section class="card">
      <h2>Transactions</h2>
      <form class="inline" method="post" action="/finance/transactions">
        <select name="kind"><option value="income">Income</option><option value="expense">Expense</option></select>
        <input type="text" name="amount" inputmode="decimal" placeholder="Amount" required />
        <input type="text" name="description" placeholder="Description" required />
        <input type="text" name="category" placeholder="Category" />
        <button class="btn-add" type="submit">Save</button>
      </form>
      <table><thead><tr><th>Date</th><th>Description</th><th>Category</th><th>Amount</th></tr></thead><tbody>{transaction_rows}</tbody></table>
    </section>
    <section class="card">
      <h2>Inventory</h2>
      <form class="inline" method="post" action="/finance/inventory">
        <input type="text" name="name" placeholder="Item" required />
        <input type="text" name="quantity" inputmode="decimal" placeholder="Quantity" required />
        <input type="text" name="unit" placeholder="Unit (kg)" />
        <input type="text" name="min_quantity" inputmode="decimal" placeholder="Minimum" />
        <button class="btn-sub" type="submit">Save</button>
      </form>
      <table><thead><tr><th>Item</th><th>Quantity</th><th>Minimum</th><th>Status</th></tr></thead><tbody>{inventory_rows}</tbody></table>
    </section>"#,
        stat("Income", &money(totals.total_income)),
        stat("Expenses", &money(totals.total_expense)),
        stat("Balance", &money(totals.balance)),
    );
    layout("Finance", Some(email), notice, &body)
}

pub fn render_locked(email: &str, feature: Feature) -> String {
    let body = format!(
        r#"<header>
      <h1>Premium feature</h1>
      <p class="subtitle">The {feature} module is not included in your current plan.</p>
    </header>
    <section class="card">
      <p>Upgrade to {} ({}) to unlock it.</p>
      <a class="button btn-add" href="/settings">Manage subscription</a>
    </section>"#,
        Plan::Premium.info().name,
        escape_html(Plan::Premium.info().price),
    );
    layout("Locked", Some(email), None, &body)
}

pub fn render_rewards(email: &str, rewards: &RewardsResponse, notice: Option<&str>) -> String {
    let mut badges = String::new();
    for achievement in &rewards.achievements {
        let progress = match achievement.progress {
            Some(progress) if !achievement.unlocked => {
                format!(r#"<span class="hint">{} / {}</span>"#, progress.current, progress.required)
            }
            _ => String::new(),
        };
        let _ = write!(
            badges,
            r#"<div class="stat{}"><span class="label">{}</span><span class="value">{}</span><span class="hint">{} &middot; +{} pts</span>{progress}</div>"#,
            if achievement.unlocked { " highlight" } else { " locked" },
            if achievement.unlocked { "Unlocked" } else { "Locked" },
            escape_html(achievement.title),
            escape_html(achievement.description),
            achievement.bonus_points
        );
    }
    let body = format!(
        r#"<header>
      <h1>Rewards</h1>
      <p class="subtitle">{} of {} achievements unlocked.</p>
    </header>
    <section class="panel">{}{}{}{}</section>
    <section class="card">
      <h2>Level {}</h2>
      {}
      <p class="hint">{} / {POINTS_PER_LEVEL} points in this level</p>
    </section>
    <section class="panel">{badges}</section>"#,
        rewards.unlocked_count,
        rewards.achievements.len(),
        stat("Points", &rewards.total_points.to_string()),
        stat("Tasks", &rewards.completed_tasks.to_string()),
        stat("Streak", &rewards.current_streak.to_string()),
        stat("Best streak", &rewards.longest_streak.to_string()),
        rewards.level,
        progress_bar(rewards.progress.percent),
        rewards.progress.points_into_level,
    );
    layout("Rewards", Some(email), notice, &body)
}

fn text_input(label: &str, name: &str, value: Option<&str>) -> String {
    format!(
        r#"<label>{label} <input type="text" name="{name}" maxlength="200" value="{}" /></label>"#,
        escape_html(value.unwrap_or_default())
    )
}

pub fn render_settings(
    email: &str,
    profile: &UserProfile,
    subscription: &SubscriptionResponse,
    notice: Option<&str>,
) -> String {
    let details = &profile.details;
    let mut plans = String::new();
    for plan in &subscription.plans {
        let current = plan.id == subscription.plan;
        let action = if current && subscription.active {
            r#"<span class="hint">Current plan</span>"#.to_string()
        } else {
            format!(
                r#"<form method="post" action="/settings/plan">
          <input type="hidden" name="plan" value="{}" />
          <select name="months"><option value="1">1 month</option><option value="3">3 months</option><option value="12">12 months</option></select>
          <button class="btn-add" type="submit">Choose {}</button>
        </form>"#,
                if plan.id == Plan::Premium { "premium" } else { "basic" },
                escape_html(plan.name)
            )
        };
        let _ = write!(
            plans,
            r#"<div class="stat{}"><span class="label">{}</span><span class="value">{}</span>{action}</div>"#,
            if plan.highlight { " highlight" } else { "" },
            escape_html(plan.name),
            escape_html(plan.price)
        );
    }

    let body = format!(
        r#"<header>
      <h1>Settings</h1>
      <p class="subtitle">{} plan &middot; {} &middot; renews {} ({} days left)</p>
    </header>
    <section class="card">
      <h2>Profile</h2>
      <form method="post" action="/settings/profile">
        {}{}{}{}{}{}
        <button class="btn-add" type="submit">Save profile</button>
      </form>
    </section>
    <section class="panel">
      <form class="card" method="post" action="/settings/email">
        <h2>Email</h2>
        <p class="hint">Currently {}</p>
        <label>New email <input type="email" name="new_email" required /></label>
        <label>Current password <input type="password" name="current_password" required /></label>
        <button class="btn-sub" type="submit">Change email</button>
      </form>
      <form class="card" method="post" action="/settings/password">
        <h2>Password</h2>
        <label>Current password <input type="password" name="current_password" required /></label>
        <label>New password <input type="password" name="new_password" minlength="6" required /></label>
        <label>Confirm <input type="password" name="confirm_password" minlength="6" required /></label>
        <button class="btn-sub" type="submit">Change password</button>
      </form>
    </section>
    <section class="panel">{plans}</section>"#,
        subscription.plan.info().name,
        if subscription.active { "active" } else { "expired" },
        subscription.renewal_date,
        subscription.days_remaining,
        text_input("Display name", "display_name", details.display_name.as_deref()),
        text_input("Phone", "phone", details.phone.as_deref()),
        text_input("Address", "address", details.address.as_deref()),
        text_input("City", "city", details.city.as_deref()),
        text_input("State", "state", details.state.as_deref()),
        text_input("Zip code", "zip_code", details.zip_code.as_deref()),
        escape_html(email),
    );
    layout("Settings", Some(email), notice, &body)
}

pub fn render_not_found() -> String {
    let body = r#"<header>
      <h1>Page not found</h1>
      <p class="subtitle">The page you are looking for does not exist.</p>
    </header>
    <section class="actions"><a class="button btn-add" href="/">Back to start</a></section>"#;
    layout("Not found", None, None, body)
}

const LAYOUT_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>{{TITLE}} &middot; Seiton</title>
  <style>
    @import url('https://fonts.googleapis.com/css2?family=Space+Grotesk:wght@400;500;600&family=Fraunces:wght@600&display=swap');

    :root {
      --bg-1: #f8f3e6;
      --bg-2: #f5d3a7;
      --ink: #2b2a28;
      --accent: #ff6b4a;
      --accent-2: #2f4858;
      --card: rgba(255, 255, 255, 0.86);
      --shadow: 0 24px 60px rgba(47, 72, 88, 0.18);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: radial-gradient(circle at top, var(--bg-2), transparent 60%),
        linear-gradient(135deg, var(--bg-1), #ffe9d4 60%, #f9f2e9 100%);
      color: var(--ink);
      font-family: "Space Grotesk", "Trebuchet MS", sans-serif;
      display: grid;
      place-items: center;
      padding: 32px 18px 48px;
    }

    .app {
      width: min(960px, 100%);
      background: var(--card);
      backdrop-filter: blur(12px);
      border-radius: 28px;
      box-shadow: var(--shadow);
      padding: 36px;
      display: grid;
      gap: 28px;
      animation: rise 600ms ease;
    }

    nav {
      display: flex;
      flex-wrap: wrap;
      align-items: center;
      gap: 14px;
    }

    nav a {
      color: var(--accent-2);
      font-weight: 600;
      text-decoration: none;
    }

    header {
      display: flex;
      flex-direction: column;
      gap: 6px;
    }

    h1 {
      font-family: "Fraunces", "Georgia", serif;
      font-weight: 600;
      font-size: clamp(2rem, 4vw, 2.8rem);
      margin: 0;
    }

    h2 {
      margin: 0 0 12px;
      font-size: 1.3rem;
    }

    .subtitle {
      margin: 0;
      color: #5f5c57;
      font-size: 1rem;
    }

    .panel {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(180px, 1fr));
      gap: 16px;
    }

    .stat,
    .card {
      background: white;
      border-radius: 18px;
      padding: 18px;
      border: 1px solid rgba(47, 72, 88, 0.08);
      display: grid;
      gap: 8px;
    }

    .stat.highlight {
      border-color: var(--accent);
    }

    .stat.locked {
      opacity: 0.55;
    }

    .stat .label {
      font-size: 0.85rem;
      text-transform: uppercase;
      letter-spacing: 0.12em;
      color: #8b857d;
    }

    .stat .value {
      font-size: 1.5rem;
      font-weight: 600;
      color: var(--accent-2);
    }

    .actions {
      display: flex;
      flex-wrap: wrap;
      gap: 16px;
    }

    label {
      display: grid;
      gap: 4px;
      font-size: 0.9rem;
      color: #6b645d;
    }

    input,
    select {
      border: 1px solid rgba(47, 72, 88, 0.2);
      border-radius: 12px;
      padding: 10px 12px;
      font: inherit;
    }

    form.inline {
      display: flex;
      flex-wrap: wrap;
      gap: 10px;
    }

    button,
    .button {
      appearance: none;
      border: none;
      border-radius: 999px;
      padding: 12px 20px;
      font-size: 1rem;
      font-weight: 600;
      cursor: pointer;
      text-decoration: none;
      transition: transform 150ms ease, box-shadow 150ms ease;
      display: inline-flex;
      align-items: center;
      justify-content: center;
      gap: 10px;
    }

    button:active {
      transform: scale(0.98);
    }

    .btn-add {
      background: var(--accent);
      color: white;
      box-shadow: 0 10px 24px rgba(255, 107, 74, 0.3);
    }

    .btn-sub {
      background: var(--accent-2);
      color: white;
      box-shadow: 0 10px 24px rgba(47, 72, 88, 0.3);
    }

    .btn-ghost {
      background: transparent;
      color: #6b645d;
      padding: 6px 10px;
    }

    .tabs {
      display: flex;
      gap: 6px;
      padding: 6px;
      background: rgba(47, 72, 88, 0.08);
      border-radius: 999px;
      width: fit-content;
    }

    .tab {
      background: transparent;
      border: none;
      border-radius: 999px;
      padding: 8px 14px;
      font-size: 0.9rem;
      font-weight: 600;
      color: #6b645d;
      text-decoration: none;
      box-shadow: none;
    }

    .tab.active {
      background: white;
      color: var(--accent-2);
      box-shadow: 0 8px 16px rgba(47, 72, 88, 0.12);
    }

    .tasks {
      list-style: none;
      margin: 0;
      padding: 0;
      display: grid;
      gap: 8px;
    }

    .tasks li {
      display: flex;
      align-items: center;
      justify-content: space-between;
      gap: 12px;
      padding: 10px 0;
      border-bottom: 1px solid rgba(47, 72, 88, 0.08);
    }

    .tasks li.done span:first-child {
      text-decoration: line-through;
      color: #8b857d;
    }

    .bar {
      height: 12px;
      border-radius: 999px;
      background: rgba(47, 72, 88, 0.08);
      overflow: hidden;
    }

    .bar .fill {
      height: 100%;
      background: var(--accent);
    }

    table {
      width: 100%;
      border-collapse: collapse;
      font-size: 0.95rem;
    }

    th,
    td {
      text-align: left;
      padding: 8px 6px;
      border-bottom: 1px solid rgba(47, 72, 88, 0.08);
    }

    tr.income td:last-child {
      color: #2d7a4b;
    }

    tr.expense td:last-child,
    tr.low td:last-child {
      color: #c63b2b;
    }

    .status {
      font-size: 0.95rem;
      color: #6b645d;
      margin: 0;
    }

    .status[data-type="error"] {
      color: #c63b2b;
    }

    .status[data-type="ok"] {
      color: #2d7a4b;
    }

    .hint {
      margin: 0;
      color: #6f6a65;
      font-size: 0.9rem;
    }

    @keyframes rise {
      from {
        opacity: 0;
        transform: translateY(18px);
      }
      to {
        opacity: 1;
        transform: translateY(0);
      }
    }

    @media (max-width: 600px) {
      .app {
        padding: 28px 22px;
      }
      button {
        width: 100%;
      }
    }
  </style>
</head>
<body>
  <main class="app">
    {{NAV}}
    {{NOTICE}}
    {{BODY}}
  </main>
</body>
</html>
"#;
