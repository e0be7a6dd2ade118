use crate::auth::{self, CurrentUser};
use crate::errors::{AppError, ServiceError};
use crate::finance;
use crate::gamification;
use crate::live::Collection;
use crate::models::{
    AuthResponse, CredentialsRequest, DashboardResponse, EmailChangeRequest, HealthResponse,
    InventoryItem, InventoryItemView, NewInventoryItemRequest, NewTaskRequest,
    NewTransactionRequest, PasswordChangeRequest, PlanChangeRequest, ProfileUpdateRequest,
    RewardsResponse, SubscriptionResponse, Task, TaskQuery, Transaction, TransactionKind,
    UserProfile,
};
use crate::planner::{self, ToggleOutcome};
use crate::profile;
use crate::state::AppState;
use crate::stats;
use crate::storage::Backend;
use crate::subscription::{self, Feature};
use crate::ui;
use axum::{
    Form, Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use chrono::{Local, NaiveDate, Utc};
use serde::Deserialize;
use tracing::warn;

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Loads the caller's profile and checks that its plan includes `feature`.
async fn require_access(
    backend: &Backend,
    user: &CurrentUser,
    feature: Feature,
) -> Result<UserProfile, ServiceError> {
    let profile = profile::load(backend, &user.user_id).await?;
    subscription::require_feature(&profile, feature, Utc::now())?;
    Ok(profile)
}

// JSON API

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        backend_configured: state.is_backend_configured(),
    })
}

pub async fn sign_up(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let (account, token) = auth::sign_up(&state, &payload.email, &payload.password).await?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user_id: account.user_id,
            email: account.email,
        }),
    ))
}

pub async fn sign_in(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let (account, token) = auth::sign_in(&state, &payload.email, &payload.password).await?;
    Ok(Json(AuthResponse {
        token,
        user_id: account.user_id,
        email: account.email,
    }))
}

pub async fn sign_out(State(state): State<AppState>, user: CurrentUser) -> Result<StatusCode, AppError> {
    auth::sign_out(&state, &user.token).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_profile(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<UserProfile>, AppError> {
    let backend = state.backend()?;
    Ok(Json(profile::load(backend, &user.user_id).await?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<ProfileUpdateRequest>,
) -> Result<Json<UserProfile>, AppError> {
    let backend = state.backend()?;
    let updated = backend
        .transact(|data| profile::update_details(data, &user.user_id, payload, Utc::now()))
        .await?;
    backend.notify(&user.user_id, &[Collection::Profiles]);
    Ok(Json(updated))
}

pub async fn change_email(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<EmailChangeRequest>,
) -> Result<StatusCode, AppError> {
    auth::change_email(&state, &user.user_id, &payload.current_password, &payload.new_email).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn change_password(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<PasswordChangeRequest>,
) -> Result<StatusCode, AppError> {
    auth::change_password(
        &state,
        &user.user_id,
        &user.token,
        &payload.current_password,
        &payload.new_password,
        &payload.confirm_password,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_tasks(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<TaskQuery>,
) -> Result<Json<Vec<Task>>, AppError> {
    let backend = state.backend()?;
    require_access(backend, &user, Feature::Planner).await?;
    let date = query.date.unwrap_or_else(today);
    let tasks = backend
        .read(|data| planner::tasks_for_day(data, &user.user_id, date))
        .await;
    Ok(Json(tasks))
}

pub async fn create_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<NewTaskRequest>,
) -> Result<(StatusCode, Json<Task>), AppError> {
    let backend = state.backend()?;
    let date = payload.date.unwrap_or_else(today);
    let task = backend
        .transact(|data| planner::create_task(data, &user.user_id, &payload.title, date, Utc::now()))
        .await?;
    backend.notify(&user.user_id, &[Collection::Tasks]);
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn toggle_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<String>,
) -> Result<Json<ToggleOutcome>, AppError> {
    let outcome = apply_toggle(&state, &user, &task_id).await?;
    Ok(Json(outcome))
}

async fn apply_toggle(state: &AppState, user: &CurrentUser, task_id: &str) -> Result<ToggleOutcome, ServiceError> {
    let backend = state.backend()?;
    let today = today();
    let outcome = backend
        .transact(|data| planner::toggle_task(data, &user.user_id, task_id, today, Utc::now()))
        .await?;
    backend.notify(&user.user_id, &[Collection::Tasks, Collection::Profiles]);
    Ok(outcome)
}

pub async fn list_transactions(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<Transaction>>, AppError> {
    let backend = state.backend()?;
    require_access(backend, &user, Feature::Finance).await?;
    let transactions = backend
        .read(|data| finance::transactions_for(data, &user.user_id))
        .await;
    Ok(Json(transactions))
}

pub async fn create_transaction(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<NewTransactionRequest>,
) -> Result<(StatusCode, Json<Transaction>), AppError> {
    let transaction = apply_new_transaction(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

async fn apply_new_transaction(
    state: &AppState,
    user: &CurrentUser,
    request: NewTransactionRequest,
) -> Result<Transaction, ServiceError> {
    let backend = state.backend()?;
    let transaction = backend
        .transact(|data| finance::add_transaction(data, &user.user_id, request, Utc::now()))
        .await?;
    backend.notify(&user.user_id, &[Collection::Transactions]);
    Ok(transaction)
}

pub async fn list_inventory(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<InventoryItemView>>, AppError> {
    let backend = state.backend()?;
    require_access(backend, &user, Feature::Finance).await?;
    let items = backend
        .read(|data| finance::inventory_for(data, &user.user_id))
        .await;
    Ok(Json(items))
}

pub async fn create_inventory_item(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<NewInventoryItemRequest>,
) -> Result<(StatusCode, Json<InventoryItemView>), AppError> {
    let item = apply_new_inventory_item(&state, &user, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(InventoryItemView {
            low_stock: item.is_low_stock(),
            item,
        }),
    ))
}

async fn apply_new_inventory_item(
    state: &AppState,
    user: &CurrentUser,
    request: NewInventoryItemRequest,
) -> Result<InventoryItem, ServiceError> {
    let backend = state.backend()?;
    let item = backend
        .transact(|data| finance::add_inventory_item(data, &user.user_id, request, Utc::now()))
        .await?;
    backend.notify(&user.user_id, &[Collection::Inventory]);
    Ok(item)
}

pub async fn dashboard(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<DashboardResponse>, AppError> {
    Ok(Json(load_dashboard(&state, &user).await?))
}

async fn load_dashboard(state: &AppState, user: &CurrentUser) -> Result<DashboardResponse, ServiceError> {
    let backend = state.backend()?;
    let profile = profile::load(backend, &user.user_id).await?;
    Ok(backend
        .read(|data| stats::build_dashboard(data, &profile))
        .await)
}

pub async fn rewards(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<RewardsResponse>, AppError> {
    let backend = state.backend()?;
    let profile = require_access(backend, &user, Feature::Rewards).await?;
    Ok(Json(rewards_for(&profile)))
}

/// Per-achievement progress is part of advanced gamification.
fn rewards_for(profile: &UserProfile) -> RewardsResponse {
    let advanced = subscription::has_feature_access(profile, Feature::AdvancedGamification, Utc::now());
    gamification::rewards_view(profile, advanced)
}

pub async fn get_subscription(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<SubscriptionResponse>, AppError> {
    let backend = state.backend()?;
    let profile = profile::load(backend, &user.user_id).await?;
    Ok(Json(subscription::subscription_view(&profile, Utc::now())))
}

pub async fn change_subscription(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<PlanChangeRequest>,
) -> Result<Json<SubscriptionResponse>, AppError> {
    let profile = apply_plan_change(&state, &user, payload).await?;
    Ok(Json(subscription::subscription_view(&profile, Utc::now())))
}

async fn apply_plan_change(
    state: &AppState,
    user: &CurrentUser,
    request: PlanChangeRequest,
) -> Result<UserProfile, ServiceError> {
    let backend = state.backend()?;
    let months = request.months.unwrap_or(1);
    let updated = backend
        .transact(|data| {
            let now = Utc::now();
            let profile = profile::get_or_create(data, &user.user_id, now);
            subscription::change_plan(profile, request.plan, months, now)?;
            Ok(profile.clone())
        })
        .await?;
    backend.notify(&user.user_id, &[Collection::Profiles]);
    Ok(updated)
}

// HTML pages

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub notice: Option<String>,
    pub date: Option<String>,
}

impl PageQuery {
    fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }
}

fn login_redirect() -> Response {
    Redirect::to("/login").into_response()
}

fn redirect_with_notice(path: &str, code: &str) -> Response {
    let separator = if path.contains('?') { '&' } else { '?' };
    Redirect::to(&format!("{path}{separator}notice={code}")).into_response()
}

/// Internal failures surface as an error page; everything else goes back to
/// the form with a notice code.
fn redirect_on_error(path: &str, err: ServiceError) -> Response {
    if err.status() == StatusCode::INTERNAL_SERVER_ERROR {
        return AppError::from(err).into_response();
    }
    redirect_with_notice(path, err.notice_code())
}

fn redirect_after<T>(path: &str, result: Result<T, ServiceError>, success: &str) -> Response {
    match result {
        Ok(_) => redirect_with_notice(path, success),
        Err(err) => redirect_on_error(path, err),
    }
}

fn signed_in_response(token: &str, state: &AppState) -> Response {
    let cookie = auth::session_cookie(token, state.config.session_ttl);
    ([(header::SET_COOKIE, cookie)], Redirect::to("/dashboard")).into_response()
}

pub async fn landing(user: Option<CurrentUser>, Query(query): Query<PageQuery>) -> Html<String> {
    Html(ui::render_landing(user.as_ref().map(|user| user.email.as_str()), query.notice()))
}

pub async fn login_page(user: Option<CurrentUser>, Query(query): Query<PageQuery>) -> Response {
    if user.is_some() {
        return Redirect::to("/dashboard").into_response();
    }
    Html(ui::render_login(query.notice())).into_response()
}

pub async fn login_submit(State(state): State<AppState>, Form(form): Form<CredentialsRequest>) -> Response {
    match auth::sign_in(&state, &form.email, &form.password).await {
        Ok((_, token)) => signed_in_response(&token, &state),
        Err(err) => redirect_on_error("/login", err),
    }
}

pub async fn signup_submit(State(state): State<AppState>, Form(form): Form<CredentialsRequest>) -> Response {
    match auth::sign_up(&state, &form.email, &form.password).await {
        Ok((_, token)) => signed_in_response(&token, &state),
        Err(err) => redirect_on_error("/login", err),
    }
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = auth::session_token(&headers) {
        if let Err(err) = auth::sign_out(&state, &token).await {
            warn!("sign out failed: {err}");
        }
    }
    (
        [(header::SET_COOKIE, auth::expired_session_cookie())],
        Redirect::to("/login?notice=logged-out"),
    )
        .into_response()
}

pub async fn dashboard_page(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Query(query): Query<PageQuery>,
) -> Result<Response, AppError> {
    let Some(user) = user else {
        return Ok(login_redirect());
    };
    let dashboard = load_dashboard(&state, &user).await?;
    Ok(Html(ui::render_dashboard(&user.email, &dashboard, query.notice())).into_response())
}

pub async fn planner_page(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Query(query): Query<PageQuery>,
) -> Result<Response, AppError> {
    let Some(user) = user else {
        return Ok(login_redirect());
    };
    let backend = state.backend()?;
    let profile = profile::load(backend, &user.user_id).await?;
    if !subscription::has_feature_access(&profile, Feature::Planner, Utc::now()) {
        return Ok(Html(ui::render_locked(&user.email, Feature::Planner)).into_response());
    }

    let date = query
        .date
        .as_deref()
        .and_then(|value| value.parse::<NaiveDate>().ok())
        .unwrap_or_else(today);
    let tasks = backend
        .read(|data| planner::tasks_for_day(data, &user.user_id, date))
        .await;
    Ok(Html(ui::render_planner(&user.email, date, &tasks, &profile, query.notice())).into_response())
}

#[derive(Debug, Deserialize)]
pub struct TaskForm {
    pub title: String,
    #[serde(default)]
    pub date: String,
}

pub async fn planner_add_task(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Form(form): Form<TaskForm>,
) -> Response {
    let Some(user) = user else {
        return login_redirect();
    };
    let date = match form.date.trim() {
        "" => today(),
        value => match value.parse::<NaiveDate>() {
            Ok(date) => date,
            Err(_) => return redirect_with_notice("/planner", "invalid-input"),
        },
    };
    let back = format!("/planner?date={date}");

    let result = async {
        let backend = state.backend()?;
        let task = backend
            .transact(|data| planner::create_task(data, &user.user_id, &form.title, date, Utc::now()))
            .await?;
        backend.notify(&user.user_id, &[Collection::Tasks]);
        Ok::<_, ServiceError>(task)
    }
    .await;
    redirect_after(&back, result, "task-added")
}

pub async fn planner_toggle_task(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Path(task_id): Path<String>,
) -> Response {
    let Some(user) = user else {
        return login_redirect();
    };
    match apply_toggle(&state, &user, &task_id).await {
        Ok(outcome) => {
            let code = if !outcome.newly_unlocked.is_empty() {
                "achievement-unlocked"
            } else if outcome.task.completed {
                "task-completed"
            } else {
                "task-reopened"
            };
            redirect_with_notice(&format!("/planner?date={}", outcome.task.date), code)
        }
        Err(err) => redirect_on_error("/planner", err),
    }
}

pub async fn finance_page(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Query(query): Query<PageQuery>,
) -> Result<Response, AppError> {
    let Some(user) = user else {
        return Ok(login_redirect());
    };
    let backend = state.backend()?;
    let profile = profile::load(backend, &user.user_id).await?;
    if !subscription::has_feature_access(&profile, Feature::Finance, Utc::now()) {
        return Ok(Html(ui::render_locked(&user.email, Feature::Finance)).into_response());
    }

    let (transactions, inventory) = backend
        .read(|data| {
            (
                finance::transactions_for(data, &user.user_id),
                finance::inventory_for(data, &user.user_id),
            )
        })
        .await;
    let totals = finance::totals(&transactions);
    Ok(Html(ui::render_finance(
        &user.email,
        &transactions,
        &inventory,
        &totals,
        query.notice(),
    ))
    .into_response())
}

#[derive(Debug, Deserialize)]
pub struct TransactionForm {
    pub kind: TransactionKind,
    pub amount: String,
    pub description: String,
    #[serde(default)]
    pub category: String,
}

#[derive(Debug, Deserialize)]
pub struct InventoryForm {
    pub name: String,
    pub quantity: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub min_quantity: String,
}

/// Accepts both `12.5` and `12,5`. Blank input reads as `blank`.
fn parse_number(value: &str, label: &str, blank: Option<f64>) -> Result<f64, ServiceError> {
    let value = value.trim();
    if value.is_empty() {
        return blank.ok_or_else(|| ServiceError::validation(format!("{label} is required")));
    }
    value
        .replace(',', ".")
        .parse::<f64>()
        .map_err(|_| ServiceError::validation(format!("{label} must be a number")))
}

pub async fn finance_add_transaction(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Form(form): Form<TransactionForm>,
) -> Response {
    let Some(user) = user else {
        return login_redirect();
    };
    let result = async {
        let request = NewTransactionRequest {
            kind: form.kind,
            amount: parse_number(&form.amount, "amount", None)?,
            description: form.description,
            category: form.category,
        };
        apply_new_transaction(&state, &user, request).await
    }
    .await;
    redirect_after("/finance", result, "transaction-added")
}

pub async fn finance_add_inventory_item(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Form(form): Form<InventoryForm>,
) -> Response {
    let Some(user) = user else {
        return login_redirect();
    };
    let result = async {
        let request = NewInventoryItemRequest {
            name: form.name,
            quantity: parse_number(&form.quantity, "quantity", None)?,
            unit: Some(form.unit),
            min_quantity: parse_number(&form.min_quantity, "minimum quantity", Some(0.0))?,
        };
        apply_new_inventory_item(&state, &user, request).await
    }
    .await;
    redirect_after("/finance", result, "item-added")
}

pub async fn rewards_page(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Query(query): Query<PageQuery>,
) -> Result<Response, AppError> {
    let Some(user) = user else {
        return Ok(login_redirect());
    };
    let backend = state.backend()?;
    let profile = profile::load(backend, &user.user_id).await?;
    if !subscription::has_feature_access(&profile, Feature::Rewards, Utc::now()) {
        return Ok(Html(ui::render_locked(&user.email, Feature::Rewards)).into_response());
    }
    let rewards = rewards_for(&profile);
    Ok(Html(ui::render_rewards(&user.email, &rewards, query.notice())).into_response())
}

pub async fn settings_page(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Query(query): Query<PageQuery>,
) -> Result<Response, AppError> {
    let Some(user) = user else {
        return Ok(login_redirect());
    };
    let backend = state.backend()?;
    let profile = profile::load(backend, &user.user_id).await?;
    let subscription = subscription::subscription_view(&profile, Utc::now());
    Ok(Html(ui::render_settings(
        &user.email,
        &profile,
        &subscription,
        query.notice(),
    ))
    .into_response())
}

pub async fn settings_profile(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Form(form): Form<ProfileUpdateRequest>,
) -> Response {
    let Some(user) = user else {
        return login_redirect();
    };
    let result = async {
        let backend = state.backend()?;
        let updated = backend
            .transact(|data| profile::update_details(data, &user.user_id, form, Utc::now()))
            .await?;
        backend.notify(&user.user_id, &[Collection::Profiles]);
        Ok::<_, ServiceError>(updated)
    }
    .await;
    redirect_after("/settings", result, "profile-saved")
}

pub async fn settings_email(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Form(form): Form<EmailChangeRequest>,
) -> Response {
    let Some(user) = user else {
        return login_redirect();
    };
    let result = auth::change_email(&state, &user.user_id, &form.current_password, &form.new_email).await;
    redirect_after("/settings", result, "email-changed")
}

pub async fn settings_password(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Form(form): Form<PasswordChangeRequest>,
) -> Response {
    let Some(user) = user else {
        return login_redirect();
    };
    let result = auth::change_password(
        &state,
        &user.user_id,
        &user.token,
        &form.current_password,
        &form.new_password,
        &form.confirm_password,
    )
    .await;
    redirect_after("/settings", result, "password-changed")
}

pub async fn settings_plan(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Form(form): Form<PlanChangeRequest>,
) -> Response {
    let Some(user) = user else {
        return login_redirect();
    };
    let result = apply_plan_change(&state, &user, form).await;
    redirect_after("/settings", result, "plan-changed")
}

pub async fn not_found() -> (StatusCode, Html<String>) {
    (StatusCode::NOT_FOUND, Html(ui::render_not_found()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_accept_comma_decimals() {
        assert_eq!(parse_number("12,5", "amount", None).unwrap(), 12.5);
        assert_eq!(parse_number(" 3 ", "amount", None).unwrap(), 3.0);
        assert_eq!(parse_number("", "min", Some(0.0)).unwrap(), 0.0);
        assert!(parse_number("", "amount", None).is_err());
        assert!(parse_number("abc", "amount", None).is_err());
    }

    #[test]
    fn notices_append_to_existing_query() {
        let response = redirect_with_notice("/planner?date=2026-03-01", "task-added");
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        assert_eq!(location, "/planner?date=2026-03-01&notice=task-added");

        let response = redirect_with_notice("/settings", "saved");
        assert_eq!(response.headers()[header::LOCATION], "/settings?notice=saved");
    }

    #[test]
    fn failed_forms_redirect_with_error_code() {
        let response = redirect_after::<()>(
            "/finance",
            Err(ServiceError::FeatureLocked(Feature::Finance)),
            "transaction-added",
        );
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/finance?notice=feature-locked");

        let response = redirect_after("/finance", Ok(()), "item-added");
        assert_eq!(response.headers()[header::LOCATION], "/finance?notice=item-added");

        let response = redirect_on_error("/login", ServiceError::BackendNotConfigured);
        assert_eq!(response.headers()[header::LOCATION], "/login?notice=backend-unavailable");
    }
}
