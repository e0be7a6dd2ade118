use crate::handlers;
use crate::live;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post, put},
};

pub fn router(state: AppState) -> Router {
    let pages = Router::new()
        .route("/", get(handlers::landing))
        .route("/login", get(handlers::login_page).post(handlers::login_submit))
        .route("/signup", post(handlers::signup_submit))
        .route("/logout", post(handlers::logout))
        .route("/dashboard", get(handlers::dashboard_page))
        .route("/planner", get(handlers::planner_page))
        .route("/planner/tasks", post(handlers::planner_add_task))
        .route("/planner/tasks/:id/toggle", post(handlers::planner_toggle_task))
        .route("/finance", get(handlers::finance_page))
        .route("/finance/transactions", post(handlers::finance_add_transaction))
        .route("/finance/inventory", post(handlers::finance_add_inventory_item))
        .route("/rewards", get(handlers::rewards_page))
        .route("/settings", get(handlers::settings_page))
        .route("/settings/profile", post(handlers::settings_profile))
        .route("/settings/email", post(handlers::settings_email))
        .route("/settings/password", post(handlers::settings_password))
        .route("/settings/plan", post(handlers::settings_plan));

    let api = Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/signup", post(handlers::sign_up))
        .route("/auth/signin", post(handlers::sign_in))
        .route("/auth/signout", post(handlers::sign_out))
        .route("/profile", get(handlers::get_profile).patch(handlers::update_profile))
        .route("/account/email", put(handlers::change_email))
        .route("/account/password", put(handlers::change_password))
        .route("/tasks", get(handlers::list_tasks).post(handlers::create_task))
        .route("/tasks/:id/toggle", post(handlers::toggle_task))
        .route(
            "/transactions",
            get(handlers::list_transactions).post(handlers::create_transaction),
        )
        .route(
            "/inventory",
            get(handlers::list_inventory).post(handlers::create_inventory_item),
        )
        .route("/dashboard", get(handlers::dashboard))
        .route("/rewards", get(handlers::rewards))
        .route(
            "/subscription",
            get(handlers::get_subscription).post(handlers::change_subscription),
        )
        .route("/live", get(live::live_changes));

    pages
        .nest("/api", api)
        .fallback(handlers::not_found)
        .with_state(state)
}
