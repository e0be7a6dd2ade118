use crate::errors::ServiceError;
use crate::gamification::{self, StreakChange, TASK_POINTS};
use crate::models::{AppData, Task, UserProfile};
use crate::profile;
use crate::subscription::{self, Feature};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

pub const MAX_TITLE_LEN: usize = 200;
pub const UPCOMING_LIMIT: usize = 5;

pub fn create_task(
    data: &mut AppData,
    user_id: &str,
    title: &str,
    date: NaiveDate,
    now: DateTime<Utc>,
) -> Result<Task, ServiceError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ServiceError::validation("task title is required"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ServiceError::validation(format!(
            "task title must be at most {MAX_TITLE_LEN} characters"
        )));
    }

    let profile = profile::get_or_create(data, user_id, now);
    subscription::require_feature(profile, Feature::Planner, now)?;
    subscription::can_create_task(profile, now).into_result()?;

    let task = Task {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        title: title.to_string(),
        completed: false,
        date,
        points: TASK_POINTS,
        created_at: now,
        completed_at: None,
    };
    data.tasks.insert(task.id.clone(), task.clone());
    Ok(task)
}

pub fn tasks_for_day(data: &AppData, user_id: &str, date: NaiveDate) -> Vec<Task> {
    let mut tasks: Vec<Task> = data
        .tasks
        .values()
        .filter(|task| task.user_id == user_id && task.date == date)
        .cloned()
        .collect();
    tasks.sort_by_key(|task| task.created_at);
    tasks
}

/// Open tasks from `today` onwards, soonest first.
pub fn upcoming_tasks(data: &AppData, user_id: &str, today: NaiveDate) -> Vec<Task> {
    let mut tasks: Vec<Task> = data
        .tasks
        .values()
        .filter(|task| task.user_id == user_id && !task.completed && task.date >= today)
        .cloned()
        .collect();
    tasks.sort_by_key(|task| (task.date, task.created_at));
    tasks.truncate(UPCOMING_LIMIT);
    tasks
}

#[derive(Debug, Serialize)]
pub struct ToggleOutcome {
    pub task: Task,
    pub profile: UserProfile,
    /// Signed change of `total_points`, bonuses included.
    pub points_delta: i64,
    /// `None` when the task was reopened.
    pub streak: Option<StreakChange>,
    pub newly_unlocked: Vec<gamification::AchievementId>,
}

fn signed(points: u64) -> i64 {
    i64::try_from(points).unwrap_or(i64::MAX)
}

/// Flips a task's completion and applies the matching profile bookkeeping.
pub fn toggle_task(
    data: &mut AppData,
    user_id: &str,
    task_id: &str,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<ToggleOutcome, ServiceError> {
    if !data.tasks.get(task_id).is_some_and(|task| task.user_id == user_id) {
        return Err(ServiceError::NotFound("task"));
    }
    subscription::require_feature(profile::get_or_create(data, user_id, now), Feature::Planner, now)?;

    let task = data
        .tasks
        .get_mut(task_id)
        .ok_or(ServiceError::NotFound("task"))?;
    task.completed = !task.completed;
    task.completed_at = task.completed.then_some(now);
    let task = task.clone();

    let profile = profile::get_or_create(data, user_id, now);
    let (points_delta, streak, newly_unlocked) = if task.completed {
        let outcome = gamification::record_task_completion(profile, task.points, task.date, today, now);
        (signed(outcome.points_awarded), Some(outcome.streak), outcome.newly_unlocked)
    } else {
        let removed = gamification::revert_task_completion(profile, task.points, now);
        (-signed(removed), None, Vec::new())
    };

    Ok(ToggleOutcome {
        task,
        profile: profile.clone(),
        points_delta,
        streak,
        newly_unlocked,
    })
}
