//! Points, levels, streaks and achievements.
//!
//! Everything here is a pure mutation of a [`UserProfile`]. Callers run these
//! inside a single storage transaction, so the derived fields (level, streak,
//! unlocked set) are always written together with the counters they depend on.

use crate::models::{RewardsResponse, UserProfile};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

pub const POINTS_PER_LEVEL: u64 = 500;

/// Points attached to every task at creation.
pub const TASK_POINTS: u32 = 10;

pub fn level_for_points(total_points: u64) -> u32 {
    let level = total_points / POINTS_PER_LEVEL + 1;
    u32::try_from(level).unwrap_or(u32::MAX).max(1)
}

pub fn add_points(profile: &mut UserProfile, points: u64) {
    profile.total_points = profile.total_points.saturating_add(points);
    profile.level = level_for_points(profile.total_points);
}

/// Removes points, never going below zero.
pub fn remove_points(profile: &mut UserProfile, points: u64) {
    profile.total_points = profile.total_points.saturating_sub(points);
    profile.level = level_for_points(profile.total_points);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakChange {
    Started,
    Extended,
    Unchanged,
    Reset,
    /// The task was not scheduled for today.
    Ignored,
}

/// Advances the daily streak for a task completed on `task_date`.
///
/// Only tasks scheduled for `today` move an existing streak. The very first
/// completion always starts one, whatever day the task belongs to.
pub fn update_streak(profile: &mut UserProfile, task_date: NaiveDate, today: NaiveDate) -> StreakChange {
    let change = match profile.last_task_date {
        None => {
            profile.current_streak = 1;
            profile.last_task_date = Some(task_date);
            StreakChange::Started
        }
        Some(_) if task_date != today => return StreakChange::Ignored,
        Some(last) if last == today => StreakChange::Unchanged,
        Some(last) if today.pred_opt() == Some(last) => {
            profile.current_streak = profile.current_streak.saturating_add(1);
            profile.last_task_date = Some(today);
            StreakChange::Extended
        }
        Some(_) => {
            profile.current_streak = 1;
            profile.last_task_date = Some(today);
            StreakChange::Reset
        }
    };

    profile.longest_streak = profile.longest_streak.max(profile.current_streak);
    change
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AchievementId {
    FirstTask,
    TaskMaster,
    Dedication,
    Perfectionist,
    Legend,
    Streak,
}

impl AchievementId {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FirstTask => "first-task",
            Self::TaskMaster => "task-master",
            Self::Dedication => "dedication",
            Self::Perfectionist => "perfectionist",
            Self::Legend => "legend",
            Self::Streak => "streak",
        }
    }
}

impl fmt::Display for AchievementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Threshold {
    CompletedTasks(u64),
    Streak(u32),
}

#[derive(Debug)]
pub struct Achievement {
    pub id: AchievementId,
    pub title: &'static str,
    pub description: &'static str,
    pub threshold: Threshold,
    pub bonus_points: u64,
}

impl Achievement {
    pub fn is_satisfied(&self, completed_tasks: u64, current_streak: u32) -> bool {
        match self.threshold {
            Threshold::CompletedTasks(required) => completed_tasks >= required,
            Threshold::Streak(required) => current_streak >= required,
        }
    }

    /// Current value of the tracked counter, capped at the requirement.
    pub fn progress(&self, completed_tasks: u64, current_streak: u32) -> AchievementProgress {
        let (current, required) = match self.threshold {
            Threshold::CompletedTasks(required) => (completed_tasks, required),
            Threshold::Streak(required) => (u64::from(current_streak), u64::from(required)),
        };
        AchievementProgress {
            current: current.min(required),
            required,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AchievementProgress {
    pub current: u64,
    pub required: u64,
}

pub static ACHIEVEMENTS: [Achievement; 6] = [
    Achievement {
        id: AchievementId::FirstTask,
        title: "First Step",
        description: "Complete your first task",
        threshold: Threshold::CompletedTasks(1),
        bonus_points: 50,
    },
    Achievement {
        id: AchievementId::TaskMaster,
        title: "Task Master",
        description: "Complete 10 tasks",
        threshold: Threshold::CompletedTasks(10),
        bonus_points: 200,
    },
    Achievement {
        id: AchievementId::Dedication,
        title: "Dedication",
        description: "Complete 25 tasks",
        threshold: Threshold::CompletedTasks(25),
        bonus_points: 500,
    },
    Achievement {
        id: AchievementId::Perfectionist,
        title: "Perfectionist",
        description: "Complete 50 tasks",
        threshold: Threshold::CompletedTasks(50),
        bonus_points: 1000,
    },
    Achievement {
        id: AchievementId::Legend,
        title: "Legend",
        description: "Complete 100 tasks",
        threshold: Threshold::CompletedTasks(100),
        bonus_points: 2500,
    },
    Achievement {
        id: AchievementId::Streak,
        title: "On a Roll",
        description: "Complete tasks 7 days in a row",
        threshold: Threshold::Streak(7),
        bonus_points: 300,
    },
];

/// Unlocks every satisfied achievement not yet held and awards its bonus.
/// Returns the ids unlocked by this call, in table order.
pub fn check_and_unlock_achievements(
    profile: &mut UserProfile,
    completed_tasks: u64,
    current_streak: u32,
) -> Vec<AchievementId> {
    let mut newly_unlocked = Vec::new();
    for achievement in &ACHIEVEMENTS {
        if !achievement.is_satisfied(completed_tasks, current_streak) {
            continue;
        }
        if profile.unlocked_achievements.insert(achievement.id) {
            add_points(profile, achievement.bonus_points);
            info!(
                user_id = %profile.user_id,
                achievement = %achievement.id,
                bonus = achievement.bonus_points,
                "achievement unlocked"
            );
            newly_unlocked.push(achievement.id);
        }
    }
    newly_unlocked
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionOutcome {
    pub points_awarded: u64,
    pub streak: StreakChange,
    pub newly_unlocked: Vec<AchievementId>,
}

/// Applies everything a task completion implies, as one step.
pub fn record_task_completion(
    profile: &mut UserProfile,
    task_points: u32,
    task_date: NaiveDate,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> CompletionOutcome {
    let before = profile.total_points;
    add_points(profile, u64::from(task_points));
    profile.completed_tasks = profile.completed_tasks.saturating_add(1);
    let streak = update_streak(profile, task_date, today);
    let (completed, current) = (profile.completed_tasks, profile.current_streak);
    let newly_unlocked = check_and_unlock_achievements(profile, completed, current);
    profile.updated_at = now;

    CompletionOutcome {
        points_awarded: profile.total_points - before,
        streak,
        newly_unlocked,
    }
}

/// Undoes the points and counter of a completion. Streaks and achievements
/// stay. Returns the points actually removed.
pub fn revert_task_completion(profile: &mut UserProfile, task_points: u32, now: DateTime<Utc>) -> u64 {
    let before = profile.total_points;
    remove_points(profile, u64::from(task_points));
    profile.completed_tasks = profile.completed_tasks.saturating_sub(1);
    profile.updated_at = now;
    before - profile.total_points
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LevelProgress {
    pub level: u32,
    pub points_into_level: u64,
    pub points_to_next_level: u64,
    pub percent: f64,
}

impl LevelProgress {
    pub fn for_points(total_points: u64) -> Self {
        let points_into_level = total_points % POINTS_PER_LEVEL;
        Self {
            level: level_for_points(total_points),
            points_into_level,
            points_to_next_level: POINTS_PER_LEVEL - points_into_level,
            percent: points_into_level as f64 * 100.0 / POINTS_PER_LEVEL as f64,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AchievementStatus {
    pub id: AchievementId,
    pub title: &'static str,
    pub description: &'static str,
    pub bonus_points: u64,
    pub unlocked: bool,
    /// Only filled in for plans with advanced gamification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<AchievementProgress>,
}

pub fn rewards_view(profile: &UserProfile, show_progress: bool) -> RewardsResponse {
    let achievements: Vec<AchievementStatus> = ACHIEVEMENTS
        .iter()
        .map(|achievement| AchievementStatus {
            id: achievement.id,
            title: achievement.title,
            description: achievement.description,
            bonus_points: achievement.bonus_points,
            unlocked: profile.unlocked_achievements.contains(&achievement.id),
            progress: show_progress
                .then(|| achievement.progress(profile.completed_tasks, profile.current_streak)),
        })
        .collect();
    let unlocked_count = achievements.iter().filter(|status| status.unlocked).count();

    RewardsResponse {
        total_points: profile.total_points,
        level: profile.level,
        progress: LevelProgress::for_points(profile.total_points),
        completed_tasks: profile.completed_tasks,
        current_streak: profile.current_streak,
        longest_streak: profile.longest_streak,
        achievements,
        unlocked_count,
    }
}
