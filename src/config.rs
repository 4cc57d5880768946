//! §6 configuration surface, grounded on the teacher's
//! `db::repo_config::RepositoryConfig` / `PostgresConfig::from_env` pattern:
//! serde + `toml` for file-based config, with env-var overrides and a
//! `Default` that matches the spec's literal defaults.

use serde::{Deserialize, Serialize};
use std::time::Duration as StdDuration;

/// Scheduler placement configuration (§4.B, §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Minutes after local midnight the working day begins. Default 09:00.
    pub default_work_start_minutes: i64,
    /// Minutes after local midnight the working day ends. Default 17:00.
    pub default_work_end_minutes: i64,
    /// Minimum gap to leave between consecutively placed blocks.
    pub min_break_between_minutes: i64,
    /// Prefer placing high-priority (<=2) tasks before the day's midpoint.
    pub prefer_morning: bool,
    pub task_defaults: TaskDefaults,
    pub habit_defaults: HabitDefaults,
    pub meeting_defaults: MeetingDefaults,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskDefaults {
    pub duration_minutes: i64,
    pub same_day_due_penalty: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HabitDefaults {
    pub duration_minutes: i64,
    pub priority: u8,
    pub preferred_time_penalty: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeetingDefaults {
    pub duration_minutes: i64,
    pub priority: u8,
    pub preferred_time_penalty: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_work_start_minutes: 9 * 60,
            default_work_end_minutes: 17 * 60,
            min_break_between_minutes: 5,
            prefer_morning: true,
            task_defaults: TaskDefaults::default(),
            habit_defaults: HabitDefaults::default(),
            meeting_defaults: MeetingDefaults::default(),
        }
    }
}

impl Default for TaskDefaults {
    fn default() -> Self {
        Self {
            duration_minutes: 30,
            same_day_due_penalty: 100.0,
        }
    }
}

impl Default for HabitDefaults {
    fn default() -> Self {
        Self {
            duration_minutes: 20,
            priority: 3,
            preferred_time_penalty: 5.0,
        }
    }
}

impl Default for MeetingDefaults {
    fn default() -> Self {
        Self {
            duration_minutes: 30,
            priority: 2,
            preferred_time_penalty: 10.0,
        }
    }
}

impl SchedulerConfig {
    pub fn work_start(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.default_work_start_minutes)
    }

    pub fn work_end(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.default_work_end_minutes)
    }

    pub fn min_break_between(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.min_break_between_minutes)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Overlays environment variables on top of [`Default`], mirroring the
    /// teacher's `PostgresConfig::from_env`.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(v) = std::env::var("SCHEDULER_WORK_START_MINUTES") {
            if let Ok(v) = v.parse() {
                cfg.default_work_start_minutes = v;
            }
        }
        if let Ok(v) = std::env::var("SCHEDULER_WORK_END_MINUTES") {
            if let Ok(v) = v.parse() {
                cfg.default_work_end_minutes = v;
            }
        }
        if let Ok(v) = std::env::var("SCHEDULER_MIN_BREAK_MINUTES") {
            if let Ok(v) = v.parse() {
                cfg.min_break_between_minutes = v;
            }
        }
        if let Ok(v) = std::env::var("SCHEDULER_PREFER_MORNING") {
            if let Ok(v) = v.parse() {
                cfg.prefer_morning = v;
            }
        }
        cfg
    }
}

/// Default strategy for the conflict resolver (§4.D).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    OrbitaWins,
    ExternalWins,
    TimeFirst,
    Manual,
}

impl Default for ResolutionStrategy {
    fn default() -> Self {
        ResolutionStrategy::TimeFirst
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConflictResolutionConfig {
    pub strategy: ResolutionStrategy,
}

impl Default for ConflictResolutionConfig {
    fn default() -> Self {
        Self {
            strategy: ResolutionStrategy::default(),
        }
    }
}

/// A deadline budget for a single command, honored at suspension points
/// (§5). Intentionally simple — no `tokio-util` dependency in this stack.
#[derive(Debug, Copy, Clone)]
pub struct CommandDeadline {
    started_at: std::time::Instant,
    budget: Option<StdDuration>,
}

impl CommandDeadline {
    pub fn unbounded() -> Self {
        Self {
            started_at: std::time::Instant::now(),
            budget: None,
        }
    }

    pub fn with_budget(budget: StdDuration) -> Self {
        Self {
            started_at: std::time::Instant::now(),
            budget: Some(budget),
        }
    }

    pub fn expired(&self) -> bool {
        match self.budget {
            Some(budget) => self.started_at.elapsed() >= budget,
            None => false,
        }
    }
}
