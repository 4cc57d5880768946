//! Component B: the scheduler engine — priority sort, slot search, optimal
//! placement, utilization, conflict repacking.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::SchedulerConfig;
use crate::domain::{BlockType, Schedule, Slot, TimeBlock};

use super::candidate::{PlacementResult, SchedulableTask};

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("no available time slots")]
    NoAvailableSlots,
}

pub struct SchedulerEngine {
    config: SchedulerConfig,
}

impl SchedulerEngine {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    fn working_window(&self, schedule_date: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            schedule_date + self.config.work_start(),
            schedule_date + self.config.work_end(),
        )
    }

    /// §4.B: stable-sort by ascending priority, then earlier due date first
    /// (absent due dates sort last), then shorter duration first.
    fn sort_tasks(tasks: &mut [SchedulableTask]) {
        tasks.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| match (a.due_date, b.due_date) {
                    (Some(x), Some(y)) => x.cmp(&y),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                })
                .then_with(|| a.duration.cmp(&b.duration))
        });
    }

    fn choose_best_slot<'a>(
        &self,
        slots: &'a [Slot],
        task: &SchedulableTask,
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
    ) -> Option<&'a Slot> {
        if slots.is_empty() {
            return None;
        }

        if self.config.prefer_morning && task.priority <= 2 {
            let midpoint = day_start + (day_end - day_start) / 2;
            if let Some(slot) = slots.iter().find(|s| s.start < midpoint) {
                return Some(slot);
            }
        }

        if task.is_due_same_day(day_start) {
            // Procrastination buffer: the last slot that fits the duration.
            if let Some(slot) = slots.iter().rev().find(|s| s.fits(task.duration)) {
                return Some(slot);
            }
        }

        slots.first()
    }

    /// §4.B main algorithm: place a batch of candidates into `schedule`,
    /// emitting one [`PlacementResult`] per task in sorted order.
    pub fn auto_schedule(
        &self,
        schedule: &mut Schedule,
        tasks: Vec<SchedulableTask>,
        now: DateTime<Utc>,
    ) -> Vec<PlacementResult> {
        let mut tasks = tasks;
        Self::sort_tasks(&mut tasks);

        let (day_start, day_end) = self.working_window(schedule.date);
        let min_break = self.config.min_break_between();

        let mut results = Vec::with_capacity(tasks.len());

        for task in tasks {
            let required = task.duration + min_break;
            let slots = schedule.find_available_slots(day_start, day_end, required);

            let Some(slot) = self.choose_best_slot(&slots, &task, day_start, day_end) else {
                debug!(task_id = %task.id, "no available time slots");
                results.push(PlacementResult::failed(
                    task.id.clone(),
                    "no available time slots",
                ));
                continue;
            };

            let mut start_time = slot.start;
            if min_break > Duration::zero() && start_time != day_start {
                start_time += min_break;
            }
            let end_time = start_time + task.duration;

            match schedule.add_block(
                task.block_type,
                Some(task.id.clone()),
                task.title.clone(),
                start_time,
                end_time,
                &task.constraints,
                now,
            ) {
                Ok(block) => {
                    info!(task_id = %task.id, start = %block.start_time, "placed block");
                    results.push(PlacementResult::placed(task.id.clone(), &block));
                }
                Err(err) => {
                    results.push(PlacementResult::failed(task.id.clone(), err.message()));
                }
            }
        }

        results
    }

    /// Without a preference: first slot. With one: the slot whose start
    /// minimizes `|start - preferred|` among slots of sufficient length.
    pub fn find_optimal_slot(
        &self,
        schedule: &Schedule,
        duration: Duration,
        preferred_start: Option<DateTime<Utc>>,
    ) -> Result<Slot, SchedulerError> {
        let (day_start, day_end) = self.working_window(schedule.date);
        let slots = schedule.find_available_slots(day_start, day_end, duration);

        match preferred_start {
            None => slots.into_iter().next().ok_or(SchedulerError::NoAvailableSlots),
            Some(preferred) => slots
                .into_iter()
                .min_by_key(|s| (s.start - preferred).num_seconds().abs())
                .ok_or(SchedulerError::NoAvailableSlots),
        }
    }

    /// §4.B `rescheduleConflicts`: move every existing block overlapping
    /// `candidate_start..candidate_end` to the first available slot.
    pub fn reschedule_conflicts(
        &self,
        schedule: &mut Schedule,
        candidate_block_id: Option<crate::domain::BlockId>,
        candidate_start: DateTime<Utc>,
        candidate_end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Vec<PlacementResult> {
        let (day_start, day_end) = self.working_window(schedule.date);
        let min_break = self.config.min_break_between();

        let overlapping: Vec<TimeBlock> = schedule
            .blocks()
            .iter()
            .filter(|b| Some(b.id) != candidate_block_id)
            .filter(|b| b.overlaps(candidate_start, candidate_end))
            .cloned()
            .collect();

        let mut results = Vec::with_capacity(overlapping.len());
        for block in overlapping {
            let required = block.duration() + min_break;
            let slots =
                schedule.find_available_slots_excluding(Some(block.id), day_start, day_end, required);

            let Some(slot) = slots.first() else {
                results.push(PlacementResult::failed(
                    block.id.to_string(),
                    "no available time slots",
                ));
                continue;
            };

            let new_start = slot.start;
            let new_end = new_start + block.duration();

            match schedule.reschedule_block(block.id, new_start, new_end, &[], now) {
                Ok(updated) => results.push(PlacementResult::placed(block.id.to_string(), &updated)),
                Err(err) => results.push(PlacementResult::failed(block.id.to_string(), err.message())),
            }
        }

        results
    }

    /// `totalScheduledDuration / (workEnd - workStart) * 100`; 0 when the
    /// window is empty.
    pub fn calculate_utilization(&self, schedule: &Schedule) -> f64 {
        let (day_start, day_end) = self.working_window(schedule.date);
        let window = day_end - day_start;
        if window <= Duration::zero() {
            return 0.0;
        }

        let total: Duration = schedule
            .blocks()
            .iter()
            .filter(|b| b.start_time >= day_start && b.end_time <= day_end)
            .map(|b| b.duration())
            .fold(Duration::zero(), |acc, d| acc + d);

        (total.num_seconds() as f64 / window.num_seconds() as f64) * 100.0
    }

    pub fn default_block_type_for(task: &SchedulableTask) -> BlockType {
        task.block_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;
    use chrono::TimeZone;

    fn day() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap()
    }

    fn task(id: &str, priority: u8, minutes: i64) -> SchedulableTask {
        SchedulableTask {
            id: id.into(),
            title: id.into(),
            priority,
            duration: Duration::minutes(minutes),
            due_date: None,
            constraints: vec![],
            block_type: BlockType::Task,
        }
    }

    #[test]
    fn scenario_1_empty_schedule_single_task() {
        let engine = SchedulerEngine::new(SchedulerConfig::default());
        let mut schedule = Schedule::new(UserId::new(), day(), day());
        let results = engine.auto_schedule(&mut schedule, vec![task("T1", 3, 45)], day());

        assert!(results[0].scheduled);
        assert_eq!(results[0].start_time.unwrap(), day() + Duration::hours(9));
        assert_eq!(
            results[0].end_time.unwrap(),
            day() + Duration::hours(9) + Duration::minutes(45)
        );

        let utilization = engine.calculate_utilization(&schedule);
        assert!((utilization - 9.375).abs() < 0.01);
    }

    #[test]
    fn scenario_2_priority_order() {
        let engine = SchedulerEngine::new(SchedulerConfig::default());
        let mut schedule = Schedule::new(UserId::new(), day(), day());
        let results = engine.auto_schedule(
            &mut schedule,
            vec![task("low", 4, 30), task("urgent", 1, 30)],
            day(),
        );

        let urgent = results.iter().find(|r| r.task_id == "urgent").unwrap();
        let low = results.iter().find(|r| r.task_id == "low").unwrap();
        assert_eq!(urgent.start_time.unwrap(), day() + Duration::hours(9));
        assert_eq!(
            low.start_time.unwrap(),
            day() + Duration::hours(9) + Duration::minutes(35)
        );
    }

    #[test]
    fn scenario_3_due_date_tie_break() {
        let engine = SchedulerEngine::new(SchedulerConfig::default());
        let mut schedule = Schedule::new(UserId::new(), day(), day());
        let mut due_tomorrow = task("tomorrow", 3, 30);
        due_tomorrow.due_date = Some(day() + Duration::days(1));
        let mut due_next_week = task("next_week", 3, 30);
        due_next_week.due_date = Some(day() + Duration::days(7));

        let results =
            engine.auto_schedule(&mut schedule, vec![due_next_week, due_tomorrow], day());

        let tomorrow = results.iter().find(|r| r.task_id == "tomorrow").unwrap();
        let next_week = results.iter().find(|r| r.task_id == "next_week").unwrap();
        assert!(tomorrow.start_time.unwrap() < next_week.start_time.unwrap());
    }

    #[test]
    fn scenario_4_no_slot() {
        let engine = SchedulerEngine::new(SchedulerConfig::default());
        let mut schedule = Schedule::new(UserId::new(), day(), day());
        schedule
            .add_block(
                BlockType::Meeting,
                None,
                "blocker".into(),
                day() + Duration::hours(9),
                day() + Duration::hours(17),
                &[],
                day(),
            )
            .unwrap();

        let results = engine.auto_schedule(&mut schedule, vec![task("T1", 3, 30)], day());
        assert!(!results[0].scheduled);
        assert_eq!(results[0].reason.as_deref(), Some("no available time slots"));
    }

    #[test]
    fn scenario_8_duplicate_add_is_overlap() {
        let mut schedule = Schedule::new(UserId::new(), day(), day());
        schedule
            .add_block(
                BlockType::Task,
                None,
                "a".into(),
                day() + Duration::hours(9),
                day() + Duration::hours(10),
                &[],
                day(),
            )
            .unwrap();
        let err = schedule
            .add_block(
                BlockType::Task,
                None,
                "b".into(),
                day() + Duration::hours(9) + Duration::minutes(30),
                day() + Duration::hours(10) + Duration::minutes(30),
                &[],
                day(),
            )
            .unwrap_err();
        assert!(matches!(err, crate::domain::DomainError::Overlap));
        assert!(schedule.drain_events().is_empty());
    }
}
