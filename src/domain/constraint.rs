//! Polymorphic, closed-set constraints: a predicate `(block) -> (satisfied, penalty)`.
//!
//! Implemented as a tagged variant set rather than an open trait hierarchy —
//! constraint kinds are closed per the design notes.

use chrono::{Datelike, Duration, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::time_block::TimeBlock;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    Hard,
    Soft,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Constraint {
    /// Half-open hour window `[range_start_hour, range_end_hour)`.
    TimeRange {
        kind: ConstraintKind,
        range_start_hour: u32,
        range_end_hour: u32,
        penalty: f64,
    },
    DayOfWeek {
        kind: ConstraintKind,
        allowed: HashSet<WeekdayDto>,
        penalty: f64,
    },
    MaxDuration {
        kind: ConstraintKind,
        max: DurationMinutes,
        penalty: f64,
    },
}

/// `chrono::Weekday` has no `Serialize`/`Hash`-friendly wire form, so the
/// constraint set stores its own small DTO for it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeekdayDto {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl From<Weekday> for WeekdayDto {
    fn from(w: Weekday) -> Self {
        match w {
            Weekday::Mon => WeekdayDto::Mon,
            Weekday::Tue => WeekdayDto::Tue,
            Weekday::Wed => WeekdayDto::Wed,
            Weekday::Thu => WeekdayDto::Thu,
            Weekday::Fri => WeekdayDto::Fri,
            Weekday::Sat => WeekdayDto::Sat,
            Weekday::Sun => WeekdayDto::Sun,
        }
    }
}

/// Wire-friendly minutes newtype so `MaxDuration` can derive `Serialize`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationMinutes(pub i64);

impl DurationMinutes {
    pub fn as_duration(self) -> Duration {
        Duration::minutes(self.0)
    }
}

/// Outcome of evaluating a single constraint against a candidate block.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ConstraintEvaluation {
    pub satisfied: bool,
    pub penalty: f64,
}

impl Constraint {
    pub fn kind(&self) -> ConstraintKind {
        match self {
            Constraint::TimeRange { kind, .. } => *kind,
            Constraint::DayOfWeek { kind, .. } => *kind,
            Constraint::MaxDuration { kind, .. } => *kind,
        }
    }

    pub fn is_hard(&self) -> bool {
        matches!(self.kind(), ConstraintKind::Hard)
    }

    pub fn evaluate(&self, block: &TimeBlock) -> ConstraintEvaluation {
        match self {
            Constraint::TimeRange {
                range_start_hour,
                range_end_hour,
                penalty,
                ..
            } => evaluate_time_range(block, *range_start_hour, *range_end_hour, *penalty),
            Constraint::DayOfWeek {
                allowed, penalty, ..
            } => {
                let weekday: WeekdayDto = block.start_time.weekday().into();
                let satisfied = allowed.contains(&weekday);
                ConstraintEvaluation {
                    satisfied,
                    penalty: if satisfied { 0.0 } else { *penalty },
                }
            }
            Constraint::MaxDuration { max, penalty, .. } => {
                let max = max.as_duration();
                let actual = block.duration();
                if actual <= max {
                    ConstraintEvaluation {
                        satisfied: true,
                        penalty: 0.0,
                    }
                } else {
                    let overrun = (actual - max).num_seconds() as f64;
                    let max_seconds = max.num_seconds().max(1) as f64;
                    ConstraintEvaluation {
                        satisfied: false,
                        penalty: penalty * (overrun / max_seconds),
                    }
                }
            }
        }
    }
}

/// `satisfied` iff `startHour >= rangeStart` AND the block's end hour
/// (decremented by one if it lands exactly on the hour) is `< rangeEnd`.
fn evaluate_time_range(
    block: &TimeBlock,
    range_start_hour: u32,
    range_end_hour: u32,
    penalty: f64,
) -> ConstraintEvaluation {
    let start_hour = block.start_time.hour();
    let raw_end_hour = block.end_time.hour() as i64;
    let lands_on_hour = block.end_time.minute() == 0 && block.end_time.second() == 0;
    let effective_end_hour = if lands_on_hour {
        raw_end_hour - 1
    } else {
        raw_end_hour
    };

    let satisfied =
        start_hour >= range_start_hour && effective_end_hour < range_end_hour as i64;

    ConstraintEvaluation {
        satisfied,
        penalty: if satisfied { 0.0 } else { penalty },
    }
}

/// A composed set of constraints applying to a schedule or a single
/// placement call. No shared identity — values only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConstraintSet(pub Vec<Constraint>);

impl ConstraintSet {
    pub fn new(constraints: Vec<Constraint>) -> Self {
        Self(constraints)
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.0.iter()
    }

    pub fn merged_with<'a>(&'a self, extra: &'a [Constraint]) -> impl Iterator<Item = &'a Constraint> {
        self.0.iter().chain(extra.iter())
    }

    /// Returns the first hard constraint violated by `block`, if any.
    pub fn first_hard_violation<'a>(
        &'a self,
        extra: &'a [Constraint],
        block: &TimeBlock,
    ) -> Option<(&'a Constraint, ConstraintEvaluation)> {
        self.merged_with(extra).find_map(|c| {
            if !c.is_hard() {
                return None;
            }
            let eval = c.evaluate(block);
            if eval.satisfied {
                None
            } else {
                Some((c, eval))
            }
        })
    }

    /// Sum of soft-constraint penalties for `block`; used by the scheduler
    /// for placement scoring, never to reject a block.
    pub fn soft_penalty(&self, extra: &[Constraint], block: &TimeBlock) -> f64 {
        self.merged_with(extra)
            .filter(|c| !c.is_hard())
            .map(|c| c.evaluate(block).penalty)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::{BlockId, ScheduleId, UserId};
    use chrono::TimeZone;

    fn block(start_h: u32, start_m: u32, end_h: u32, end_m: u32) -> TimeBlock {
        let day = chrono::Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap();
        TimeBlock::new(
            BlockId::new(),
            UserId::new(),
            ScheduleId::new(),
            super::super::time_block::BlockType::Task,
            None,
            "t".into(),
            day.with_hour(start_h).unwrap().with_minute(start_m).unwrap(),
            day.with_hour(end_h).unwrap().with_minute(end_m).unwrap(),
            day,
        )
    }
    use chrono::Timelike;

    #[test]
    fn time_range_tolerates_block_ending_on_the_hour() {
        let c = Constraint::TimeRange {
            kind: ConstraintKind::Hard,
            range_start_hour: 9,
            range_end_hour: 17,
            penalty: 100.0,
        };
        let b = block(16, 0, 17, 0);
        assert!(c.evaluate(&b).satisfied);
    }

    #[test]
    fn time_range_rejects_block_crossing_boundary() {
        let c = Constraint::TimeRange {
            kind: ConstraintKind::Hard,
            range_start_hour: 9,
            range_end_hour: 17,
            penalty: 100.0,
        };
        let b = block(16, 30, 17, 30);
        let eval = c.evaluate(&b);
        assert!(!eval.satisfied);
        assert_eq!(eval.penalty, 100.0);
    }

    #[test]
    fn max_duration_penalty_scales_with_overrun() {
        let c = Constraint::MaxDuration {
            kind: ConstraintKind::Soft,
            max: DurationMinutes(30),
            penalty: 10.0,
        };
        let b = block(9, 0, 9, 45);
        let eval = c.evaluate(&b);
        assert!(!eval.satisfied);
        assert!((eval.penalty - 5.0).abs() < 1e-9);
    }
}
