//! [`Schedule`]: the aggregate root modeling one user's single day of
//! time blocks.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::constraint::{Constraint, ConstraintSet};
use super::error::DomainError;
use super::events::DomainEvent;
use super::ids::{BlockId, ScheduleId, UserId};
use super::time_block::{detect_overlap, BlockType, TimeBlock, MIN_BLOCK_DURATION_MINUTES};

/// A maximal free `[start, end)` gap of at least a requested duration.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Slot {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn fits(&self, duration: Duration) -> bool {
        self.duration() >= duration
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub id: ScheduleId,
    pub user_id: UserId,
    /// Normalized to local midnight (§3).
    pub date: DateTime<Utc>,
    blocks: Vec<TimeBlock>,
    pub constraints: ConstraintSet,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pending_events: Vec<DomainEvent>,
}

impl Schedule {
    pub fn new(user_id: UserId, date: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            id: ScheduleId::new(),
            user_id,
            date: normalize_to_midnight(date),
            blocks: Vec::new(),
            constraints: ConstraintSet::empty(),
            created_at: now,
            updated_at: now,
            pending_events: Vec::new(),
        }
    }

    /// Reconstitute from persisted state (repository load path). Does not
    /// re-emit events.
    pub fn from_parts(
        id: ScheduleId,
        user_id: UserId,
        date: DateTime<Utc>,
        blocks: Vec<TimeBlock>,
        constraints: ConstraintSet,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        let mut blocks = blocks;
        blocks.sort_by_key(|b| b.start_time);
        Self {
            id,
            user_id,
            date,
            blocks,
            constraints,
            created_at,
            updated_at,
            pending_events: Vec::new(),
        }
    }

    pub fn blocks(&self) -> &[TimeBlock] {
        &self.blocks
    }

    /// Drains the buffered domain events. Called by the command handler
    /// after a successful persist; the domain never publishes directly.
    pub fn drain_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.pending_events)
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    /// §4.A `addBlock`. `extra_constraints` are candidate-specific
    /// constraints attached by the collector (§4.C) and are validated for
    /// this call only — they are not merged into `self.constraints`.
    pub fn add_block(
        &mut self,
        block_type: BlockType,
        reference_id: Option<String>,
        title: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        extra_constraints: &[Constraint],
        now: DateTime<Utc>,
    ) -> Result<TimeBlock, DomainError> {
        self.validate_times(start, end)?;

        let candidate = TimeBlock::new(
            BlockId::new(),
            self.user_id,
            self.id,
            block_type,
            reference_id,
            title,
            start,
            end,
            now,
        );

        if let Some((constraint, eval)) = self
            .constraints
            .first_hard_violation(extra_constraints, &candidate)
        {
            return Err(DomainError::ConstraintViolation {
                constraint: Box::new(constraint.clone()),
                penalty: eval.penalty,
            });
        }

        if self.overlaps_any(start, end, None) {
            return Err(DomainError::Overlap);
        }

        self.blocks.push(candidate.clone());
        self.blocks.sort_by_key(|b| b.start_time);
        self.touch(now);
        self.pending_events.push(DomainEvent::BlockScheduled {
            block_id: candidate.id,
            block_type: candidate.block_type,
            reference_id: candidate.reference_id.clone(),
            title: candidate.title.clone(),
            start_time: candidate.start_time,
            end_time: candidate.end_time,
        });

        Ok(candidate)
    }

    /// §4.A `rescheduleBlock`. Builds a hypothetical block sharing the
    /// existing identity to exclude it from the overlap check, rather than
    /// temporarily removing it from `blocks` (which would emit spurious
    /// re-sort churn and risks losing the block on an early return).
    pub fn reschedule_block(
        &mut self,
        id: BlockId,
        new_start: DateTime<Utc>,
        new_end: DateTime<Utc>,
        extra_constraints: &[Constraint],
        now: DateTime<Utc>,
    ) -> Result<TimeBlock, DomainError> {
        self.validate_times(new_start, new_end)?;

        let existing = self
            .blocks
            .iter()
            .find(|b| b.id == id)
            .ok_or(DomainError::BlockNotFound(id))?
            .clone();
        if existing.user_id != self.user_id {
            return Err(DomainError::OwnershipMismatch);
        }

        let hypothetical = TimeBlock {
            start_time: new_start,
            end_time: new_end,
            ..existing.clone()
        };

        if let Some((constraint, eval)) = self
            .constraints
            .first_hard_violation(extra_constraints, &hypothetical)
        {
            return Err(DomainError::ConstraintViolation {
                constraint: Box::new(constraint.clone()),
                penalty: eval.penalty,
            });
        }

        if self.overlaps_any(new_start, new_end, Some(id)) {
            return Err(DomainError::Overlap);
        }

        let old_start = existing.start_time;
        let old_end = existing.end_time;

        let block = self.blocks.iter_mut().find(|b| b.id == id).unwrap();
        block.start_time = new_start;
        block.end_time = new_end;
        block.missed = false;
        block.updated_at = now;
        let updated = block.clone();

        self.blocks.sort_by_key(|b| b.start_time);
        self.touch(now);
        self.pending_events.push(DomainEvent::BlockRescheduled {
            block_id: id,
            old_start_time: old_start,
            old_end_time: old_end,
            new_start_time: new_start,
            new_end_time: new_end,
        });

        Ok(updated)
    }

    pub fn complete_block(&mut self, id: BlockId, now: DateTime<Utc>) -> Result<(), DomainError> {
        let block = self
            .blocks
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(DomainError::BlockNotFound(id))?;
        if block.user_id != self.user_id {
            return Err(DomainError::OwnershipMismatch);
        }
        block.completed = true;
        block.updated_at = now;
        let (block_type, reference_id) = (block.block_type, block.reference_id.clone());
        self.touch(now);
        self.pending_events.push(DomainEvent::BlockCompleted {
            block_id: id,
            block_type,
            reference_id,
        });
        Ok(())
    }

    pub fn miss_block(&mut self, id: BlockId, now: DateTime<Utc>) -> Result<(), DomainError> {
        let block = self
            .blocks
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(DomainError::BlockNotFound(id))?;
        if block.user_id != self.user_id {
            return Err(DomainError::OwnershipMismatch);
        }
        block.missed = true;
        block.updated_at = now;
        let (block_type, reference_id) = (block.block_type, block.reference_id.clone());
        self.touch(now);
        self.pending_events.push(DomainEvent::BlockMissed {
            block_id: id,
            block_type,
            reference_id,
        });
        Ok(())
    }

    /// No idempotency guaranteed: a second call on an already-removed id
    /// returns `BlockNotFound`.
    pub fn remove_block(
        &mut self,
        id: BlockId,
        now: DateTime<Utc>,
    ) -> Result<TimeBlock, DomainError> {
        let idx = self
            .blocks
            .iter()
            .position(|b| b.id == id)
            .ok_or(DomainError::BlockNotFound(id))?;
        if self.blocks[idx].user_id != self.user_id {
            return Err(DomainError::OwnershipMismatch);
        }
        let removed = self.blocks.remove(idx);
        self.touch(now);
        Ok(removed)
    }

    /// §4.A `findAvailableSlots`: maximal half-open gaps in `[day_start,
    /// day_end)` of length `>= min_duration`, sorted ascending by start.
    pub fn find_available_slots(
        &self,
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
        min_duration: Duration,
    ) -> Vec<Slot> {
        self.find_available_slots_excluding(None, day_start, day_end, min_duration)
    }

    /// Same as [`find_available_slots`](Self::find_available_slots) but
    /// treats `exclude` as absent from the schedule — used by
    /// `rescheduleBlock`'s overlap check and the auto-reschedule engine so a
    /// missed block's own original window is a candidate slot.
    pub fn find_available_slots_excluding(
        &self,
        exclude: Option<BlockId>,
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
        min_duration: Duration,
    ) -> Vec<Slot> {
        if day_end <= day_start {
            return Vec::new();
        }

        let mut slots = Vec::new();
        let mut cursor = day_start;

        for block in self
            .blocks
            .iter()
            .filter(|b| Some(b.id) != exclude)
            .filter(|b| b.end_time > day_start && b.start_time < day_end)
        {
            let gap_end = block.start_time.min(day_end);
            if gap_end > cursor && gap_end - cursor >= min_duration {
                slots.push(Slot {
                    start: cursor,
                    end: gap_end,
                });
            }
            cursor = cursor.max(block.end_time);
            if cursor >= day_end {
                break;
            }
        }

        if cursor < day_end && day_end - cursor >= min_duration {
            slots.push(Slot {
                start: cursor,
                end: day_end,
            });
        }

        slots
    }

    fn overlaps_any(&self, start: DateTime<Utc>, end: DateTime<Utc>, exclude: Option<BlockId>) -> bool {
        self.blocks
            .iter()
            .filter(|b| Some(b.id) != exclude)
            .any(|b| detect_overlap(b.start_time, b.end_time, start, end))
    }

    fn validate_times(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), DomainError> {
        if end <= start {
            return Err(DomainError::InvalidTimeRange);
        }
        if end - start < Duration::minutes(MIN_BLOCK_DURATION_MINUTES) {
            return Err(DomainError::TooShort {
                min_minutes: MIN_BLOCK_DURATION_MINUTES,
            });
        }
        Ok(())
    }
}

pub fn normalize_to_midnight(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.date_naive().and_hms_opt(0, 0, 0).unwrap().and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap()
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        day() + Duration::hours(h as i64) + Duration::minutes(m as i64)
    }

    fn new_schedule() -> Schedule {
        Schedule::new(UserId::new(), day(), day())
    }

    #[test]
    fn add_block_sorts_and_emits_event() {
        let mut s = new_schedule();
        s.add_block(
            BlockType::Task,
            None,
            "B".into(),
            at(10, 0),
            at(10, 30),
            &[],
            day(),
        )
        .unwrap();
        s.add_block(
            BlockType::Task,
            None,
            "A".into(),
            at(9, 0),
            at(9, 30),
            &[],
            day(),
        )
        .unwrap();

        assert_eq!(s.blocks()[0].title, "A");
        assert_eq!(s.blocks()[1].title, "B");
        assert_eq!(s.drain_events().len(), 2);
    }

    #[test]
    fn add_block_rejects_too_short() {
        let mut s = new_schedule();
        let err = s
            .add_block(BlockType::Task, None, "x".into(), at(9, 0), at(9, 2), &[], day())
            .unwrap_err();
        assert!(matches!(err, DomainError::TooShort { .. }));
    }

    #[test]
    fn add_block_rejects_overlap() {
        let mut s = new_schedule();
        s.add_block(BlockType::Task, None, "a".into(), at(9, 0), at(10, 0), &[], day())
            .unwrap();
        let err = s
            .add_block(BlockType::Task, None, "b".into(), at(9, 30), at(10, 30), &[], day())
            .unwrap_err();
        assert!(matches!(err, DomainError::Overlap));
    }

    #[test]
    fn reschedule_excludes_self_from_overlap_check() {
        let mut s = new_schedule();
        let b = s
            .add_block(BlockType::Task, None, "a".into(), at(9, 0), at(10, 0), &[], day())
            .unwrap();
        // Rescheduling onto an overlapping-with-itself window must succeed.
        let updated = s
            .reschedule_block(b.id, at(9, 15), at(10, 15), &[], day())
            .unwrap();
        assert_eq!(updated.start_time, at(9, 15));
    }

    #[test]
    fn reschedule_clears_missed_flag() {
        let mut s = new_schedule();
        let b = s
            .add_block(BlockType::Task, None, "a".into(), at(9, 0), at(10, 0), &[], day())
            .unwrap();
        s.miss_block(b.id, day()).unwrap();
        assert!(s.blocks()[0].missed);
        s.reschedule_block(b.id, at(11, 0), at(12, 0), &[], day())
            .unwrap();
        assert!(!s.blocks()[0].missed);
    }

    #[test]
    fn find_available_slots_returns_maximal_gaps() {
        let mut s = new_schedule();
        s.add_block(BlockType::Task, None, "a".into(), at(10, 0), at(11, 0), &[], day())
            .unwrap();
        s.add_block(BlockType::Task, None, "b".into(), at(13, 0), at(14, 0), &[], day())
            .unwrap();

        let slots = s.find_available_slots(at(9, 0), at(17, 0), Duration::minutes(30));
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[0], Slot { start: at(9, 0), end: at(10, 0) });
        assert_eq!(slots[1], Slot { start: at(11, 0), end: at(13, 0) });
        assert_eq!(slots[2], Slot { start: at(14, 0), end: at(17, 0) });
    }

    #[test]
    fn block_with_foreign_user_id_is_rejected_by_every_mutator() {
        let mut s = new_schedule();
        let b = s
            .add_block(BlockType::Task, None, "a".into(), at(9, 0), at(10, 0), &[], day())
            .unwrap();
        // Simulate a reconstitution bug that attached a block under the
        // wrong owner: poke a foreign user_id straight into storage.
        s.blocks[0].user_id = UserId::new();

        assert!(matches!(
            s.complete_block(b.id, day()),
            Err(DomainError::OwnershipMismatch)
        ));
        assert!(matches!(
            s.miss_block(b.id, day()),
            Err(DomainError::OwnershipMismatch)
        ));
        assert!(matches!(
            s.reschedule_block(b.id, at(11, 0), at(12, 0), &[], day()),
            Err(DomainError::OwnershipMismatch)
        ));
        assert!(matches!(
            s.remove_block(b.id, day()),
            Err(DomainError::OwnershipMismatch)
        ));
    }

    #[test]
    fn find_available_slots_excludes_short_gaps() {
        let mut s = new_schedule();
        s.add_block(BlockType::Task, None, "a".into(), at(10, 0), at(10, 10), &[], day())
            .unwrap();
        s.add_block(BlockType::Task, None, "b".into(), at(10, 15), at(11, 0), &[], day())
            .unwrap();
        let slots = s.find_available_slots(at(9, 0), at(17, 0), Duration::minutes(30));
        // The 5-minute gap between the two blocks is dropped.
        assert!(slots.iter().all(|s| s.duration() >= Duration::minutes(30)));
        assert!(slots
            .iter()
            .any(|slot| slot.start == at(9, 0) && slot.end == at(10, 0)));
    }
}
