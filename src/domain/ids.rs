//! Newtype identifiers for the scheduling core's aggregates.
//!
//! Mirrors the teacher's `ScheduleId`/`TargetId` newtype pattern, but backed
//! by `Uuid` since these ids are minted by this core rather than assigned by
//! a SQL sequence.

use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($name:ident) => {
        #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn value(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }
    };
}

uuid_id!(UserId);
uuid_id!(ScheduleId);
uuid_id!(BlockId);
uuid_id!(ConflictId);
uuid_id!(RescheduleAttemptId);
uuid_id!(OutboxMessageId);
