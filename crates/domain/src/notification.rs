use crate::shared::{
    entity::{Entity, ID},
    recurrence::{InvalidPatternError, RecurringPattern},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where a `Notification` is in its send cycle. Persisted as the `is_send` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SendState {
    /// Nothing has been sent for the current occurrence
    Pending,
    /// The optional earlier reminder has been sent
    BeforeDueSent,
    /// The due reminder has been sent, terminal unless the notification recurs
    DueSent,
}

impl SendState {
    pub fn as_i16(&self) -> i16 {
        match self {
            Self::Pending => 0,
            Self::BeforeDueSent => 1,
            Self::DueSent => 2,
        }
    }

    pub fn from_i16(is_send: i16) -> Option<Self> {
        match is_send {
            0 => Some(Self::Pending),
            1 => Some(Self::BeforeDueSent),
            2 => Some(Self::DueSent),
            _ => None,
        }
    }
}

/// A state change that results in a push notification being sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    BeforeDue,
    Due,
}

impl Transition {
    pub fn next_state(&self) -> SendState {
        match self {
            Self::BeforeDue => SendState::BeforeDueSent,
            Self::Due => SendState::DueSent,
        }
    }

    /// Identifier used in push payloads
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BeforeDue => "beforeDue",
            Self::Due => "due",
        }
    }
}

/// A scheduled due date after a recurrence has been applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    pub due_date: i64,
    pub before_due_date: Option<i64>,
}

#[derive(Error, Debug, PartialEq)]
pub enum InvalidNotificationError {
    #[error("before_due_date ({before_due_date}) must be earlier than due_date ({due_date})")]
    BeforeDueNotBeforeDue { due_date: i64, before_due_date: i64 },
}

/// The ledger row describing when the reminders of a `Task` should be sent.
/// There is exactly one `Notification` per `Task`.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: ID,
    pub task_id: ID,
    pub due_date: i64,
    pub before_due_date: Option<i64>,
    /// Raw pattern as stored. Parsed lazily so that rows with an unknown
    /// pattern can still be loaded and reported.
    pub recurring_pattern: String,
    pub is_send: SendState,
    pub created_at: i64,
}

impl Notification {
    pub fn new(
        task_id: ID,
        due_date: i64,
        before_due_date: Option<i64>,
        recurring_pattern: RecurringPattern,
        created_at: i64,
    ) -> Result<Self, InvalidNotificationError> {
        if let Some(before_due_date) = before_due_date {
            if before_due_date >= due_date {
                return Err(InvalidNotificationError::BeforeDueNotBeforeDue {
                    due_date,
                    before_due_date,
                });
            }
        }
        Ok(Self {
            id: Default::default(),
            task_id,
            due_date,
            before_due_date,
            recurring_pattern: recurring_pattern.to_string(),
            is_send: SendState::Pending,
            created_at,
        })
    }

    /// Decides which reminder, if any, should be sent at `now`.
    /// Only depends on the persisted state and the clock, so re-evaluating it
    /// on every pass is what makes the dispatch idempotent.
    pub fn next_transition(&self, now: i64) -> Option<Transition> {
        match (self.is_send, self.before_due_date) {
            (SendState::Pending, Some(before_due_date)) if before_due_date <= now => {
                Some(Transition::BeforeDue)
            }
            (SendState::Pending, None) if self.due_date <= now => Some(Transition::Due),
            (SendState::BeforeDueSent, _) if self.due_date <= now => Some(Transition::Due),
            _ => None,
        }
    }

    pub fn pattern(&self) -> Result<RecurringPattern, InvalidPatternError> {
        self.recurring_pattern.parse()
    }

    /// The next occurrence of this notification, keeping the distance between
    /// the before-due reminder and the due date.
    pub fn next_occurrence(&self) -> Result<Option<Occurrence>, InvalidPatternError> {
        let due_date = match self.pattern()?.next_occurrence(self.due_date)? {
            Some(due_date) => due_date,
            None => return Ok(None),
        };
        let before_due_date = self
            .before_due_date
            .map(|before_due_date| due_date - (self.due_date - before_due_date));

        Ok(Some(Occurrence {
            due_date,
            before_due_date,
        }))
    }

    pub fn reschedule(&mut self, occurrence: Occurrence) {
        self.due_date = occurrence.due_date;
        self.before_due_date = occurrence.before_due_date;
        self.is_send = SendState::Pending;
    }
}

impl Entity for Notification {
    fn id(&self) -> &ID {
        &self.id
    }
}
