mod audience;
mod date;
mod notification;
mod projection;
mod push;
mod shared;
mod summary;
mod task;
mod user;

pub use audience::{Audience, AudienceError, ProjectionShape};
pub use date::{add_days, add_months, format_timestamp};
pub use notification::{InvalidNotificationError, Notification, Occurrence, SendState, Transition};
pub use projection::{
    ProjectionFields, ProjectionPath, ProjectionTarget, ProjectionUpdate, VisibilityFlags,
};
pub use push::{MulticastReport, PushMessage};
pub use shared::entity::{Entity, InvalidIDError, ID};
pub use shared::recurrence::{InvalidPatternError, RecurringPattern};
pub use summary::RunSummary;
pub use task::{Board, BoardMember, Task};
pub use user::User;
