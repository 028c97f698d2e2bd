pub mod advance_recurring_notifications;
