pub mod send_due_notifications;
