// Services module - Business logic

pub mod eligibility;
pub mod emails;
pub mod ledger;
pub mod mailer;
pub mod notifier;
pub mod overdue;
