// Background jobs driven by the scheduler

pub mod notification_scan;
