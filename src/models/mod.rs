// Models module - Database entity representations

pub mod cash_cut;
pub mod payment;
pub mod student;

pub use cash_cut::CashCut;
pub use payment::{PaymentRecord, PaymentStatus};
pub use student::Student;
