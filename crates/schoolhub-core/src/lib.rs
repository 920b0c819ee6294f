//! # SchoolHub Core
//!
//! Record engine for the SchoolHub administration server.
//!
//! Every entity (students, teachers, classes, attendance, examinations,
//! fees, homework, notices, transport routes, SMS logs, user accounts)
//! lives in a redb table and is manipulated through the operations in
//! the domain modules below. Operations take a [`Reader`] for queries or
//! a [`Tx`] for changes, so a handler can compose several of them in one
//! atomic write transaction.
//!
//! ## Determinism
//!
//! The core never reads the wall clock. Operations that need "today" or
//! "now" receive it as an argument.
//!
//! ## Money
//!
//! All amounts are [`Money`], an integer count of paise. There is no
//! floating-point arithmetic anywhere in the crate.

pub mod academic;
pub mod attendance;
pub mod error;
pub mod exams;
pub mod fees;
pub mod form;
pub mod homework;
pub mod money;
pub mod notices;
pub mod school;
pub mod seed;
pub mod sms;
pub mod storage;
pub mod students;
pub mod teachers;
pub mod transport;
pub mod users;

pub use error::{CoreError, Result};
pub use money::Money;
pub use storage::{Reader, Record, Snapshot, Store, Tx};
pub use users::Role;

/// Every entity table, in the order `status` reports them.
pub const TABLES: &[&str] = &[
    users::User::TABLE,
    academic::AcademicYear::TABLE,
    academic::SchoolClass::TABLE,
    academic::Section::TABLE,
    academic::Subject::TABLE,
    students::Student::TABLE,
    students::Parent::TABLE,
    teachers::Teacher::TABLE,
    teachers::TeacherAssignment::TABLE,
    attendance::Attendance::TABLE,
    attendance::LeaveApplication::TABLE,
    exams::Examination::TABLE,
    exams::ExamSchedule::TABLE,
    exams::Marks::TABLE,
    fees::FeeStructure::TABLE,
    fees::FeePayment::TABLE,
    fees::FeeReceipt::TABLE,
    homework::Homework::TABLE,
    notices::Notice::TABLE,
    transport::TransportRoute::TABLE,
    school::SchoolProfile::TABLE,
    sms::SmsLog::TABLE,
];

/// Implement [`Record`] for an entity with `id: u64`.
macro_rules! record {
    ($ty:ty, $table:literal, $kind:literal) => {
        impl $crate::storage::Record for $ty {
            const TABLE: &'static str = $table;
            const KIND: &'static str = $kind;

            fn id(&self) -> u64 {
                self.id
            }

            fn set_id(&mut self, id: u64) {
                self.id = id;
            }
        }
    };
}

pub(crate) use record;
