pub mod finalizer;
pub mod intake;
pub mod ledger;
pub mod reminder;

pub use finalizer::BookingFinalizer;
pub use intake::IntakeFormService;
pub use ledger::LedgerService;
pub use reminder::ReminderService;
