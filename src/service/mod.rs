pub mod bill_text;
pub mod categorizer;
pub mod clock;
pub mod insights;
pub mod reminder_actor;
pub mod voice;

pub use categorizer::Categorizer;
pub use clock::Clock;
pub use reminder_actor::{ReminderDeps, ReminderHandle};
