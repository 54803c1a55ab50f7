pub mod category;
pub mod expense;
pub mod reminder;
pub mod vision;
