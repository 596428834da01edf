pub mod commands;
pub mod selection;
pub mod store;

pub use store::HistoryStore;
