//! Sensor watch engine: conditions, debounce state, persisted watch list and
//! the periodic driver

pub mod action;
pub mod condition;
pub mod entry;
pub mod error;
pub mod scheduler;
pub mod store;
pub mod tools;

pub use action::ActionSet;
pub use condition::Condition;
pub use entry::{WatchEntry, WatchState};
pub use scheduler::{SharedStore, WatchScheduler};
pub use store::WatchStore;
