pub mod db;
pub mod store;

pub use store::{ReviewItemStore, SaveOutcome};
