pub mod types;

pub use types::{Money, TransferId};
