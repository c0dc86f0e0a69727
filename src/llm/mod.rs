pub mod categorize;
pub mod client;
pub mod extract;
pub mod planner;
pub mod prompts;
pub mod receipt;
pub mod statement;
pub mod types;

pub use categorize::*;
pub use client::*;
pub use extract::*;
pub use planner::*;
pub use receipt::*;
pub use statement::*;
pub use types::*;
