pub mod achievements;
pub mod clock;
pub mod errors;
pub mod history;
pub mod models;
pub mod repo;
pub mod scheduler;
pub mod session;
pub mod stats;

pub use achievements::*;
pub use clock::*;
pub use errors::*;
pub use history::*;
pub use models::*;
pub use repo::*;
pub use scheduler::*;
pub use stats::*;
