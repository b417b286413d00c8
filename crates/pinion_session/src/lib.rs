pub mod config;
pub mod repetition;
pub mod scheduler;
pub mod session;

pub use config::SessionConfig;
pub use scheduler::{schedule_computed_move, PendingMove};
pub use session::{PlayerKind, SelectionView, Session, Submission};
