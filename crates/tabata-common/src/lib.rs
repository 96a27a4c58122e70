pub mod error;
pub mod history;
pub mod progress;
pub mod workout;

pub use error::{Error, MigrationError, Result};
pub use history::SessionRecord;
pub use progress::{WeeklyProgress, YearlyProgress};
pub use workout::{Block, Exercise, Interval, Session};
