mod error;
mod image;
mod json;
mod report;
mod util;

pub use error::OutputError;
pub use self::image::{annotate, write_jpeg, write_result_frame};
pub use json::{MatchJsonRecord, RuleJsonRecord, ScanJsonReport};
pub use report::{ConsoleReport, render_elapsed, render_result};
