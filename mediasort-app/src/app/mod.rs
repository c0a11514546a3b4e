mod cli;
mod errors;
mod logging;
mod run;

pub use errors::{AppError, AppResult};
pub use run::run_app;
