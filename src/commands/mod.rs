mod install;
mod restart;
mod start;
mod status;
mod stop;

pub use install::run_install;
pub use restart::run_restart;
pub use start::run_start;
pub use status::run_status;
pub use stop::run_stop;

use pipe_supervisor::output::UserOutput;
use pipe_supervisor::Report;

/// Print per-tracker failures left in `report`. Returns whether there were none.
fn summarize(report: &Report, out: &dyn UserOutput) -> bool {
    for (key, error) in &report.failures {
        out.error(&format!("  {}: {}", key, error));
        if let Some(suggestion) = error.suggestion() {
            out.status(&format!("    Hint: {}", suggestion));
        }
    }
    report.is_success()
}
