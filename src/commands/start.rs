use pipe_supervisor::output::UserOutput;
use pipe_supervisor::{Selection, Supervisor};

pub async fn run_start(
    supervisor: &Supervisor,
    selection: &Selection,
    flag: &str,
    out: &dyn UserOutput,
) -> anyhow::Result<bool> {
    let report = supervisor.start(selection, flag).await;

    if !report.launched.is_empty() {
        out.success(&format!(
            "Started {} listener(s): {}",
            report.launched.len(),
            report.launched.join(", ")
        ));
    }
    if !report.skipped.is_empty() {
        out.status(&format!("Left running: {}", report.skipped.join(", ")));
    }

    Ok(super::summarize(&report, out))
}
