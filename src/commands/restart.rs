use pipe_supervisor::output::UserOutput;
use pipe_supervisor::{Selection, Supervisor};

pub async fn run_restart(
    supervisor: &Supervisor,
    selection: &Selection,
    flag: &str,
    stop_everything: bool,
    out: &dyn UserOutput,
) -> anyhow::Result<bool> {
    out.status(&format!("Restarting tracker listeners [{}]", flag));
    let report = supervisor.restart(selection, flag, stop_everything).await;

    if !report.launched.is_empty() {
        out.success(&format!(
            "Restarted {} listener(s): {}",
            report.launched.len(),
            report.launched.join(", ")
        ));
    }

    Ok(super::summarize(&report, out))
}
