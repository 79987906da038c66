use pipe_supervisor::output::UserOutput;
use pipe_supervisor::{Report, Selection, Supervisor};

pub async fn run_stop(
    supervisor: &Supervisor,
    selection: &Selection,
    flag: &str,
    stop_everything: bool,
    out: &dyn UserOutput,
) -> anyhow::Result<bool> {
    let report = if stop_everything {
        supervisor.stop_all(supervisor.settings().legacy_sweep)
    } else {
        supervisor.stop(selection, flag).await
    };

    print_stopped(&report, out);
    Ok(super::summarize(&report, out))
}

fn print_stopped(report: &Report, out: &dyn UserOutput) {
    if report.stopped.is_empty() {
        out.status("No running listeners were stopped");
    } else {
        out.success(&format!("Stopped {} listener(s)", report.stopped.len()));
    }
}
