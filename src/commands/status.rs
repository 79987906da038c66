use pipe_supervisor::output::UserOutput;
use pipe_supervisor::{Selection, Supervisor};

pub fn run_status(
    supervisor: &Supervisor,
    selection: &Selection,
    flag: &str,
    out: &dyn UserOutput,
) -> anyhow::Result<bool> {
    let states = supervisor.status(selection, flag)?;

    if states.is_empty() {
        out.status("No trackers configured");
        return Ok(true);
    }

    for state in states {
        let verdict = if state.running { "is running" } else { "is down" };
        out.status(&format!(
            "Listener for tracker {} [{}] {}",
            state.key, flag, verdict
        ));
        if !state.running && state.port_busy {
            out.warning(&format!("  port {} is held by another process", state.port));
        }
    }

    Ok(true)
}
