use pipe_supervisor::install::Installer;
use pipe_supervisor::output::UserOutput;
use pipe_supervisor::Settings;

pub fn run_install(settings: &Settings, out: &dyn UserOutput) -> anyhow::Result<bool> {
    if !cfg!(target_os = "linux") {
        anyhow::bail!("Install is only supported on Linux");
    }

    let executable = std::env::current_exe()?;
    let link = Installer::new(settings).install(&executable, out)?;
    out.success(&format!("Installation complete: {}", link.display()));
    Ok(true)
}
