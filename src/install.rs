//! Registration of the supervisor as a SysV init script.

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::output::UserOutput;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;

const RC_TOOL: &str = "update-rc.d";

pub struct Installer {
    init_dir: PathBuf,
    service_name: String,
    /// `None` leaves runlevel registration to the operator.
    rc_tool: Option<PathBuf>,
}

impl Installer {
    pub fn new(settings: &Settings) -> Self {
        Self {
            init_dir: settings.init_dir.clone(),
            service_name: settings.service_name.clone(),
            rc_tool: Some(PathBuf::from(RC_TOOL)),
        }
    }

    pub fn with_rc_tool(mut self, rc_tool: Option<PathBuf>) -> Self {
        self.rc_tool = rc_tool;
        self
    }

    pub fn script_path(&self) -> PathBuf {
        self.init_dir.join(&self.service_name)
    }

    /// Link `executable` into the init directory, make it executable and
    /// register it for the default runlevels. Re-running is harmless.
    pub fn install(&self, executable: &Path, out: &dyn UserOutput) -> Result<PathBuf> {
        let executable = executable
            .canonicalize()
            .map_err(|e| Error::Install(format!("{}: {}", executable.display(), e)))?;
        let link = self.script_path();

        out.progress(&format!("Linking {}... ", link.display()));
        match fs::read_link(&link) {
            Ok(existing) if existing == executable => {
                out.finish_progress("already installed");
            }
            Ok(existing) => {
                out.finish_progress("[FAIL]");
                return Err(Error::Install(format!(
                    "{} already points to {}",
                    link.display(),
                    existing.display()
                )));
            }
            Err(_) if link.exists() => {
                out.finish_progress("[FAIL]");
                return Err(Error::Install(format!(
                    "{} exists and is not a symlink",
                    link.display()
                )));
            }
            Err(_) => {
                std::os::unix::fs::symlink(&executable, &link).map_err(|e| {
                    out.finish_progress("[FAIL]");
                    Error::Install(format!("cannot create {}: {}", link.display(), e))
                })?;
                out.finish_progress("[OK]");
            }
        }

        ensure_executable(&executable)?;

        if let Some(rc_tool) = &self.rc_tool {
            out.progress(&format!("Registering {} for default runlevels... ", self.service_name));
            match register(rc_tool, &self.service_name) {
                Ok(()) => out.finish_progress("[OK]"),
                Err(e) => {
                    out.finish_progress("[FAIL]");
                    return Err(e);
                }
            }
        }

        tracing::info!("Installed {} -> {}", link.display(), executable.display());
        Ok(link)
    }
}

fn ensure_executable(path: &Path) -> Result<()> {
    let mut permissions = fs::metadata(path)?.permissions();
    let mode = permissions.mode();
    if mode & 0o111 != 0o111 {
        permissions.set_mode(mode | 0o111);
        fs::set_permissions(path, permissions)
            .map_err(|e| Error::Install(format!("chmod {}: {}", path.display(), e)))?;
    }
    Ok(())
}

fn register(rc_tool: &Path, service_name: &str) -> Result<()> {
    let cmd_str = format!("{} {} defaults", rc_tool.display(), service_name);
    let output = Command::new(rc_tool)
        .args([service_name, "defaults"])
        .output()
        .map_err(|e| Error::Install(format!("{}: {}", cmd_str, e)))?;

    if output.status.success() {
        Ok(())
    } else {
        Err(Error::Install(format!(
            "{}: {}",
            cmd_str,
            String::from_utf8_lossy(&output.stderr).trim()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::QuietOutput;

    fn setup() -> (tempfile::TempDir, PathBuf, Installer) {
        let dir = tempfile::tempdir().unwrap();
        let init_dir = dir.path().join("init.d");
        fs::create_dir_all(&init_dir).unwrap();

        let executable = dir.path().join("pipe-server");
        fs::write(&executable, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&executable, fs::Permissions::from_mode(0o644)).unwrap();

        let settings = Settings {
            init_dir,
            ..Settings::default()
        };
        let installer = Installer::new(&settings).with_rc_tool(None);
        (dir, executable, installer)
    }

    #[test]
    fn test_install_links_and_chmods() {
        let (_dir, executable, installer) = setup();

        let link = installer.install(&executable, &QuietOutput).unwrap();
        assert_eq!(link.file_name().unwrap(), "pipe-server");
        assert_eq!(
            fs::read_link(&link).unwrap(),
            executable.canonicalize().unwrap()
        );
        let mode = fs::metadata(&executable).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    #[test]
    fn test_install_is_idempotent() {
        let (_dir, executable, installer) = setup();
        installer.install(&executable, &QuietOutput).unwrap();
        installer.install(&executable, &QuietOutput).unwrap();
    }

    #[test]
    fn test_install_refuses_foreign_script() {
        let (_dir, executable, installer) = setup();
        fs::write(installer.script_path(), "#!/bin/sh\n# someone else\n").unwrap();

        let err = installer.install(&executable, &QuietOutput).unwrap_err();
        assert!(matches!(err, Error::Install(_)));
    }

    #[test]
    fn test_registration_failure_is_reported() {
        let (_dir, executable, installer) = setup();
        let installer = installer.with_rc_tool(Some(PathBuf::from("/nonexistent/update-rc.d")));

        let err = installer.install(&executable, &QuietOutput).unwrap_err();
        assert!(err.to_string().contains("update-rc.d"));
    }
}
