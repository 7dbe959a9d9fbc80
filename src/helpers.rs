//! Auxiliary helper-process supervision
//!
//! Three helpers hang off boolean settings: the typing-disable daemon
//! (`syndaemon`, legacy driver only), the pointer locator, and the
//! accessibility click daemon (`mousetweaks`). `reconcile_*` brings the
//! running state in line with the desired state; exits are reaped on a
//! spawned task and reported back into the control loop as events.
//!
//! A helper binary missing from the search path is a normal condition.
//! Spawn failures are reported so the caller can reset the originating
//! setting and avoid a retry storm.

use std::env;
use std::fmt;

use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::debug;

use crate::manager::Event;

/// Typing-disable helper for the legacy driver
pub const SYNDAEMON_PROGRAM: &str = "syndaemon";

/// Pointer locator helper
pub const LOCATE_POINTER_PROGRAM: &str = "pointerd-locate-pointer";

/// Accessibility click daemon (dwell click / simulated secondary click)
pub const MOUSETWEAKS_PROGRAM: &str = "mousetweaks";

/// Helper process kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelperKind {
    Syndaemon,
    LocatePointer,
    Mousetweaks,
}

impl HelperKind {
    pub fn program(self) -> &'static str {
        match self {
            HelperKind::Syndaemon => SYNDAEMON_PROGRAM,
            HelperKind::LocatePointer => LOCATE_POINTER_PROGRAM,
            HelperKind::Mousetweaks => MOUSETWEAKS_PROGRAM,
        }
    }
}

/// Helper error type
#[derive(Debug)]
pub enum HelperError {
    /// The helper failed to spawn
    Spawn {
        program: &'static str,
        source: std::io::Error,
    },
}

impl fmt::Display for HelperError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HelperError::Spawn { program, source } => {
                write!(f, "failed to launch {}: {}", program, source)
            }
        }
    }
}

impl std::error::Error for HelperError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HelperError::Spawn { source, .. } => Some(source),
        }
    }
}

/// One record per helper kind: running flag plus pid.
pub struct HelperSupervisor {
    event_tx: mpsc::UnboundedSender<Event>,
    syndaemon_pid: Option<u32>,
    locate_pointer_pid: Option<u32>,
    mousetweaks_running: bool,
}

impl HelperSupervisor {
    pub fn new(event_tx: mpsc::UnboundedSender<Event>) -> Self {
        Self {
            event_tx,
            syndaemon_pid: None,
            locate_pointer_pid: None,
            mousetweaks_running: false,
        }
    }

    pub fn syndaemon_running(&self) -> bool {
        self.syndaemon_pid.is_some()
    }

    pub fn locate_pointer_running(&self) -> bool {
        self.locate_pointer_pid.is_some()
    }

    pub fn mousetweaks_running(&self) -> bool {
        self.mousetweaks_running
    }

    /// Start or stop syndaemon. A missing binary is a silent no-op; the
    /// legacy driver simply keeps typing-through-touchpad behavior.
    pub fn reconcile_syndaemon(&mut self, desired: bool) -> Result<(), HelperError> {
        if desired {
            if self.syndaemon_pid.is_some() {
                return Ok(());
            }
            if !have_program_in_path(SYNDAEMON_PROGRAM) {
                return Ok(());
            }

            let mut cmd = Command::new(SYNDAEMON_PROGRAM);
            cmd.args(["-i", "1.0", "-t", "-K", "-R"]);
            if let Some(home) = dirs::home_dir() {
                cmd.current_dir(home);
            }
            // syndaemon must not outlive this daemon
            let install_pdeathsig = || {
                unsafe {
                    libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGHUP as libc::c_ulong);
                }
                Ok(())
            };
            unsafe {
                cmd.pre_exec(install_pdeathsig);
            }

            let child = cmd.spawn().map_err(|source| HelperError::Spawn {
                program: SYNDAEMON_PROGRAM,
                source,
            })?;
            self.syndaemon_pid = child.id();
            debug!("Launched syndaemon");
            self.spawn_reaper(HelperKind::Syndaemon, child);
        } else if let Some(pid) = self.syndaemon_pid.take() {
            terminate(pid);
            debug!("Killed syndaemon");
        }
        Ok(())
    }

    /// Start or stop the pointer-locator helper.
    pub fn reconcile_locate_pointer(&mut self, desired: bool) -> Result<(), HelperError> {
        if desired {
            if self.locate_pointer_pid.is_some() {
                return Ok(());
            }

            let child = Command::new(LOCATE_POINTER_PROGRAM)
                .spawn()
                .map_err(|source| HelperError::Spawn {
                    program: LOCATE_POINTER_PROGRAM,
                    source,
                })?;
            self.locate_pointer_pid = child.id();
            debug!("Launched pointer locator");
            self.spawn_reaper(HelperKind::LocatePointer, child);
        } else if let Some(pid) = self.locate_pointer_pid.take() {
            terminate(pid);
            debug!("Killed pointer locator");
        }
        Ok(())
    }

    /// Start or stop mousetweaks. The daemon manages its own lifetime: it is
    /// started plain and stopped by running it again with `-s`.
    pub fn reconcile_mousetweaks(&mut self, desired: bool) -> Result<(), HelperError> {
        if !desired && !self.mousetweaks_running {
            return Ok(());
        }

        let mut cmd = Command::new(MOUSETWEAKS_PROGRAM);
        if !desired {
            cmd.arg("-s");
        }

        match cmd.spawn() {
            Ok(mut child) => {
                self.mousetweaks_running = desired;
                tokio::spawn(async move {
                    let _ = child.wait().await;
                });
                Ok(())
            }
            Err(source) => {
                self.mousetweaks_running = false;
                if desired {
                    Err(HelperError::Spawn {
                        program: MOUSETWEAKS_PROGRAM,
                        source,
                    })
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Clear the running record for an exited helper. Never touches device
    /// state.
    pub fn on_exited(&mut self, kind: HelperKind, status: Option<i32>) {
        debug!("{} stopped with status {:?}", kind.program(), status);
        match kind {
            HelperKind::Syndaemon => self.syndaemon_pid = None,
            HelperKind::LocatePointer => self.locate_pointer_pid = None,
            HelperKind::Mousetweaks => {}
        }
    }

    /// Teardown: the pointer locator dies with us; syndaemon has the
    /// parent-death signal installed and mousetweaks owns its own lifetime.
    pub fn shutdown(&mut self) {
        if let Some(pid) = self.locate_pointer_pid.take() {
            terminate(pid);
            debug!("Killed pointer locator");
        }
    }

    fn spawn_reaper(&self, kind: HelperKind, mut child: Child) {
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let status = child.wait().await.ok().and_then(|s| s.code());
            let _ = tx.send(Event::HelperExited { kind, status });
        });
    }
}

fn terminate(pid: u32) {
    unsafe {
        libc::kill(pid as libc::pid_t, libc::SIGHUP);
    }
}

pub fn have_program_in_path(name: &str) -> bool {
    let Some(paths) = env::var_os("PATH") else {
        return false;
    };
    env::split_paths(&paths).any(|dir| dir.join(name).is_file())
}
