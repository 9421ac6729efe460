//! Backend worker process supervision.
//!
//! Resolves the launch command for the current run mode, spawns the worker,
//! forwards its stdout/stderr to the log line by line, and terminates it on
//! shutdown. At most one worker is tracked at a time; its exit (any code)
//! clears the slot.

use crate::config::{AppConfig, RunMode};
use crate::lock;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// How long `shutdown()` waits for the worker to exit after the kill.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

/// Directory under the app's resource dir holding the bundled worker.
const RESOURCE_SUBDIR: &str = "extraResources";

#[cfg(windows)]
const PACKAGED_EXECUTABLE: &str = "main_app.exe";
#[cfg(not(windows))]
const PACKAGED_EXECUTABLE: &str = "main_app";

#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("Failed to spawn backend '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Backend is already running (pid {pid:?})")]
    AlreadyRunning { pid: Option<u32> },

    #[error("Resource directory unavailable; cannot locate the packaged backend")]
    MissingResourceDir,
}

/// Program, arguments and working directory used to launch the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl BackendCommand {
    /// `python -u main.py`, run from `<project_root>/core_py`.
    pub fn development(python: &str, project_root: &Path) -> Self {
        Self {
            program: PathBuf::from(python),
            args: vec!["-u".to_string(), "main.py".to_string()],
            cwd: Some(project_root.join("core_py")),
        }
    }

    /// The bundled executable, run from its own directory.
    pub fn packaged(resource_dir: &Path) -> Self {
        let program = resource_dir.join(RESOURCE_SUBDIR).join(PACKAGED_EXECUTABLE);
        let cwd = program.parent().map(Path::to_path_buf);
        Self {
            program,
            args: Vec::new(),
            cwd,
        }
    }

    /// Pick the launch command for `config.run_mode`.
    ///
    /// In packaged mode the executable bit is set before returning; failing to
    /// set it is logged and the launch is still attempted.
    pub fn resolve(
        config: &AppConfig,
        project_root: &Path,
        resource_dir: Option<&Path>,
    ) -> Result<Self, SupervisorError> {
        match config.run_mode {
            RunMode::Development => {
                let command = Self::development(&config.python, project_root);
                log::info!(
                    "[BACKEND] Dev mode: {} {} in {}",
                    command.program.display(),
                    command.args.join(" "),
                    command.cwd.as_deref().unwrap_or(project_root).display()
                );
                Ok(command)
            }
            RunMode::Packaged => {
                let dir = resource_dir.ok_or(SupervisorError::MissingResourceDir)?;
                let command = Self::packaged(dir);
                match ensure_executable(&command.program) {
                    Ok(()) => log::info!(
                        "[BACKEND] Execute permission set on {}",
                        command.program.display()
                    ),
                    Err(e) => log::error!(
                        "[BACKEND] Failed to set execute permission on {}: {}",
                        command.program.display(),
                        e
                    ),
                }
                log::info!("[BACKEND] Packaged mode: {}", command.program.display());
                Ok(command)
            }
        }
    }
}

#[cfg(unix)]
fn ensure_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn ensure_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Identifies one launch of the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendHandle {
    pub pid: Option<u32>,
    pub generation: u64,
}

struct RunningBackend {
    handle: BackendHandle,
    kill_tx: Option<oneshot::Sender<()>>,
    watcher: JoinHandle<()>,
}

type Slot = Arc<Mutex<Option<RunningBackend>>>;

/// Owner of the (single) backend worker process.
///
/// Lives in Tauri managed state; nothing else touches the child process.
pub struct BackendSupervisor {
    slot: Slot,
    next_generation: AtomicU64,
}

impl Default for BackendSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl BackendSupervisor {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
            next_generation: AtomicU64::new(1),
        }
    }

    /// Spawn the worker. Must be called from within a tokio runtime.
    pub fn start(&self, command: &BackendCommand) -> Result<BackendHandle, SupervisorError> {
        let mut slot = lock(&self.slot);
        if let Some(running) = slot.as_ref() {
            return Err(SupervisorError::AlreadyRunning {
                pid: running.handle.pid,
            });
        }

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &command.cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|source| SupervisorError::Spawn {
            program: command.program.display().to_string(),
            source,
        })?;

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, OutputStream::Stdout));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, OutputStream::Stderr));
        }

        let handle = BackendHandle {
            pid: child.id(),
            generation: self.next_generation.fetch_add(1, Ordering::SeqCst),
        };
        let (kill_tx, kill_rx) = oneshot::channel();
        let watcher = tokio::spawn(watch_process(
            child,
            kill_rx,
            Arc::clone(&self.slot),
            handle.generation,
        ));

        *slot = Some(RunningBackend {
            handle,
            kill_tx: Some(kill_tx),
            watcher,
        });

        log::info!("[BACKEND] Started (pid {:?})", handle.pid);
        Ok(handle)
    }

    /// Ask the worker to terminate. Returns `false` if nothing was running.
    pub fn stop(&self) -> bool {
        match self.take_running() {
            Some(mut running) => {
                if let Some(tx) = running.kill_tx.take() {
                    let _ = tx.send(());
                }
                true
            }
            None => false,
        }
    }

    /// Terminate the worker and wait (bounded) for it to exit.
    pub async fn shutdown(&self) {
        let Some(mut running) = self.take_running() else {
            return;
        };
        if let Some(tx) = running.kill_tx.take() {
            let _ = tx.send(());
        }
        match tokio::time::timeout(SHUTDOWN_GRACE, running.watcher).await {
            Ok(_) => log::info!("[BACKEND] Shut down (pid {:?})", running.handle.pid),
            Err(_) => log::warn!(
                "[BACKEND] Process {:?} did not exit within {}s",
                running.handle.pid,
                SHUTDOWN_GRACE.as_secs()
            ),
        }
    }

    pub fn is_running(&self) -> bool {
        lock(&self.slot).is_some()
    }

    pub fn current(&self) -> Option<BackendHandle> {
        lock(&self.slot).as_ref().map(|running| running.handle)
    }

    fn take_running(&self) -> Option<RunningBackend> {
        lock(&self.slot).take()
    }
}

#[derive(Debug, Clone, Copy)]
enum OutputStream {
    Stdout,
    Stderr,
}

async fn forward_lines<R: AsyncRead + Unpin>(reader: R, stream: OutputStream) {
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim_end();
                if line.is_empty() {
                    continue;
                }
                match stream {
                    OutputStream::Stdout => log::info!("[BACKEND] stdout: {}", line),
                    OutputStream::Stderr => log::warn!("[BACKEND] stderr: {}", line),
                }
            }
            Ok(None) => break,
            Err(e) => {
                log::debug!("[BACKEND] {:?} read failed: {}", stream, e);
                break;
            }
        }
    }
}

/// Owns the child until it exits, either on its own or after a kill request.
async fn watch_process(
    mut child: Child,
    kill_rx: oneshot::Receiver<()>,
    slot: Slot,
    generation: u64,
) {
    let status = tokio::select! {
        status = child.wait() => status,
        _ = kill_rx => {
            log::info!("[BACKEND] Terminating backend process");
            if let Err(e) = child.kill().await {
                log::warn!("[BACKEND] Kill failed: {}", e);
            }
            child.wait().await
        }
    };

    match status {
        Ok(status) => log::info!("[BACKEND] Process exited with {}", status),
        Err(e) => log::warn!("[BACKEND] Failed to reap process: {}", e),
    }

    let mut guard = lock(&slot);
    if guard.as_ref().map(|running| running.handle.generation) == Some(generation) {
        *guard = None;
    }
}
