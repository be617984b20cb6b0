//! Thread and process launchers
//!
//! Both launchers start a closure asynchronously and return a handle with a
//! blocking [`Join::join`]. They share one contract so the same scenario can
//! be driven by threads or by processes:
//!
//! ```ignore
//! fn run<L: Launcher>(launcher: &L, cell: Arc<SynchronizedCell<f64, AnyBacking<f64>>>) {
//!     let h1 = launcher.launch({ let c = cell.clone(); move || { c.increment(50.0).unwrap(); } })?;
//!     let h2 = launcher.launch({ let c = cell.clone(); move || { c.increment(100.0).unwrap(); } })?;
//!     h1.join()?;
//!     h2.join()?;
//! }
//! ```
//!
//! ## Process launch
//!
//! [`ProcessLauncher`] forks. The child runs the closure on a copy of the
//! parent's address space, so captured cell handles only stay synchronized
//! with the parent if the cell uses cross-process storage. The child never
//! returns into the caller: it exits with status 0, or
//! [`CHILD_PANIC_EXIT_CODE`] if the closure panicked.

use std::fmt;
use std::io;
use std::thread;
use thiserror::Error;
use tracing::trace;

/// Exit status used by a forked child whose closure panicked
pub const CHILD_PANIC_EXIT_CODE: i32 = 101;

/// How a child process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildExit {
    /// Exited with this status code
    Code(i32),
    /// Terminated by this signal
    Signal(i32),
}

impl fmt::Display for ChildExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildExit::Code(code) => write!(f, "exit code {}", code),
            ChildExit::Signal(sig) => write!(f, "signal {}", sig),
        }
    }
}

/// Launcher errors
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The thread or process could not be started
    #[error("failed to launch: {0}")]
    Spawn(#[source] io::Error),

    /// Waiting for a child process failed
    #[error("failed to wait for child: {0}")]
    Wait(#[source] io::Error),

    /// The launched thread panicked
    #[error("launched thread panicked")]
    ThreadPanicked,

    /// The child process did not exit cleanly
    #[error("child process {pid} failed with {exit}")]
    ChildFailed {
        /// Child process id
        pid: i32,
        /// How the child ended
        exit: ChildExit,
    },
}

/// Handle to launched work
pub trait Join {
    /// Block until the launched work has finished
    fn join(self) -> Result<(), LaunchError>;
}

/// Starts closures asynchronously relative to the caller
pub trait Launcher {
    /// Handle returned for each launch
    type Handle: Join;

    /// Start `f` and return immediately
    fn launch<F>(&self, f: F) -> Result<Self::Handle, LaunchError>
    where
        F: FnOnce() + Send + 'static;
}

// =============================================================================
// Threads
// =============================================================================

/// Runs closures on new OS threads
#[derive(Debug, Clone, Default)]
pub struct ThreadLauncher {
    name: Option<String>,
}

impl ThreadLauncher {
    /// Create a launcher for unnamed threads
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a launcher that names every thread `name`
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }
}

impl Launcher for ThreadLauncher {
    type Handle = ThreadHandle;

    fn launch<F>(&self, f: F) -> Result<ThreadHandle, LaunchError>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut builder = thread::Builder::new();
        if let Some(name) = &self.name {
            builder = builder.name(name.clone());
        }
        let inner = builder.spawn(f).map_err(LaunchError::Spawn)?;
        Ok(ThreadHandle { inner })
    }
}

/// Joinable handle to a launched thread
#[must_use = "dropping a ThreadHandle detaches the thread"]
#[derive(Debug)]
pub struct ThreadHandle {
    inner: thread::JoinHandle<()>,
}

impl ThreadHandle {
    /// Check whether the thread has finished
    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }
}

impl Join for ThreadHandle {
    fn join(self) -> Result<(), LaunchError> {
        self.inner.join().map_err(|_| LaunchError::ThreadPanicked)
    }
}

/// Run `f` on a new thread
pub fn spawn_thread<F>(f: F) -> Result<ThreadHandle, LaunchError>
where
    F: FnOnce() + Send + 'static,
{
    ThreadLauncher::new().launch(f)
}

// =============================================================================
// Processes
// =============================================================================

/// Runs closures in forked child processes
#[cfg(unix)]
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessLauncher;

#[cfg(unix)]
impl ProcessLauncher {
    /// Create a process launcher
    pub fn new() -> Self {
        ProcessLauncher
    }
}

#[cfg(unix)]
impl Launcher for ProcessLauncher {
    type Handle = ProcessHandle;

    fn launch<F>(&self, f: F) -> Result<ProcessHandle, LaunchError>
    where
        F: FnOnce() + Send + 'static,
    {
        // SAFETY: the child only runs `f` and then `_exit`s, never unwinding
        // or returning into frames it shares with the parent.
        match unsafe { libc::fork() } {
            -1 => Err(LaunchError::Spawn(io::Error::last_os_error())),
            0 => {
                let code = match std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)) {
                    Ok(()) => 0,
                    Err(_) => CHILD_PANIC_EXIT_CODE,
                };
                // SAFETY: skips atexit handlers and buffered-stream flushes
                // that belong to the parent.
                unsafe { libc::_exit(code) }
            }
            pid => {
                trace!(pid, "launched child process");
                Ok(ProcessHandle { pid })
            }
        }
    }
}

/// Joinable handle to a forked child process
#[cfg(unix)]
#[must_use = "a ProcessHandle must be joined to reap the child"]
#[derive(Debug)]
pub struct ProcessHandle {
    pid: libc::pid_t,
}

#[cfg(unix)]
impl ProcessHandle {
    /// Child process id
    pub fn pid(&self) -> i32 {
        self.pid
    }
}

#[cfg(unix)]
impl Join for ProcessHandle {
    fn join(self) -> Result<(), LaunchError> {
        let mut status: libc::c_int = 0;
        loop {
            // SAFETY: `pid` is our own unreaped child
            let rc = unsafe { libc::waitpid(self.pid, &mut status, 0) };
            if rc != -1 {
                break;
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(LaunchError::Wait(err));
            }
        }

        let exit = if libc::WIFEXITED(status) {
            ChildExit::Code(libc::WEXITSTATUS(status))
        } else if libc::WIFSIGNALED(status) {
            ChildExit::Signal(libc::WTERMSIG(status))
        } else {
            ChildExit::Code(status)
        };
        trace!(pid = self.pid, %exit, "joined child process");

        match exit {
            ChildExit::Code(0) => Ok(()),
            exit => Err(LaunchError::ChildFailed {
                pid: self.pid,
                exit,
            }),
        }
    }
}

/// Run `f` in a forked child process
#[cfg(unix)]
pub fn spawn_process<F>(f: F) -> Result<ProcessHandle, LaunchError>
where
    F: FnOnce() + Send + 'static,
{
    ProcessLauncher::new().launch(f)
}
