//! Spawning and tearing down the app-server child process.

use std::process::Stdio;

use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, info};

use super::error::RpcError;

/// Owned handle to the running child process.
///
/// The process is spawned with `kill_on_drop`, so dropping the handle
/// without calling [`terminate`](Self::terminate) still kills it.
pub struct ProcessHandle {
    child: Child,
    pid: Option<u32>,
}

impl ProcessHandle {
    /// OS process id, if the process was still running when spawned.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Kill the process and reap it. Failures are logged and swallowed.
    pub async fn terminate(&mut self) {
        if let Err(e) = self.child.start_kill() {
            debug!("Failed to kill app-server (pid {:?}): {}", self.pid, e);
        }
        match self.child.wait().await {
            Ok(status) => debug!("app-server (pid {:?}) exited: {}", self.pid, status),
            Err(e) => debug!("Failed to wait for app-server (pid {:?}): {}", self.pid, e),
        }
    }
}

/// Spawn `program args...` with stdin/stdout piped and stderr discarded.
///
/// Returns the process handle together with both pipe ends.
pub fn launch(
    program: &str,
    args: &[String],
) -> Result<(ProcessHandle, ChildStdin, ChildStdout), RpcError> {
    info!("Starting app-server: {} {}", program, args.join(" "));

    let spawn_err = |source: std::io::Error| RpcError::Spawn {
        program: program.to_string(),
        source,
    };

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(spawn_err)?;

    let pid = child.id();

    let stdin = child.stdin.take().ok_or_else(|| {
        spawn_err(std::io::Error::other("stdin handle was not captured"))
    })?;
    let stdout = child.stdout.take().ok_or_else(|| {
        spawn_err(std::io::Error::other("stdout handle was not captured"))
    })?;

    debug!("app-server spawned (pid {:?})", pid);

    Ok((ProcessHandle { child, pid }, stdin, stdout))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_launch_missing_program_is_spawn_error() {
        let result = launch("/nonexistent/ccstats-no-such-binary", &[]);
        match result {
            Err(RpcError::Spawn { program, .. }) => {
                assert_eq!(program, "/nonexistent/ccstats-no-such-binary");
            }
            Err(other) => panic!("Expected Spawn error, got {:?}", other),
            Ok(_) => panic!("Expected Spawn error, got a running process"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_launch_and_terminate() {
        let (mut handle, stdin, stdout) =
            launch("sh", &["-c".to_string(), "cat".to_string()]).expect("sh should spawn");
        assert!(handle.pid().is_some());
        drop(stdin);
        drop(stdout);

        tokio::time::timeout(std::time::Duration::from_secs(5), handle.terminate())
            .await
            .expect("terminate should not hang");
    }
}
