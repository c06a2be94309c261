//! Process spawner backed by `tokio::process`.

use std::{io, process::Stdio};

use log::{debug, warn};
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process::{Child, Command},
    sync::{mpsc, oneshot},
};

use super::{ProcessEvent, ProcessHandle, ProcessSpawner, SpawnRequest, SpawnedProcess};

const READ_BUFFER_SIZE: usize = 4096;

/// Spawns real child processes on the tokio runtime.
///
/// Must be called from within a tokio runtime: each child gets a watcher
/// task that owns it, forwards its output, and reports its exit.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSpawner;

impl ProcessSpawner for TokioSpawner {
    fn spawn(&self, request: &SpawnRequest) -> io::Result<SpawnedProcess> {
        debug!(
            "Spawning {} {:?} in {}",
            request.program,
            request.args,
            request.cwd.display()
        );

        let mut child = Command::new(&request.program)
            .args(&request.args)
            .current_dir(&request.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (kill_tx, kill_rx) = oneshot::channel();

        let stdout = child.stdout.take().map(|out| {
            tokio::spawn(forward_output(out, events_tx.clone(), ProcessEvent::Stdout))
        });
        let stderr = child.stderr.take().map(|err| {
            tokio::spawn(forward_output(err, events_tx.clone(), ProcessEvent::Stderr))
        });

        tokio::spawn(async move {
            let exit = wait_or_kill(&mut child, kill_rx).await;
            // Drain both pipes before reporting, so the exit event comes last.
            for reader in [stdout, stderr].into_iter().flatten() {
                let _ = reader.await;
            }
            let _ = events_tx.send(exit);
        });

        Ok(SpawnedProcess {
            handle: Box::new(TokioProcessHandle {
                kill: Some(kill_tx),
            }),
            events: events_rx,
        })
    }
}

async fn wait_or_kill(child: &mut Child, mut kill_rx: oneshot::Receiver<()>) -> ProcessEvent {
    tokio::select! {
        status = child.wait() => match status {
            Ok(status) => ProcessEvent::Exited(status.code().unwrap_or(-1)),
            Err(e) => ProcessEvent::Error(e.to_string()),
        },
        Ok(()) = &mut kill_rx => {
            if let Err(e) = child.start_kill() {
                warn!("Failed to kill child process: {e}");
            }
            match child.wait().await {
                Ok(status) => ProcessEvent::Exited(status.code().unwrap_or(-1)),
                Err(e) => ProcessEvent::Error(e.to_string()),
            }
        }
    }
}

async fn forward_output<R>(
    mut reader: R,
    events: mpsc::UnboundedSender<ProcessEvent>,
    wrap: fn(Vec<u8>) -> ProcessEvent,
) where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                if events.send(wrap(buf[..n].to_vec())).is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!("Failed to read child output: {e}");
                break;
            }
        }
    }
}

/// Kill switch for a child owned by its watcher task.
struct TokioProcessHandle {
    kill: Option<oneshot::Sender<()>>,
}

impl ProcessHandle for TokioProcessHandle {
    fn kill(&mut self) {
        if let Some(kill) = self.kill.take() {
            let _ = kill.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    async fn collect(mut spawned: SpawnedProcess) -> (String, Option<ProcessEvent>) {
        let mut stdout = Vec::new();
        let mut last = None;
        while let Some(event) = spawned.events.recv().await {
            match event {
                ProcessEvent::Stdout(chunk) => stdout.extend(chunk),
                ProcessEvent::Stderr(_) => {}
                other => last = Some(other),
            }
        }
        (String::from_utf8_lossy(&stdout).into_owned(), last)
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_spawn_captures_stdout_and_exit_code() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let request = SpawnRequest {
            program: "echo".to_string(),
            args: vec!["hi".to_string()],
            cwd: dir.path().to_path_buf(),
        };

        let spawned = TokioSpawner.spawn(&request).expect("Failed to spawn echo");
        let (stdout, last) = collect(spawned).await;

        assert_eq!(stdout, "hi\n");
        assert_eq!(last, Some(ProcessEvent::Exited(0)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_reported() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let request = SpawnRequest {
            program: "false".to_string(),
            args: vec![],
            cwd: dir.path().to_path_buf(),
        };

        let spawned = TokioSpawner.spawn(&request).expect("Failed to spawn false");
        let (_, last) = collect(spawned).await;
        assert_eq!(last, Some(ProcessEvent::Exited(1)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_kill_terminates_child() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let request = SpawnRequest {
            program: "sleep".to_string(),
            args: vec!["30".to_string()],
            cwd: dir.path().to_path_buf(),
        };

        let mut spawned = TokioSpawner.spawn(&request).expect("Failed to spawn sleep");
        spawned.handle.kill();
        let (_, last) = tokio::time::timeout(std::time::Duration::from_secs(5), collect(spawned))
            .await
            .expect("Killed child should exit promptly");
        assert_eq!(last, Some(ProcessEvent::Exited(-1)));
    }

    #[test]
    fn test_missing_program_fails_to_spawn() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let _guard = runtime.enter();
        let request = SpawnRequest {
            program: "definitely-not-a-real-program-relay".to_string(),
            args: vec![],
            cwd: std::env::temp_dir(),
        };
        assert!(TokioSpawner.spawn(&request).is_err());
    }
}
