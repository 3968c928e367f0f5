/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::process::ExitStatus;
use std::time::Duration;

use forge_core::error::Error;
use forge_core::error::Result;
use futures::future::Future;
use tokio::process::Child;
use tokio::process::Command;

/// How an invoked command came to an end. Stdout and stderr are redirected
/// to files by the caller, so only the exit disposition travels here.
#[derive(Debug)]
pub(crate) enum GatherStatus {
    /// The command ran to completion. A command killed by signal N reports
    /// exit code 128+N, shell convention.
    Finished { exit_code: i32 },
    TimedOut(Duration),
}

async fn timeout_into_cancellation(timeout: Option<Duration>) -> GatherStatus {
    match timeout {
        Some(t) => {
            tokio::time::sleep(t).await;
            GatherStatus::TimedOut(t)
        }
        None => futures::future::pending().await,
    }
}

fn decode_exit_status(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    match status.code() {
        Some(code) => code,
        None => 128 + status.signal().unwrap_or(0),
    }
}

/// Kills the command's entire process group, then reaps the direct child.
/// Grandchildren holding the stdio files open would otherwise be able to
/// outlive the action.
async fn kill(child: &mut Child) -> std::io::Result<()> {
    if let Some(pid) = child.id() {
        unsafe {
            libc::killpg(pid as i32, libc::SIGKILL);
        }
    }
    child.kill().await
}

/// fork-exec is a bit tricky here: we have input files open for writing
/// just prior to executing them, and a concurrently forked child can hold
/// such an fd across our exec, failing it with ETXTBSY. The window is
/// small, so a few retries with a short delay cover it.
async fn spawn_retry_txt_busy<F, D>(cmd: &mut Command, mut delay: F) -> std::io::Result<Child>
where
    F: FnMut() -> D,
    D: Future<Output = ()>,
{
    let mut attempts = 10;

    loop {
        let res = cmd.spawn();

        let is_txt_busy = matches!(&res, Err(e) if e.raw_os_error() == Some(libc::ETXTBSY));
        if attempts == 0 || !is_txt_busy {
            return res;
        }

        delay().await;

        attempts -= 1;
    }
}

/// Spawns `cmd` in its own process group and waits for it, honoring
/// `timeout`. Expiry kills the process group. Dropping the returned future
/// does the same: the child is spawned with kill-on-drop, so caller
/// cancellation propagates into the process.
pub(crate) async fn gather_status(
    mut cmd: Command,
    timeout: Option<Duration>,
) -> Result<GatherStatus> {
    cmd.kill_on_drop(true);
    cmd.process_group(0);

    let mut child = spawn_retry_txt_busy(&mut cmd, || {
        tokio::time::sleep(Duration::from_millis(50))
    })
    .await
    .map_err(|e| Error::internal(format!("failed to spawn command: {}", e)).with_source(e))?;

    tokio::select! {
        status = child.wait() => Ok(GatherStatus::Finished {
            exit_code: decode_exit_status(status?),
        }),
        timed_out = timeout_into_cancellation(timeout) => {
            kill(&mut child)
                .await
                .map_err(|e| Error::internal("failed to kill timed out command").with_source(e))?;
            Ok(timed_out)
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use forge_core::error::Code;

    use super::*;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("/bin/sh");
        cmd.args(["-c", script]);
        cmd.stdout(std::process::Stdio::null());
        cmd.stderr(std::process::Stdio::null());
        cmd
    }

    #[tokio::test]
    async fn test_gather_status_reports_exit_codes() {
        assert_matches!(
            gather_status(sh("exit 0"), None).await.unwrap(),
            GatherStatus::Finished { exit_code: 0 }
        );
        assert_matches!(
            gather_status(sh("exit 7"), None).await.unwrap(),
            GatherStatus::Finished { exit_code: 7 }
        );
    }

    #[tokio::test]
    async fn test_signal_death_is_128_plus_signal() {
        assert_matches!(
            gather_status(sh("kill -KILL \"$$\""), None).await.unwrap(),
            GatherStatus::Finished { exit_code } if exit_code == 128 + libc::SIGKILL
        );
    }

    #[tokio::test]
    async fn test_timeout_kills_the_command() {
        let start = std::time::Instant::now();
        let status = gather_status(sh("sleep 10"), Some(Duration::from_millis(200)))
            .await
            .unwrap();
        assert_matches!(status, GatherStatus::TimedOut(..));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_spawn_failure_is_an_error() {
        let cmd = Command::new("/nonexistent/binary");
        let err = gather_status(cmd, None).await.unwrap_err();
        assert_eq!(Code::Internal, err.code());
    }
}
