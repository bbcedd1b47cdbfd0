// src/exec/command.rs

use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{Context, Result, bail};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::task::{BodyFuture, TaskBody};

/// Task body that runs a shell command and succeeds on exit status 0.
#[derive(Debug, Clone)]
pub struct CommandBody {
    task: String,
    cmd: String,
    workdir: Option<PathBuf>,
}

impl CommandBody {
    pub fn new(task: impl Into<String>, cmd: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            cmd: cmd.into(),
            workdir: None,
        }
    }

    /// Run the command from `dir` instead of the current directory.
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    async fn execute(self) -> Result<()> {
        info!(task = %self.task, cmd = %self.cmd, "starting task process");

        // Build a shell command appropriate for the platform.
        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&self.cmd);
            c
        };

        if let Some(dir) = &self.workdir {
            cmd.current_dir(dir);
        }

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning process for task '{}'", self.task))?;

        // Always consume both pipes so buffers don't fill.
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(self.task.clone(), "stdout", stdout));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(self.task.clone(), "stderr", stderr));
        }

        let status = child
            .wait()
            .await
            .with_context(|| format!("waiting for process of task '{}'", self.task))?;

        info!(
            task = %self.task,
            exit_code = status.code().unwrap_or(-1),
            success = status.success(),
            "task process exited"
        );

        if !status.success() {
            match status.code() {
                Some(code) => bail!("command `{}` exited with code {code}", self.cmd),
                None => bail!("command `{}` was terminated by a signal", self.cmd),
            }
        }
        Ok(())
    }
}

impl TaskBody for CommandBody {
    fn run(&self) -> BodyFuture {
        Box::pin(self.clone().execute())
    }
}

async fn forward_lines<R>(task: String, stream: &'static str, reader: R)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(task = %task, stream, "{}", line);
    }
}
