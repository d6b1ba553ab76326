use anyhow::Context;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

#[derive(Debug)]
pub(crate) struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Run a command to completion, optionally feeding it `stdin`.
pub(crate) async fn run_command(
    program: &Path,
    args: &[String],
    stdin: Option<&[u8]>,
) -> anyhow::Result<CommandOutput> {
    log::trace!("Running {} {}", program.display(), args.join(" "));

    let mut child = Command::new(program)
        .args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("Failed to start {}", program.display()))?;

    if let Some(input) = stdin {
        let mut pipe = child
            .stdin
            .take()
            .context("Child process has no stdin")?;
        pipe.write_all(input)
            .await
            .with_context(|| format!("Failed to write to {}", program.display()))?;
        // Closing stdin lets the child see the end of its input.
        drop(pipe);
    }

    let output = child
        .wait_with_output()
        .await
        .with_context(|| format!("Failed to wait for {}", program.display()))?;

    Ok(CommandOutput {
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}


/// Write an executable shell script that stands in for a CLI tool. Every invocation appends its
/// arguments to `calls.log` next to the script.
#[cfg(all(test, unix))]
pub(crate) fn fake_binary(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    let log = dir.join("calls.log");
    let script = format!(
        "#!/bin/sh\necho \"$@\" >> '{}'\n{body}\n",
        log.display()
    );
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[cfg(all(test, unix))]
pub(crate) fn fake_binary_calls(dir: &Path) -> Vec<String> {
    std::fs::read_to_string(dir.join("calls.log"))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}
