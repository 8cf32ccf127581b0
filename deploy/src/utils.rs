use std::{
    fs,
    path::{Path, PathBuf},
    process::Stdio,
};

use tokio::process::Command;

use crate::error::{Error, Result};

/// Exit status and interleaved output of a finished subprocess.
#[derive(Debug)]
pub struct CapturedOutput {
    pub success: bool,
    pub text: String,
}

/// Runs `command` to completion with stdout and stderr captured.
///
/// The two streams are joined stdout first, which is what callers show to the
/// user when the tool fails.
pub async fn run_captured(command: &mut Command) -> Result<CapturedOutput> {
    let program = program_name(command);
    log::debug!("running {program}");

    let output = command
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|source| Error::Spawn { program, source })?;

    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));

    Ok(CapturedOutput {
        success: output.status.success(),
        text,
    })
}

/// Runs `command` with inherited stdio and reports whether it exited cleanly.
pub async fn run_inherited(command: &mut Command) -> Result<bool> {
    let program = program_name(command);
    log::debug!("running {program}");

    let status = command
        .status()
        .await
        .map_err(|source| Error::Spawn { program, source })?;
    Ok(status.success())
}

pub fn program_name(command: &Command) -> String {
    command
        .as_std()
        .get_program()
        .to_string_lossy()
        .into_owned()
}

/// Files directly inside `dir` whose name ends with `suffix`, sorted by name.
/// A missing directory has no files.
pub fn files_with_suffix(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let matches = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.ends_with(suffix));
        if matches && entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}
