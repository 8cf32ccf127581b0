use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use tokio::process::Command;

use crate::{
    config::ClientLanguage,
    error::{Error, Result},
    utils::{files_with_suffix, run_captured, CapturedOutput},
};

/// Suffix of the ARC-56 app spec written by the compiler. Its presence marks a
/// successful build.
pub const APP_SPEC_SUFFIX: &str = ".arc56.json";

const UNKNOWN_COMMAND: &str = "No such command";

/// The external AlgoKit CLI, possibly behind a launcher such as
/// `poetry run algokit`.
#[derive(Debug, Clone)]
pub struct Toolchain {
    program: String,
    leading_args: Vec<String>,
}

impl Toolchain {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    /// Splits a whitespace separated command line; the first word is the
    /// program. An empty line falls back to plain `algokit`.
    pub fn from_command_line(line: &str) -> Self {
        let mut words = line.split_whitespace().map(str::to_owned);
        match words.next() {
            Some(program) => Self {
                program,
                leading_args: words.collect(),
            },
            None => Self::new("algokit"),
        }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.leading_args);
        command
    }

    pub async fn compile_python(&self, contract: &Path, out_dir: &Path) -> Result<CapturedOutput> {
        let mut command = self.command();
        command
            .args(["--no-color", "compile", "python"])
            .arg(contract)
            .arg(format!("--out-dir={}", out_dir.display()))
            .args(["--no-output-arc32", "--output-arc56", "--output-source-map"]);
        run_captured(&mut command).await
    }

    pub async fn generate_client(&self, app_spec: &Path, output: &Path) -> Result<CapturedOutput> {
        let mut command = self.command();
        command
            .args(["generate", "client"])
            .arg(app_spec)
            .arg("--output")
            .arg(output);
        run_captured(&mut command).await
    }
}

#[derive(Debug, Deserialize)]
struct AppSpec {
    name: String,
}

fn app_spec_name(path: &Path) -> Result<String> {
    let spec: AppSpec = serde_json::from_slice(&fs::read(path)?)?;
    Ok(spec.name)
}

/// App name from the spec, or from the file name when the spec is unreadable.
fn app_name(path: &Path) -> String {
    match app_spec_name(path) {
        Ok(name) => name,
        Err(err) => {
            log::warn!("could not read {}: {err}", path.display());
            path.file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_suffix(APP_SPEC_SUFFIX))
                .unwrap_or("contract")
                .to_owned()
        }
    }
}

/// Recreates `output_dir`, compiles `contract_path` into it and generates a
/// typed client for every app spec produced.
///
/// Returns the client generated for the last app spec, or `output_dir` itself
/// when the compiler emitted no app spec.
pub async fn build(
    toolchain: &Toolchain,
    language: ClientLanguage,
    output_dir: &Path,
    contract_path: &Path,
) -> Result<PathBuf> {
    if output_dir.exists() {
        fs::remove_dir_all(output_dir)?;
    }
    fs::create_dir_all(output_dir)?;
    let output_dir = output_dir.canonicalize()?;
    let contract_path = contract_path.canonicalize()?;
    log::info!(
        "Exporting {} to {}",
        contract_path.display(),
        output_dir.display()
    );

    let compiled = toolchain.compile_python(&contract_path, &output_dir).await?;
    if !compiled.success {
        return Err(Error::Build {
            step: "build contract",
            output: compiled.text,
        });
    }

    let app_specs = files_with_suffix(&output_dir, APP_SPEC_SUFFIX)?;
    if app_specs.is_empty() {
        log::warn!("No '*{APP_SPEC_SUFFIX}' file found; skipping client generation.");
        return Ok(output_dir);
    }

    let mut client_file = None;
    for app_spec in &app_specs {
        let name = app_name(app_spec);
        log::info!("Generating typed client for {name}");

        let output = output_dir.join(language.output_file_name(&name));
        let generated = toolchain.generate_client(app_spec, &output).await?;
        if !generated.success {
            if generated.text.contains(UNKNOWN_COMMAND) {
                return Err(Error::ToolchainVersion);
            }
            return Err(Error::Build {
                step: "generate typed client",
                output: generated.text,
            });
        }
        client_file = Some(output);
    }

    Ok(client_file.unwrap_or(output_dir))
}
