use std::{ffi::OsString, path::PathBuf, str::FromStr};

use anyhow::Result;
use clap::Parser;

use crate::{
    config::{load_env, load_env_file, ClientLanguage, Config},
    contracts::discover,
    deploy::{Action, Deploy},
    python::{PythonClientLoader, PythonOverrides},
};

/// Build AlgoKit Python smart contracts and deploy them.
#[derive(Debug, Parser)]
#[clap(version)]
pub struct CommandLine {
    /// One of `build`, `deploy` or `all`.
    #[clap(default_value = "all", value_parser = Action::from_str)]
    action: Action,

    /// Only act on the contract in this folder.
    contract_name: Option<String>,

    /// Folder holding one subfolder per contract.
    #[clap(long, env = "SMART_CONTRACTS_ROOT", default_value = "smart_contracts")]
    root: PathBuf,

    /// Where build output goes, one folder per contract. Defaults to
    /// `<root>/artifacts`.
    #[clap(long, env = "SMART_CONTRACTS_ARTIFACTS")]
    artifacts: Option<PathBuf>,

    /// AlgoKit command line.
    #[clap(long, env = "ALGOKIT_BIN", default_value = "algokit")]
    algokit: String,

    /// Interpreter used for generated clients and deploy_config overrides.
    #[clap(long, env = "PYTHON", default_value = "python")]
    python: PathBuf,

    #[clap(long, value_enum, default_value_t = ClientLanguage::Python)]
    client_language: ClientLanguage,

    /// Env file loaded before `.env` and before the other flags are resolved.
    /// Variables already set in the process win.
    #[clap(long)]
    env_file: Option<PathBuf>,
}

/// Value of `--env-file` in raw arguments, read ahead of clap.
fn env_file_arg(args: &[OsString]) -> Option<PathBuf> {
    let mut args = args.iter().skip(1);
    while let Some(arg) = args.next() {
        let Some(arg) = arg.to_str() else {
            continue;
        };
        if arg == "--" {
            return None;
        }
        if arg == "--env-file" {
            return args.next().map(PathBuf::from);
        }
        if let Some(path) = arg.strip_prefix("--env-file=") {
            return Some(PathBuf::from(path));
        }
    }
    None
}

impl CommandLine {
    /// Loads `--env-file` and `.env` into the environment, then parses `args`,
    /// so both files can supply the env-backed flags.
    pub fn parse_with_env(args: Vec<OsString>) -> Self {
        if let Some(env_file) = env_file_arg(&args) {
            if !load_env_file(&env_file) {
                log::warn!("could not load env file {}", env_file.display());
            }
        }
        load_env();
        Self::parse_from(args)
    }

    pub fn config(&self) -> Config {
        let mut config = Config::new(&self.root);
        if let Some(artifacts) = &self.artifacts {
            config.artifacts = artifacts.clone();
        }
        config.algokit = self.algokit.clone();
        config.python = self.python.clone();
        config.client_language = self.client_language;
        config
    }

    pub async fn execute(self) -> Result<()> {
        if let Some(env_file) = &self.env_file {
            log::debug!("using variables from {}", env_file.display());
        }
        let config = self.config();
        let overrides = PythonOverrides::new(&config.python);
        let contracts = discover(&config.root, &overrides).await?;
        log::debug!("found {} contract(s) in {}", contracts.len(), config.root.display());

        let deploy = Deploy::new(
            &config,
            contracts,
            Box::new(PythonClientLoader::new(&config.python)),
        );
        deploy
            .run(self.action, self.contract_name.as_deref())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_all_without_filter() {
        let cmd = CommandLine::try_parse_from(["algorand-contracts"]).unwrap();
        assert_eq!(cmd.action, Action::All);
        assert_eq!(cmd.contract_name, None);

        let config = cmd.config();
        assert_eq!(config.artifacts, config.root.join("artifacts"));
        assert_eq!(config.client_language, ClientLanguage::Python);
    }

    #[test]
    fn takes_action_and_contract_name() {
        let cmd = CommandLine::try_parse_from([
            "algorand-contracts",
            "deploy",
            "hello",
            "--root",
            "contracts",
            "--artifacts",
            "out",
            "--algokit",
            "poetry run algokit",
        ])
        .unwrap();
        assert_eq!(cmd.action, Action::Deploy);
        assert_eq!(cmd.contract_name.as_deref(), Some("hello"));

        let config = cmd.config();
        assert_eq!(config.root, PathBuf::from("contracts"));
        assert_eq!(config.artifacts, PathBuf::from("out"));
        assert_eq!(config.algokit, "poetry run algokit");
    }

    #[test]
    fn env_file_is_found_before_parsing() {
        let args = |list: &[&str]| list.iter().map(OsString::from).collect::<Vec<_>>();

        assert_eq!(
            env_file_arg(&args(&["bin", "build", "--env-file", "ci.env"])),
            Some(PathBuf::from("ci.env"))
        );
        assert_eq!(
            env_file_arg(&args(&["bin", "--env-file=ci.env", "deploy"])),
            Some(PathBuf::from("ci.env"))
        );
        assert_eq!(env_file_arg(&args(&["bin", "build", "hello"])), None);
        assert_eq!(env_file_arg(&args(&["bin", "--", "--env-file", "x"])), None);
    }

    #[test]
    fn unknown_action_is_rejected() {
        let err = CommandLine::try_parse_from(["algorand-contracts", "publish"]).unwrap_err();
        assert!(err.to_string().contains("Unknown action: publish"));
    }
}
