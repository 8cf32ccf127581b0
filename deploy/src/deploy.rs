use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use crate::{
    build::{build, Toolchain, APP_SPEC_SUFFIX},
    client::{default_deploy, ClientLoader},
    config::Config,
    contracts::SmartContract,
    error::{Error, Result},
    utils::files_with_suffix,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Build,
    Deploy,
    /// Build, then deploy.
    All,
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "build" => Ok(Action::Build),
            "deploy" => Ok(Action::Deploy),
            "all" => Ok(Action::All),
            other => Err(Error::Usage(format!("Unknown action: {other}"))),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Build => "build",
            Action::Deploy => "deploy",
            Action::All => "all",
        };
        f.write_str(name)
    }
}

/// Routes an action over the discovered contracts.
pub struct Deploy {
    config: Config,
    toolchain: Toolchain,
    contracts: Vec<SmartContract>,
    loader: Box<dyn ClientLoader>,
}

impl Deploy {
    pub fn new(config: &Config, contracts: Vec<SmartContract>, loader: Box<dyn ClientLoader>) -> Self {
        Self {
            config: config.clone(),
            toolchain: Toolchain::from_command_line(&config.algokit),
            contracts,
            loader,
        }
    }

    pub async fn run(&self, action: Action, contract_name: Option<&str>) -> Result<()> {
        let selected = self.select(contract_name)?;

        for contract in selected {
            match action {
                Action::Build => {
                    self.build_contract(contract).await?;
                }
                Action::Deploy => self.deploy_contract(contract).await?,
                Action::All => {
                    self.build_contract(contract).await?;
                    self.deploy_contract(contract).await?;
                }
            }
        }
        Ok(())
    }

    fn select(&self, contract_name: Option<&str>) -> Result<Vec<&SmartContract>> {
        let selected: Vec<_> = self
            .contracts
            .iter()
            .filter(|c| contract_name.map_or(true, |name| c.name == name))
            .collect();
        if selected.is_empty() {
            return Err(Error::Usage(format!(
                "No contracts found matching '{}'",
                contract_name.unwrap_or_default()
            )));
        }
        Ok(selected)
    }

    async fn build_contract(&self, contract: &SmartContract) -> Result<PathBuf> {
        log::info!("Building app at {}", contract.path.display());
        build(
            &self.toolchain,
            self.config.client_language,
            &self.config.artifact_dir(&contract.name),
            &contract.path,
        )
        .await
    }

    async fn deploy_contract(&self, contract: &SmartContract) -> Result<()> {
        let out_dir = self.config.artifact_dir(&contract.name);
        ensure_built(&out_dir, &contract.name)?;

        match &contract.deploy {
            Some(hook) => {
                log::info!("Deploying app {} via {}", contract.name, hook.describe());
                hook.deploy().await
            }
            None => default_deploy(self.loader.as_ref(), &out_dir, &contract.name).await,
        }
    }
}

fn ensure_built(out_dir: &Path, contract_name: &str) -> Result<()> {
    if files_with_suffix(out_dir, APP_SPEC_SUFFIX)?.is_empty() {
        return Err(Error::Deploy(format!(
            "Could not deploy {contract_name}; {APP_SPEC_SUFFIX} not found. Run 'build' first."
        )));
    }
    Ok(())
}
