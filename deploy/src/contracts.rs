use std::{
    fmt, fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;

use crate::error::{Error, Result};

/// File that marks a folder as a contract project.
pub const CONTRACT_FILE: &str = "contract.py";

/// Sibling module that may provide a `deploy()` override.
pub const DEPLOY_CONFIG_MODULE: &str = "deploy_config";

/// A project-supplied replacement for client-based deployment.
#[async_trait]
pub trait DeployHook: Send + Sync {
    fn describe(&self) -> String;

    async fn deploy(&self) -> Result<()>;
}

/// Looks up the optional deploy override of a contract folder. Lookup
/// failures of any kind mean "no override".
#[async_trait]
pub trait OverrideResolver: Send + Sync {
    async fn resolve(&self, folder: &Path) -> Option<Arc<dyn DeployHook>>;
}

/// Resolver for projects that never override deployment.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOverrides;

#[async_trait]
impl OverrideResolver for NoOverrides {
    async fn resolve(&self, _folder: &Path) -> Option<Arc<dyn DeployHook>> {
        None
    }
}

pub struct SmartContract {
    pub path: PathBuf,
    pub name: String,
    pub deploy: Option<Arc<dyn DeployHook>>,
}

impl fmt::Debug for SmartContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmartContract")
            .field("path", &self.path)
            .field("name", &self.name)
            .field("deploy", &self.deploy.as_ref().map(|d| d.describe()))
            .finish()
    }
}

pub fn has_contract_file(dir: &Path) -> bool {
    dir.join(CONTRACT_FILE).is_file()
}

pub fn import_contract(folder: &Path) -> Result<PathBuf> {
    let contract_path = folder.join(CONTRACT_FILE);
    if !contract_path.is_file() {
        return Err(Error::NotFound(format!(
            "Contract not found in {}",
            folder.display()
        )));
    }
    Ok(contract_path)
}

/// Contract projects directly under `root`, sorted by folder name. Folders
/// starting with `_` are skipped.
pub async fn discover(root: &Path, overrides: &dyn OverrideResolver) -> Result<Vec<SmartContract>> {
    let mut folders = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            log::warn!("skipping non UTF-8 folder {}", entry.path().display());
            continue;
        };
        if name.starts_with('_') || !has_contract_file(&entry.path()) {
            continue;
        }
        folders.push((name, entry.path()));
    }
    folders.sort();

    let mut contracts = Vec::with_capacity(folders.len());
    for (name, folder) in folders {
        let deploy = overrides.resolve(&folder).await;
        if let Some(hook) = &deploy {
            log::debug!("{name} deploys through {}", hook.describe());
        }
        contracts.push(SmartContract {
            path: import_contract(&folder)?,
            name,
            deploy,
        });
    }
    Ok(contracts)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Override that records how often it ran.
    #[derive(Default)]
    pub(crate) struct RecordingHook {
        pub calls: Mutex<u32>,
    }

    #[async_trait]
    impl DeployHook for RecordingHook {
        fn describe(&self) -> String {
            "recording hook".to_owned()
        }

        async fn deploy(&self) -> Result<()> {
            *self.calls.lock().unwrap() += 1;
            Ok(())
        }
    }

    /// Gives every folder named in `with_override` the same hook.
    pub(crate) struct StaticOverrides {
        pub with_override: Vec<&'static str>,
        pub hook: Arc<RecordingHook>,
    }

    #[async_trait]
    impl OverrideResolver for StaticOverrides {
        async fn resolve(&self, folder: &Path) -> Option<Arc<dyn DeployHook>> {
            let name = folder.file_name()?.to_str()?;
            if self.with_override.iter().any(|n| *n == name) {
                Some(self.hook.clone() as Arc<dyn DeployHook>)
            } else {
                None
            }
        }
    }

    pub(crate) fn project(root: &Path, folders: &[&str]) {
        for folder in folders {
            let dir = root.join(folder);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join(CONTRACT_FILE), "").unwrap();
        }
    }

    #[tokio::test]
    async fn skips_underscored_and_contractless_folders() {
        let root = tempfile::tempdir().unwrap();
        project(root.path(), &["hello", "_private", "counter"]);
        fs::create_dir_all(root.path().join("artifacts/hello")).unwrap();
        fs::write(root.path().join("README.md"), "").unwrap();

        let contracts = discover(root.path(), &NoOverrides).await.unwrap();
        let names: Vec<_> = contracts.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["counter", "hello"]);
        assert_eq!(contracts[1].path, root.path().join("hello").join(CONTRACT_FILE));
        assert!(contracts.iter().all(|c| c.deploy.is_none()));
    }

    #[tokio::test]
    async fn attaches_resolved_overrides() {
        let root = tempfile::tempdir().unwrap();
        project(root.path(), &["hello", "counter"]);
        let overrides = StaticOverrides {
            with_override: vec!["hello"],
            hook: Arc::default(),
        };

        let contracts = discover(root.path(), &overrides).await.unwrap();
        assert!(contracts[0].deploy.is_none());
        assert_eq!(
            contracts[1].deploy.as_ref().map(|d| d.describe()).as_deref(),
            Some("recording hook")
        );
    }

    #[test]
    fn import_contract_requires_the_file() {
        let root = tempfile::tempdir().unwrap();
        assert!(matches!(import_contract(root.path()), Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn missing_root_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        assert!(discover(&root.path().join("nope"), &NoOverrides).await.is_err());
    }
}
