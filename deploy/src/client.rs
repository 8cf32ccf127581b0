//! Deployment through the typed client generated by `algokit generate client`.
//!
//! The generated client is foreign code. It is reached through [`ClientLoader`]
//! and [`ClientModule`], and the rules for choosing a class, constructing it and
//! picking the deploy method live here.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;

use crate::{
    error::{Error, Result},
    utils::files_with_suffix,
};

/// Generated client file name endings, in lookup order.
pub const CLIENT_FILE_SUFFIXES: [&str; 2] = ["_client.py", "Client.py"];

pub const CLIENT_CLASS_SUFFIX: &str = "Client";

/// No-argument factory tried when the constructor needs arguments.
pub const FALLBACK_FACTORY: &str = "from_env";

/// Instance methods that deploy the app, in order of preference.
pub const DEPLOY_METHODS: [&str; 2] = ["deploy", "create"];

/// A class found in a loaded client module.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClassInfo {
    pub name: String,
    /// Module the class was defined in.
    pub module: String,
    /// Class-level no-argument factories the class exposes.
    #[serde(default)]
    pub factories: Vec<String>,
}

impl ClassInfo {
    pub fn has_factory(&self, factory: &str) -> bool {
        self.factories.iter().any(|f| f == factory)
    }
}

/// A constructed client object living inside a [`ClientModule`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub id: u64,
    /// Which of [`DEPLOY_METHODS`] the object has.
    pub methods: Vec<String>,
}

#[derive(Debug)]
pub enum ConstructError {
    /// The constructor or factory rejected the call signature.
    Arity(String),
    Other(Error),
}

impl From<Error> for ConstructError {
    fn from(err: Error) -> Self {
        ConstructError::Other(err)
    }
}

#[async_trait]
pub trait ClientModule: Send {
    /// Name the module was loaded under.
    fn name(&self) -> &str;

    async fn classes(&mut self) -> Result<Vec<ClassInfo>>;

    /// Builds an instance of `class`, through `factory` when given, otherwise
    /// through its no-argument constructor.
    async fn construct(
        &mut self,
        class: &str,
        factory: Option<&str>,
    ) -> Result<Instance, ConstructError>;

    async fn call(&mut self, instance: &Instance, method: &str) -> Result<()>;
}

#[async_trait]
pub trait ClientLoader: Send + Sync {
    /// Loads the client source at `path` as an isolated module named
    /// `module_name`.
    async fn load(&self, path: &Path, module_name: &str) -> Result<Box<dyn ClientModule>>;
}

/// First generated client in `artifact_dir`.
pub fn find_client_file(artifact_dir: &Path) -> Result<PathBuf> {
    for suffix in CLIENT_FILE_SUFFIXES {
        if let Some(path) = files_with_suffix(artifact_dir, suffix)?.into_iter().next() {
            return Ok(path);
        }
    }
    Err(Error::NotFound(format!(
        "No generated client found in {}. Did build succeed?",
        artifact_dir.display()
    )))
}

pub fn client_module_name(contract_name: &str) -> String {
    format!("artifact_{contract_name}_client")
}

/// The client class defined in `module_name` itself, ignoring classes the
/// module merely imports. Several candidates resolve to the first by name.
pub fn select_client_class<'a>(classes: &'a [ClassInfo], module_name: &str) -> Option<&'a ClassInfo> {
    let mut candidates: Vec<_> = classes
        .iter()
        .filter(|c| c.module == module_name && c.name.ends_with(CLIENT_CLASS_SUFFIX))
        .collect();
    candidates.sort_by(|a, b| a.name.cmp(&b.name));
    if candidates.len() > 1 {
        log::warn!(
            "several client classes in {module_name}; using {}",
            candidates[0].name
        );
    }
    candidates.into_iter().next()
}

async fn instantiate(module: &mut dyn ClientModule, class: &ClassInfo) -> Result<Instance> {
    match module.construct(&class.name, None).await {
        Ok(instance) => Ok(instance),
        Err(ConstructError::Arity(message)) if class.has_factory(FALLBACK_FACTORY) => {
            log::debug!(
                "{}() needs arguments ({message}); using {}.{FALLBACK_FACTORY}()",
                class.name,
                class.name
            );
            module
                .construct(&class.name, Some(FALLBACK_FACTORY))
                .await
                .map_err(|err| match err {
                    ConstructError::Arity(message) => Error::Deploy(message),
                    ConstructError::Other(err) => err,
                })
        }
        Err(ConstructError::Arity(message)) => Err(Error::Deploy(format!(
            "Could not construct {}: {message}",
            class.name
        ))),
        Err(ConstructError::Other(err)) => Err(err),
    }
}

/// Loads the generated client for `contract_name` and deploys through it.
pub async fn default_deploy(
    loader: &dyn ClientLoader,
    artifact_dir: &Path,
    contract_name: &str,
) -> Result<()> {
    let client_path = find_client_file(artifact_dir)?;
    let module_name = client_module_name(contract_name);
    let mut module = loader.load(&client_path, &module_name).await?;

    let classes = module.classes().await?;
    let class = select_client_class(&classes, module.name()).ok_or_else(|| {
        Error::NotFound(format!("No client class found in {}", client_path.display()))
    })?;

    let instance = instantiate(module.as_mut(), class).await?;

    let method = DEPLOY_METHODS
        .into_iter()
        .find(|m| instance.methods.iter().any(|have| have == m))
        .ok_or_else(|| {
            Error::Deploy(
                "Typed client has neither .deploy() nor .create(). Provide a deploy_config.py."
                    .to_owned(),
            )
        })?;

    log::info!("Deploying {contract_name} via typed client .{method}()");
    module.call(&instance, method).await
}
