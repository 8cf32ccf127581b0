//! Plumbing for the Python side of a project: the generated typed clients and
//! the optional `deploy_config.py` overrides.

use std::{
    path::{Path, PathBuf},
    process::Stdio,
    sync::Arc,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines},
    process::{Child, ChildStdin, ChildStdout, Command},
};

use crate::{
    client::{ClassInfo, ClientLoader, ClientModule, ConstructError, Instance},
    contracts::{DeployHook, OverrideResolver, DEPLOY_CONFIG_MODULE},
    error::{Error, Result},
    utils::{program_name, run_captured, run_inherited},
};

const CLIENT_HOST: &str = include_str!("client_host.py");

const FIND_OVERRIDE: &str =
    "import importlib, sys; assert callable(importlib.import_module(sys.argv[1]).deploy)";

const RUN_OVERRIDE: &str = "import importlib, sys; importlib.import_module(sys.argv[1]).deploy()";

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Request<'a> {
    Load {
        path: &'a Path,
        module: &'a str,
    },
    Classes,
    Construct {
        class: &'a str,
        factory: Option<&'a str>,
    },
    Call {
        instance: u64,
        method: &'a str,
    },
}

impl Request<'_> {
    fn describe(&self) -> String {
        match self {
            Request::Load { module, .. } => format!("loading {module}"),
            Request::Classes => "listing classes".to_owned(),
            Request::Construct {
                class,
                factory: Some(factory),
            } => format!("{class}.{factory}()"),
            Request::Construct { class, .. } => format!("{class}()"),
            Request::Call { method, .. } => format!(".{method}()"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct Reply {
    ok: bool,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    classes: Vec<ClassInfo>,
    #[serde(default)]
    instance: Option<u64>,
    #[serde(default)]
    methods: Vec<String>,
}

impl Reply {
    fn into_result(self) -> Result<Self, (String, String)> {
        if self.ok {
            return Ok(self);
        }
        Err((
            self.kind.unwrap_or_else(|| "error".to_owned()),
            self.message.unwrap_or_default(),
        ))
    }
}

/// Loads generated clients into a long-lived Python host process and drives
/// them over a JSON-lines protocol on its stdin/stdout.
#[derive(Debug, Clone)]
pub struct PythonClientLoader {
    python: PathBuf,
}

impl PythonClientLoader {
    pub fn new(python: impl Into<PathBuf>) -> Self {
        Self {
            python: python.into(),
        }
    }
}

#[async_trait]
impl ClientLoader for PythonClientLoader {
    async fn load(&self, path: &Path, module_name: &str) -> Result<Box<dyn ClientModule>> {
        let mut command = Command::new(&self.python);
        command
            .args(["-c", CLIENT_HOST])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let program = program_name(&command);
        let mut child = command
            .spawn()
            .map_err(|source| Error::Spawn { program, source })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Protocol("host stdin unavailable".to_owned()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Protocol("host stdout unavailable".to_owned()))?;

        let mut module = PythonClientModule {
            name: module_name.to_owned(),
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
        };

        let path = path.canonicalize()?;
        module
            .request(&Request::Load {
                path: &path,
                module: module_name,
            })
            .await?
            .into_result()
            .map_err(|(_, message)| {
                Error::Deploy(format!(
                    "Unable to load client module from {}: {message}",
                    path.display()
                ))
            })?;
        Ok(Box::new(module))
    }
}

struct PythonClientModule {
    name: String,
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

impl PythonClientModule {
    async fn request(&mut self, request: &Request<'_>) -> Result<Reply> {
        let mut line = serde_json::to_vec(request)?;
        line.push(b'\n');
        self.stdin.write_all(&line).await?;
        self.stdin.flush().await?;

        let Some(reply) = self.stdout.next_line().await? else {
            let status = self.child.wait().await?;
            return Err(Error::Deploy(format!(
                "client host exited ({status}) during {}",
                request.describe()
            )));
        };
        serde_json::from_str(&reply).map_err(|err| Error::Protocol(format!("{err}: {reply}")))
    }
}

#[async_trait]
impl ClientModule for PythonClientModule {
    fn name(&self) -> &str {
        &self.name
    }

    async fn classes(&mut self) -> Result<Vec<ClassInfo>> {
        let reply = self
            .request(&Request::Classes)
            .await?
            .into_result()
            .map_err(|(_, message)| Error::Deploy(message))?;
        Ok(reply.classes)
    }

    async fn construct(
        &mut self,
        class: &str,
        factory: Option<&str>,
    ) -> Result<Instance, ConstructError> {
        let reply = self
            .request(&Request::Construct { class, factory })
            .await?
            .into_result()
            .map_err(construct_failure)?;
        let id = reply
            .instance
            .ok_or_else(|| Error::Protocol("construct reply without instance".to_owned()))?;
        Ok(Instance {
            id,
            methods: reply.methods,
        })
    }

    async fn call(&mut self, instance: &Instance, method: &str) -> Result<()> {
        self.request(&Request::Call {
            instance: instance.id,
            method,
        })
        .await?
        .into_result()
        .map_err(|(_, message)| Error::Deploy(format!(".{method}() failed: {message}")))?;
        Ok(())
    }
}

fn construct_failure((kind, message): (String, String)) -> ConstructError {
    if kind == "type_error" {
        ConstructError::Arity(message)
    } else {
        ConstructError::Other(Error::Deploy(message))
    }
}

/// Finds `deploy_config.deploy` for a contract folder by asking the
/// interpreter to import it, with the root's parent as working directory so
/// the root is importable as a package.
#[derive(Debug, Clone)]
pub struct PythonOverrides {
    python: PathBuf,
}

impl PythonOverrides {
    pub fn new(python: impl Into<PathBuf>) -> Self {
        Self {
            python: python.into(),
        }
    }

    fn module_for(folder: &Path) -> Option<(String, PathBuf)> {
        let folder = folder.canonicalize().ok()?;
        let root = folder.parent()?;
        let module = format!(
            "{}.{}.{DEPLOY_CONFIG_MODULE}",
            root.file_name()?.to_str()?,
            folder.file_name()?.to_str()?
        );
        Some((module, root.parent()?.to_path_buf()))
    }
}

#[async_trait]
impl OverrideResolver for PythonOverrides {
    async fn resolve(&self, folder: &Path) -> Option<Arc<dyn DeployHook>> {
        if !folder.join(format!("{DEPLOY_CONFIG_MODULE}.py")).is_file() {
            return None;
        }
        let (module, cwd) = Self::module_for(folder)?;

        let mut check = Command::new(&self.python);
        check.args(["-c", FIND_OVERRIDE, module.as_str()]).current_dir(&cwd);
        match run_captured(&mut check).await {
            Ok(output) if output.success => {
                let hook: Arc<dyn DeployHook> = Arc::new(PythonDeployHook {
                    python: self.python.clone(),
                    module,
                    cwd,
                });
                Some(hook)
            }
            Ok(output) => {
                log::debug!("no usable deploy override in {module}: {}", output.text.trim());
                None
            }
            Err(err) => {
                log::debug!("could not inspect {module}: {err}");
                None
            }
        }
    }
}

/// Calls `deploy()` from a project's `deploy_config` module.
#[derive(Debug, Clone)]
pub struct PythonDeployHook {
    python: PathBuf,
    module: String,
    cwd: PathBuf,
}

#[async_trait]
impl DeployHook for PythonDeployHook {
    fn describe(&self) -> String {
        format!("{}.deploy", self.module)
    }

    async fn deploy(&self) -> Result<()> {
        let mut command = Command::new(&self.python);
        command
            .args(["-c", RUN_OVERRIDE, self.module.as_str()])
            .current_dir(&self.cwd)
            .stdin(Stdio::null());
        if run_inherited(&mut command).await? {
            Ok(())
        } else {
            Err(Error::Deploy(format!("{} failed", self.describe())))
        }
    }
}
