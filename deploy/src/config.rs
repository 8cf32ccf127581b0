use std::path::{Path, PathBuf};

use clap::ValueEnum;

/// Language of the typed client emitted by `algokit generate client`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ClientLanguage {
    #[default]
    Python,
    Typescript,
}

impl ClientLanguage {
    /// Client file name for the app called `app_name`: `hello_world_client.py`
    /// or `HelloWorldClient.ts` for `HelloWorld`.
    pub fn output_file_name(self, app_name: &str) -> String {
        match self {
            ClientLanguage::Python => format!("{}_client.py", snake_case(app_name)),
            ClientLanguage::Typescript => format!("{app_name}Client.ts"),
        }
    }
}

fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev: Option<char> = None;
    for c in name.chars() {
        if !c.is_alphanumeric() {
            out.push('_');
        } else {
            if c.is_uppercase() && prev.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit()) {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        }
        prev = Some(c);
    }
    out
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory whose subfolders are contract projects.
    pub root: PathBuf,
    pub artifacts: PathBuf,
    /// AlgoKit command line, e.g. `algokit` or `poetry run algokit`.
    pub algokit: String,
    pub python: PathBuf,
    pub client_language: ClientLanguage,
}

impl Config {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            artifacts: root.join("artifacts"),
            root,
            algokit: "algokit".to_owned(),
            python: PathBuf::from("python"),
            client_language: ClientLanguage::default(),
        }
    }

    pub fn artifact_dir(&self, contract_name: &str) -> PathBuf {
        self.artifacts.join(contract_name)
    }
}

/// Loads `.env` from the working directory (or its ancestors) into the process
/// environment. A missing file is not an error.
pub fn load_env() -> Option<PathBuf> {
    match dotenvy::dotenv() {
        Ok(path) => {
            log::info!("Loaded environment from {}", path.display());
            Some(path)
        }
        Err(err) if err.not_found() => {
            log::debug!("no .env file found");
            None
        }
        Err(err) => {
            log::warn!("ignoring unreadable .env file: {err}");
            None
        }
    }
}

/// Loads a specific env file. Used when the location is known up front.
pub fn load_env_file(path: &Path) -> bool {
    match dotenvy::from_path(path) {
        Ok(()) => true,
        Err(err) => {
            log::debug!("skipping env file {}: {err}", path.display());
            false
        }
    }
}
