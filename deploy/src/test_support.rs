use std::{fs, path::Path};

use crate::build::Toolchain;

/// Compiles to a `Hello.arc56.json` app spec and generates `hello_client.py`.
pub(crate) const COMPILES_AND_GENERATES: &str = r##"
if [ "$1" = "generate" ]; then
    echo "# client for $3" > "$5"
    exit 0
fi
for arg in "$@"; do
    case "$arg" in --out-dir=*) dir="${arg#--out-dir=}" ;; esac
done
echo '{"name": "Hello"}' > "$dir/Hello.arc56.json"
echo compiled
"##;

/// An `algokit` stand-in: `script` run by `sh` with AlgoKit's arguments.
pub(crate) fn fake_algokit(dir: &Path, script: &str) -> Toolchain {
    let path = dir.join("algokit.sh");
    fs::write(&path, script).unwrap();
    Toolchain::from_command_line(&format!("sh {}", path.display()))
}
