use anyhow::{bail, Context};
use std::path::PathBuf;

/// Environment variable to override the path to the `kubectl` binary.
pub const KUBECTL_PATH_ENV: &str = "LOGBENCH_KUBECTL_PATH";

/// Environment variable to override the path to the `docker` binary.
pub const DOCKER_PATH_ENV: &str = "LOGBENCH_DOCKER_PATH";

/// Get the path to a binary the deployers shell out to.
///
/// If `env_var` is set, its value is used as the path to the binary. If it is not set, or is set
/// to the bare binary name, the binary is looked up in the user's `PATH`.
pub fn binary_path(binary: &str, env_var: &str) -> anyhow::Result<PathBuf> {
    resolve_binary_path(binary, env_var, std::env::var(env_var).ok().as_deref())
}

fn resolve_binary_path(
    binary: &str,
    env_var: &str,
    configured: Option<&str>,
) -> anyhow::Result<PathBuf> {
    match configured {
        Some("") => {
            bail!("'{env_var}' set to empty string");
        }
        Some(name) if name == binary => lookup(binary, env_var),
        None => lookup(binary, env_var),
        Some(path) => {
            let path = PathBuf::from(path);
            if !path.exists() {
                bail!(
                    "Path to {binary} overwritten with '{env_var}={path}' but that path doesn't exist",
                    path = path.display()
                );
            }
            Ok(path)
        }
    }
}

fn lookup(binary: &str, env_var: &str) -> anyhow::Result<PathBuf> {
    log::debug!("'{env_var}' is not a path so looking for {binary} in user's 'PATH'");
    which::which(binary).with_context(|| {
        format!("{binary} not found in PATH. Please install it or set '{env_var}' to the correct path.")
    })
}
