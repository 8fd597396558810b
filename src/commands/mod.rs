//! Command implementations
//!
//! - `apply` - Make the cluster match the manifest
//! - `diff` - Preview what apply would change
//! - `status` - Declared buckets next to their observed state
//! - `list` - Every bucket on the cluster
//! - `validate` - Manifest check, no network

pub mod apply;
pub mod diff;
pub mod list;
pub mod status;
pub mod validate;

use anyhow::{Context as AnyhowContext, Result};
use cbadmin::{Client, ConnectionConfig};
use std::path::Path;

use crate::Context;
use crate::cli::ConnectionArgs;
use crate::paths;
use crate::schema::Manifest;

/// Load the manifest selected by `--manifest` or the default location
pub fn load_manifest(ctx: &Context) -> Result<Manifest> {
    let path = paths::manifest_path(ctx.manifest.as_deref())?;
    log::debug!("Loading manifest from {}", path.display());
    Manifest::load(&path)
}

/// Build the connection config: defaults file first, then flags and env
pub fn resolve_connection(args: &ConnectionArgs) -> Result<ConnectionConfig> {
    let defaults_file = paths::expand(&args.defaults_file);
    let mut config = ConnectionConfig::load(Path::new(&defaults_file))
        .with_context(|| format!("Could not read {}", defaults_file.display()))?;

    if let Some(host) = &args.host {
        config = config.with_host(host.clone());
    }
    if let Some(port) = args.port {
        config = config.with_port(port);
    }
    if let Some(username) = &args.username {
        config = config.with_username(username.clone());
    }
    if let Some(password) = &args.password {
        config = config.with_password(password.clone());
    }

    log::debug!(
        "Connecting to {} ({})",
        config.base_url(),
        if config.credentials().is_some() {
            "authenticated"
        } else {
            "anonymous"
        }
    );
    Ok(config)
}

/// Create a client for the cluster selected by the connection flags
pub fn connect(ctx: &Context) -> Result<Client> {
    let config = resolve_connection(&ctx.connection)?;
    Ok(Client::new(&config))
}

/// What to check when `err` came from the cluster or the defaults file
pub fn hint(err: &anyhow::Error) -> Option<&'static str> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<cbadmin::Error>())
        .map(|e| e.category().advice())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbadmin::ErrorCategory;

    fn args(defaults_file: &Path) -> ConnectionArgs {
        ConnectionArgs {
            defaults_file: defaults_file.display().to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_defaults_file_uses_builtin_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = resolve_connection(&args(&dir.path().join("absent.cnf"))).unwrap();
        assert_eq!(config.base_url(), "http://127.0.0.1:8091");
        assert!(config.credentials().is_none());
    }

    #[test]
    fn test_defaults_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".cb.cnf");
        std::fs::write(
            &path,
            "CB_REST_HOST=10.1.2.3\nCB_REST_PORT=18091\nCB_REST_USERNAME=Administrator\nCB_REST_PASSWORD=pa=ss\n",
        )
        .unwrap();

        let config = resolve_connection(&args(&path)).unwrap();
        assert_eq!(config.base_url(), "http://10.1.2.3:18091");
        assert_eq!(config.credentials(), Some(("Administrator", "pa=ss")));
    }

    #[test]
    fn test_flags_override_defaults_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".cb.cnf");
        std::fs::write(&path, "CB_REST_HOST=10.1.2.3\nCB_REST_USERNAME=file-user\n").unwrap();

        let mut args = args(&path);
        args.host = Some("cb.internal".into());
        args.username = Some("flag-user".into());
        args.password = Some("secret".into());

        let config = resolve_connection(&args).unwrap();
        assert_eq!(config.base_url(), "http://cb.internal:8091");
        assert_eq!(config.credentials(), Some(("flag-user", "secret")));
    }

    #[test]
    fn test_hint_follows_cluster_errors() {
        let refused = cbadmin::Error::request_failed("GET", "/pools/default/buckets", None, "refused");
        let err = anyhow::Error::new(refused).context("Could not list buckets");
        assert_eq!(hint(&err), Some(ErrorCategory::Transport.advice()));

        let rejected = cbadmin::Error::request_failed("POST", "/pools/default/buckets", Some(401), "");
        let err = anyhow::Error::new(rejected).context("Could not list buckets");
        assert_eq!(hint(&err), Some(ErrorCategory::Rejected.advice()));

        assert_eq!(hint(&anyhow::anyhow!("2 of 3 buckets failed")), None);
    }
}
