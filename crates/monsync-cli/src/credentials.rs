//! Credential resolution from the environment
//!
//! Each instance names the environment variables holding its username and
//! password. Values are read when the instance is connected, never stored.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use monsync_core::config::InstanceConfig;
use monsync_core::ports::Credentials;
use monsync_opensearch::provider::CredentialResolver;

pub fn env_resolver() -> CredentialResolver {
    Arc::new(from_env)
}

fn from_env(instance: &InstanceConfig) -> Result<Option<Credentials>> {
    from_lookup(instance, |name| std::env::var(name).ok())
}

fn from_lookup<F>(instance: &InstanceConfig, lookup: F) -> Result<Option<Credentials>>
where
    F: Fn(&str) -> Option<String>,
{
    match (&instance.env_username, &instance.env_password) {
        (None, None) => Ok(None),
        (Some(user_var), Some(pass_var)) => {
            let read = |var: &str| {
                lookup(var)
                    .filter(|v| !v.is_empty())
                    .with_context(|| format!("environment variable {var} is not set"))
            };
            Ok(Some(Credentials {
                username: read(user_var)?,
                password: read(pass_var)?,
            }))
        }
        _ => bail!(
            "instance '{}' must set both env_username and env_password",
            instance.name
        ),
    }
}
