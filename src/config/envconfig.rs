use std::path::Path;

use ::config as config_rs;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

/// Environment-backed settings: `{PREFIX}_SECTION__KEY=value`, after `.env` is loaded.
pub trait EnvConfig: Sized + DeserializeOwned {
    const PREFIX: &'static str = "APP";
    const SEPARATOR: &'static str = "__";

    fn validate(&self) -> Result<()> {
        Ok(())
    }

    fn from_env() -> Result<Self> {
        let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        match dotenvy::from_filename(&manifest_env).or_else(|_| dotenvy::dotenv()) {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
            Err(err) if err.not_found() => {}
            Err(err) => return Err(err).context("failed to parse .env"),
        }
        Self::from_source(environment::<Self>())
    }

    /// Same as `from_env`, over an explicit variable map instead of the process env.
    fn from_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: config_rs::Map<String, String> = vars
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        Self::from_source(environment::<Self>().source(Some(vars)))
    }

    fn from_source(source: config_rs::Environment) -> Result<Self> {
        let cfg = config_rs::Config::builder()
            .add_source(source)
            .build()
            .context("failed to read config variables")?
            .try_deserialize::<Self>()
            .context("failed to deserialize config")?;
        cfg.validate()?;
        Ok(cfg)
    }
}

fn environment<C: EnvConfig>() -> config_rs::Environment {
    config_rs::Environment::with_prefix(C::PREFIX)
        .prefix_separator("_")
        .separator(C::SEPARATOR)
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::EnvConfig;
    use crate::config::AppConfig;

    #[test]
    fn nested_keys_map_onto_sections() {
        let cfg = AppConfig::from_vars([
            ("APP_DATABASE__URL", "sqlite::memory:"),
            ("APP_AUTH__JWT_SECRET", "from-env-secret"),
            ("APP_AUTH__ACCESS_TTL_MINUTES", "5"),
            ("APP_CACHE__TIMEOUT_MS", "250"),
            ("APP_GENERAL__PORT", "9100"),
        ])
        .expect("config should load");

        assert_eq!(cfg.general.port, 9100);
        assert_eq!(cfg.cache.timeout_ms, 250);
        let auth = cfg.auth.expect("auth section should be present");
        assert_eq!(auth.jwt_secret, "from-env-secret");
        assert_eq!(auth.access_ttl_minutes, 5);
        assert_eq!(auth.jwt_algorithm, "HS256");
        assert_eq!(
            cfg.database.expect("database section").url,
            "sqlite::memory:"
        );
    }

    #[test]
    fn validation_runs_after_loading() {
        let err = AppConfig::from_vars([
            ("APP_AUTH__JWT_SECRET", "secret"),
            ("APP_AUTH__JWT_ALGORITHM", "none"),
        ])
        .expect_err("bad algorithm should be rejected");

        assert!(format!("{err:#}").contains("auth.jwt_algorithm"), "{err:#}");
    }
}
