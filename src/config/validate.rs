use anyhow::{Result, bail};

use super::{AppConfig, OAuthClientConfig};
use crate::auth::jwt::parse_algorithm;

pub fn validate(cfg: &AppConfig) -> Result<()> {
    let mut errors: Vec<String> = Vec::new();

    if cfg.general.host.trim().is_empty() {
        errors.push("general.host must not be empty".to_string());
    }

    if let Some(database) = cfg.database.as_ref() {
        if database.url.trim().is_empty() {
            errors.push("database.url must not be empty".to_string());
        }

        if database.min_idle > database.max_connections {
            errors.push(format!(
                "database.min_idle ({}) must be <= database.max_connections ({})",
                database.min_idle, database.max_connections
            ));
        }

        if database.timeout_ms == 0 {
            errors.push("database.timeout_ms must be > 0".to_string());
        }
    }

    if let Some(auth) = cfg.auth.as_ref() {
        if auth.jwt_secret.trim().is_empty() {
            errors.push("auth.jwt_secret must not be empty".to_string());
        }

        if parse_algorithm(&auth.jwt_algorithm).is_none() {
            errors.push(format!(
                "auth.jwt_algorithm '{}' is not supported (expected HS256, HS384 or HS512)",
                auth.jwt_algorithm
            ));
        }

        if auth.access_ttl_minutes <= 0 {
            errors.push("auth.access_ttl_minutes must be > 0".to_string());
        }

        if auth.refresh_ttl_multiplier <= 0 {
            errors.push("auth.refresh_ttl_multiplier must be > 0".to_string());
        }

        match (&auth.superuser_login, &auth.superuser_password) {
            (Some(_), None) | (None, Some(_)) => {
                errors.push("auth.superuser_login and _password must be set together".to_string())
            }
            (Some(_), Some(password)) if password.chars().count() < 8 => {
                errors.push("auth.superuser_password must be at least 8 characters".to_string())
            }
            _ => {}
        }
    }

    if cfg.cache.timeout_ms == 0 {
        errors.push("cache.timeout_ms must be > 0".to_string());
    }

    if cfg.oauth.http_timeout_ms == 0 {
        errors.push("oauth.http_timeout_ms must be > 0".to_string());
    }

    for (name, client) in [("yandex", &cfg.oauth.yandex), ("google", &cfg.oauth.google)] {
        if let Some(client) = client {
            validate_oauth_client(name, client, &mut errors);
        }
    }

    if errors.is_empty() {
        return Ok(());
    }

    bail!("invalid app config:\n- {}", errors.join("\n- "))
}

fn validate_oauth_client(name: &str, client: &OAuthClientConfig, errors: &mut Vec<String>) {
    let fields = [
        ("client_id", &client.client_id),
        ("client_secret", &client.client_secret),
        ("authorize_url", &client.authorize_url),
        ("token_url", &client.token_url),
        ("userinfo_url", &client.userinfo_url),
        ("redirect_uri", &client.redirect_uri),
    ];
    for (field, value) in fields {
        if value.trim().is_empty() {
            errors.push(format!("oauth.{name}.{field} must not be empty"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::validate;
    use crate::config::{AppConfig, AuthConfig, DatabaseConfig};

    #[test]
    fn default_config_is_valid() {
        validate(&AppConfig::default()).expect("defaults should validate");
    }

    #[test]
    fn collects_every_error_at_once() {
        let mut cfg = AppConfig::default();
        let mut database = DatabaseConfig::new("");
        database.min_idle = 50;
        cfg.database = Some(database);
        let mut auth = AuthConfig::new(" ");
        auth.jwt_algorithm = "RS256".to_string();
        cfg.auth = Some(auth);

        let err = validate(&cfg)
            .expect_err("config should be rejected")
            .to_string();

        assert!(err.contains("database.url must not be empty"), "{err}");
        assert!(err.contains("database.min_idle"), "{err}");
        assert!(err.contains("auth.jwt_secret must not be empty"), "{err}");
        assert!(err.contains("auth.jwt_algorithm 'RS256'"), "{err}");
    }

    #[test]
    fn superuser_credentials_must_come_in_pairs() {
        let mut cfg = AppConfig::default();
        let mut auth = AuthConfig::new("secret");
        auth.superuser_login = Some("root".to_string());
        cfg.auth = Some(auth);

        let err = validate(&cfg)
            .expect_err("config should be rejected")
            .to_string();

        assert!(err.contains("must be set together"), "{err}");
    }
}
