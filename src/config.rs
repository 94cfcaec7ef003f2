use std::{env, path::PathBuf, time::Duration};

/// GitHub Pages project path the site is published under.
const DEFAULT_PROD_BASE_PATH: &str = "/mo-roy.github.io";

/// Environment: dev or prod
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Prod,
}

impl Environment {
    fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "prod" | "production" => Self::Prod,
            _ => Self::Dev,
        }
    }
}

/// Settings read once at start-up.
#[derive(Clone, Debug)]
pub struct SiteConfig {
    pub environment: Environment,
    pub bind_address: String,
    pub port: u16,
    /// Holds `images/`, `videos/`, `generated/` and `root/`.
    pub static_dir: PathBuf,
    /// Normalized route prefix; empty when served from `/`.
    pub base_path: String,
    pub cache_enabled: bool,
    pub trust_proxy: bool,
    pub log_file: PathBuf,
    pub log_flush_interval: Duration,
}

impl SiteConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let environment = lookup("PORTFOLIO_ENV")
            .or_else(|| lookup("RUST_ENV"))
            .map(|v| Environment::parse(&v))
            .unwrap_or(Environment::Dev);

        let base_path = match lookup("PORTFOLIO_BASE_PATH") {
            Some(raw) => normalize_base_path(&raw),
            None if environment == Environment::Prod => DEFAULT_PROD_BASE_PATH.to_string(),
            None => String::new(),
        };

        Self {
            environment,
            bind_address: lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: lookup("PORT").and_then(|p| p.parse().ok()).unwrap_or(3000),
            static_dir: lookup("PORTFOLIO_STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("static")),
            base_path,
            cache_enabled: lookup("CACHE_ENABLED").is_some_and(|v| is_truthy(&v)),
            trust_proxy: lookup("TRUST_PROXY").is_some_and(|v| is_truthy(&v)),
            log_file: lookup("LOG_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("logs/access.log")),
            log_flush_interval: Duration::from_secs(
                lookup("LOG_FLUSH_INTERVAL")
                    .and_then(|s| s.parse().ok())
                    // tokio intervals must be non-zero
                    .filter(|&secs: &u64| secs > 0)
                    .unwrap_or(5),
            ),
        }
    }

    pub fn generated_index_path(&self) -> PathBuf {
        self.static_dir.join("generated").join("portfolio-items.json")
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "True" | "on" | "ON" | "yes")
}

/// `"/foo/"` -> `"/foo"`, `"foo"` -> `"/foo"`, `"/"` or blank -> `""`.
pub fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> SiteConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SiteConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_to_dev_at_root() {
        let cfg = config(&[]);
        assert_eq!(cfg.environment, Environment::Dev);
        assert_eq!(cfg.base_path, "");
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.bind_address, "0.0.0.0");
        assert_eq!(cfg.static_dir, PathBuf::from("static"));
        assert!(!cfg.cache_enabled);
        assert!(!cfg.trust_proxy);
        assert_eq!(cfg.log_flush_interval, Duration::from_secs(5));
        assert_eq!(
            cfg.generated_index_path(),
            PathBuf::from("static/generated/portfolio-items.json")
        );
    }

    #[test]
    fn prod_uses_published_base_path() {
        let cfg = config(&[("RUST_ENV", "Production")]);
        assert_eq!(cfg.environment, Environment::Prod);
        assert_eq!(cfg.base_path, "/mo-roy.github.io");
    }

    #[test]
    fn explicit_base_path_wins() {
        let cfg = config(&[("PORTFOLIO_ENV", "prod"), ("PORTFOLIO_BASE_PATH", "/")]);
        assert_eq!(cfg.base_path, "");
        let cfg = config(&[("PORTFOLIO_BASE_PATH", "gallery/")]);
        assert_eq!(cfg.base_path, "/gallery");
    }

    #[test]
    fn portfolio_env_takes_priority_over_rust_env() {
        let cfg = config(&[("PORTFOLIO_ENV", "dev"), ("RUST_ENV", "prod")]);
        assert_eq!(cfg.environment, Environment::Dev);
    }

    #[test]
    fn bad_numbers_fall_back() {
        let cfg = config(&[("PORT", "http"), ("LOG_FLUSH_INTERVAL", "-1")]);
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.log_flush_interval, Duration::from_secs(5));
        let cfg = config(&[("LOG_FLUSH_INTERVAL", "0")]);
        assert_eq!(cfg.log_flush_interval, Duration::from_secs(5));
        let cfg = config(&[("LOG_FLUSH_INTERVAL", "2")]);
        assert_eq!(cfg.log_flush_interval, Duration::from_secs(2));
    }

    #[test]
    fn flags_accept_common_spellings() {
        let cfg = config(&[("CACHE_ENABLED", "ON"), ("TRUST_PROXY", "true")]);
        assert!(cfg.cache_enabled);
        assert!(cfg.trust_proxy);
        let cfg = config(&[("CACHE_ENABLED", "nope")]);
        assert!(!cfg.cache_enabled);
    }

    #[test]
    fn normalizes_base_paths() {
        assert_eq!(normalize_base_path("  "), "");
        assert_eq!(normalize_base_path("//"), "");
        assert_eq!(normalize_base_path("/mo-roy.github.io/"), "/mo-roy.github.io");
        assert_eq!(normalize_base_path("a/b"), "/a/b");
    }
}
