use serde::Serialize;

use crate::config::Config;
use crate::error::{AppError, Result};

/// One probe target. Identity for probing and storage is `(host, port)`;
/// `id` and `user` are display metadata and never reach the sample store.
#[derive(Debug, Clone, Serialize)]
pub struct Target {
    pub id: u32,
    pub user: String,
    pub host: String,
    pub port: u16,
}

/// Immutable, ordered target list. Built once at startup from configuration
/// and passed explicitly to the orchestrator, scheduler, and API.
#[derive(Debug)]
pub struct Registry {
    targets: Vec<Target>,
}

impl Registry {
    /// Builds the registry: one target per port in the configured range
    /// (IDs sequential from `start_id`, user labels positional from `users`),
    /// followed by static targets with the next IDs.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let mut targets = Vec::new();

        for (idx, port) in (cfg.start_port..=cfg.end_port).enumerate() {
            let user = cfg
                .users
                .get(idx)
                .cloned()
                .unwrap_or_else(|| "-".to_string());
            targets.push(Target {
                id: cfg.start_id + idx as u32,
                user,
                host: cfg.target_host.clone(),
                port,
            });
        }

        let next_id = cfg.start_id + (cfg.end_port - cfg.start_port) as u32 + 1;
        for (i, st) in parse_static_targets(&cfg.static_targets)?.into_iter().enumerate() {
            targets.push(Target {
                id: next_id + i as u32,
                user: st.user,
                host: st.host,
                port: st.port,
            });
        }

        Ok(Self { targets })
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn find(&self, host: &str, port: u16) -> Option<&Target> {
        self.targets.iter().find(|t| t.host == host && t.port == port)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct StaticTarget {
    pub host: String,
    pub port: u16,
    pub user: String,
}

/// Parses the STATIC_TARGETS spec: comma-separated `host:port` entries with an
/// optional `@label` suffix. Empty entries are skipped; a malformed entry is a
/// configuration error.
pub fn parse_static_targets(raw: &str) -> Result<Vec<StaticTarget>> {
    let mut items = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (host_port, label) = match part.split_once('@') {
            Some((hp, label)) => (hp, label.trim()),
            None => (part, ""),
        };
        let (host, port) = host_port.split_once(':').ok_or_else(|| {
            AppError::Config(format!("static target '{part}' must be host:port[@label]"))
        })?;
        let host = host.trim();
        if host.is_empty() {
            return Err(AppError::Config(format!("static target '{part}' has an empty host")));
        }
        let port = port.trim().parse::<u16>().map_err(|_| {
            AppError::Config(format!("static target '{part}' has an invalid port"))
        })?;
        items.push(StaticTarget {
            host: host.to_string(),
            port,
            user: if label.is_empty() { "-".to_string() } else { label.to_string() },
        });
    }
    Ok(items)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DbBackend;
    use std::time::Duration;

    fn test_config() -> Config {
        Config {
            log_level: "info".to_string(),
            api_port: 8080,
            target_host: "example.org".to_string(),
            start_port: 50101,
            end_port: 50103,
            start_id: 701,
            users: vec!["alan".to_string(), "bianca".to_string()],
            static_targets: String::new(),
            connect_timeout: Duration::from_secs_f64(1.5),
            max_workers: 60,
            sample_interval_secs: 60,
            db_backend: DbBackend::Sqlite,
            db_path: "portwatch.db".to_string(),
            db_url: String::new(),
        }
    }

    #[test]
    fn range_targets_get_sequential_ids_and_positional_users() {
        let registry = Registry::from_config(&test_config()).unwrap();
        let targets = registry.targets();

        assert_eq!(targets.len(), 3);
        assert_eq!(targets[0].id, 701);
        assert_eq!(targets[0].port, 50101);
        assert_eq!(targets[0].user, "alan");
        assert_eq!(targets[1].user, "bianca");
        // No label for the third port in the range
        assert_eq!(targets[2].id, 703);
        assert_eq!(targets[2].user, "-");
    }

    #[test]
    fn static_targets_continue_after_the_range() {
        let mut cfg = test_config();
        cfg.static_targets = "backup.example.org:2222@ops, 10.0.0.9:8443".to_string();

        let registry = Registry::from_config(&cfg).unwrap();
        let targets = registry.targets();

        assert_eq!(targets.len(), 5);
        assert_eq!(targets[3].id, 704);
        assert_eq!(targets[3].host, "backup.example.org");
        assert_eq!(targets[3].port, 2222);
        assert_eq!(targets[3].user, "ops");
        assert_eq!(targets[4].id, 705);
        assert_eq!(targets[4].user, "-");
    }

    #[test]
    fn find_matches_on_host_and_port() {
        let registry = Registry::from_config(&test_config()).unwrap();

        assert!(registry.find("example.org", 50102).is_some());
        assert!(registry.find("example.org", 60000).is_none());
        assert!(registry.find("other.org", 50102).is_none());
    }

    #[test]
    fn malformed_static_target_is_a_config_error() {
        assert!(parse_static_targets("noport").is_err());
        assert!(parse_static_targets("host:notaport").is_err());
        assert!(parse_static_targets(":22").is_err());
    }

    #[test]
    fn empty_static_target_spec_parses_to_nothing() {
        assert_eq!(parse_static_targets("").unwrap().len(), 0);
        assert_eq!(parse_static_targets(" , ,").unwrap().len(), 0);
    }
}
