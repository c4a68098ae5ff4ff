//! Configuration profiles: named transforms applied to a freshly generated
//! configuration before it is persisted.
//!
//! Profiles run exactly once, during provisioning. They are not guaranteed
//! to be idempotent and must never be applied to an already-persisted
//! repository.

use std::collections::BTreeMap;

use crate::config::NodeConfig;
use crate::error::{Error, Result};

/// A pure transform over a configuration.
pub type ProfileTransform = fn(&mut NodeConfig) -> Result<()>;

/// An explicit registry mapping profile names to transforms.
///
/// The registry is constructed once at process start and passed to whoever
/// needs it; there is no ambient global table.
#[derive(Debug, Clone, Default)]
pub struct ProfileRegistry {
    transforms: BTreeMap<String, ProfileTransform>,
}

impl ProfileRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry populated with the built-in profiles:
    /// `lowpower`, `server`, and `test`.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("lowpower", lowpower);
        registry.register("server", server);
        registry.register("test", test_profile);
        registry
    }

    /// Registers a transform under the given name, replacing any previous
    /// transform with that name.
    pub fn register(&mut self, name: &str, transform: ProfileTransform) {
        self.transforms.insert(name.to_string(), transform);
    }

    /// Looks up a transform by name.
    pub fn get(&self, name: &str) -> Option<ProfileTransform> {
        self.transforms.get(name).copied()
    }

    /// Names of all registered profiles, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.transforms.keys().map(String::as_str).collect()
    }
}

/// Resolves a comma-separated profile list against a registry without
/// applying anything.
///
/// An unknown name fails the whole list before any transform runs, so a
/// typo cannot leave a configuration half-transformed. An empty list
/// resolves to nothing.
pub fn resolve_profiles(
    registry: &ProfileRegistry,
    profiles: &str,
) -> Result<Vec<(String, ProfileTransform)>> {
    if profiles.is_empty() {
        return Ok(Vec::new());
    }

    let mut resolved = Vec::new();
    for name in profiles.split(',') {
        let transform = registry.get(name).ok_or_else(|| Error::UnknownProfile {
            name: name.to_string(),
        })?;
        resolved.push((name.to_string(), transform));
    }
    Ok(resolved)
}

/// Applies a comma-separated, ordered profile list to a configuration.
///
/// All names are resolved first; the transforms then run in the order
/// given. The first transform failure aborts the remainder.
pub fn apply_profiles(
    config: &mut NodeConfig,
    registry: &ProfileRegistry,
    profiles: &str,
) -> Result<()> {
    for (name, transform) in resolve_profiles(registry, profiles)? {
        transform(config).map_err(|e| Error::Profile(format!("profile {name}: {e}")))?;
    }
    Ok(())
}

/// Low-resource preset: client-only routing and tight connection limits.
fn lowpower(config: &mut NodeConfig) -> Result<()> {
    config.network.routing = crate::config::RoutingMode::Client;
    config.network.conn_low_water = 20;
    config.network.conn_high_water = 40;
    config.network.conn_grace_period_secs = 60;
    Ok(())
}

/// Server preset: full routing participation and generous connection limits.
fn server(config: &mut NodeConfig) -> Result<()> {
    config.network.routing = crate::config::RoutingMode::Participant;
    config.network.conn_low_water = 100;
    config.network.conn_high_water = 400;
    Ok(())
}

/// Test preset: loopback listener on an OS-assigned port, no bootstrap
/// peers.
fn test_profile(config: &mut NodeConfig) -> Result<()> {
    config.network.listen_addr = "/ip4/127.0.0.1/tcp/0".to_string();
    config.network.bootstrap_peers.clear();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NodeConfig, RoutingMode, DEFAULT_KEY_BITS};

    fn base_config() -> NodeConfig {
        NodeConfig::generate(DEFAULT_KEY_BITS).unwrap()
    }

    #[test]
    fn test_builtin_names() {
        let registry = ProfileRegistry::builtin();
        assert_eq!(registry.names(), vec!["lowpower", "server", "test"]);
    }

    #[test]
    fn test_empty_list_is_noop() {
        let registry = ProfileRegistry::builtin();
        let mut config = base_config();
        let before = config.clone();

        apply_profiles(&mut config, &registry, "").unwrap();
        assert_eq!(config, before);
    }

    #[test]
    fn test_lowpower_profile() {
        let registry = ProfileRegistry::builtin();
        let mut config = base_config();

        apply_profiles(&mut config, &registry, "lowpower").unwrap();

        assert_eq!(config.network.routing, RoutingMode::Client);
        assert_eq!(config.network.conn_low_water, 20);
        assert_eq!(config.network.conn_high_water, 40);
        assert_eq!(config.network.conn_grace_period_secs, 60);
    }

    #[test]
    fn test_test_profile_uses_loopback() {
        let registry = ProfileRegistry::builtin();
        let mut config = base_config();
        config.network.bootstrap_peers = vec!["/ip4/203.0.113.9/tcp/4501".to_string()];

        apply_profiles(&mut config, &registry, "test").unwrap();

        assert_eq!(config.network.listen_addr, "/ip4/127.0.0.1/tcp/0");
        assert!(config.network.bootstrap_peers.is_empty());
    }

    #[test]
    fn test_profile_order_sensitivity() {
        let registry = ProfileRegistry::builtin();

        // lowpower then server: server's transform wins the shared fields.
        let mut config_ls = base_config();
        apply_profiles(&mut config_ls, &registry, "lowpower,server").unwrap();
        assert_eq!(config_ls.network.routing, RoutingMode::Participant);
        assert_eq!(config_ls.network.conn_low_water, 100);
        assert_eq!(config_ls.network.conn_high_water, 400);
        // server does not touch the grace period, lowpower's value sticks.
        assert_eq!(config_ls.network.conn_grace_period_secs, 60);

        // server then lowpower: lowpower wins.
        let mut config_sl = base_config();
        apply_profiles(&mut config_sl, &registry, "server,lowpower").unwrap();
        assert_eq!(config_sl.network.routing, RoutingMode::Client);
        assert_eq!(config_sl.network.conn_low_water, 20);
        assert_eq!(config_sl.network.conn_high_water, 40);
    }

    #[test]
    fn test_ordered_application_matches_sequential_transforms() {
        let registry = ProfileRegistry::builtin();

        let mut combined = base_config();
        apply_profiles(&mut combined, &registry, "lowpower,server").unwrap();

        let mut sequential = base_config();
        apply_profiles(&mut sequential, &registry, "lowpower").unwrap();
        apply_profiles(&mut sequential, &registry, "server").unwrap();

        assert_eq!(combined.network, sequential.network);
    }

    #[test]
    fn test_unknown_profile_names_offender() {
        let registry = ProfileRegistry::builtin();
        let mut config = base_config();

        let err = apply_profiles(&mut config, &registry, "warp-speed").unwrap_err();
        match err {
            Error::UnknownProfile { name } => assert_eq!(name, "warp-speed"),
            other => panic!("expected UnknownProfile, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_profile_aborts_before_any_transform() {
        let registry = ProfileRegistry::builtin();
        let mut config = base_config();
        let before = config.clone();

        let result = apply_profiles(&mut config, &registry, "lowpower,warp-speed");
        assert!(result.is_err());
        // The valid leading profile must not have been applied.
        assert_eq!(config, before);
    }

    #[test]
    fn test_empty_segment_is_unknown() {
        let registry = ProfileRegistry::builtin();
        let mut config = base_config();

        let err = apply_profiles(&mut config, &registry, "lowpower,,server").unwrap_err();
        match err {
            Error::UnknownProfile { name } => assert_eq!(name, ""),
            other => panic!("expected UnknownProfile, got {:?}", other),
        }
    }

    #[test]
    fn test_transform_failure_aborts_remaining() {
        fn failing(_: &mut NodeConfig) -> Result<()> {
            Err(Error::Other("broken transform".to_string()))
        }
        fn mark(config: &mut NodeConfig) -> Result<()> {
            config.network.conn_low_water = 1;
            Ok(())
        }

        let mut registry = ProfileRegistry::new();
        registry.register("failing", failing);
        registry.register("mark", mark);

        let mut config = base_config();
        let result = apply_profiles(&mut config, &registry, "failing,mark");

        assert!(matches!(result, Err(Error::Profile(_))));
        assert_ne!(config.network.conn_low_water, 1);
    }

    #[test]
    fn test_register_replaces_existing() {
        fn wide_open(config: &mut NodeConfig) -> Result<()> {
            config.network.conn_high_water = 10_000;
            Ok(())
        }

        let mut registry = ProfileRegistry::builtin();
        registry.register("server", wide_open);

        let mut config = base_config();
        apply_profiles(&mut config, &registry, "server").unwrap();
        assert_eq!(config.network.conn_high_water, 10_000);
    }
}
