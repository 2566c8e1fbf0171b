use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

/// Plan/permission limits granted to the current installation.
#[cfg_attr(test, mockall::automock)]
pub trait CapabilityService: Send + Sync {
    /// Numeric limit for a capability key. `-1` means unlimited.
    fn get_limit(&self, key: &str) -> i64;

    /// Whether the current tenant holds the named capability.
    fn tenant_can(&self, key: &str) -> bool;
}

/// Usage counters backing quota enforcement, keyed by driver name.
#[cfg_attr(test, mockall::automock)]
pub trait UsageService: Send + Sync {
    fn usage_for(&self, driver: &str) -> u64;
}

/// Static capability table for tests and single-tenant deployments.
#[derive(Debug, Default)]
pub struct StaticCapabilities {
    limits: RwLock<HashMap<String, i64>>,
    grants: RwLock<HashSet<String>>,
}

impl StaticCapabilities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_limit(&self, key: &str, limit: i64) {
        if let Ok(mut map) = self.limits.write() {
            map.insert(key.to_string(), limit);
        }
    }

    pub fn grant(&self, key: &str) {
        if let Ok(mut set) = self.grants.write() {
            set.insert(key.to_string());
        }
    }
}

impl CapabilityService for StaticCapabilities {
    fn get_limit(&self, key: &str) -> i64 {
        self.limits
            .read()
            .ok()
            .and_then(|m| m.get(key).copied())
            .unwrap_or(-1)
    }

    fn tenant_can(&self, key: &str) -> bool {
        self.grants.read().map(|s| s.contains(key)).unwrap_or(false)
    }
}

/// Fixed usage counter for tests.
#[derive(Debug, Default)]
pub struct FixedUsage {
    count: u64,
}

impl FixedUsage {
    pub fn new(count: u64) -> Self {
        Self { count }
    }
}

impl UsageService for FixedUsage {
    fn usage_for(&self, _driver: &str) -> u64 {
        self.count
    }
}
