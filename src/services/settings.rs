use std::collections::HashMap;
use std::sync::RwLock;

/// Read access to the host's option storage.
///
/// Options live in two scopes: installation-wide (`global = true`) and
/// tenant-level (`global = false`). Missing keys fall back to the supplied
/// default, never to an error.
#[cfg_attr(test, mockall::automock)]
pub trait SettingsStore: Send + Sync {
    fn get_option(&self, key: &str, default: &str, global: bool) -> String;
}

/// In-memory settings store, used in tests and as a reference implementation
/// for hosts that keep their options elsewhere.
#[derive(Debug, Default)]
pub struct MemorySettings {
    global: RwLock<HashMap<String, String>>,
    tenant: RwLock<HashMap<String, String>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_global(&self, key: &str, value: &str) {
        if let Ok(mut map) = self.global.write() {
            map.insert(key.to_string(), value.to_string());
        }
    }

    pub fn set_tenant(&self, key: &str, value: &str) {
        if let Ok(mut map) = self.tenant.write() {
            map.insert(key.to_string(), value.to_string());
        }
    }
}

impl SettingsStore for MemorySettings {
    fn get_option(&self, key: &str, default: &str, global: bool) -> String {
        let map = if global { &self.global } else { &self.tenant };
        map.read()
            .ok()
            .and_then(|m| m.get(key).cloned())
            .unwrap_or_else(|| default.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_lookup() {
        let settings = MemorySettings::new();
        settings.set_global("sender_name", "Acme Bookings");
        settings.set_tenant("sender_name", "Downtown Branch");

        assert_eq!(settings.get_option("sender_name", "", true), "Acme Bookings");
        assert_eq!(settings.get_option("sender_name", "", false), "Downtown Branch");
    }

    #[test]
    fn test_default_for_missing_key() {
        let settings = MemorySettings::new();
        assert_eq!(settings.get_option("mail_gateway", "platform", true), "platform");
        assert_eq!(settings.get_option("mail_gateway", "", false), "");
    }
}
