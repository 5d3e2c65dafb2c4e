use serde::{Deserialize, Serialize};

use crate::contract::model::ProfileDefaults;
use crate::domain::service::ServiceConfig;

/// Configuration for the accounts module (`modules.accounts` in the app config).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountsConfig {
    /// Run every operation inside a transaction that is rolled back at the end.
    #[serde(default)]
    pub dry_run: bool,
    /// Apply schema migrations when the module is initialized.
    #[serde(default)]
    pub auto_migrate: bool,
    /// Values for newly provisioned profiles. Left unset they are the
    /// standard `UTC` / `en` / `system`; setting any of them is an explicit
    /// site override and every profile created afterwards carries it.
    #[serde(default = "default_timezone")]
    pub default_timezone: String,
    #[serde(default = "default_language")]
    pub default_language: String,
    #[serde(default = "default_theme")]
    pub default_theme: String,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            auto_migrate: false,
            default_timezone: default_timezone(),
            default_language: default_language(),
            default_theme: default_theme(),
        }
    }
}

impl AccountsConfig {
    pub fn profile_defaults(&self) -> ProfileDefaults {
        ProfileDefaults {
            timezone: self.default_timezone.clone(),
            language: self.default_language.clone(),
            theme: self.default_theme.clone(),
        }
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            dry_run: self.dry_run,
            profile_defaults: self.profile_defaults(),
        }
    }
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_theme() -> String {
    "system".to_string()
}
