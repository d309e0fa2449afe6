//! Bridge configuration.

/// Settings that control naming and side effects of the bridge.
///
/// ```
/// use scriptbridge::BridgeConfig;
///
/// let config = BridgeConfig::default().with_notifications(false);
/// assert_eq!(config.generated_module, "ScriptGenerated");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Module that owns synthesized types when a definition names none.
    pub generated_module: String,
    /// Rename suffix of superseded generated types.
    pub reinstance_suffix: String,
    /// Prefix of the raw-storage accessor synthesized for overridden fields.
    pub internal_accessor_prefix: String,
    /// Metadata key prefix for parameter defaults.
    pub default_metadata_prefix: String,
    /// Emit pre/post change notifications for mutations.
    pub notifications: bool,
    /// Migrate instances as part of each redefinition.
    pub auto_reinstance: bool,
    /// Maximum number of chained causes kept in the script error slot.
    pub max_error_chain: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            generated_module: "ScriptGenerated".to_string(),
            reinstance_suffix: "_REINST".to_string(),
            internal_accessor_prefix: "_".to_string(),
            default_metadata_prefix: "CPP_Default_".to_string(),
            notifications: true,
            auto_reinstance: true,
            max_error_chain: 16,
        }
    }
}

impl BridgeConfig {
    pub fn with_generated_module(mut self, module: impl Into<String>) -> Self {
        self.generated_module = module.into();
        self
    }

    pub fn with_reinstance_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.reinstance_suffix = suffix.into();
        self
    }

    pub fn with_notifications(mut self, enabled: bool) -> Self {
        self.notifications = enabled;
        self
    }

    pub fn with_auto_reinstance(mut self, enabled: bool) -> Self {
        self.auto_reinstance = enabled;
        self
    }

    pub fn with_max_error_chain(mut self, depth: usize) -> Self {
        self.max_error_chain = depth.max(1);
        self
    }

    /// Metadata key holding the default of parameter `param`.
    pub fn default_key(&self, param: &str) -> String {
        format!("{}{}", self.default_metadata_prefix, param)
    }
}
