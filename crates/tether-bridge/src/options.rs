//! Bridge configuration

use crate::marshal::MAX_DEPTH;

/// Options for a [`Bridge`](crate::Bridge)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeOptions {
    /// Property that reads `true` on every proxy without a host round-trip
    pub mapped_marker: String,

    /// Hidden property naming the host method a function proxy forwards to
    pub selector_property: String,

    /// Hidden property of script errors that wrap a host failure
    pub exception_property: String,

    /// Check syntax before evaluating, so syntax errors have no side effects
    pub syntax_check: bool,

    /// Nesting depth beyond which values are not converted
    pub max_depth: usize,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            mapped_marker: "isMappedObject".to_string(),
            selector_property: "selector".to_string(),
            exception_property: "__hostException".to_string(),
            syntax_check: true,
            max_depth: MAX_DEPTH,
        }
    }
}

impl BridgeOptions {
    /// Defaults overlaid with `TETHER_MAPPED_MARKER`, `TETHER_SYNTAX_CHECK`
    /// and `TETHER_MAX_DEPTH` from the environment
    pub fn from_env() -> Self {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    /// Overlay values found through `lookup`. Unparseable values are ignored.
    pub fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(marker) = lookup("TETHER_MAPPED_MARKER").filter(|m| !m.is_empty()) {
            self.mapped_marker = marker;
        }
        if let Some(check) = lookup("TETHER_SYNTAX_CHECK").and_then(|v| parse_flag(&v)) {
            self.syntax_check = check;
        }
        if let Some(depth) = lookup("TETHER_MAX_DEPTH").and_then(|v| v.trim().parse().ok()) {
            self.max_depth = depth;
        }
        self
    }

    /// Use a different reserved marker property
    pub fn with_mapped_marker(mut self, marker: impl Into<String>) -> Self {
        self.mapped_marker = marker.into();
        self
    }

    /// Enable or disable the syntax pre-check
    pub fn with_syntax_check(mut self, syntax_check: bool) -> Self {
        self.syntax_check = syntax_check;
        self
    }

    /// Set the conversion depth limit
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
