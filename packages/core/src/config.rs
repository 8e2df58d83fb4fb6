//! Configuration for the frame graph coordinator
//!
//! Every field has a serde default so partial JSON documents deserialize
//! cleanly. Environment overrides use the `FRAMEGRAPH_` prefix.

use crate::models::Point;
use crate::services::GraphError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Tuning knobs for placement, scheduling and message handling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Size of newly created frames
    pub frame_width: f64,
    pub frame_height: f64,

    /// Gap between neighbouring frames
    pub gap: f64,

    /// Where the first frame goes when no anchor is given
    pub default_anchor: Point,

    /// Columns tested by next-free-column placement before giving up
    pub column_retry_limit: usize,

    /// Fallback delay for a sweep when no animation frame arrives
    pub sweep_fallback_ms: u64,

    /// Fallback delay for z-order normalization
    pub normalize_fallback_ms: u64,

    /// Background sweep interval, independent of change events
    pub safety_net_interval_ms: u64,

    /// Window within which identical creation requests collapse into one
    pub dedup_window_ms: u64,

    /// Debounce for search-suggestion lookups
    pub suggest_debounce_ms: u64,

    /// Zoom multiplier applied when focusing a frame
    pub zoom_bump: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,

    /// Camera animation duration for focus requests
    pub focus_animation_ms: u64,

    /// Base URL that relative content references resolve against
    pub content_base: String,

    /// Paths of the content proxy endpoints, unwrapped during normalization.
    /// The first one is the page proxy and also accepts a bare `path=`.
    pub proxy_paths: Vec<String>,

    /// Only open frames for Wikimedia hosts
    pub restrict_to_wikimedia: bool,

    /// Forward best-effort failures to tracing
    pub diagnostics_enabled: bool,

    /// Size of the search overlay widget
    pub overlay_width: f64,
    pub overlay_height: f64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            frame_width: 480.0,
            frame_height: 640.0,
            gap: 48.0,
            default_anchor: Point::new(120.0, 120.0),
            column_retry_limit: 24,
            sweep_fallback_ms: 80,
            normalize_fallback_ms: 80,
            safety_net_interval_ms: 400,
            dedup_window_ms: 250,
            suggest_debounce_ms: 300,
            zoom_bump: 1.2,
            min_zoom: 0.1,
            max_zoom: 1.0,
            focus_animation_ms: 320,
            content_base: "https://en.m.wikipedia.org".to_string(),
            proxy_paths: vec!["/m".to_string(), "/i".to_string()],
            restrict_to_wikimedia: true,
            diagnostics_enabled: false,
            overlay_width: 360.0,
            overlay_height: 48.0,
        }
    }
}

impl GraphConfig {
    /// Parse a (possibly partial) JSON document and validate it.
    pub fn from_json_str(json: &str) -> Result<Self, GraphError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| GraphError::invalid_config(format!("config parse failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `FRAMEGRAPH_*` environment variables.
    ///
    /// Unparsable values are ignored with a warning.
    pub fn from_env() -> Result<Self, GraphError> {
        let mut config = Self::default();

        override_from_env("FRAMEGRAPH_GAP", &mut config.gap);
        override_from_env("FRAMEGRAPH_FRAME_WIDTH", &mut config.frame_width);
        override_from_env("FRAMEGRAPH_FRAME_HEIGHT", &mut config.frame_height);
        override_from_env("FRAMEGRAPH_SWEEP_FALLBACK_MS", &mut config.sweep_fallback_ms);
        override_from_env("FRAMEGRAPH_SAFETY_NET_MS", &mut config.safety_net_interval_ms);
        override_from_env("FRAMEGRAPH_DEDUP_WINDOW_MS", &mut config.dedup_window_ms);
        override_from_env("FRAMEGRAPH_SUGGEST_DEBOUNCE_MS", &mut config.suggest_debounce_ms);
        override_from_env("FRAMEGRAPH_MAX_ZOOM", &mut config.max_zoom);
        override_from_env("FRAMEGRAPH_DIAGNOSTICS", &mut config.diagnostics_enabled);
        if let Ok(base) = std::env::var("FRAMEGRAPH_CONTENT_BASE") {
            config.content_base = base;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), GraphError> {
        for (name, value) in [
            ("frame_width", self.frame_width),
            ("frame_height", self.frame_height),
            ("overlay_width", self.overlay_width),
            ("overlay_height", self.overlay_height),
            ("gap", self.gap),
            ("default_anchor.x", self.default_anchor.x),
            ("default_anchor.y", self.default_anchor.y),
            ("min_zoom", self.min_zoom),
            ("max_zoom", self.max_zoom),
            ("zoom_bump", self.zoom_bump),
        ] {
            if !value.is_finite() {
                return Err(GraphError::invalid_config(format!(
                    "{} must be a finite number, got {}",
                    name, value
                )));
            }
        }
        if self.frame_width <= 0.0 || self.frame_height <= 0.0 {
            return Err(GraphError::invalid_config("frame size must be positive"));
        }
        if self.overlay_width <= 0.0 || self.overlay_height <= 0.0 {
            return Err(GraphError::invalid_config("overlay size must be positive"));
        }
        if self.gap < 0.0 {
            return Err(GraphError::invalid_config("gap cannot be negative"));
        }
        if self.column_retry_limit == 0 {
            return Err(GraphError::invalid_config(
                "column_retry_limit must be greater than 0",
            ));
        }
        for (name, value) in [
            ("sweep_fallback_ms", self.sweep_fallback_ms),
            ("normalize_fallback_ms", self.normalize_fallback_ms),
            ("safety_net_interval_ms", self.safety_net_interval_ms),
            ("dedup_window_ms", self.dedup_window_ms),
            ("suggest_debounce_ms", self.suggest_debounce_ms),
        ] {
            if value == 0 {
                return Err(GraphError::invalid_config(format!(
                    "{} must be greater than 0",
                    name
                )));
            }
        }
        if self.min_zoom <= 0.0 || self.min_zoom > self.max_zoom {
            return Err(GraphError::invalid_config(format!(
                "zoom range [{}, {}] is invalid",
                self.min_zoom, self.max_zoom
            )));
        }
        if self.zoom_bump < 1.0 {
            return Err(GraphError::invalid_config("zoom_bump cannot be below 1.0"));
        }
        Url::parse(&self.content_base).map_err(|e| {
            GraphError::invalid_config(format!("content_base '{}': {}", self.content_base, e))
        })?;
        Ok(())
    }

    pub fn sweep_fallback(&self) -> Duration {
        Duration::from_millis(self.sweep_fallback_ms)
    }

    pub fn normalize_fallback(&self) -> Duration {
        Duration::from_millis(self.normalize_fallback_ms)
    }

    pub fn safety_net_interval(&self) -> Duration {
        Duration::from_millis(self.safety_net_interval_ms)
    }

    pub fn dedup_window(&self) -> Duration {
        Duration::from_millis(self.dedup_window_ms)
    }

    pub fn suggest_debounce(&self) -> Duration {
        Duration::from_millis(self.suggest_debounce_ms)
    }

    pub fn focus_animation(&self) -> Duration {
        Duration::from_millis(self.focus_animation_ms)
    }
}

fn override_from_env<T: std::str::FromStr>(key: &str, target: &mut T) {
    if let Ok(raw) = std::env::var(key) {
        match raw.parse::<T>() {
            Ok(value) => *target = value,
            Err(_) => tracing::warn!("Ignoring unparsable {}={}", key, raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = GraphConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.dedup_window(), Duration::from_millis(250));
        assert_eq!(config.safety_net_interval(), Duration::from_millis(400));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = GraphConfig::from_json_str(r#"{ "gap": 16, "max_zoom": 2.0 }"#).unwrap();
        assert_eq!(config.gap, 16.0);
        assert_eq!(config.max_zoom, 2.0);
        assert_eq!(config.frame_width, 480.0);
        assert!(config.restrict_to_wikimedia);
    }

    #[test]
    fn test_invalid_zoom_range_rejected() {
        let config = GraphConfig {
            min_zoom: 2.0,
            max_zoom: 1.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(GraphError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_zero_durations_rejected() {
        let config = GraphConfig {
            dedup_window_ms: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("dedup_window_ms"));
    }

    #[test]
    fn test_non_finite_values_rejected() {
        let cases = [
            GraphConfig { gap: f64::NAN, ..Default::default() },
            GraphConfig { frame_width: f64::INFINITY, ..Default::default() },
            GraphConfig { max_zoom: f64::INFINITY, ..Default::default() },
            GraphConfig { zoom_bump: f64::NAN, ..Default::default() },
            GraphConfig {
                default_anchor: Point::new(f64::NEG_INFINITY, 0.0),
                ..Default::default()
            },
        ];
        for config in cases {
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("finite"), "{}", err);
        }
    }

    #[test]
    fn test_bad_content_base_rejected() {
        assert!(GraphConfig::from_json_str(r#"{ "content_base": "not a url" }"#).is_err());
    }
}
