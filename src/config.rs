// config.rs — 预览参数：默认值 -> assets/preview.json -> 环境变量
//
// File search order (first hit wins):
// 1) --config <path> / CUBE_PREVIEW_CONFIG
// 2) <exe_dir>/assets/preview.json
// 3) ./assets/preview.json
//
// Env overrides: CUBE_PREVIEW_TICK_MS, CUBE_PREVIEW_YAW_STEP, CUBE_PREVIEW_DRAG_SENSITIVITY

use serde::Deserialize;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

use crate::rotation::RotationConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub tick_period_ms: u64,
    pub yaw_step_deg: f32,
    pub drag_sensitivity: f32,
    pub max_catch_up_ticks: u32,
    pub transition_ms: u64,
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: 30,
            yaw_step_deg: 0.5,
            drag_sensitivity: 0.5,
            max_catch_up_ticks: 16,
            transition_ms: 100,
            min_zoom: 0.5,
            max_zoom: 2.5,
            window_width: 720,
            window_height: 720,
        }
    }
}

impl PreviewConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let cfg: PreviewConfig = serde_json::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_period_ms == 0 {
            return Err(invalid("tick_period_ms", "must be at least 1"));
        }
        if !self.yaw_step_deg.is_finite() {
            return Err(invalid("yaw_step_deg", "must be a finite number"));
        }
        if !self.drag_sensitivity.is_finite() {
            return Err(invalid("drag_sensitivity", "must be a finite number"));
        }
        if self.max_catch_up_ticks == 0 {
            return Err(invalid("max_catch_up_ticks", "must be at least 1"));
        }
        if !(self.min_zoom > 0.0 && self.min_zoom <= self.max_zoom) {
            return Err(invalid("min_zoom", "must be positive and not above max_zoom"));
        }
        if self.window_width == 0 || self.window_height == 0 {
            return Err(invalid("window_width", "window size must be non-zero"));
        }
        Ok(())
    }

    pub fn rotation(&self) -> RotationConfig {
        RotationConfig {
            tick_period: Duration::from_millis(self.tick_period_ms),
            yaw_step_deg: self.yaw_step_deg,
            drag_sensitivity: self.drag_sensitivity,
            max_catch_up_ticks: self.max_catch_up_ticks,
        }
    }

    pub fn transition(&self) -> Duration {
        Duration::from_millis(self.transition_ms)
    }

    /// Applies overrides from `lookup` (normally `std::env::var`). Bad values are
    /// reported and skipped, leaving the previous value in place.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Vec<ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut errors = Vec::new();

        if let Some(v) = lookup("CUBE_PREVIEW_TICK_MS") {
            match v.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => self.tick_period_ms = ms,
                _ => errors.push(invalid(
                    "CUBE_PREVIEW_TICK_MS",
                    format!("`{v}` is not a positive integer"),
                )),
            }
        }
        if let Some(v) = lookup("CUBE_PREVIEW_YAW_STEP") {
            match v.trim().parse::<f32>() {
                Ok(step) if step.is_finite() => self.yaw_step_deg = step,
                _ => errors.push(invalid(
                    "CUBE_PREVIEW_YAW_STEP",
                    format!("`{v}` is not a number"),
                )),
            }
        }
        if let Some(v) = lookup("CUBE_PREVIEW_DRAG_SENSITIVITY") {
            match v.trim().parse::<f32>() {
                Ok(s) if s.is_finite() => self.drag_sensitivity = s,
                _ => errors.push(invalid(
                    "CUBE_PREVIEW_DRAG_SENSITIVITY",
                    format!("`{v}` is not a number"),
                )),
            }
        }

        errors
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.into(),
    }
}

fn find_config_file() -> Option<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let p = dir.join("assets").join("preview.json");
            if p.exists() {
                return Some(p);
            }
        }
    }

    let p = PathBuf::from("assets").join("preview.json");
    if p.exists() {
        return Some(p);
    }

    None
}

/// Choose config path from CLI/env.
pub fn resolve_config_path_from_args() -> Option<PathBuf> {
    let mut it = std::env::args();
    while let Some(a) = it.next() {
        if a == "--config" {
            if let Some(v) = it.next() {
                return Some(PathBuf::from(v));
            }
        }
    }

    match std::env::var("CUBE_PREVIEW_CONFIG") {
        Ok(v) if !v.trim().is_empty() => Some(PathBuf::from(v)),
        _ => None,
    }
}

/// Loads the effective config. Never fails: problems are logged and defaults kept.
pub fn load(explicit: Option<PathBuf>) -> PreviewConfig {
    let mut cfg = match explicit.or_else(find_config_file) {
        Some(path) => match PreviewConfig::from_path(&path) {
            Ok(cfg) => {
                log::info!("loaded preview config from {}", path.display());
                cfg
            }
            Err(e) => {
                log::warn!("{e}; using defaults");
                PreviewConfig::default()
            }
        },
        None => PreviewConfig::default(),
    };

    for e in cfg.apply_overrides(|key| std::env::var(key).ok()) {
        log::warn!("{e}; keeping previous value");
    }
    cfg
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn defaults_match_observed_animation() {
        let rot = PreviewConfig::default().rotation();
        assert_eq!(rot, RotationConfig::default());
        assert_eq!(rot.tick_period, Duration::from_millis(30));
        assert_eq!(rot.yaw_step_deg, 0.5);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = PreviewConfig::from_json_str(r#"{ "tick_period_ms": 16 }"#).unwrap();
        assert_eq!(cfg.tick_period_ms, 16);
        assert_eq!(cfg.yaw_step_deg, 0.5);
        assert_eq!(cfg.window_width, 720);
    }

    #[test]
    fn rejects_zero_period() {
        let err = PreviewConfig::from_json_str(r#"{ "tick_period_ms": 0 }"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { field: "tick_period_ms", .. }
        ));
    }

    #[test]
    fn rejects_inverted_zoom_range() {
        let err =
            PreviewConfig::from_json_str(r#"{ "min_zoom": 3.0, "max_zoom": 1.0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "min_zoom", .. }));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let err = PreviewConfig::from_json_str("{ tick_period_ms: ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn env_overrides_apply_and_report() {
        let env: HashMap<&str, &str> = [
            ("CUBE_PREVIEW_TICK_MS", "45"),
            ("CUBE_PREVIEW_YAW_STEP", "abc"),
            ("CUBE_PREVIEW_DRAG_SENSITIVITY", " 0.25 "),
        ]
        .into_iter()
        .collect();

        let mut cfg = PreviewConfig::default();
        let errors = cfg.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.tick_period_ms, 45);
        assert_eq!(cfg.yaw_step_deg, 0.5);
        assert_eq!(cfg.drag_sensitivity, 0.25);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("CUBE_PREVIEW_YAW_STEP"));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "yaw_step_deg": 1.5, "transition_ms": 0 }}"#).unwrap();

        let cfg = PreviewConfig::from_path(file.path()).unwrap();
        assert_eq!(cfg.yaw_step_deg, 1.5);
        assert_eq!(cfg.transition(), Duration::ZERO);

        let missing = PreviewConfig::from_path(Path::new("/definitely/not/here.json"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
