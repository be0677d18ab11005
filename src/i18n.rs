// src/i18n.rs
//
// Lightweight runtime i18n:
// - Strings live in either:
//   A) assets/i18n/<lang>.json
//   B) assets/i18n.json (single file, format: { "<lang>": { "key": "value" } })
// - Load order: selected lang -> fallback en -> built-in en table
// - Lookup: tr("key") / tr_with("key", [("name", "...")]) with {name} placeholders
//
// Language selection:
// - CLI: --lang <code> (e.g. en, zh-Hans, ja, fr)
// - Env: CUBE_PREVIEW_LANG
// - Default: en

use once_cell::sync::OnceCell;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::RwLock,
};

const FALLBACK_LANG: &str = "en";
const BUILTIN_EN: &str = include_str!("../assets/i18n/en.json");

#[derive(Debug, Clone)]
pub struct I18n {
    pub lang: String,
    map: HashMap<String, String>,
    fallback_map: HashMap<String, String>,
}

impl I18n {
    pub fn from_maps(
        lang: impl Into<String>,
        map: HashMap<String, String>,
        fallback_map: HashMap<String, String>,
    ) -> Self {
        Self {
            lang: lang.into(),
            map,
            fallback_map,
        }
    }

    /// Selected language, then fallback, then the key itself.
    pub fn lookup(&self, key: &str) -> String {
        self.map
            .get(key)
            .or_else(|| self.fallback_map.get(key))
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }
}

static I18N: OnceCell<RwLock<I18n>> = OnceCell::new();

fn load_json_map(path: &Path) -> Option<HashMap<String, String>> {
    let text = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&text) {
        Ok(map) => Some(map),
        Err(e) => {
            log::warn!("ignoring {}: {e}", path.display());
            None
        }
    }
}

fn load_multi_lang_json(path: &Path, lang: &str) -> Option<HashMap<String, String>> {
    let text = std::fs::read_to_string(path).ok()?;
    let all: HashMap<String, HashMap<String, String>> = serde_json::from_str(&text).ok()?;
    all.get(lang).cloned()
}

/// Search `<exe_dir>/assets/<rel>` then `./assets/<rel>`.
fn find_asset(rel: &Path) -> Option<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let p = dir.join("assets").join(rel);
            if p.exists() {
                return Some(p);
            }
        }
    }

    let p = PathBuf::from("assets").join(rel);
    if p.exists() {
        return Some(p);
    }

    None
}

fn load_lang(lang: &str) -> HashMap<String, String> {
    let per_lang = PathBuf::from("i18n").join(format!("{lang}.json"));
    if let Some(m) = find_asset(&per_lang).and_then(|p| load_json_map(&p)) {
        return m;
    }

    if let Some(m) =
        find_asset(Path::new("i18n.json")).and_then(|p| load_multi_lang_json(&p, lang))
    {
        return m;
    }

    HashMap::new()
}

fn builtin_fallback() -> HashMap<String, String> {
    serde_json::from_str(BUILTIN_EN).unwrap_or_default()
}

/// Initialize global i18n. Safe to call multiple times; later calls overwrite current lang maps.
pub fn init(lang: impl Into<String>) {
    let lang = lang.into();

    let map = load_lang(&lang);
    if map.is_empty() && lang != FALLBACK_LANG {
        log::warn!("no strings found for language `{lang}`, falling back to {FALLBACK_LANG}");
    }

    let mut fallback_map = builtin_fallback();
    fallback_map.extend(load_lang(FALLBACK_LANG));

    let i = I18n::from_maps(lang, map, fallback_map);
    log::info!("ui language: {} ({} strings)", i.lang, i.map.len());

    if let Some(lock) = I18N.get() {
        if let Ok(mut w) = lock.write() {
            *w = i;
        }
    } else {
        let _ = I18N.set(RwLock::new(i));
    }
}

fn get_locked() -> Option<std::sync::RwLockReadGuard<'static, I18n>> {
    I18N.get().and_then(|l| l.read().ok())
}

/// Get localized text by key. If key missing, returns key itself.
pub fn tr(key: &str) -> String {
    match get_locked() {
        Some(i) => i.lookup(key),
        None => key.to_string(),
    }
}

/// Get localized text and substitute `{name}` placeholders.
/// Any placeholder not provided is kept as-is.
pub fn tr_with(key: &str, args: &[(&str, String)]) -> String {
    substitute(tr(key), args)
}

fn substitute(mut s: String, args: &[(&str, String)]) -> String {
    for (k, v) in args {
        let placeholder = format!("{{{}}}", k);
        s = s.replace(&placeholder, v);
    }
    s
}

/// Choose language from CLI/env.
pub fn resolve_lang_from_args() -> String {
    // CLI: --lang <code>
    let mut it = std::env::args();
    while let Some(a) = it.next() {
        if a == "--lang" {
            if let Some(v) = it.next() {
                return v;
            }
        }
    }

    // Env: CUBE_PREVIEW_LANG
    if let Ok(v) = std::env::var("CUBE_PREVIEW_LANG") {
        if !v.trim().is_empty() {
            return v;
        }
    }

    FALLBACK_LANG.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn lookup_prefers_selected_then_fallback_then_key() {
        let i = I18n::from_maps(
            "fr",
            map(&[("view.reset", "Réinitialiser")]),
            map(&[("view.reset", "Reset"), ("badge.preview", "3D Preview")]),
        );
        assert_eq!(i.lookup("view.reset"), "Réinitialiser");
        assert_eq!(i.lookup("badge.preview"), "3D Preview");
        assert_eq!(i.lookup("no.such.key"), "no.such.key");
    }

    #[test]
    fn substitute_fills_known_placeholders_only() {
        let s = substitute(
            "Yaw {yaw}° Pitch {pitch}°".to_string(),
            &[("yaw", "12.5".to_string())],
        );
        assert_eq!(s, "Yaw 12.5° Pitch {pitch}°");
    }

    #[test]
    fn builtin_table_has_widget_labels() {
        let en = builtin_fallback();
        let keys = [
            "view.reset",
            "view.stop_rotate",
            "view.auto_rotate",
            "hint.drag",
            "badge.preview",
            "status.yaw",
            "status.pitch",
        ];
        for key in keys {
            assert!(en.contains_key(key), "missing {key}");
        }
        assert_eq!(en["view.stop_rotate"], "Stop Rotate");
        assert_eq!(en["view.auto_rotate"], "Auto Rotate");
        assert_eq!(
            substitute(en["status.yaw"].clone(), &[("yaw", "12.5".to_string())]),
            "Yaw: 12.5°"
        );
    }
}
