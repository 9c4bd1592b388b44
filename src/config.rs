use std::path::Path;

use serde::Deserialize;

/// Sidecar tuning knobs. Everything has an in-code default; the file is
/// optional and unknown keys are rejected so typos fail loudly at startup.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// How long the undo affordance for a confirmed transition stays live.
    #[serde(default = "default_undo_window_ms")]
    pub undo_window_ms: u64,
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
    /// Upper bound on rows accepted by a single CSV import.
    #[serde(default = "default_max_import_rows")]
    pub max_import_rows: usize,
}

fn default_undo_window_ms() -> u64 {
    5_000
}

fn default_page_size() -> u32 {
    10
}

fn default_max_import_rows() -> usize {
    1_000
}

impl Default for Config {
    fn default() -> Self {
        Config {
            undo_window_ms: default_undo_window_ms(),
            default_page_size: default_page_size(),
            max_import_rows: default_max_import_rows(),
        }
    }
}

pub fn load(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let text = std::fs::read_to_string(path)?;
    let cfg: Config = toml::from_str(&text)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_apply_without_a_file() {
        let cfg = load(None).expect("default config");
        assert_eq!(cfg.undo_window_ms, 5_000);
        assert_eq!(cfg.default_page_size, 10);
        assert_eq!(cfg.max_import_rows, 1_000);
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let mut f = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(f, "undo_window_ms = 250").expect("write");
        let cfg = load(Some(f.path())).expect("load config");
        assert_eq!(cfg.undo_window_ms, 250);
        assert_eq!(cfg.default_page_size, 10);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let mut f = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(f, "undo_windw_ms = 250").expect("write");
        assert!(load(Some(f.path())).is_err());
    }
}
