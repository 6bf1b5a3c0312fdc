use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};

use crate::layout_engine::{LayoutKind, LayoutMode, Orientation};

pub fn data_dir() -> PathBuf { dirs::home_dir().unwrap_or_default().join(".tiletree") }
pub fn restore_file() -> PathBuf { data_dir().join("layout.ron") }
pub fn config_file() -> PathBuf {
    dirs::home_dir().unwrap_or_default().join(".config").join("tiletree").join("config.toml")
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    settings: Settings,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Config {
    pub settings: Settings,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Orientation of the root container of new workspaces.
    #[serde(default)]
    pub default_root_container_orientation: Orientation,
    #[serde(default)]
    pub default_root_container_layout: LayoutMode,
    /// Check the whole tree after every move, also in release builds.
    #[serde(default = "yes")]
    pub verify_invariants_after_moves: bool,
    /// Lower bound for weights changed by resize commands.
    #[serde(default = "default_minimum_weight")]
    pub minimum_weight: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_root_container_orientation: Orientation::default(),
            default_root_container_layout: LayoutMode::default(),
            verify_invariants_after_moves: true,
            minimum_weight: default_minimum_weight(),
        }
    }
}

impl Settings {
    pub fn root_layout(&self) -> LayoutKind {
        LayoutKind::new(
            self.default_root_container_orientation,
            self.default_root_container_layout,
        )
    }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if !(self.minimum_weight.is_finite() && self.minimum_weight > 0.0) {
            issues.push(format!("minimum_weight must be positive, got {}", self.minimum_weight));
        } else if self.minimum_weight >= 1.0 {
            issues.push(format!(
                "minimum_weight must be below the default weight 1.0, got {}",
                self.minimum_weight
            ));
        }

        issues
    }
}

fn yes() -> bool { true }

fn default_minimum_weight() -> f64 { 0.05 }

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::parse(&buf)
    }

    pub fn default() -> Config {
        Self::parse(include_str!("../../tiletree.default.toml")).unwrap_or(Config {
            settings: Settings::default(),
        })
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let config_file = ConfigFile { settings: self.settings.clone() };
        let toml_string = toml::to_string_pretty(&config_file)?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml_string.as_bytes())?;
        Ok(())
    }

    pub fn validate(&self) -> Vec<String> { self.settings.validate() }

    fn parse(buf: &str) -> anyhow::Result<Config> {
        match toml::from_str::<ConfigFile>(buf) {
            Ok(c) => {
                let config = Config { settings: c.settings };
                let issues = config.validate();
                if !issues.is_empty() {
                    bail!("invalid configuration: {}", issues.join("; "));
                }
                Ok(config)
            }
            Err(e) => {
                let msg = e.to_string();
                match Self::extract_unknown_variant(&msg)
                    .and_then(|(unknown, expected)| Self::suggest_similar(&unknown, &expected))
                {
                    Some(suggestion) => bail!("{msg}\nDid you mean `{suggestion}`?"),
                    None => bail!("{msg}"),
                }
            }
        }
    }

    fn levenshtein(a: &str, b: &str) -> usize {
        let a_chars: Vec<char> = a.chars().collect();
        let b_chars: Vec<char> = b.chars().collect();
        let mut d = vec![vec![0usize; b_chars.len() + 1]; a_chars.len() + 1];
        for (i, row) in d.iter_mut().enumerate() {
            row[0] = i;
        }
        for j in 0..=b_chars.len() {
            d[0][j] = j;
        }
        for i in 1..=a_chars.len() {
            for j in 1..=b_chars.len() {
                let cost = usize::from(a_chars[i - 1] != b_chars[j - 1]);
                d[i][j] = (d[i - 1][j] + 1).min(d[i][j - 1] + 1).min(d[i - 1][j - 1] + cost);
            }
        }
        d[a_chars.len()][b_chars.len()]
    }

    // Pulls the unknown token and serde's list of expected variants out of an
    // "unknown variant `x`, expected `a` or `b`" message.
    fn extract_unknown_variant(err: &str) -> Option<(String, Vec<String>)> {
        let needle = "unknown variant `";
        let start = err.find(needle)? + needle.len();
        let end = start + err[start..].find('`')?;
        let unknown = err[start..end].to_string();

        let mut expected = Vec::new();
        let mut rest = &err[end + 1..];
        while let Some(open) = rest.find('`') {
            let after = &rest[open + 1..];
            let Some(close) = after.find('`') else { break };
            let token = &after[..close];
            if token != unknown && !expected.iter().any(|e| e == token) {
                expected.push(token.to_string());
            }
            rest = &after[close + 1..];
        }
        Some((unknown, expected))
    }

    fn suggest_similar(unknown: &str, candidates: &[String]) -> Option<String> {
        let unknown = unknown.to_lowercase();
        let (best, dist) = candidates
            .iter()
            .map(|c| (c, Self::levenshtein(&unknown, &c.to_lowercase())))
            .min_by_key(|&(_, dist)| dist)?;
        let threshold = 3usize.max(best.len() / 2);
        (dist <= threshold).then(|| best.clone())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn default_config_parses() {
        let config = Config::default();
        assert_eq!(Settings::default(), config.settings);
        assert_eq!(LayoutKind::HorizontalTiles, config.settings.root_layout());
        assert!(config.validate().is_empty());
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(Settings::default(), config.settings);
    }

    #[test]
    fn settings_are_read() {
        let config = Config::parse(
            r#"
            [settings]
            default_root_container_orientation = "vertical"
            default_root_container_layout = "accordion"
            verify_invariants_after_moves = false
            "#,
        )
        .unwrap();
        assert_eq!(LayoutKind::VerticalAccordion, config.settings.root_layout());
        assert!(!config.settings.verify_invariants_after_moves);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = Config::parse("[settings]\nanimate = true\n").unwrap_err();
        assert!(err.to_string().contains("animate"), "{err}");
    }

    #[test]
    fn misspelled_variant_gets_a_suggestion() {
        let err = Config::parse("[settings]\ndefault_root_container_orientation = \"vertcal\"\n")
            .unwrap_err();
        assert!(err.to_string().contains("Did you mean `vertical`?"), "{err}");
    }

    #[test]
    fn invalid_minimum_weight_is_rejected() {
        let err = Config::parse("[settings]\nminimum_weight = 1.5\n").unwrap_err();
        assert!(err.to_string().contains("minimum_weight"), "{err}");
    }

    #[test]
    fn levenshtein_distance() {
        assert_eq!(0, Config::levenshtein("tiles", "tiles"));
        assert_eq!(1, Config::levenshtein("tile", "tiles"));
        assert_eq!(3, Config::levenshtein("kitten", "sitting"));
    }

    #[test]
    fn save_and_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.settings.default_root_container_orientation = Orientation::Vertical;
        config.save(&path).unwrap();
        assert_eq!(config, Config::read(&path).unwrap());
    }
}
