//! Startup settings read from a `key = value` file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

use crate::rotation::PositionUpdate;

pub(crate) const DEFAULT_PATH: &str = "settings.conf";

const DEFAULT_ANIMATION_FRAMES: u32 = 30;
const DEFAULT_SELECTED_SCALE: f32 = 0.75;

const KEYS: [&str; 7] = [
    "cube_size",
    "window_width",
    "window_height",
    "mouse_sensitivity",
    "animation_frames",
    "position_update",
    "selected_scale",
];

#[derive(Error, Debug)]
pub(crate) enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A non-comment line without `=`.
    #[error("line {line}: expected `key = value`, found {text:?}")]
    Malformed { line: usize, text: String },

    #[error("line {line}: unknown setting `{key}`")]
    UnknownKey { line: usize, key: String },

    #[error("invalid value {value:?} for `{key}`")]
    InvalidValue { key: &'static str, value: String },

    #[error("missing required setting `{0}`")]
    MissingKey(&'static str),

    #[error("`{0}` must be greater than zero")]
    NonPositive(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Settings {
    pub(crate) cube_size: usize,
    pub(crate) window_width: u32,
    pub(crate) window_height: u32,
    /// Radians of orbit per pixel of mouse drag.
    pub(crate) mouse_sensitivity: f32,
    /// Frames per quarter turn.
    pub(crate) animation_frames: u32,
    pub(crate) position_update: PositionUpdate,
    pub(crate) selected_scale: f32,
}

impl Settings {
    pub(crate) fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents)
    }

    pub(crate) fn parse(contents: &str) -> Result<Self, ConfigError> {
        let values = collect_values(contents)?;

        let settings = Self {
            cube_size: required(&values, "cube_size")?,
            window_width: required(&values, "window_width")?,
            window_height: required(&values, "window_height")?,
            mouse_sensitivity: required(&values, "mouse_sensitivity")?,
            animation_frames: optional(&values, "animation_frames")?
                .unwrap_or(DEFAULT_ANIMATION_FRAMES),
            position_update: match values.get("position_update") {
                Some(&raw) => parse_position_update(raw)?,
                None => PositionUpdate::default(),
            },
            selected_scale: optional(&values, "selected_scale")?
                .unwrap_or(DEFAULT_SELECTED_SCALE),
        };

        settings.check_positive()?;
        Ok(settings)
    }

    fn check_positive(&self) -> Result<(), ConfigError> {
        let checks = [
            ("cube_size", self.cube_size > 0),
            ("window_width", self.window_width > 0),
            ("window_height", self.window_height > 0),
            ("mouse_sensitivity", self.mouse_sensitivity > 0.0),
            ("animation_frames", self.animation_frames > 0),
            ("selected_scale", self.selected_scale > 0.0),
        ];
        match checks.iter().find(|(_, positive)| !positive) {
            Some(&(key, _)) => Err(ConfigError::NonPositive(key)),
            None => Ok(()),
        }
    }
}

/// Splits the file into raw values keyed by setting name. Later lines win.
fn collect_values(contents: &str) -> Result<HashMap<&'static str, &str>, ConfigError> {
    let mut values = HashMap::new();

    for (index, line) in contents.lines().enumerate() {
        let line_number = index + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(ConfigError::Malformed {
                line: line_number,
                text: line.to_string(),
            });
        };
        let key = key.trim();
        let Some(&known) = KEYS.iter().find(|&&k| k == key) else {
            return Err(ConfigError::UnknownKey {
                line: line_number,
                key: key.to_string(),
            });
        };
        values.insert(known, value.trim());
    }

    Ok(values)
}

fn optional<T: FromStr>(
    values: &HashMap<&'static str, &str>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    values
        .get(key)
        .map(|raw| {
            raw.parse().map_err(|_| ConfigError::InvalidValue {
                key,
                value: raw.to_string(),
            })
        })
        .transpose()
}

fn required<T: FromStr>(
    values: &HashMap<&'static str, &str>,
    key: &'static str,
) -> Result<T, ConfigError> {
    optional(values, key)?.ok_or(ConfigError::MissingKey(key))
}

fn parse_position_update(raw: &str) -> Result<PositionUpdate, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "planar" => Ok(PositionUpdate::Planar),
        "polar" => Ok(PositionUpdate::Polar),
        _ => Err(ConfigError::InvalidValue {
            key: "position_update",
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = "\
cube_size = 3
window_width = 800
window_height = 600
mouse_sensitivity = 0.005
";

    #[test]
    fn parses_required_keys_with_defaults() {
        let settings = Settings::parse(MINIMAL).expect("valid settings");
        assert_eq!(settings.cube_size, 3);
        assert_eq!(settings.window_width, 800);
        assert_eq!(settings.window_height, 600);
        assert!((settings.mouse_sensitivity - 0.005).abs() < f32::EPSILON);
        assert_eq!(settings.animation_frames, DEFAULT_ANIMATION_FRAMES);
        assert_eq!(settings.position_update, PositionUpdate::Planar);
        assert_eq!(settings.selected_scale, DEFAULT_SELECTED_SCALE);
    }

    #[test]
    fn comments_optional_keys_and_overrides() {
        let contents = format!(
            "# cube\n\n{MINIMAL}animation_frames = 12\nposition_update = Polar\ncube_size = 5\n"
        );
        let settings = Settings::parse(&contents).expect("valid settings");
        assert_eq!(settings.cube_size, 5);
        assert_eq!(settings.animation_frames, 12);
        assert_eq!(settings.position_update, PositionUpdate::Polar);
    }

    #[test]
    fn missing_key_is_reported() {
        let error = Settings::parse("cube_size = 3\n").unwrap_err();
        assert!(matches!(error, ConfigError::MissingKey("window_width")));
    }

    #[test]
    fn zero_size_is_rejected() {
        let contents = MINIMAL.replace("cube_size = 3", "cube_size = 0");
        let error = Settings::parse(&contents).unwrap_err();
        assert!(matches!(error, ConfigError::NonPositive("cube_size")));

        let contents = MINIMAL.replace("0.005", "-1.0");
        let error = Settings::parse(&contents).unwrap_err();
        assert!(matches!(error, ConfigError::NonPositive("mouse_sensitivity")));
    }

    #[test]
    fn bad_lines_are_rejected() {
        let error = Settings::parse("cube_size 3\n").unwrap_err();
        assert!(matches!(error, ConfigError::Malformed { line: 1, .. }));

        let error = Settings::parse("# header\ncube_colour = red\n").unwrap_err();
        assert!(matches!(error, ConfigError::UnknownKey { line: 2, .. }));

        let contents = MINIMAL.replace("800", "wide");
        let error = Settings::parse(&contents).unwrap_err();
        assert!(matches!(error, ConfigError::InvalidValue { key: "window_width", .. }));

        let contents = format!("{MINIMAL}position_update = spherical\n");
        let error = Settings::parse(&contents).unwrap_err();
        assert!(matches!(error, ConfigError::InvalidValue { key: "position_update", .. }));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(MINIMAL.as_bytes()).expect("write settings");
        let settings = Settings::load(file.path()).expect("valid settings");
        assert_eq!(settings.cube_size, 3);
    }

    #[test]
    fn missing_file_names_the_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("absent.conf");
        let error = Settings::load(&path).unwrap_err();
        assert!(matches!(error, ConfigError::Io { .. }));
        assert!(error.to_string().contains("absent.conf"));
    }
}
