//! Runtime game settings
//!
//! Stored in SQLite as key/value rows and editable over the REST API, so the
//! serialized field names are part of the API.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    // Character building
    pub default_power_level: i32,
    pub points_per_level: i32,

    // Validation
    pub max_name_length: usize,
    pub max_description_length: usize,

    // Warfare
    pub morale_dc: i32,
    pub rally_dc: i32,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            default_power_level: 10,
            points_per_level: 15,
            max_name_length: 255,
            max_description_length: 10000,
            morale_dc: 15,
            rally_dc: 15,
        }
    }
}

impl AppSettings {
    /// Load from environment variables, using defaults for missing values
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_power_level: env_or("CAMPAIGN_DEFAULT_POWER_LEVEL", defaults.default_power_level),
            points_per_level: env_or("CAMPAIGN_POINTS_PER_LEVEL", defaults.points_per_level),
            max_name_length: env_or("CAMPAIGN_MAX_NAME_LENGTH", defaults.max_name_length),
            max_description_length: env_or("CAMPAIGN_MAX_DESCRIPTION_LENGTH", defaults.max_description_length),
            morale_dc: env_or("CAMPAIGN_MORALE_DC", defaults.morale_dc),
            rally_dc: env_or("CAMPAIGN_RALLY_DC", defaults.rally_dc),
        }
    }

    /// Key/value pairs as persisted
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("default_power_level", self.default_power_level.to_string()),
            ("points_per_level", self.points_per_level.to_string()),
            ("max_name_length", self.max_name_length.to_string()),
            ("max_description_length", self.max_description_length.to_string()),
            ("morale_dc", self.morale_dc.to_string()),
            ("rally_dc", self.rally_dc.to_string()),
        ]
    }

    /// Overlay stored pairs on the defaults; unknown or unparsable keys are ignored
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self::default().with_pairs(pairs)
    }

    pub fn with_pairs<'a>(mut self, pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        for (key, value) in pairs {
            match key {
                "default_power_level" => parse_into(value, &mut self.default_power_level),
                "points_per_level" => parse_into(value, &mut self.points_per_level),
                "max_name_length" => parse_into(value, &mut self.max_name_length),
                "max_description_length" => parse_into(value, &mut self.max_description_length),
                "morale_dc" => parse_into(value, &mut self.morale_dc),
                "rally_dc" => parse_into(value, &mut self.rally_dc),
                _ => {}
            }
        }
        self
    }
}

fn parse_into<T: std::str::FromStr>(value: &str, target: &mut T) {
    if let Ok(parsed) = value.parse() {
        *target = parsed;
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairs_overlay_defaults() {
        let settings = AppSettings::from_pairs([("morale_dc", "12"), ("rally_dc", "oops"), ("unknown", "1")]);
        assert_eq!(settings.morale_dc, 12);
        assert_eq!(settings.rally_dc, 15);
        assert_eq!(settings.points_per_level, 15);
    }

    #[test]
    fn test_pairs_cover_every_field() {
        let custom = AppSettings {
            default_power_level: 8,
            points_per_level: 12,
            max_name_length: 40,
            max_description_length: 400,
            morale_dc: 13,
            rally_dc: 11,
        };
        let pairs = custom.to_pairs();
        let restored = AppSettings::from_pairs(pairs.iter().map(|(k, v)| (*k, v.as_str())));
        assert_eq!(restored, custom);
    }
}
