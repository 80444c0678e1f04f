//! Run configuration read from `GEOBENCH_*` environment variables.

use std::{
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

use tracing::warn;

pub const SEED_VAR: &str = "GEOBENCH_SEED";
pub const CITIES_VAR: &str = "GEOBENCH_CITIES";
pub const ANCHORS_VAR: &str = "GEOBENCH_ANCHORS";
pub const VALIDATE_VAR: &str = "GEOBENCH_VALIDATE";

pub const DEFAULT_CITIES_FILE: &str = "cities.txt";

/// How query anchors are shared between the benchmarked variants.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AnchorPolicy {
    /// One workload is sampled up front and replayed for every variant.
    #[default]
    Shared,
    /// Each run draws its own anchors from the continuing generator stream.
    Independent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub seed: u64,
    pub cities_path: PathBuf,
    pub anchors: AnchorPolicy,
    pub validate: bool,
}

impl Config {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from any variable source. Unparsable values fall back
    /// to their defaults with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let seed = match lookup(SEED_VAR) {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warn!(value = %raw, "ignoring invalid {SEED_VAR}");
                clock_seed()
            }),
            None => clock_seed(),
        };
        let cities_path = lookup(CITIES_VAR)
            .filter(|raw| !raw.trim().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_CITIES_FILE), PathBuf::from);
        let anchors = match lookup(ANCHORS_VAR).as_deref().map(str::trim) {
            None | Some("shared") => AnchorPolicy::Shared,
            Some("independent") => AnchorPolicy::Independent,
            Some(other) => {
                warn!(value = other, "ignoring invalid {ANCHORS_VAR}");
                AnchorPolicy::Shared
            }
        };
        let validate = match lookup(VALIDATE_VAR).as_deref().map(str::trim) {
            None | Some("" | "0" | "false") => false,
            Some("1" | "true") => true,
            Some(other) => {
                warn!(value = other, "ignoring invalid {VALIDATE_VAR}");
                false
            }
        };
        Config {
            seed,
            cities_path,
            anchors,
            validate,
        }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

/// Wall-clock seconds, so unseeded runs differ from each other.
fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, path::PathBuf};

    use super::{AnchorPolicy, Config, DEFAULT_CITIES_FILE};

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]);
        assert_eq!(config.cities_path, PathBuf::from(DEFAULT_CITIES_FILE));
        assert_eq!(config.anchors, AnchorPolicy::Shared);
        assert!(!config.validate);
    }

    #[test]
    fn reads_every_variable() {
        let config = config(&[
            ("GEOBENCH_SEED", "42"),
            ("GEOBENCH_CITIES", "/data/worldcitiespop.txt"),
            ("GEOBENCH_ANCHORS", "independent"),
            ("GEOBENCH_VALIDATE", "true"),
        ]);
        assert_eq!(config.seed, 42);
        assert_eq!(config.cities_path, PathBuf::from("/data/worldcitiespop.txt"));
        assert_eq!(config.anchors, AnchorPolicy::Independent);
        assert!(config.validate);
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = config(&[
            ("GEOBENCH_CITIES", "  "),
            ("GEOBENCH_ANCHORS", "sometimes"),
            ("GEOBENCH_VALIDATE", "maybe"),
        ]);
        assert_eq!(config.cities_path, PathBuf::from(DEFAULT_CITIES_FILE));
        assert_eq!(config.anchors, AnchorPolicy::Shared);
        assert!(!config.validate);
    }

    #[test]
    fn with_seed_overrides() {
        assert_eq!(Config::default().with_seed(7).seed, 7);
    }
}
