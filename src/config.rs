use crate::error::{Error, Result};
use crate::etl::{JoinPolicy, OutOfRangePolicy};
use crate::ml::grid::Scoring;
use crate::taxonomy::CATEGORY_COUNT;
use std::env;

pub const DEFAULT_TABLE_NAME: &str = "message_categories";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub table_name: String,
    pub model_path: String,
    pub bind_addr: String,
    pub split_seed: u64,
    pub test_ratio: f64,
    pub cv_folds: usize,
    pub scoring: Scoring,
    pub decision_threshold: f64,
    /// Set only when `DECISION_THRESHOLD` is given; the service then
    /// serves at this threshold instead of the trained one.
    pub threshold_override: Option<f64>,
    pub join_policy: JoinPolicy,
    pub out_of_range: OutOfRangePolicy,
    pub expected_categories: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "DisasterResponse.db".to_string(),
            table_name: DEFAULT_TABLE_NAME.to_string(),
            model_path: "classifier.json".to_string(),
            bind_addr: "0.0.0.0:3001".to_string(),
            split_seed: 42,
            test_ratio: 0.25,
            cv_folds: 3,
            scoring: Scoring::MeanF1,
            decision_threshold: 0.5,
            threshold_override: None,
            join_policy: JoinPolicy::Inner,
            out_of_range: OutOfRangePolicy::Drop,
            expected_categories: Some(CATEGORY_COUNT),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Unset keys fall back to
    /// the defaults; set keys that fail to parse are reported.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let database_path = lookup("DATABASE_PATH").unwrap_or(defaults.database_path);
        let table_name = lookup("TABLE_NAME").unwrap_or(defaults.table_name);
        let model_path = lookup("MODEL_PATH").unwrap_or(defaults.model_path);
        let bind_addr = lookup("BIND_ADDR").unwrap_or(defaults.bind_addr);

        let split_seed = parse_var(&lookup, "SPLIT_SEED")?.unwrap_or(defaults.split_seed);
        let test_ratio = parse_var(&lookup, "TEST_RATIO")?.unwrap_or(defaults.test_ratio);
        let cv_folds = parse_var(&lookup, "CV_FOLDS")?.unwrap_or(defaults.cv_folds);
        let scoring = parse_var(&lookup, "SCORING")?.unwrap_or(defaults.scoring);
        let threshold_override: Option<f64> = parse_var(&lookup, "DECISION_THRESHOLD")?;
        let decision_threshold = threshold_override.unwrap_or(defaults.decision_threshold);
        let join_policy = parse_var(&lookup, "JOIN_POLICY")?.unwrap_or(defaults.join_policy);
        let out_of_range =
            parse_var(&lookup, "OUT_OF_RANGE_POLICY")?.unwrap_or(defaults.out_of_range);

        // "0" or "any" disables the category-count check at service startup
        let expected_categories = match lookup("EXPECTED_CATEGORIES") {
            None => defaults.expected_categories,
            Some(v) if v == "0" || v.eq_ignore_ascii_case("any") => None,
            Some(v) => Some(v.parse().map_err(|_| {
                Error::Config(format!("EXPECTED_CATEGORIES must be a number, got '{}'", v))
            })?),
        };

        let config = Self {
            database_path,
            table_name,
            model_path,
            bind_addr,
            split_seed,
            test_ratio,
            cv_folds,
            scoring,
            decision_threshold,
            threshold_override,
            join_policy,
            out_of_range,
            expected_categories,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.test_ratio > 0.0 && self.test_ratio < 1.0) {
            return Err(Error::Config(format!(
                "test ratio must be within (0, 1), got {}",
                self.test_ratio
            )));
        }
        if self.cv_folds < 2 {
            return Err(Error::Config(format!(
                "cross-validation needs at least 2 folds, got {}",
                self.cv_folds
            )));
        }
        if !(0.0..=1.0).contains(&self.decision_threshold) {
            return Err(Error::Config(format!(
                "decision threshold must be within [0, 1], got {}",
                self.decision_threshold
            )));
        }
        if self.table_name.trim().is_empty() {
            return Err(Error::Config("table name must not be empty".to_string()));
        }
        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("{} has an invalid value '{}'", key, raw))),
    }
}

#[derive(Debug, Clone)]
pub struct EtlConfig {
    pub table_name: String,
    pub join_policy: JoinPolicy,
    pub out_of_range: OutOfRangePolicy,
}

impl From<&Config> for EtlConfig {
    fn from(config: &Config) -> Self {
        Self {
            table_name: config.table_name.clone(),
            join_policy: config.join_policy,
            out_of_range: config.out_of_range,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrainingConfig {
    pub table_name: String,
    pub split_seed: u64,
    pub test_ratio: f64,
    pub cv_folds: usize,
    pub scoring: Scoring,
    pub decision_threshold: f64,
}

impl From<&Config> for TrainingConfig {
    fn from(config: &Config) -> Self {
        Self {
            table_name: config.table_name.clone(),
            split_seed: config.split_seed,
            test_ratio: config.test_ratio,
            cv_folds: config.cv_folds,
            scoring: config.scoring,
            decision_threshold: config.decision_threshold,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub model_path: String,
    pub database_path: Option<String>,
    pub table_name: String,
    /// `None` serves at the threshold stored in the artifact.
    pub decision_threshold: Option<f64>,
    pub expected_categories: Option<usize>,
}

impl From<&Config> for ServiceConfig {
    fn from(config: &Config) -> Self {
        Self {
            model_path: config.model_path.clone(),
            database_path: Some(config.database_path.clone()),
            table_name: config.table_name.clone(),
            decision_threshold: config.threshold_override,
            expected_categories: config.expected_categories,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.table_name, DEFAULT_TABLE_NAME);
        assert_eq!(config.split_seed, 42);
        assert_eq!(config.out_of_range, OutOfRangePolicy::Drop);
        assert_eq!(config.expected_categories, Some(36));
        assert_eq!(ServiceConfig::from(&config).decision_threshold, None);
    }

    #[test]
    fn test_threshold_override_reaches_service_only_when_set() {
        let config = Config::from_lookup(lookup_from(&[("DECISION_THRESHOLD", "0.3")])).unwrap();
        assert_eq!(config.decision_threshold, 0.3);
        assert_eq!(ServiceConfig::from(&config).decision_threshold, Some(0.3));
        assert_eq!(TrainingConfig::from(&config).decision_threshold, 0.3);
    }

    #[test]
    fn test_overrides_are_parsed() {
        let config = Config::from_lookup(lookup_from(&[
            ("SPLIT_SEED", "7"),
            ("TEST_RATIO", "0.2"),
            ("OUT_OF_RANGE_POLICY", "clamp"),
            ("JOIN_POLICY", "strict"),
            ("SCORING", "gmean_f1"),
            ("EXPECTED_CATEGORIES", "any"),
        ]))
        .unwrap();
        assert_eq!(config.split_seed, 7);
        assert_eq!(config.test_ratio, 0.2);
        assert_eq!(config.out_of_range, OutOfRangePolicy::Clamp);
        assert_eq!(config.join_policy, JoinPolicy::Strict);
        assert_eq!(config.scoring, Scoring::GeometricMeanF1);
        assert_eq!(config.expected_categories, None);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(Config::from_lookup(lookup_from(&[("SPLIT_SEED", "abc")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("TEST_RATIO", "1.5")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("CV_FOLDS", "1")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("OUT_OF_RANGE_POLICY", "keep")])).is_err());
    }
}
