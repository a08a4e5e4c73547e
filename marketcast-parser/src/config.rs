/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Parser configuration.
//!
//! This module provides configuration options shared by every parser kind.
//! Options that only apply to FIX are ignored by the binary parsers.

use marketcast_core::ConfigError;
use serde::Deserialize;
use std::path::PathBuf;

/// Default FIX pair separator (SOH).
pub const DEFAULT_FIX_SEPARATOR: u8 = 0x01;

/// Configuration for a message parser.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Path of the schema or dictionary file.
    pub schema_path: PathBuf,
    /// Only these message types are decoded, when set.
    pub message_type_inclusions: Option<Vec<String>>,
    /// These message types are skipped, when set.
    pub message_type_exclusions: Option<Vec<String>>,
    /// Maximum number of decoded messages per type, when set and non-zero.
    pub sampling_count: Option<u64>,
    /// Only count messages, never decode their fields.
    pub stats_only: bool,
    /// Extra header tags prepended to every FIX schema.
    pub fix_header_tags: Vec<u32>,
    /// FIX pair separator.
    pub fix_separator: u8,
    /// FIX tags left out of decoded records.
    ///
    /// Empty by default, so header and trailer tags such as BeginString (8),
    /// BodyLength (9) and CheckSum (10) stay in every record. List them here
    /// to drop them.
    pub excluded_record_tags: Vec<u32>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self::new(PathBuf::new())
    }
}

impl ParserConfig {
    /// Creates a configuration with defaults for everything but the schema.
    ///
    /// # Arguments
    /// * `schema_path` - Path of the schema or dictionary file
    #[must_use]
    pub fn new(schema_path: impl Into<PathBuf>) -> Self {
        Self {
            schema_path: schema_path.into(),
            message_type_inclusions: None,
            message_type_exclusions: None,
            sampling_count: None,
            stats_only: false,
            fix_header_tags: Vec::new(),
            fix_separator: DEFAULT_FIX_SEPARATOR,
            excluded_record_tags: Vec::new(),
        }
    }

    /// Sets the message types to decode.
    #[must_use]
    pub fn with_inclusions<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.message_type_inclusions = Some(types.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the message types to skip.
    #[must_use]
    pub fn with_exclusions<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.message_type_exclusions = Some(types.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the per-type sampling cap.
    #[must_use]
    pub const fn with_sampling_count(mut self, count: u64) -> Self {
        self.sampling_count = Some(count);
        self
    }

    /// Sets stats-only mode.
    #[must_use]
    pub const fn with_stats_only(mut self, stats_only: bool) -> Self {
        self.stats_only = stats_only;
        self
    }

    /// Sets the extra FIX header tags.
    #[must_use]
    pub fn with_fix_header_tags(mut self, tags: Vec<u32>) -> Self {
        self.fix_header_tags = tags;
        self
    }

    /// Sets the FIX pair separator.
    #[must_use]
    pub const fn with_fix_separator(mut self, separator: u8) -> Self {
        self.fix_separator = separator;
        self
    }

    /// Sets the FIX tags left out of decoded records.
    #[must_use]
    pub fn with_excluded_record_tags(mut self, tags: Vec<u32>) -> Self {
        self.excluded_record_tags = tags;
        self
    }

    /// Returns true if sampling is enabled.
    #[must_use]
    pub fn use_sampling(&self) -> bool {
        self.sampling_count.is_some_and(|n| n > 0)
    }

    /// Returns true if inclusion or exclusion filtering is enabled.
    #[must_use]
    pub const fn use_filtering(&self) -> bool {
        self.message_type_inclusions.is_some() || self.message_type_exclusions.is_some()
    }

    /// Returns true if a message type passes the filters.
    ///
    /// A type matches a filter entry by name or by id. When both lists are
    /// set only the inclusion list applies.
    #[must_use]
    pub fn includes(&self, name: &str, id: Option<&str>) -> bool {
        let listed = |types: &[String]| types.iter().any(|t| t == name || Some(t.as_str()) == id);
        match (&self.message_type_inclusions, &self.message_type_exclusions) {
            (Some(inclusions), _) => listed(inclusions.as_slice()),
            (None, Some(exclusions)) => !listed(exclusions.as_slice()),
            (None, None) => true,
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns `ConfigError::ConflictingFilters` if a type is both included
    /// and excluded.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (Some(inclusions), Some(exclusions)) =
            (&self.message_type_inclusions, &self.message_type_exclusions)
        else {
            return Ok(());
        };
        match inclusions.iter().find(|t| exclusions.contains(t)) {
            Some(conflict) => Err(ConfigError::ConflictingFilters(conflict.clone())),
            None => Ok(()),
        }
    }

    /// Splits a comma-separated list, trimming entries and dropping empty ones.
    ///
    /// # Arguments
    /// * `list` - Text such as `"Trade, Quote"`
    #[must_use]
    pub fn split_list(list: &str) -> Vec<String> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Parses a comma-separated list of tag numbers.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidTagList` if an entry is not a tag number.
    pub fn split_tags(list: &str) -> Result<Vec<u32>, ConfigError> {
        Self::split_list(list)
            .into_iter()
            .map(|t| t.parse().map_err(|_| ConfigError::InvalidTagList(t)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ParserConfig::new("schemas/cme.xml");
        assert_eq!(config.schema_path, PathBuf::from("schemas/cme.xml"));
        assert_eq!(config.fix_separator, 0x01);
        assert!(!config.use_sampling());
        assert!(!config.use_filtering());
        assert!(config.includes("Trade", None));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sampling_zero_is_disabled() {
        assert!(!ParserConfig::new("s.xml").with_sampling_count(0).use_sampling());
        assert!(ParserConfig::new("s.xml").with_sampling_count(3).use_sampling());
    }

    #[test]
    fn test_filters() {
        let config = ParserConfig::new("s.xml").with_inclusions(["A", "B"]);
        assert!(config.includes("A", None));
        assert!(!config.includes("C", None));

        let config = ParserConfig::new("s.xml").with_exclusions(["C"]);
        assert!(config.includes("A", None));
        assert!(!config.includes("C", None));

        let config = ParserConfig::new("s.xml").with_inclusions(["D"]);
        assert!(config.includes("NewOrderSingle", Some("D")));
    }

    #[test]
    fn test_inclusions_take_precedence() {
        let config = ParserConfig::new("s.xml").with_inclusions(["A"]).with_exclusions(["B"]);
        assert!(config.validate().is_ok());
        assert!(config.includes("A", None));
        assert!(!config.includes("C", None));
    }

    #[test]
    fn test_conflicting_filters() {
        let config = ParserConfig::new("s.xml").with_inclusions(["A", "B"]).with_exclusions(["B"]);
        assert_eq!(
            config.validate().unwrap_err(),
            ConfigError::ConflictingFilters("B".to_string())
        );
    }

    #[test]
    fn test_split_list() {
        assert_eq!(ParserConfig::split_list("Trade, Quote,,"), vec!["Trade", "Quote"]);
        assert!(ParserConfig::split_list("").is_empty());
        assert_eq!(ParserConfig::split_tags("1128, 1129").unwrap(), vec![1128, 1129]);
        assert_eq!(
            ParserConfig::split_tags("35,x").unwrap_err(),
            ConfigError::InvalidTagList("x".to_string())
        );
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let json = r#"{"schema_path": "FIX44.xml", "fix_separator": 124,
                       "message_type_inclusions": ["W"]}"#;
        let config: ParserConfig = serde_json::from_str(json).unwrap();
        assert_eq!(
            config,
            ParserConfig::new("FIX44.xml")
                .with_fix_separator(b'|')
                .with_inclusions(["W"])
        );
    }
}
