use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

use crate::error::Result;

pub const DEFAULT_MAX_LINE_LENGTH: usize = 200;
pub const DEFAULT_RESOURCE_PREFIX: &str = "/resources/";

#[derive(Debug, Clone)]
pub struct AutofixOptions {
    /// Inserted dependencies wrap onto new lines beyond this width.
    pub max_line_length: usize,
    /// Stripped from resource paths to obtain module names.
    pub resource_prefix: String,
    /// Process resources on the rayon thread pool.
    pub parallel: bool,
}

impl Default for AutofixOptions {
    fn default() -> Self {
        Self {
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            resource_prefix: DEFAULT_RESOURCE_PREFIX.to_string(),
            parallel: true,
        }
    }
}

impl AutofixOptions {
    /// Builds options from a loose key/value map. Unknown keys and values of
    /// the wrong type fall back to the defaults with a warning.
    pub fn from_config_map(mut config: HashMap<String, Value>) -> Self {
        let defaults = Self::default();
        let max_line_length = take(&mut config, "maxLineLength", |v| {
            v.as_u64().and_then(|v| usize::try_from(v).ok())
        })
        .unwrap_or(defaults.max_line_length);
        let resource_prefix = take(&mut config, "resourcePrefix", |v| {
            v.as_str().map(|s| s.to_string())
        })
        .unwrap_or(defaults.resource_prefix);
        let parallel =
            take(&mut config, "parallel", Value::as_bool).unwrap_or(defaults.parallel);
        for key in config.keys() {
            warn!(key = %key, "ignoring unknown option");
        }
        Self {
            max_line_length,
            resource_prefix,
            parallel,
        }
    }

    /// Reads a JSON object of options from `path`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: HashMap<String, Value> = serde_json::from_str(&text)?;
        Ok(Self::from_config_map(config))
    }
}

fn take<T>(
    config: &mut HashMap<String, Value>,
    key: &str,
    convert: impl FnOnce(&Value) -> Option<T>,
) -> Option<T> {
    let value = config.remove(key)?;
    let converted = convert(&value);
    if converted.is_none() {
        warn!(key, value = %value, "ignoring option of unexpected type");
    }
    converted
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_missing_fields() {
        let mut config = HashMap::new();
        config.insert("maxLineLength".to_string(), json!(120));
        let options = AutofixOptions::from_config_map(config);
        assert_eq!(options.max_line_length, 120);
        assert_eq!(options.resource_prefix, "/resources/");
        assert!(options.parallel);
    }

    #[test]
    fn reads_loose_config_map() {
        let mut config = HashMap::new();
        config.insert("resourcePrefix".to_string(), json!("/test-resources/"));
        config.insert("parallel".to_string(), json!("no"));
        config.insert("somethingElse".to_string(), json!(1));
        let options = AutofixOptions::from_config_map(config);
        assert_eq!(options.resource_prefix, "/test-resources/");
        assert!(options.parallel);
        assert_eq!(options.max_line_length, 200);
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("autofix.json");
        std::fs::write(&path, r#"{"parallel": false, "maxLineLength": "wide"}"#).unwrap();
        let options = AutofixOptions::from_file(&path).unwrap();
        assert!(!options.parallel);
        assert_eq!(options.max_line_length, 200);
        assert!(AutofixOptions::from_file(&dir.path().join("missing.json")).is_err());

        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(AutofixOptions::from_file(&path).is_err());
    }
}
