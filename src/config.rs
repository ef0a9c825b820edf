use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path, time::Duration};

use crate::{Error, InternalResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Name given to rules that arrive without one.
    #[serde(default = "default_rule_name")]
    pub default_rule_name: String,

    #[serde(default = "default_max_expression_depth")]
    pub max_expression_depth: usize,

    /// Compiles slower than this are logged as warnings.
    #[serde(default = "default_slow_compile_threshold", with = "duration_ms")]
    pub slow_compile_threshold: Duration,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            default_rule_name: default_rule_name(),
            max_expression_depth: default_max_expression_depth(),
            slow_compile_threshold: default_slow_compile_threshold(),
        }
    }
}

impl CompilerConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> InternalResult<Self> {
        from_file(path)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(json: &str) -> InternalResult<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))
    }
}

fn default_rule_name() -> String {
    "Unnamed Rule".to_string()
}

fn default_max_expression_depth() -> usize {
    128
}

fn default_slow_compile_threshold() -> Duration {
    Duration::from_millis(50)
}

// Duration <-> milliseconds
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

pub fn from_file<P: AsRef<Path>, T: for<'de> Deserialize<'de>>(path: P) -> InternalResult<T> {
    let file = File::open(path.as_ref()).map_err(|e| {
        Error::Config(format!(
            "Failed to open config file {}: {}",
            path.as_ref().display(),
            e
        ))
    })?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader).map_err(|e| Error::Config(e.to_string()))
}
