use crate::error::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Program configuration
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Input sheet
    pub input_path: PathBuf,
    /// Output sheet (appended to)
    pub output_path: PathBuf,
    /// Directory for persisted scan payloads
    pub results_dir: PathBuf,
    /// URLs per submission
    pub batch_size: usize,
    // --- scan service ---
    pub scan_api_base_url: String,
    pub scan_request_timeout_secs: u64,
    pub poll_interval_secs: u64,
    /// Takes precedence over `poll_max_wait_secs` when set
    pub poll_max_attempts: Option<u32>,
    pub poll_max_wait_secs: u64,
    /// Jobs polled at the same time
    pub max_concurrent_polls: usize,
    // --- retrieval ---
    pub fetch_timeout_secs: u64,
    pub box_client_id: Option<String>,
    pub box_client_secret: Option<String>,
    pub box_access_token: Option<String>,
    // --- run policy ---
    /// Cancel everything still pending after this many seconds
    pub run_deadline_secs: Option<u64>,
    /// Delete prior output and results before starting
    pub reset: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("input.csv"),
            output_path: PathBuf::from("output.csv"),
            results_dir: PathBuf::from("results"),
            batch_size: 100,
            scan_api_base_url: "https://scan-dev.equalify.app".to_string(),
            scan_request_timeout_secs: 30,
            poll_interval_secs: 15,
            poll_max_attempts: None,
            poll_max_wait_secs: 180,
            max_concurrent_polls: 16,
            fetch_timeout_secs: 15,
            box_client_id: None,
            box_client_secret: None,
            box_access_token: None,
            run_deadline_secs: None,
            reset: false,
        }
    }
}

/// Box API secrets; all three must be present
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoxCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub access_token: String,
}

/// How long a single job may be polled
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollBudget {
    Attempts(u32),
    MaxWait(Duration),
}

/// Interval and budget for the job poller
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub budget: PollBudget,
}

impl PollPolicy {
    pub fn new(interval: Duration, budget: PollBudget) -> Self {
        Self { interval, budget }
    }

    /// Number of status requests a job gets before it times out
    pub fn max_attempts(&self) -> u32 {
        match self.budget {
            PollBudget::Attempts(n) => n.max(1),
            PollBudget::MaxWait(wait) => {
                let interval = self.interval.as_millis().max(1);
                let attempts = wait.as_millis().div_ceil(interval);
                u32::try_from(attempts).unwrap_or(u32::MAX).max(1)
            }
        }
    }

    /// Wall-clock budget reported in timeout notes
    pub fn budget_duration(&self) -> Duration {
        match self.budget {
            PollBudget::Attempts(n) => self.interval * n,
            PollBudget::MaxWait(wait) => wait,
        }
    }
}

impl Config {
    /// Defaults, then the optional TOML file, then environment variables
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };
        let config = base.with_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::TomlParseFailed {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    fn with_env_overrides(self) -> Result<Self, ConfigError> {
        Ok(Self {
            input_path: env_string("INPUT_PATH").map(PathBuf::from).unwrap_or(self.input_path),
            output_path: env_string("OUTPUT_PATH").map(PathBuf::from).unwrap_or(self.output_path),
            results_dir: env_string("RESULTS_DIR").map(PathBuf::from).unwrap_or(self.results_dir),
            batch_size: env_parse("SCAN_BATCH_SIZE", "integer")?.unwrap_or(self.batch_size),
            scan_api_base_url: env_string("SCAN_API_BASE_URL").unwrap_or(self.scan_api_base_url),
            scan_request_timeout_secs: env_parse("SCAN_REQUEST_TIMEOUT_SECS", "integer")?
                .unwrap_or(self.scan_request_timeout_secs),
            poll_interval_secs: env_parse("POLL_INTERVAL_SECS", "integer")?
                .unwrap_or(self.poll_interval_secs),
            poll_max_attempts: env_parse("POLL_MAX_ATTEMPTS", "integer")?.or(self.poll_max_attempts),
            poll_max_wait_secs: env_parse("POLL_MAX_WAIT_SECS", "integer")?
                .unwrap_or(self.poll_max_wait_secs),
            max_concurrent_polls: env_parse("MAX_CONCURRENT_POLLS", "integer")?
                .unwrap_or(self.max_concurrent_polls),
            fetch_timeout_secs: env_parse("FETCH_TIMEOUT_SECS", "integer")?
                .unwrap_or(self.fetch_timeout_secs),
            box_client_id: env_string("BOX_CLIENT_ID").or(self.box_client_id),
            box_client_secret: env_string("BOX_CLIENT_SECRET").or(self.box_client_secret),
            box_access_token: env_string("BOX_ACCESS_TOKEN").or(self.box_access_token),
            run_deadline_secs: env_parse("RUN_DEADLINE_SECS", "integer")?.or(self.run_deadline_secs),
            reset: env_parse("RESET_OUTPUT", "boolean")?.unwrap_or(self.reset),
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Zero { field: "batch_size" });
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Zero {
                field: "poll_interval_secs",
            });
        }
        if self.max_concurrent_polls == 0 {
            return Err(ConfigError::Zero {
                field: "max_concurrent_polls",
            });
        }
        Ok(())
    }

    pub fn poll_policy(&self) -> PollPolicy {
        let budget = match self.poll_max_attempts {
            Some(n) => PollBudget::Attempts(n),
            None => PollBudget::MaxWait(Duration::from_secs(self.poll_max_wait_secs)),
        };
        PollPolicy::new(Duration::from_secs(self.poll_interval_secs), budget)
    }

    /// Present only when all three secrets are non-empty
    pub fn box_credentials(&self) -> Option<BoxCredentials> {
        let non_empty = |v: &Option<String>| v.as_ref().filter(|s| !s.trim().is_empty()).cloned();
        Some(BoxCredentials {
            client_id: non_empty(&self.box_client_id)?,
            client_secret: non_empty(&self.box_client_secret)?,
            access_token: non_empty(&self.box_access_token)?,
        })
    }

    pub fn scan_request_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_request_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn run_deadline(&self) -> Option<Duration> {
        self.run_deadline_secs.map(Duration::from_secs)
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(name: &str, expected_type: &str) -> Result<Option<T>, ConfigError> {
    match env_string(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_max_wait_budget_rounds_up_to_attempts() {
        let policy = PollPolicy::new(
            Duration::from_secs(15),
            PollBudget::MaxWait(Duration::from_secs(60)),
        );
        assert_eq!(policy.max_attempts(), 4);

        let policy = PollPolicy::new(
            Duration::from_secs(15),
            PollBudget::MaxWait(Duration::from_secs(50)),
        );
        assert_eq!(policy.max_attempts(), 4);

        let policy = PollPolicy::new(Duration::from_secs(15), PollBudget::MaxWait(Duration::ZERO));
        assert_eq!(policy.max_attempts(), 1);
    }

    #[test]
    fn test_attempt_budget_duration() {
        let policy = PollPolicy::new(Duration::from_secs(10), PollBudget::Attempts(6));
        assert_eq!(policy.max_attempts(), 6);
        assert_eq!(policy.budget_duration(), Duration::from_secs(60));
    }

    #[test]
    fn test_box_credentials_require_all_three() {
        let mut config = Config {
            box_client_id: Some("id".into()),
            box_client_secret: Some("secret".into()),
            ..Config::default()
        };
        assert!(config.box_credentials().is_none());

        config.box_access_token = Some("  ".into());
        assert!(config.box_credentials().is_none());

        config.box_access_token = Some("token".into());
        assert_eq!(config.box_credentials().unwrap().access_token, "token");
    }

    #[test]
    fn test_toml_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "batch_size = 25\npoll_interval_secs = 10\npoll_max_attempts = 6\nresults_dir = \"out/results\""
        )
        .unwrap();

        let config = Config::from_toml_file(file.path()).unwrap();
        assert_eq!(config.batch_size, 25);
        assert_eq!(config.results_dir, PathBuf::from("out/results"));
        assert_eq!(config.input_path, PathBuf::from("input.csv"));
        assert_eq!(
            config.poll_policy(),
            PollPolicy::new(Duration::from_secs(10), PollBudget::Attempts(6))
        );
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        let config = Config {
            batch_size: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_poll_interval_is_rejected() {
        let config = Config {
            poll_interval_secs: 0,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Zero {
                field: "poll_interval_secs"
            })
        ));
        assert!(Config::default().validate().is_ok());
    }
}
