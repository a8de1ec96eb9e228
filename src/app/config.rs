use crate::app::cli::CliConfig;
use crate::app::error::{AppError, Result};
use crate::app::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub run: RunSection,
    pub filter: FilterConfig,
    pub input: InputConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSection {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Filter to run, selected by the `kind` key of the `[filter]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterConfig {
    /// Kinematic Kalman filter; `order` 0 tracks a constant, 1 a
    /// constant velocity, 2 a constant acceleration.
    Kalman {
        order: usize,
        r: f64,
        q: f64,
        #[serde(default = "default_p0")]
        p0: f64,
    },
    Gh {
        g: f64,
        h: f64,
    },
    Ghk {
        g: f64,
        h: f64,
        k: f64,
    },
    FadingMemory {
        order: usize,
        beta: f64,
    },
    LeastSquares {
        order: usize,
        #[serde(default)]
        noise_sigma: f64,
    },
    Hinfinity {
        gamma: f64,
        q: f64,
        r: f64,
    },
}

fn default_p0() -> f64 {
    500.0
}

impl FilterConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            FilterConfig::Kalman { .. } => "kalman",
            FilterConfig::Gh { .. } => "gh",
            FilterConfig::Ghk { .. } => "ghk",
            FilterConfig::FadingMemory { .. } => "fading_memory",
            FilterConfig::LeastSquares { .. } => "least_squares",
            FilterConfig::Hinfinity { .. } => "hinfinity",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    pub path: String,
    #[serde(default = "default_column")]
    pub column: String,
    #[serde(default = "default_dt")]
    pub dt: f64,
}

fn default_column() -> String {
    "z".to_string()
}

fn default_dt() -> f64 {
    1.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub path: String,
    #[serde(default)]
    pub format: OutputFormat,
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;
        Ok(toml::from_str(&processed_content)?)
    }

    /// Replaces `${VAR}` with the environment value; unset variables are
    /// left as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| AppError::config(format!("invalid substitution pattern: {}", e)))?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// Command line flags win over the file.
    pub fn apply_overrides(&mut self, cli: &CliConfig) {
        if let Some(input) = &cli.input {
            tracing::info!("🔧 Input overridden to: {}", input);
            self.input.path = input.clone();
        }
        if let Some(output) = &cli.output {
            tracing::info!("🔧 Output overridden to: {}", output);
            self.output.path = output.clone();
        }
        if let Some(format) = cli.format {
            self.output.format = format;
        }
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("run.name", &self.run.name)?;
        validation::validate_path("input.path", &self.input.path)?;
        validation::validate_file_extension("input.path", &self.input.path, &["csv"])?;
        validation::validate_non_empty_string("input.column", &self.input.column)?;
        validation::validate_positive("input.dt", self.input.dt)?;
        validation::validate_path("output.path", &self.output.path)?;

        match self.filter {
            FilterConfig::Kalman { order, r, q, p0 } => {
                validation::validate_range("filter.order", order, 0, 3)?;
                validation::validate_positive("filter.r", r)?;
                validation::validate_non_negative("filter.q", q)?;
                validation::validate_positive("filter.p0", p0)?;
            }
            FilterConfig::Gh { g, h } => {
                validation::validate_range("filter.g", g, 0.0, 2.0)?;
                validation::validate_range("filter.h", h, 0.0, 2.0)?;
            }
            FilterConfig::Ghk { g, h, k } => {
                validation::validate_range("filter.g", g, 0.0, 2.0)?;
                validation::validate_range("filter.h", h, 0.0, 2.0)?;
                validation::validate_range("filter.k", k, 0.0, 2.0)?;
            }
            FilterConfig::FadingMemory { order, beta } => {
                validation::validate_range("filter.order", order, 0, 2)?;
                validation::validate_open_unit("filter.beta", beta)?;
            }
            FilterConfig::LeastSquares { order, noise_sigma } => {
                validation::validate_range("filter.order", order, 0, 2)?;
                validation::validate_non_negative("filter.noise_sigma", noise_sigma)?;
            }
            FilterConfig::Hinfinity { gamma, q, r } => {
                validation::validate_non_negative("filter.gamma", gamma)?;
                validation::validate_non_negative("filter.q", q)?;
                validation::validate_positive("filter.r", r)?;
            }
        }

        Ok(())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BASIC: &str = r#"
[run]
name = "ramp"
description = "constant velocity target"

[filter]
kind = "kalman"
order = 1
r = 5.0
q = 0.01

[input]
path = "data/ramp.csv"
column = "range"
dt = 0.5

[output]
path = "out/ramp.csv"
"#;

    #[test]
    fn test_parse_basic_toml_config() {
        let config = TomlConfig::from_toml_str(BASIC).unwrap();

        assert_eq!(config.run.name, "ramp");
        assert_eq!(
            config.filter,
            FilterConfig::Kalman {
                order: 1,
                r: 5.0,
                q: 0.01,
                p0: 500.0
            }
        );
        assert_eq!(config.input.column, "range");
        assert_eq!(config.input.dt, 0.5);
        assert_eq!(config.output.format, OutputFormat::Csv);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_every_filter_kind_parses() {
        for (table, kind) in [
            ("kind = \"gh\"\ng = 0.6\nh = 0.2", "gh"),
            ("kind = \"ghk\"\ng = 0.5\nh = 0.2\nk = 0.05", "ghk"),
            ("kind = \"fading_memory\"\norder = 1\nbeta = 0.8", "fading_memory"),
            ("kind = \"least_squares\"\norder = 2", "least_squares"),
            ("kind = \"hinfinity\"\ngamma = 0.0\nq = 0.01\nr = 1.0", "hinfinity"),
        ] {
            let content = format!(
                "[run]\nname = \"x\"\n[filter]\n{}\n[input]\npath = \"z.csv\"\n[output]\npath = \"o.json\"\nformat = \"json\"\n",
                table
            );
            let config = TomlConfig::from_toml_str(&content).unwrap();
            assert_eq!(config.filter.kind(), kind);
            assert_eq!(config.input.column, "z");
            assert_eq!(config.output.format, OutputFormat::Json);
            assert!(config.validate().is_ok());
        }
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let content = BASIC.replace("kind = \"kalman\"", "kind = \"particle\"");
        assert!(matches!(
            TomlConfig::from_toml_str(&content),
            Err(AppError::TomlError(_))
        ));
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("FILTERPY_TEST_INPUT", "env/measurements.csv");

        let content = BASIC.replace("data/ramp.csv", "${FILTERPY_TEST_INPUT}");
        let config = TomlConfig::from_toml_str(&content).unwrap();
        assert_eq!(config.input.path, "env/measurements.csv");

        let content = BASIC.replace("data/ramp.csv", "${FILTERPY_TEST_UNSET_VAR}");
        let config = TomlConfig::from_toml_str(&content).unwrap();
        assert_eq!(config.input.path, "${FILTERPY_TEST_UNSET_VAR}");

        std::env::remove_var("FILTERPY_TEST_INPUT");
    }

    #[test]
    fn test_config_validation() {
        let config = TomlConfig::from_toml_str(&BASIC.replace("dt = 0.5", "dt = 0.0")).unwrap();
        assert!(config.validate().is_err());

        let config = TomlConfig::from_toml_str(&BASIC.replace("order = 1", "order = 7")).unwrap();
        assert!(config.validate().is_err());

        let config = TomlConfig::from_toml_str(&BASIC.replace("ramp.csv\"\ncolumn", "ramp.txt\"\ncolumn")).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_blank_required_fields_are_missing() {
        let config = TomlConfig::from_toml_str(&BASIC.replace("column = \"range\"", "column = \"\"")).unwrap();
        assert!(matches!(
            config.validate(),
            Err(AppError::MissingConfigError { field }) if field == "input.column"
        ));

        let config = TomlConfig::from_toml_str(&BASIC.replace("out/ramp.csv", "")).unwrap();
        assert!(matches!(
            config.validate(),
            Err(AppError::MissingConfigError { field }) if field == "output.path"
        ));
    }

    #[test]
    fn test_nan_gain_is_rejected() {
        let table = "kind = \"gh\"\ng = nan\nh = 0.1";
        let content = BASIC.replace("kind = \"kalman\"\norder = 1\nr = 5.0\nq = 0.01", table);
        let config = TomlConfig::from_toml_str(&content).unwrap();
        assert_eq!(config.filter.kind(), "gh");
        assert!(matches!(
            config.validate(),
            Err(AppError::InvalidConfigValueError { field, .. }) if field == "filter.g"
        ));
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = TomlConfig::from_toml_str(BASIC).unwrap();
        let cli = CliConfig::parse_from([
            "filterpy",
            "--config",
            "run.toml",
            "--output",
            "elsewhere.json",
            "--format",
            "json",
        ]);
        config.apply_overrides(&cli);
        assert_eq!(config.input.path, "data/ramp.csv");
        assert_eq!(config.output.path, "elsewhere.json");
        assert_eq!(config.output.format, OutputFormat::Json);
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(BASIC.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.run.name, "ramp");
        assert!(TomlConfig::from_file("does/not/exist.toml").is_err());
    }
}
