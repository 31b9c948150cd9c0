use std::path::{Path, PathBuf};

use billing_core::NormalizationDefaults;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Locations and normalization defaults for one pipeline run.
///
/// Every key is optional in the TOML file:
///
/// ```toml
/// input = "dados_cobranca.csv"
/// database = "resumo.db"
///
/// [defaults]
/// unknown_creditor = "Credor Desconhecido"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub normalized_export: PathBuf,
    pub summary_export: PathBuf,
    pub database: PathBuf,
    pub defaults: NormalizationDefaults,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("dados_cobranca.csv"),
            normalized_export: PathBuf::from("dados_cobranca_formatado.csv"),
            summary_export: PathBuf::from("resumo_mensal.csv"),
            database: PathBuf::from("resumo.db"),
            defaults: NormalizationDefaults::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content, path)
    }

    /// Loads `path` when given, otherwise the built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use billing_core::TitleStatus;

    #[test]
    fn defaults_use_legacy_file_names() {
        let config = PipelineConfig::default();
        assert_eq!(config.input, PathBuf::from("dados_cobranca.csv"));
        assert_eq!(config.normalized_export, PathBuf::from("dados_cobranca_formatado.csv"));
        assert_eq!(config.summary_export, PathBuf::from("resumo_mensal.csv"));
        assert_eq!(config.database, PathBuf::from("resumo.db"));
    }

    #[test]
    fn empty_file_gives_defaults() {
        let config = PipelineConfig::from_toml_str("", Path::new("billing.toml")).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn partial_file_overrides_only_given_keys() {
        let toml = r#"
            input = "raw/export.csv"

            [defaults]
            unknown_creditor = "Sem Credor"
            default_status = "Vencido"
        "#;
        let config = PipelineConfig::from_toml_str(toml, Path::new("billing.toml")).unwrap();
        assert_eq!(config.input, PathBuf::from("raw/export.csv"));
        assert_eq!(config.database, PathBuf::from("resumo.db"));
        assert_eq!(config.defaults.unknown_creditor, "Sem Credor");
        assert_eq!(config.defaults.default_status, TitleStatus::Overdue);
        assert_eq!(config.defaults.client_label, "Cliente");
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = PipelineConfig::from_toml_str("input = [", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PipelineConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn no_path_means_defaults() {
        assert_eq!(PipelineConfig::load_or_default(None).unwrap(), PipelineConfig::default());
    }
}
