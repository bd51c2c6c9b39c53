//! Host configuration.
//!
//! # Responsibility
//! - Describe the filesystem layout and contract names the host relies on.
//! - Resolve defaults relative to the running executable.
//!
//! # Invariants
//! - `contract_file` is a bare file name; exclusion from the scan is by name.
//! - A validated config always yields a compilable candidate pattern.

use crate::catalog::{DiscoveryOptions, DuplicateNamePolicy, ModuleFailurePolicy};
use crate::contract::ContractNames;
use regex::Regex;
use serde::Deserialize;
use std::env::consts::{DLL_EXTENSION, DLL_PREFIX, DLL_SUFFIX};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Environment override for the module directory.
pub const MODULE_DIR_ENV: &str = "OPDECK_MODULE_DIR";

const CONTRACT_LIBRARY_NAME: &str = "opdeck_contract";
const OPERATION_LIBRARY_PREFIX: &str = "op_";

/// Filesystem layout and contract naming for one host.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostConfig {
    /// Directory scanned for operation modules; also holds the contract.
    pub module_dir: PathBuf,
    /// File name of the contract module inside `module_dir`.
    pub contract_file: String,
    pub namespace: String,
    pub interface_type: String,
    pub implementation_type: String,
    pub execute_method: String,
    pub name_property: String,
    /// Regex matched against candidate file names.
    pub module_pattern: String,
    pub failure_policy: ModuleFailurePolicy,
    pub duplicate_names: DuplicateNamePolicy,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            module_dir: PathBuf::from("."),
            contract_file: default_contract_file(),
            namespace: opdeck_abi::CONTRACT_NAMESPACE.to_string(),
            interface_type: opdeck_abi::CONTRACT_INTERFACE.to_string(),
            implementation_type: opdeck_abi::IMPLEMENTATION_TYPE.to_string(),
            execute_method: opdeck_abi::EXECUTE_METHOD.to_string(),
            name_property: opdeck_abi::NAME_PROPERTY.to_string(),
            module_pattern: default_module_pattern(),
            failure_policy: ModuleFailurePolicy::default(),
            duplicate_names: DuplicateNamePolicy::default(),
        }
    }
}

impl HostConfig {
    /// Defaults rooted at `module_dir`.
    pub fn with_module_dir(module_dir: impl Into<PathBuf>) -> Self {
        Self {
            module_dir: module_dir.into(),
            ..Self::default()
        }
    }

    /// Defaults rooted next to the running executable, unless
    /// `OPDECK_MODULE_DIR` names another directory.
    pub fn for_executable() -> Result<Self, ConfigError> {
        if let Some(raw) = std::env::var_os(MODULE_DIR_ENV) {
            let dir = PathBuf::from(raw);
            if !dir.as_os_str().is_empty() {
                return Ok(Self::with_module_dir(dir));
            }
        }
        let exe = std::env::current_exe().map_err(ConfigError::ExecutablePath)?;
        let dir = exe.parent().map(Path::to_path_buf).ok_or_else(|| {
            ConfigError::ExecutablePath(std::io::Error::other(
                "executable has no parent directory",
            ))
        })?;
        Ok(Self::with_module_dir(dir))
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Full path of the contract module.
    pub fn contract_path(&self) -> PathBuf {
        self.module_dir.join(&self.contract_file)
    }

    pub fn contract_names(&self) -> ContractNames {
        ContractNames {
            namespace: self.namespace.clone(),
            interface_type: self.interface_type.clone(),
            execute_method: self.execute_method.clone(),
        }
    }

    pub fn discovery_options(&self) -> Result<DiscoveryOptions, ConfigError> {
        let module_pattern =
            Regex::new(&self.module_pattern).map_err(|err| ConfigError::InvalidPattern {
                pattern: self.module_pattern.clone(),
                message: err.to_string(),
            })?;
        Ok(DiscoveryOptions {
            module_pattern,
            namespace: self.namespace.clone(),
            implementation_type: self.implementation_type.clone(),
            name_property: self.name_property.clone(),
            failure_policy: self.failure_policy,
            duplicate_names: self.duplicate_names,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validated_options().map(|_| ())
    }

    /// Validates every field and returns the compiled discovery options.
    pub fn validated_options(&self) -> Result<DiscoveryOptions, ConfigError> {
        self.check_fields()?;
        self.discovery_options()
    }

    fn check_fields(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("contract_file", &self.contract_file),
            ("namespace", &self.namespace),
            ("interface_type", &self.interface_type),
            ("implementation_type", &self.implementation_type),
            ("execute_method", &self.execute_method),
            ("name_property", &self.name_property),
            ("module_pattern", &self.module_pattern),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::EmptyField(field));
            }
        }
        if Path::new(&self.contract_file).file_name()
            != Some(std::ffi::OsStr::new(&self.contract_file))
        {
            return Err(ConfigError::ContractFileNotBare(self.contract_file.clone()));
        }
        Ok(())
    }
}

/// Platform file name of the contract library, e.g. `libopdeck_contract.so`.
pub fn default_contract_file() -> String {
    format!("{DLL_PREFIX}{CONTRACT_LIBRARY_NAME}{DLL_SUFFIX}")
}

/// Pattern matching operation libraries, e.g. `libop_add.so` or `op_add.dll`.
pub fn default_module_pattern() -> String {
    format!(
        r"^{}{}.*\.{}$",
        regex::escape(DLL_PREFIX),
        OPERATION_LIBRARY_PREFIX,
        regex::escape(DLL_EXTENSION)
    )
}

#[derive(Debug)]
pub enum ConfigError {
    EmptyField(&'static str),
    ContractFileNotBare(String),
    InvalidPattern { pattern: String, message: String },
    ExecutablePath(std::io::Error),
    Read { path: PathBuf, source: std::io::Error },
    Parse(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyField(field) => write!(f, "config field `{field}` must not be empty"),
            Self::ContractFileNotBare(value) => {
                write!(f, "contract_file must be a bare file name, got `{value}`")
            }
            Self::InvalidPattern { pattern, message } => {
                write!(f, "module_pattern `{pattern}` is invalid: {message}")
            }
            Self::ExecutablePath(err) => write!(f, "cannot locate executable directory: {err}"),
            Self::Read { path, source } => {
                write!(f, "cannot read config {}: {source}", path.display())
            }
            Self::Parse(message) => write!(f, "config is not valid JSON: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ExecutablePath(err) | Self::Read { source: err, .. } => Some(err),
            Self::EmptyField(_)
            | Self::ContractFileNotBare(_)
            | Self::InvalidPattern { .. }
            | Self::Parse(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{default_contract_file, ConfigError, HostConfig};
    use crate::catalog::{DuplicateNamePolicy, ModuleFailurePolicy};
    use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
    use std::path::PathBuf;

    #[test]
    fn defaults_are_valid() {
        let config = HostConfig::default();
        config.validate().expect("defaults validate");
        assert_eq!(config.namespace, "OpDeck");
        assert_eq!(config.interface_type, "IOperation");
        assert_eq!(config.implementation_type, "Operation");
        assert_eq!(config.failure_policy, ModuleFailurePolicy::Report);
        assert!(config.contract_file.contains("opdeck_contract"));
    }

    fn library_file(stem: &str) -> String {
        format!("{DLL_PREFIX}{stem}{DLL_SUFFIX}")
    }

    #[test]
    fn default_pattern_matches_operation_libraries_only() {
        let options = HostConfig::default().discovery_options().unwrap();
        assert!(options.module_pattern.is_match(&library_file("op_add")));
        assert!(options.module_pattern.is_match(&library_file("op_multiply")));
        assert!(!options.module_pattern.is_match(&library_file("opdeck_ffi")));
        assert!(!options.module_pattern.is_match(&default_contract_file()));
        assert!(!options.module_pattern.is_match("op_add.txt"));
        assert!(!options.module_pattern.is_match("notes.txt"));
    }

    #[test]
    fn validated_options_carry_config_settings() {
        let config = HostConfig {
            module_pattern: r"\.mod$".to_string(),
            failure_policy: ModuleFailurePolicy::Skip,
            ..HostConfig::default()
        };
        let options = config.validated_options().expect("valid config");
        assert!(options.module_pattern.is_match("op_add.mod"));
        assert_eq!(options.failure_policy, ModuleFailurePolicy::Skip);
        assert_eq!(options.implementation_type, "Operation");

        let empty = HostConfig {
            name_property: String::new(),
            ..config
        };
        assert!(matches!(
            empty.validated_options(),
            Err(ConfigError::EmptyField("name_property"))
        ));
    }

    #[test]
    fn contract_path_joins_module_dir() {
        let config = HostConfig::with_module_dir("/opt/opdeck");
        assert_eq!(
            config.contract_path(),
            PathBuf::from("/opt/opdeck").join(default_contract_file())
        );
    }

    #[test]
    fn parses_partial_json_with_defaults() {
        let config = HostConfig::from_json_str(
            r#"{
                "module_dir": "/srv/modules",
                "module_pattern": "\\.mod$",
                "failure_policy": "abort",
                "duplicate_names": "annotate"
            }"#,
        )
        .expect("valid json config");
        assert_eq!(config.module_dir, PathBuf::from("/srv/modules"));
        assert_eq!(config.failure_policy, ModuleFailurePolicy::Abort);
        assert_eq!(config.duplicate_names, DuplicateNamePolicy::Annotate);
        assert_eq!(config.execute_method, "Execute");
    }

    #[test]
    fn rejects_unknown_json_fields() {
        let err = HostConfig::from_json_str(r#"{ "plugin_dir": "/tmp" }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_invalid_pattern() {
        let config = HostConfig {
            module_pattern: "(".to_string(),
            ..HostConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn rejects_empty_names_and_nested_contract_path() {
        let empty = HostConfig {
            namespace: "  ".to_string(),
            ..HostConfig::default()
        };
        assert!(matches!(
            empty.validate(),
            Err(ConfigError::EmptyField("namespace"))
        ));

        let nested = HostConfig {
            contract_file: "core/contract.so".to_string(),
            ..HostConfig::default()
        };
        assert!(matches!(
            nested.validate(),
            Err(ConfigError::ContractFileNotBare(_))
        ));
    }

    #[test]
    fn reads_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("opdeck.json");
        std::fs::write(&path, r#"{ "name_property": "Label" }"#).unwrap();

        let config = HostConfig::from_json_file(&path).expect("config file");
        assert_eq!(config.name_property, "Label");

        let missing = HostConfig::from_json_file(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(missing, ConfigError::Read { .. }));
    }
}
