//! JSON settings files.
//!
//! Both files may be partial: missing fields fall back to the defaults.

use std::path::Path;

use stylepulse_engine::{AliasTable, ParameterSet};

use crate::csv_loader::LoadError;

fn read_to_string(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

/// Load a `ParameterSet`. Validation is left to the caller so that the
/// rejected name and reason surface as a `ConfigurationError`.
pub fn load_params_file(path: impl AsRef<Path>) -> Result<ParameterSet, LoadError> {
    let path = path.as_ref();
    let text = read_to_string(path)?;
    serde_json::from_str(&text).map_err(|e| LoadError::Json {
        path: path.display().to_string(),
        source: e,
    })
}

/// Load an `AliasTable`. Alias strings are stored as written; they are
/// normalized at match time.
pub fn load_aliases_file(path: impl AsRef<Path>) -> Result<AliasTable, LoadError> {
    let path = path.as_ref();
    let text = read_to_string(path)?;
    let table: AliasTable = serde_json::from_str(&text).map_err(|e| LoadError::Json {
        path: path.display().to_string(),
        source: e,
    })?;
    log::info!("loaded alias table from {}", path.display());
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stylepulse_engine::{CanonicalField, SourceKind};

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "stylepulse-config-{}-{}",
            std::process::id(),
            name
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn partial_params_file_uses_defaults() {
        let path = write_temp("params.json", r#"{"forecast_horizon_days": 15}"#);
        let params = load_params_file(&path).unwrap();
        assert_eq!(params.forecast_horizon_days, 15);
        assert_eq!(params.zero_sale_age_days, 14);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn malformed_params_file_is_a_json_error() {
        let path = write_temp("broken.json", "{ zero_sale_age_days: ");
        let err = load_params_file(&path).unwrap_err();
        assert!(matches!(err, LoadError::Json { .. }));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn alias_file_replaces_one_kind_only() {
        let path = write_temp(
            "aliases.json",
            r#"{"sales": {"style_id": ["article"], "date": ["when"]}}"#,
        );
        let table = load_aliases_file(&path).unwrap();
        assert_eq!(
            table.aliases(SourceKind::Sales, CanonicalField::StyleId),
            &["article".to_string()]
        );
        assert!(!table
            .aliases(SourceKind::Returns, CanonicalField::StyleId)
            .is_empty());
        std::fs::remove_file(path).ok();
    }
}
