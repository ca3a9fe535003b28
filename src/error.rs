use thiserror::Error;

/// Errors that can occur while loading inputs or simulating stand growth.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Excel error: {0}")]
    Excel(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Species not found: '{0}' is not in the coefficient store")]
    SpeciesNotFound(String),

    #[error("Coefficient missing: species '{species}' has no value for '{field}'")]
    CoefficientMissing { species: String, field: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),
}

impl From<calamine::Error> for SimError {
    fn from(e: calamine::Error) -> Self {
        SimError::Excel(e.to_string())
    }
}

impl From<calamine::XlsxError> for SimError {
    fn from(e: calamine::XlsxError) -> Self {
        SimError::Excel(e.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for SimError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        SimError::Excel(e.to_string())
    }
}

impl From<toml::ser::Error> for SimError {
    fn from(e: toml::ser::Error) -> Self {
        SimError::ParseError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = SimError::from(io_err);
        let msg = err.to_string();
        assert!(msg.contains("IO error"));
        assert!(msg.contains("file not found"));
    }

    #[test]
    fn test_species_not_found_display() {
        let err = SimError::SpeciesNotFound("XX".to_string());
        assert_eq!(
            err.to_string(),
            "Species not found: 'XX' is not in the coefficient store"
        );
    }

    #[test]
    fn test_coefficient_missing_display() {
        let err = SimError::CoefficientMissing {
            species: "LP".to_string(),
            field: "cr_d2".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'LP'"));
        assert!(msg.contains("'cr_d2'"));
    }

    #[test]
    fn test_invalid_config_display() {
        let err = SimError::InvalidConfig("time_step must be between 1 and 10".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: time_step must be between 1 and 10"
        );
    }

    #[test]
    fn test_toml_error_conversion() {
        let parse: Result<toml::Value, _> = toml::from_str("= broken");
        let err = SimError::from(parse.unwrap_err());
        assert!(err.to_string().starts_with("TOML error"));
    }

    #[test]
    fn test_excel_error_display() {
        let err = SimError::Excel("bad sheet".to_string());
        assert_eq!(err.to_string(), "Excel error: bad sheet");
    }

    #[test]
    fn test_error_is_debug() {
        let err = SimError::InsufficientData("empty stand".to_string());
        let debug = format!("{err:?}");
        assert!(debug.contains("InsufficientData"));
    }
}
