//! # Schema construction errors

use thiserror::Error;

/// Result type for schema-building operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors raised while building a schema
#[derive(Debug, Clone, Error)]
pub enum SchemaError {
    #[error("Record '{0}' declares field '{1}' more than once")]
    DuplicateField(String, String),

    #[error("Enum '{0}' declares variant '{1}' more than once")]
    DuplicateVariant(String, String),

    #[error("Enum '{0}' encodes two variants as {1}")]
    DuplicateVariantValue(String, String),

    #[error("Record '{0}' maps two fields to external name '{1}'")]
    DuplicateExternalName(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offender() {
        let err = SchemaError::DuplicateField("Point".into(), "x".into());
        assert!(err.to_string().contains("Point"));
        assert!(err.to_string().contains("'x'"));
    }
}
