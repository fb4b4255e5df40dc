//! Intake checks for an uploaded CSV file.
//!
//! Intake only looks at the file's presence, name and size. Content is not
//! parsed until the job is processed.

use crate::entity::EntityType;

/// Extension every upload must carry (compared case-insensitively).
pub const CSV_EXTENSION: &str = "csv";

/// Default ceiling on upload size: 50 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Reasons an upload is rejected before a job is created.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntakeError {
    #[error("Invalid upload type '{0}'. Expected one of: regions, provinces, citymun, barangays")]
    UnknownUploadType(String),

    #[error("No file was uploaded")]
    MissingFile,

    #[error("Invalid file type '{0}'. Only .csv files are accepted")]
    WrongExtension(String),

    #[error("The uploaded file is empty")]
    EmptyFile,

    #[error("The uploaded file is {size} bytes, larger than the {limit}-byte limit")]
    TooLarge { size: usize, limit: usize },
}

/// Resolve the `upload_type` form value.
pub fn parse_upload_type(value: &str) -> Result<EntityType, IntakeError> {
    EntityType::from_upload_type(value).ok_or_else(|| IntakeError::UnknownUploadType(value.to_string()))
}

/// Check that a file name ends in `.csv`.
pub fn validate_file_name(file_name: &str) -> Result<(), IntakeError> {
    let extension = std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");
    if extension.eq_ignore_ascii_case(CSV_EXTENSION) {
        Ok(())
    } else {
        Err(IntakeError::WrongExtension(file_name.to_string()))
    }
}

/// Check that the upload has content and fits under `limit`.
pub fn validate_file_size(size: usize, limit: usize) -> Result<(), IntakeError> {
    if size == 0 {
        return Err(IntakeError::EmptyFile);
    }
    if size > limit {
        return Err(IntakeError::TooLarge { size, limit });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn csv_extension_is_case_insensitive() {
        assert!(validate_file_name("regions.csv").is_ok());
        assert!(validate_file_name("REGIONS.CSV").is_ok());
        assert!(validate_file_name("dir/with.dots/barangays.Csv").is_ok());
    }

    #[test]
    fn other_extensions_are_rejected() {
        assert_matches!(validate_file_name("regions.xlsx"), Err(IntakeError::WrongExtension(_)));
        assert_matches!(validate_file_name("regions"), Err(IntakeError::WrongExtension(_)));
        assert_matches!(validate_file_name("csv"), Err(IntakeError::WrongExtension(_)));
    }

    #[test]
    fn empty_file_is_rejected() {
        assert_eq!(validate_file_size(0, 100), Err(IntakeError::EmptyFile));
    }

    #[test]
    fn oversize_file_is_rejected() {
        assert_matches!(
            validate_file_size(101, 100),
            Err(IntakeError::TooLarge { size: 101, limit: 100 })
        );
        assert!(validate_file_size(100, 100).is_ok());
    }

    #[test]
    fn upload_type_errors_name_the_value() {
        let err = parse_upload_type("towns").unwrap_err();
        assert!(err.to_string().contains("towns"));
        assert_eq!(parse_upload_type("citymun"), Ok(EntityType::CityMun));
    }
}
