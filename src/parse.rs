use crate::error::ParseError;
use crate::types::{ActivityRecord, ActivityType, TIMESTAMP_FORMAT};
use chrono::DateTime;
use serde_json::Value as JsonValue;
use std::fs;
use std::path::Path;

/// Read `<root>/<type>/<timestamp>.<ext>` and build its record.
pub fn parse_file(path: &Path) -> Result<ActivityRecord, ParseError> {
    let contents = fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_record(path, &contents)
}

/// Build a record from a path and the file's contents.
///
/// The activity type comes from the parent directory name, the timestamp from
/// the file stem, and the three numbers from the JSON body.
pub fn parse_record(path: &Path, contents: &str) -> Result<ActivityRecord, ParseError> {
    let activity_type = activity_type_of(path)?;

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let timestamp = DateTime::parse_from_str(&stem.replace('_', ":"), TIMESTAMP_FORMAT)
        .map_err(|source| ParseError::BadTimestamp {
            path: path.to_path_buf(),
            stem: stem.clone(),
            source,
        })?;

    let json: JsonValue = serde_json::from_str(contents).map_err(|source| ParseError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let active_seconds = int_field(path, &json, "activeSeconds")?;
    if active_seconds < 0 {
        return Err(ParseError::NegativeDuration {
            path: path.to_path_buf(),
            value: active_seconds,
        });
    }

    Ok(ActivityRecord {
        activity_type,
        timestamp,
        active_seconds,
        average_heart_rate: int_field(path, &json, "averageHR")?,
        max_heart_rate: int_field(path, &json, "maxHR")?,
    })
}

fn activity_type_of(path: &Path) -> Result<ActivityType, ParseError> {
    let Some(dir) = path.parent().and_then(Path::file_name) else {
        return Err(ParseError::NoActivityDir {
            path: path.to_path_buf(),
        });
    };

    let tag = dir.to_string_lossy();
    tag.parse().map_err(|_| ParseError::UnknownActivityType {
        path: path.to_path_buf(),
        tag: tag.into_owned(),
    })
}

/// `{"<field>": {"value": <int>}}`
fn int_field(path: &Path, json: &JsonValue, field: &'static str) -> Result<i32, ParseError> {
    let Some(value) = json.get(field).and_then(|f| f.get("value")) else {
        return Err(ParseError::MissingField {
            path: path.to_path_buf(),
            field,
        });
    };

    value
        .as_i64()
        .and_then(|v| i32::try_from(v).ok())
        .ok_or_else(|| ParseError::NotAnInteger {
            path: path.to_path_buf(),
            field,
            value: value.clone(),
        })
}
