use chrono::{DateTime, FixedOffset};
use std::fmt;
use std::str::FromStr;

/// Timestamp layout used in file stems once `_` has been mapped back to `:`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// Same layout with `_` in place of `:`, as written on disk.
pub const FILE_STEM_FORMAT: &str = "%Y-%m-%dT%H_%M_%S%z";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActivityType {
    Run,
    Core,
    Weight,
}

impl ActivityType {
    pub const ALL: [Self; 3] = [Self::Run, Self::Core, Self::Weight];

    /// Directory name and `activityType` column value.
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Run => "run",
            Self::Core => "core",
            Self::Weight => "weight",
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownActivityType(pub String);

impl FromStr for ActivityType {
    type Err = UnknownActivityType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.tag() == s)
            .ok_or_else(|| UnknownActivityType(s.to_string()))
    }
}

/// One heart-rate summary, as found in a single source file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActivityRecord {
    pub activity_type: ActivityType,
    pub timestamp: DateTime<FixedOffset>,
    pub active_seconds: i32,
    pub average_heart_rate: i32,
    pub max_heart_rate: i32,
}

impl ActivityRecord {
    /// `2024-01-01T08_00_00+0000.json`
    pub fn file_name(&self) -> String {
        format!("{}.json", self.timestamp.format(FILE_STEM_FORMAT))
    }

    /// `run/2024-01-01T08_00_00+0000.json`, relative to the watch root.
    pub fn relative_path(&self) -> String {
        format!("{}/{}", self.activity_type, self.file_name())
    }

    pub fn to_source_json(&self) -> String {
        serde_json::json!({
            "activeSeconds": { "value": self.active_seconds },
            "averageHR": { "value": self.average_heart_rate },
            "maxHR": { "value": self.max_heart_rate },
        })
        .to_string()
    }
}
