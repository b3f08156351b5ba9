use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::TopicId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SubjectError {
    #[error("unknown subject: {0:?}")]
    Unknown(String),
}

//
// ─── GRADE ─────────────────────────────────────────────────────────────────────
//

/// Curriculum year, `0` being kindergarten.
///
/// Any value is representable: lookups for grades outside `0..=5` simply come
/// back empty instead of failing.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Grade(u8);

impl Grade {
    pub const KINDERGARTEN: Grade = Grade(0);
    pub const HIGHEST: Grade = Grade(5);

    /// Every grade shipped with the catalog, in ascending order.
    pub const ALL: [Grade; 6] = [Grade(0), Grade(1), Grade(2), Grade(3), Grade(4), Grade(5)];

    #[must_use]
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    /// Returns true for grades `0..=5`.
    #[must_use]
    pub fn is_supported(self) -> bool {
        self <= Self::HIGHEST
    }

    /// Human label shown on the grade picker.
    #[must_use]
    pub fn label(self) -> String {
        if self == Self::KINDERGARTEN {
            "Kindergarten".to_string()
        } else {
            format!("Grade {}", self.0)
        }
    }
}

impl From<u8> for Grade {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//
// ─── SUBJECT ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    #[default]
    Math,
    Reading,
    Science,
}

impl Subject {
    pub const ALL: [Subject; 3] = [Subject::Math, Subject::Reading, Subject::Science];

    /// Tag used on questions and in storage.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Subject::Math => "math",
            Subject::Reading => "reading",
            Subject::Science => "science",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Subject::Math => "Math",
            Subject::Reading => "Reading",
            Subject::Science => "Science",
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Subject {
    type Err = SubjectError;

    /// Exact, case-sensitive match on the tag (`"math"`, `"reading"`, `"science"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "math" => Ok(Subject::Math),
            "reading" => Ok(Subject::Reading),
            "science" => Ok(Subject::Science),
            other => Err(SubjectError::Unknown(other.to_string())),
        }
    }
}

//
// ─── TOPIC ─────────────────────────────────────────────────────────────────────
//

/// A curriculum unit tied to a grade and subject by its position in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: TopicId,
    pub name: String,
    /// Curriculum standard code, e.g. `MAFS.K.CC.1.1`.
    pub standard: String,
}

impl Topic {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, standard: impl Into<String>) -> Self {
        Self {
            id: TopicId::new(id),
            name: name.into(),
            standard: standard.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_labels() {
        assert_eq!(Grade::KINDERGARTEN.label(), "Kindergarten");
        assert_eq!(Grade::new(3).label(), "Grade 3");
    }

    #[test]
    fn grade_support_range() {
        assert!(Grade::ALL.iter().all(|g| g.is_supported()));
        assert!(!Grade::new(6).is_supported());
        assert!(!Grade::new(99).is_supported());
    }

    #[test]
    fn subject_parse_is_case_sensitive() {
        assert_eq!("math".parse::<Subject>().unwrap(), Subject::Math);
        assert_eq!("science".parse::<Subject>().unwrap(), Subject::Science);
        let err = "Math".parse::<Subject>().unwrap_err();
        assert_eq!(err, SubjectError::Unknown("Math".into()));
    }

    #[test]
    fn subject_serializes_lowercase() {
        let json = serde_json::to_string(&Subject::Reading).unwrap();
        assert_eq!(json, "\"reading\"");
    }
}
