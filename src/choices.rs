//! Choice tables
//!
//! The controller describes enumerations as `"<code>:<label>|<code>:<label>"`,
//! e.g. `"0:Aus|1:Auto|2:Heizen|3:Absenken"`. A [`ChoiceTable`] keeps the
//! entries in wire order and is used both to decode codes into labels and
//! to bound writes to controllable attributes.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::error::{Error, Result};

/// Format string the controller uses for plain on/off switches
pub const OFF_ON_TEXT: &str = "0:Aus|1:Ein";

static OFF_ON: Lazy<Arc<ChoiceTable>> = Lazy::new(|| {
    Arc::new(ChoiceTable {
        entries: vec![(0, "Aus".to_string()), (1, "Ein".to_string())],
    })
});

/// Ordered mapping of integer code to display label
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoiceTable {
    entries: Vec<(i64, String)>,
}

impl ChoiceTable {
    /// Parse a `code:label|code:label` string
    pub fn parse(format: &str) -> Result<Self> {
        let malformed = |reason: String| Error::MalformedFormat {
            format: format.to_string(),
            reason,
        };

        let mut entries: Vec<(i64, String)> = Vec::new();
        for segment in format.split('|') {
            let (code, label) = segment
                .split_once(':')
                .ok_or_else(|| malformed(format!("segment '{segment}' has no ':'")))?;
            let code: i64 = code
                .trim()
                .parse()
                .map_err(|_| malformed(format!("code '{code}' is not an integer")))?;
            if entries.iter().any(|(c, _)| *c == code) {
                return Err(malformed(format!("code {code} appears twice")));
            }
            entries.push((code, label.to_string()));
        }

        Ok(Self { entries })
    }

    /// Shared table behind [`OFF_ON_TEXT`]
    pub fn off_on() -> Arc<Self> {
        Arc::clone(&OFF_ON)
    }

    /// Parse `format`, reusing the shared on/off table when it matches
    pub fn shared(format: &str) -> Result<Arc<Self>> {
        if format == OFF_ON_TEXT {
            Ok(Self::off_on())
        } else {
            Self::parse(format).map(Arc::new)
        }
    }

    /// Label for a code; unknown codes are not an error
    pub fn decode(&self, code: i64) -> Option<&str> {
        self.entries
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, label)| label.as_str())
    }

    /// Code for a label (exact match)
    pub fn code_for(&self, label: &str) -> Option<i64> {
        self.entries
            .iter()
            .find(|(_, l)| l == label)
            .map(|(code, _)| *code)
    }

    pub fn min_code(&self) -> Option<i64> {
        self.entries.iter().map(|(c, _)| *c).min()
    }

    pub fn max_code(&self) -> Option<i64> {
        self.entries.iter().map(|(c, _)| *c).max()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, &str)> {
        self.entries.iter().map(|(c, l)| (*c, l.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for ChoiceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (code, label)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str("|")?;
            }
            write!(f, "{code}:{label}")?;
        }
        Ok(())
    }
}
