use crate::error::BudgetError;
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Wall clock pinned to the service's configured UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    offset: FixedOffset,
}

impl Clock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }

    /// RFC3339 input keeps its instant; a naive datetime is taken as local time.
    pub fn parse_local(&self, input: &str) -> Result<DateTime<FixedOffset>, BudgetError> {
        let input = input.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
            return Ok(dt.with_timezone(&self.offset));
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
            .and_then(|naive| self.offset.from_local_datetime(&naive).single())
            .ok_or_else(|| {
                BudgetError::Validation(format!(
                    "`{input}` is not a datetime; expected RFC3339 or YYYY-MM-DDTHH:MM"
                ))
            })
    }
}
