use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlotError {
    #[error("invalid time '{0}': expected HH:MM")]
    InvalidTime(String),

    #[error("invalid window: start {start} is not before end {end}")]
    EmptyWindow { start: String, end: String },
}

/// Wall-clock minute of day parsed from an `HH:MM` string.
///
/// Input is normalized on parse (`9:30` becomes `09:30`), so equal times
/// always render and compare identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotTime {
    minutes: u16,
}

impl SlotTime {
    pub fn parse(value: &str) -> Result<Self, SlotError> {
        let (hour_part, minute_part) = value
            .split_once(':')
            .ok_or_else(|| SlotError::InvalidTime(value.to_string()))?;

        let hour: u16 = hour_part
            .trim()
            .parse()
            .map_err(|_| SlotError::InvalidTime(value.to_string()))?;
        let minute: u16 = minute_part
            .trim()
            .parse()
            .map_err(|_| SlotError::InvalidTime(value.to_string()))?;

        if hour > 23 || minute > 59 {
            return Err(SlotError::InvalidTime(value.to_string()));
        }

        Ok(Self {
            minutes: hour * 60 + minute,
        })
    }

    pub fn minute_of_day(&self) -> u16 {
        self.minutes
    }
}

impl fmt::Display for SlotTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.minutes / 60, self.minutes % 60)
    }
}

impl FromStr for SlotTime {
    type Err = SlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for SlotTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SlotTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// A half-open booking window within a single day: occupies `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawTimeSlot")]
pub struct TimeSlot {
    pub start: SlotTime,
    pub end: SlotTime,
}

#[derive(Deserialize)]
struct RawTimeSlot {
    start: SlotTime,
    end: SlotTime,
}

impl TryFrom<RawTimeSlot> for TimeSlot {
    type Error = SlotError;

    fn try_from(raw: RawTimeSlot) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end)
    }
}

impl TimeSlot {
    pub fn new(start: SlotTime, end: SlotTime) -> Result<Self, SlotError> {
        if start >= end {
            return Err(SlotError::EmptyWindow {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn parse(start: &str, end: &str) -> Result<Self, SlotError> {
        Self::new(SlotTime::parse(start)?, SlotTime::parse(end)?)
    }

    /// Open-interval overlap: windows that merely touch do not conflict.
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn duration_minutes(&self) -> u32 {
        (self.end.minute_of_day() - self.start.minute_of_day()) as u32
    }

    /// Canonical `HH:MM-HH:MM` form, used as the store's window key.
    pub fn window_key(&self) -> String {
        format!("{}-{}", self.start, self.end)
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_single_digit_hour() {
        let t = SlotTime::parse("9:30").unwrap();
        assert_eq!(t.to_string(), "09:30");
        assert_eq!(t, SlotTime::parse("09:30").unwrap());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(SlotTime::parse("25:00").is_err());
        assert!(SlotTime::parse("12:60").is_err());
        assert!(SlotTime::parse("noon").is_err());
        assert!(SlotTime::parse("12").is_err());
        assert!(SlotTime::parse("-1:30").is_err());
    }

    #[test]
    fn test_window_requires_start_before_end() {
        assert!(TimeSlot::parse("10:00", "10:00").is_err());
        assert!(TimeSlot::parse("11:00", "10:00").is_err());
        assert!(TimeSlot::parse("10:00", "10:01").is_ok());
    }

    #[test]
    fn test_touching_windows_do_not_overlap() {
        let morning = TimeSlot::parse("09:00", "12:00").unwrap();
        let afternoon = TimeSlot::parse("12:00", "15:00").unwrap();

        assert!(!morning.overlaps(&afternoon));
        assert!(!afternoon.overlaps(&morning));
    }

    #[test]
    fn test_partial_and_contained_overlap() {
        let a = TimeSlot::parse("09:00", "12:00").unwrap();
        let b = TimeSlot::parse("11:00", "13:00").unwrap();
        let inner = TimeSlot::parse("10:00", "11:00").unwrap();

        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(a.overlaps(&inner));
        assert!(inner.overlaps(&a));
    }

    #[test]
    fn test_window_key_uses_normalized_times() {
        let slot = TimeSlot::parse("9:00", "9:45").unwrap();
        assert_eq!(slot.window_key(), "09:00-09:45");
    }

    #[test]
    fn test_serde_round_trip() {
        let slot = TimeSlot::parse("09:00", "17:30").unwrap();
        let json = serde_json::to_string(&slot).unwrap();
        assert_eq!(json, r#"{"start":"09:00","end":"17:30"}"#);

        let back: TimeSlot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, slot);
    }

    #[test]
    fn test_deserialize_rejects_inverted_window() {
        let err = serde_json::from_str::<TimeSlot>(r#"{"start":"12:00","end":"09:00"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_duration() {
        let slot = TimeSlot::parse("09:00", "11:30").unwrap();
        assert_eq!(slot.duration_minutes(), 150);
    }
}
