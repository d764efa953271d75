//! Identifier newtypes shared by the store and the sampler

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Chat the picture is delivered to. Group chats have negative ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for UserId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Picture handle in the board's id space, always >= 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PictureId(u64);

impl PictureId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for PictureId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for PictureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid picture id: {0:?}")]
pub struct ParsePictureIdError(String);

impl FromStr for PictureId {
    type Err = ParsePictureIdError;

    /// Accepts plain digits and the `id:123` form used by quick-pick buttons
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix("id:").unwrap_or(trimmed);
        match digits.parse::<u64>() {
            Ok(0) | Err(_) => Err(ParsePictureIdError(s.to_string())),
            Ok(raw) => Ok(Self(raw)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_picture_id() {
        assert_eq!("4242".parse::<PictureId>(), Ok(PictureId::new(4242)));
        assert_eq!(" id:17 ".parse::<PictureId>(), Ok(PictureId::new(17)));
        assert!("0".parse::<PictureId>().is_err());
        assert!("blue_sky".parse::<PictureId>().is_err());
        assert!("-3".parse::<PictureId>().is_err());
    }

    #[test]
    fn test_ids_serialize_as_plain_integers() {
        let json = serde_json::to_string(&(UserId::new(-100), PictureId::new(9))).unwrap();
        assert_eq!(json, "[-100,9]");
    }
}
