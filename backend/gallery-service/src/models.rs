use gallery_cache::PictureId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Content-safety classification assigned by the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyRating {
    Safe,
    Questionable,
    Explicit,
}

impl SafetyRating {
    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyRating::Safe => "safe",
            SafetyRating::Questionable => "questionable",
            SafetyRating::Explicit => "explicit",
        }
    }
}

impl fmt::Display for SafetyRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SafetyRating {
    type Err = String;

    /// Accepts the board's one-letter codes as well as full names
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "s" | "safe" | "general" => Ok(SafetyRating::Safe),
            "q" | "questionable" | "sensitive" => Ok(SafetyRating::Questionable),
            "e" | "explicit" => Ok(SafetyRating::Explicit),
            other => Err(format!("Unknown rating: {}", other)),
        }
    }
}

/// Picture metadata as returned by the content source. Never mutated here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Picture {
    pub id: PictureId,
    pub rating: SafetyRating,
    #[serde(default)]
    pub tags: Vec<String>,
    pub file_url: String,
    pub sample_url: String,
    #[serde(default)]
    pub source_url: String,
    pub width: u32,
    pub height: u32,
}

impl Picture {
    pub fn is_safe(&self) -> bool {
        self.rating == SafetyRating::Safe
    }

    /// Whether this picture may be delivered under the given policy
    pub fn allowed(&self, safe_only: bool) -> bool {
        !safe_only || self.is_safe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn picture(rating: SafetyRating) -> Picture {
        Picture {
            id: PictureId::new(1),
            rating,
            tags: vec!["blue_sky".to_string()],
            file_url: "https://img.example/1.png".to_string(),
            sample_url: "https://img.example/sample_1.jpg".to_string(),
            source_url: String::new(),
            width: 800,
            height: 600,
        }
    }

    #[test]
    fn test_rating_codes() {
        assert_eq!("s".parse::<SafetyRating>(), Ok(SafetyRating::Safe));
        assert_eq!("Q".parse::<SafetyRating>(), Ok(SafetyRating::Questionable));
        assert_eq!("explicit".parse::<SafetyRating>(), Ok(SafetyRating::Explicit));
        assert!("x".parse::<SafetyRating>().is_err());
    }

    #[test]
    fn test_safety_policy() {
        assert!(picture(SafetyRating::Safe).allowed(true));
        assert!(!picture(SafetyRating::Questionable).allowed(true));
        assert!(!picture(SafetyRating::Explicit).allowed(true));
        assert!(picture(SafetyRating::Explicit).allowed(false));
    }

    #[test]
    fn test_picture_json_shape() {
        let json = serde_json::to_value(picture(SafetyRating::Safe)).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["rating"], "safe");
    }
}
