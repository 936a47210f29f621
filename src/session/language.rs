//! Request language negotiation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Languages the platform localizes for. Turkish is the platform default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Tr,
    En,
}

impl Language {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Tr => "tr",
            Self::En => "en",
        }
    }

    /// Pick a language from an `Accept-Language` header value.
    ///
    /// The first parseable tag wins, judged by its 2-letter primary subtag:
    /// `en-US,tr;q=0.8` negotiates to English, `de-DE,en` skips the unknown
    /// German tag and also lands on English. When no tag parses, `default`.
    #[must_use]
    pub fn parse(raw: Option<&str>, default: Self) -> Self {
        let Some(raw) = raw else {
            return default;
        };
        raw.split(',')
            .find_map(|entry| {
                let tag = entry.split(';').next().unwrap_or_default().trim();
                let primary = tag.chars().take(2).collect::<String>().to_ascii_lowercase();
                match primary.as_str() {
                    "tr" => Some(Self::Tr),
                    "en" => Some(Self::En),
                    _ => None,
                }
            })
            .unwrap_or(default)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
