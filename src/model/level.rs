use std::fmt;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Depth in the administrative hierarchy, ADM0 (whole country) through ADM4
/// (finest subdivision published for any country we ingest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AdminLevel {
    #[serde(rename = "ADM0")]
    Adm0,
    #[serde(rename = "ADM1")]
    Adm1,
    #[serde(rename = "ADM2")]
    Adm2,
    #[serde(rename = "ADM3")]
    Adm3,
    #[serde(rename = "ADM4")]
    Adm4,
}

impl AdminLevel {
    pub const ALL: [AdminLevel; 5] = [
        AdminLevel::Adm0,
        AdminLevel::Adm1,
        AdminLevel::Adm2,
        AdminLevel::Adm3,
        AdminLevel::Adm4,
    ];

    /// Numeric depth, 0 for the country outline.
    #[inline]
    pub fn depth(self) -> u8 {
        match self {
            AdminLevel::Adm0 => 0,
            AdminLevel::Adm1 => 1,
            AdminLevel::Adm2 => 2,
            AdminLevel::Adm3 => 3,
            AdminLevel::Adm4 => 4,
        }
    }

    pub fn from_depth(depth: u8) -> Result<Self> {
        match depth {
            0 => Ok(AdminLevel::Adm0),
            1 => Ok(AdminLevel::Adm1),
            2 => Ok(AdminLevel::Adm2),
            3 => Ok(AdminLevel::Adm3),
            4 => Ok(AdminLevel::Adm4),
            _ => bail!("admin level out of range: {}", depth),
        }
    }

    /// The level one step up the hierarchy, or `None` at the country level.
    #[inline]
    pub fn parent(self) -> Option<AdminLevel> {
        match self {
            AdminLevel::Adm0 => None,
            other => Self::from_depth(other.depth() - 1).ok(),
        }
    }

    /// Parse "ADM3", "adm3", "admin3" or a bare digit.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        if let Ok(depth) = trimmed.parse::<u8>() {
            return Self::from_depth(depth);
        }
        let lower = trimmed.to_ascii_lowercase();
        for prefix in ["adm", "admin"] {
            if let Some(rest) = lower.strip_prefix(prefix) {
                if let Ok(depth) = rest.trim_start_matches(['_', '-', ' ']).parse::<u8>() {
                    return Self::from_depth(depth);
                }
            }
        }
        bail!("unrecognized admin level: {:?}", text)
    }
}

impl fmt::Display for AdminLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ADM{}", self.depth())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_common_spellings() {
        assert_eq!(AdminLevel::parse("ADM3").unwrap(), AdminLevel::Adm3);
        assert_eq!(AdminLevel::parse("adm0").unwrap(), AdminLevel::Adm0);
        assert_eq!(AdminLevel::parse("admin2").unwrap(), AdminLevel::Adm2);
        assert_eq!(AdminLevel::parse("4").unwrap(), AdminLevel::Adm4);
        assert!(AdminLevel::parse("adm9").is_err());
        assert!(AdminLevel::parse("province").is_err());
    }

    #[test]
    fn parent_walks_up_one_level() {
        assert_eq!(AdminLevel::Adm3.parent(), Some(AdminLevel::Adm2));
        assert_eq!(AdminLevel::Adm0.parent(), None);
    }

    #[test]
    fn serde_uses_adm_tags() {
        let json = serde_json::to_string(&AdminLevel::Adm2).unwrap();
        assert_eq!(json, "\"ADM2\"");
        let back: AdminLevel = serde_json::from_str(&json).unwrap();
        assert_eq!(back, AdminLevel::Adm2);
    }
}
