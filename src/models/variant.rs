//! Post flavours.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Which registry feed a run posts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum PostVariant {
    /// Animals in shelter custody awaiting adoption (보호동물)
    Abandoned,
    /// Animals reported missing by their owners (실종동물)
    Lost,
}

impl PostVariant {
    pub const ALL: [PostVariant; 2] = [PostVariant::Abandoned, PostVariant::Lost];

    pub fn as_str(&self) -> &'static str {
        match self {
            PostVariant::Abandoned => "abandoned",
            PostVariant::Lost => "lost",
        }
    }
}

impl fmt::Display for PostVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostVariant {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "abandoned" => Ok(PostVariant::Abandoned),
            "lost" => Ok(PostVariant::Lost),
            other => Err(AppError::validation(format!("unknown post variant '{other}'"))),
        }
    }
}
