use std::fmt;
use std::str::FromStr;

use crate::error::CorpusError;

/// Which split of a corpus to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Subset {
    #[default]
    Train,
    Test,
    Valid,
}

impl Subset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Subset::Train => "train",
            Subset::Test => "test",
            Subset::Valid => "valid",
        }
    }
}

impl fmt::Display for Subset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Subset {
    type Err = CorpusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "train" => Ok(Subset::Train),
            "test" => Ok(Subset::Test),
            "valid" | "validate" | "dev" => Ok(Subset::Valid),
            _ => Err(CorpusError::InvalidSubset(s.to_string())),
        }
    }
}
