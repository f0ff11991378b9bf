//! The two things that can be done to a package's policy files.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Which way policy files move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// Copy the package's policy files into the shared tree, renamed.
    Install,
    /// Delete the renamed copies again.
    Remove,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Install => "Install",
            Self::Remove => "Remove",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = Error;

    /// Case-insensitive `install` / `remove`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("install") {
            Ok(Self::Install)
        } else if s.eq_ignore_ascii_case("remove") {
            Ok(Self::Remove)
        } else {
            Err(Error::UnknownOperation {
                operation: s.to_string(),
            })
        }
    }
}

impl TryFrom<u32> for Operation {
    type Error = Error;

    /// Numeric tags: `0` is Install, `1` is Remove.
    fn try_from(tag: u32) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(Self::Install),
            1 => Ok(Self::Remove),
            other => Err(Error::UnknownOperation {
                operation: format!("Operation({other})"),
            }),
        }
    }
}
