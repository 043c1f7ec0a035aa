//! Permission codes and the set of codes granted to a user.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

/// A single grant. The string form is what the `permissions` table stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PermissionCode {
    Superuser,
    PuzzlesCreate,
    PuzzlesRead,
    PuzzlesUpdate,
    PuzzlesDelete,
    UsersCreate,
    UsersRead,
    UsersUpdate,
    UsersDelete,
}

impl PermissionCode {
    pub const ALL: [PermissionCode; 9] = [
        PermissionCode::Superuser,
        PermissionCode::PuzzlesCreate,
        PermissionCode::PuzzlesRead,
        PermissionCode::PuzzlesUpdate,
        PermissionCode::PuzzlesDelete,
        PermissionCode::UsersCreate,
        PermissionCode::UsersRead,
        PermissionCode::UsersUpdate,
        PermissionCode::UsersDelete,
    ];

    /// Granted to every account created through the API or the `add-user` tool.
    pub const STANDARD: [PermissionCode; 7] = [
        PermissionCode::PuzzlesCreate,
        PermissionCode::PuzzlesRead,
        PermissionCode::PuzzlesUpdate,
        PermissionCode::PuzzlesDelete,
        PermissionCode::UsersRead,
        PermissionCode::UsersUpdate,
        PermissionCode::UsersDelete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionCode::Superuser => "000superuser",
            PermissionCode::PuzzlesCreate => "puzzles:create",
            PermissionCode::PuzzlesRead => "puzzles:read",
            PermissionCode::PuzzlesUpdate => "puzzles:update",
            PermissionCode::PuzzlesDelete => "puzzles:delete",
            PermissionCode::UsersCreate => "users:create",
            PermissionCode::UsersRead => "users:read",
            PermissionCode::UsersUpdate => "users:update",
            PermissionCode::UsersDelete => "users:delete",
        }
    }
}

impl fmt::Display for PermissionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PermissionCode::ALL
            .into_iter()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| format!("unknown permission code: {}", s))
    }
}

impl Serialize for PermissionCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Codes held by one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<PermissionCode>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from stored code strings. Codes this build does not know
    /// are skipped with a warning rather than failing the request.
    pub fn from_codes<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = BTreeSet::new();
        for raw in codes {
            match raw.as_ref().parse::<PermissionCode>() {
                Ok(code) => {
                    set.insert(code);
                }
                Err(e) => tracing::warn!(error = %e, "ignoring stored permission"),
            }
        }
        Self(set)
    }

    /// `000superuser` satisfies every check.
    pub fn includes(&self, code: PermissionCode) -> bool {
        self.0.contains(&PermissionCode::Superuser) || self.0.contains(&code)
    }

    pub fn insert(&mut self, code: PermissionCode) {
        self.0.insert(code);
    }

    pub fn iter(&self) -> impl Iterator<Item = PermissionCode> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<PermissionCode> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = PermissionCode>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
