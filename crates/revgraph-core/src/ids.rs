use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// The three integer ID domains of the graph.
///
/// Users and reviews are the two node types; ratings index the discrete
/// rating-value embedding table and are never nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdSpace {
    User,
    Review,
    Rating,
}

impl IdSpace {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdSpace::User => "user",
            IdSpace::Review => "review",
            IdSpace::Rating => "rating",
        }
    }

    /// Check a single ID against a table of `len` entries.
    #[inline]
    pub fn check(self, id: u32, len: usize) -> Result<()> {
        if (id as usize) < len {
            Ok(())
        } else {
            Err(Error::UnknownId {
                space: self,
                id,
                len,
            })
        }
    }

    /// Check every ID in `ids`, reporting the first one out of range.
    pub fn check_all(self, ids: &[u32], len: usize) -> Result<()> {
        ids.iter().try_for_each(|&id| self.check(id, len))
    }

    /// The opposite node type. Ratings have no counterpart.
    pub fn counterpart(self) -> Option<IdSpace> {
        match self {
            IdSpace::User => Some(IdSpace::Review),
            IdSpace::Review => Some(IdSpace::User),
            IdSpace::Rating => None,
        }
    }
}

impl fmt::Display for IdSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_boundary() {
        assert!(IdSpace::User.check(2, 3).is_ok());
        match IdSpace::User.check(3, 3) {
            Err(Error::UnknownId { space, id, len }) => {
                assert_eq!(space, IdSpace::User);
                assert_eq!(id, 3);
                assert_eq!(len, 3);
            }
            other => panic!("expected UnknownId, got {other:?}"),
        }
    }

    #[test]
    fn test_check_all_reports_first_bad_id() {
        let err = IdSpace::Review.check_all(&[0, 7, 9], 5).unwrap_err();
        assert!(matches!(err, Error::UnknownId { id: 7, .. }));
    }

    #[test]
    fn test_counterpart() {
        assert_eq!(IdSpace::User.counterpart(), Some(IdSpace::Review));
        assert_eq!(IdSpace::Review.counterpart(), Some(IdSpace::User));
        assert_eq!(IdSpace::Rating.counterpart(), None);
    }
}
