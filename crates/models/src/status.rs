use crate::error::{Error, ErrorKind};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Moderation/ranking state of a content set (and each of its items).
///
/// The numeric codes are stable: they are what snapshot rows store in their
/// `approved` column. [`None`](Self::None) is the default and means the
/// status is only known locally (never resolved, or unknown online).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(rename_all = "lowercase"))]
pub enum ApprovalStatus {
    #[default]
    None,
    Graveyard,
    #[cfg_attr(feature = "serde", serde(rename = "wip"))]
    WorkInProgress,
    Pending,
    Ranked,
    Approved,
    Qualified,
    Loved,
}
impl ApprovalStatus {
    /// Numeric code as stored in snapshot rows.
    #[must_use]
    pub fn code(&self) -> i64 {
        match self {
            ApprovalStatus::None => -3,
            ApprovalStatus::Graveyard => -2,
            ApprovalStatus::WorkInProgress => -1,
            ApprovalStatus::Pending => 0,
            ApprovalStatus::Ranked => 1,
            ApprovalStatus::Approved => 2,
            ApprovalStatus::Qualified => 3,
            ApprovalStatus::Loved => 4,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::None => "none",
            ApprovalStatus::Graveyard => "graveyard",
            ApprovalStatus::WorkInProgress => "wip",
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Ranked => "ranked",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Qualified => "qualified",
            ApprovalStatus::Loved => "loved",
        }
    }
}
impl Display for ApprovalStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}
impl TryFrom<i64> for ApprovalStatus {
    type Error = Error;
    fn try_from(code: i64) -> Result<Self, Self::Error> {
        Ok(match code {
            -3 => ApprovalStatus::None,
            -2 => ApprovalStatus::Graveyard,
            -1 => ApprovalStatus::WorkInProgress,
            0 => ApprovalStatus::Pending,
            1 => ApprovalStatus::Ranked,
            2 => ApprovalStatus::Approved,
            3 => ApprovalStatus::Qualified,
            4 => ApprovalStatus::Loved,
            _ => exn::bail!(ErrorKind::UnknownStatusCode(code)),
        })
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn default_is_local_only() {
        assert_eq!(ApprovalStatus::default(), ApprovalStatus::None);
    }

    #[rstest]
    #[case(-3, ApprovalStatus::None)]
    #[case(-1, ApprovalStatus::WorkInProgress)]
    #[case(0, ApprovalStatus::Pending)]
    #[case(1, ApprovalStatus::Ranked)]
    #[case(3, ApprovalStatus::Qualified)]
    #[case(4, ApprovalStatus::Loved)]
    fn test_from_code(#[case] code: i64, #[case] expected: ApprovalStatus) {
        let status = ApprovalStatus::try_from(code).unwrap();
        assert_eq!(status, expected);
        assert_eq!(status.code(), code);
    }

    #[rstest]
    #[case(-4)]
    #[case(5)]
    #[case(i64::MAX)]
    fn test_from_code_invalid(#[case] code: i64) {
        let err = ApprovalStatus::try_from(code).unwrap_err();
        assert_eq!(*err, ErrorKind::UnknownStatusCode(code));
    }

    #[rstest]
    #[case(ApprovalStatus::WorkInProgress, "wip")]
    #[case(ApprovalStatus::Ranked, "ranked")]
    #[case(ApprovalStatus::None, "none")]
    fn test_display(#[case] status: ApprovalStatus, #[case] expected: &str) {
        assert_eq!(status.to_string(), expected);
    }
}
