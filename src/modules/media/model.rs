use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Lifecycle of one encoding job. Stored as SMALLINT; the numeric codes are
/// part of the polling API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[repr(i16)]
pub enum EncodingStatus {
    Pending = 0,
    Processing = 1,
    Success = 2,
    Failed = 3,
}

impl EncodingStatus {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// The state a record has to be in before moving to `self`.
    pub fn required_previous(self) -> Option<EncodingStatus> {
        match self {
            EncodingStatus::Pending => None,
            EncodingStatus::Processing => Some(EncodingStatus::Pending),
            EncodingStatus::Success | EncodingStatus::Failed => Some(EncodingStatus::Processing),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct VideoStatus {
    pub id: Uuid,
    pub name: String,
    pub status: EncodingStatus,
    pub message: Option<String>,
    #[serde(with = "time::serde::iso8601")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::iso8601")]
    pub updated_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::EncodingStatus;

    #[test]
    fn status_codes_match_polling_contract() {
        assert_eq!(EncodingStatus::Pending.code(), 0);
        assert_eq!(EncodingStatus::Processing.code(), 1);
        assert_eq!(EncodingStatus::Success.code(), 2);
        assert_eq!(EncodingStatus::Failed.code(), 3);
    }

    #[test]
    fn terminal_states_have_no_way_back() {
        for terminal in [EncodingStatus::Success, EncodingStatus::Failed] {
            let all = [
                EncodingStatus::Pending,
                EncodingStatus::Processing,
                EncodingStatus::Success,
                EncodingStatus::Failed,
            ];
            assert!(all.iter().all(|next| next.required_previous() != Some(terminal)));
        }
        assert_eq!(EncodingStatus::Processing.required_previous(), Some(EncodingStatus::Pending));
        assert_eq!(EncodingStatus::Failed.required_previous(), Some(EncodingStatus::Processing));
        assert_eq!(EncodingStatus::Pending.required_previous(), None);
    }
}
