use serde::Deserialize;

/// A general reader's daily allowance of main comments. Always re-derived from
/// the server, never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaState {
    #[serde(default, alias = "daily_limit", alias = "limit")]
    pub daily_limit: u32,
    #[serde(default)]
    pub used: u32,
    #[serde(default)]
    pub unlocked: u32,
}

impl QuotaState {
    pub fn new(daily_limit: u32, used: u32, unlocked: u32) -> Self {
        Self {
            daily_limit,
            used,
            unlocked,
        }
    }

    /// `daily_limit + unlocked - used`, never below zero.
    pub fn remaining(&self) -> u32 {
        self.daily_limit
            .saturating_add(self.unlocked)
            .saturating_sub(self.used)
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_adds_unlocks() {
        let quota = QuotaState::new(2, 1, 3);
        assert_eq!(quota.remaining(), 4);
        assert!(!quota.is_exhausted());
    }

    #[test]
    fn remaining_clamps_at_zero() {
        let quota = QuotaState::new(2, 5, 0);
        assert_eq!(quota.remaining(), 0);
        assert!(quota.is_exhausted());
    }

    #[test]
    fn deserializes_camel_case_and_ignores_server_remaining() {
        let quota: QuotaState =
            serde_json::from_str(r#"{"dailyLimit":2,"used":2,"unlocked":1,"remaining":9}"#)
                .unwrap();
        assert_eq!(quota, QuotaState::new(2, 2, 1));
        assert_eq!(quota.remaining(), 1);
    }
}
