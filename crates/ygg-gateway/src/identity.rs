use ygg_core::UserId;

/// Issues a stable [`UserId`] for a connecting client (spec.md §4.6:
/// "Gateway issues a stable `userId` if absent").
///
/// A fresh id is a UUIDv7 (`UserId::default()`), time-ordered like every
/// other identifier in this workspace (`ygg_core::ID::default`).
pub fn issue_or_reuse(presented: Option<UserId>) -> UserId {
    presented.unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuses_presented_id() {
        let id = UserId::default();
        assert_eq!(issue_or_reuse(Some(id)), id);
    }

    #[test]
    fn issues_fresh_id_when_absent() {
        let a = issue_or_reuse(None);
        let b = issue_or_reuse(None);
        assert_ne!(a, b);
    }
}
