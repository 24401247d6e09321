//! Persistence seams. Each entity gets a trait describing its operations and
//! a SQLite implementation; handlers only see the traits through `AppState`.

pub mod comments;
pub mod date_proposals;
pub mod date_votes;
pub mod notifications;
pub mod trips;

pub use comments::{CommentRepository, SqliteCommentRepository};
pub use date_proposals::{DateProposalRepository, SqliteDateProposalRepository};
pub use date_votes::{DateVoteRepository, SqliteDateVoteRepository};
pub use notifications::{NotificationRepository, SqliteNotificationRepository};
pub use trips::{SqliteTripRepository, TripRepository};

/// Trims and case-folds a search term. Blank terms mean "no search".
pub(crate) fn fold_search(term: Option<&str>) -> Option<String> {
    term.map(str::trim)
        .filter(|term| !term.is_empty())
        .map(str::to_lowercase)
}

/// Whether any of `fields` contains the already folded `term`, ignoring case
/// with full Unicode folding.
pub(crate) fn matches_search<'a>(term: &str, fields: impl IntoIterator<Item = &'a str>) -> bool {
    fields
        .into_iter()
        .any(|field| field.to_lowercase().contains(term))
}

#[cfg(test)]
mod tests {
    use super::{fold_search, matches_search};

    #[test]
    fn blank_terms_disable_search() {
        assert_eq!(fold_search(None), None);
        assert_eq!(fold_search(Some("   ")), None);
        assert_eq!(fold_search(Some(" Kyoto ")).as_deref(), Some("kyoto"));
    }

    #[test]
    fn folds_non_ascii_case() {
        let term = fold_search(Some("zürich")).unwrap();
        assert!(matches_search(&term, ["ZÜRICH"]));
        let term = fold_search(Some("ZÜRICH")).unwrap();
        assert!(matches_search(&term, ["Stadt", "Zürich"]));
        assert!(!matches_search(&term, ["Zurich"]));
    }

    #[test]
    fn wildcard_characters_are_literal() {
        let term = fold_search(Some("50%_off")).unwrap();
        assert!(matches_search(&term, ["Deal: 50%_OFF today"]));
        assert!(!matches_search(&term, ["50 percent off"]));
    }
}
