use chrono::{DateTime, Utc};

use crate::auth::Identity;
use crate::db::BoundQuery;

const LIST_ALL: &str =
    "SELECT username, timestamp, text FROM tweets ORDER BY id DESC";

const SEARCH_TEXT: &str =
    "SELECT username, timestamp, text FROM tweets WHERE text LIKE ? ESCAPE '\\' ORDER BY id DESC";

const INSERT_ENTRY: &str =
    "INSERT INTO tweets (username, timestamp, text) VALUES (?, ?, ?)";

/// Builds feed reads and writes as bound queries; never executes them.
pub struct FeedQueryBuilder;

impl FeedQueryBuilder {
    /// Newest first. An absent or empty term lists everything; otherwise the
    /// term, untrimmed, is a literal substring match bound as the single
    /// parameter.
    pub fn search(term: Option<&str>) -> BoundQuery {
        match term.filter(|t| !t.is_empty()) {
            None => BoundQuery::new(LIST_ALL),
            Some(term) => BoundQuery::new(SEARCH_TEXT).bind(format!("%{}%", escape_like(term))),
        }
    }

    pub fn insert(identity: &Identity, text: &str) -> BoundQuery {
        Self::insert_at(identity, text, Utc::now())
    }

    pub fn insert_at(identity: &Identity, text: &str, posted_at: DateTime<Utc>) -> BoundQuery {
        BoundQuery::new(INSERT_ENTRY)
            .bind(identity.username.as_str())
            .bind(posted_at.to_rfc3339())
            .bind(text)
    }
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqlValue;
    use chrono::TimeZone;

    fn alice() -> Identity {
        Identity {
            user_id: 1,
            username: "alice".into(),
        }
    }

    #[test]
    fn test_empty_term_lists_everything() {
        for term in [None, Some("")] {
            let query = FeedQueryBuilder::search(term);
            assert_eq!(query.template(), LIST_ALL);
            assert!(query.params().is_empty());
        }
    }

    #[test]
    fn test_whitespace_term_is_searched_verbatim() {
        let query = FeedQueryBuilder::search(Some(" "));
        assert_eq!(query.template(), SEARCH_TEXT);
        assert_eq!(query.params(), &[SqlValue::Text("% %".into())]);

        let query = FeedQueryBuilder::search(Some("  rust "));
        assert_eq!(query.params(), &[SqlValue::Text("%  rust %".into())]);
    }

    #[test]
    fn test_template_is_independent_of_term() {
        let hostile = [
            "' OR '1'='1",
            "\"; DROP TABLE tweets; --",
            "hello",
            "100% _legit_ \\o/",
        ];
        for term in hostile {
            let query = FeedQueryBuilder::search(Some(term));
            assert_eq!(query.template(), SEARCH_TEXT);
            assert_eq!(query.params().len(), 1);
        }
    }

    #[test]
    fn test_term_is_bound_as_parameter() {
        let query = FeedQueryBuilder::search(Some("' OR '1'='1"));
        assert!(!query.template().contains("OR '1'"));
        assert_eq!(query.params(), &[SqlValue::Text("%' OR '1'='1%".into())]);
    }

    #[test]
    fn test_like_wildcards_are_escaped() {
        let query = FeedQueryBuilder::search(Some("50%_off\\"));
        assert_eq!(query.params(), &[SqlValue::Text("%50\\%\\_off\\\\%".into())]);
    }

    #[test]
    fn test_insert_binds_three_parameters() {
        let posted_at = Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 59).unwrap();
        let query = FeedQueryBuilder::insert_at(&alice(), "it's '); DROP TABLE tweets; --", posted_at);

        assert_eq!(query.template(), INSERT_ENTRY);
        assert_eq!(
            query.params(),
            &[
                SqlValue::Text("alice".into()),
                SqlValue::Text("2024-02-29T23:59:59+00:00".into()),
                SqlValue::Text("it's '); DROP TABLE tweets; --".into()),
            ]
        );
    }
}
