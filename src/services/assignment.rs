//! Assignment resolver: pure skill matching over the candidate pool.

use crate::domain::models::Handler;

/// Select the handlers qualified for a ticket's related skills.
///
/// A candidate is eligible when any of its skills case-insensitively equals
/// (not merely contains) one of the related skills. Eligible candidates come
/// back in the pool's iteration order, which keeps assignment deterministic
/// for a given snapshot.
///
/// Empty `related_skills` or no match yields an empty selection — a valid
/// outcome, not an error: the ticket stays unassigned and visible to admins
/// for manual routing.
pub fn select<'a>(related_skills: &[String], pool: &'a [Handler]) -> Vec<&'a Handler> {
    if related_skills.is_empty() {
        return Vec::new();
    }

    let wanted: Vec<String> = related_skills.iter().map(|s| s.to_lowercase()).collect();

    pool.iter()
        .filter(|candidate| {
            candidate
                .skills
                .iter()
                .any(|skill| wanted.iter().any(|w| *w == skill.to_lowercase()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::HandlerRole;

    fn pool() -> Vec<Handler> {
        vec![
            Handler::new("m1@example.com", vec!["Go".into()], HandlerRole::Moderator),
            Handler::new("m2@example.com", vec!["python".into()], HandlerRole::Moderator),
        ]
    }

    #[test]
    fn test_case_insensitive_exact_match() {
        let pool = pool();
        let selected = select(&["networking".into(), "go".into()], &pool);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, pool[0].id);
    }

    #[test]
    fn test_empty_skills_selects_nobody() {
        let pool = pool();
        assert!(select(&[], &pool).is_empty());
    }

    #[test]
    fn test_substring_does_not_match() {
        let pool = vec![Handler::new(
            "m1@example.com",
            vec!["golang".into()],
            HandlerRole::Moderator,
        )];
        assert!(select(&["go".into()], &pool).is_empty());
    }

    #[test]
    fn test_pool_order_is_preserved() {
        let pool = vec![
            Handler::new("a@example.com", vec!["rust".into()], HandlerRole::Moderator),
            Handler::new("b@example.com", vec!["rust".into()], HandlerRole::Admin),
            Handler::new("c@example.com", vec!["RUST".into()], HandlerRole::Moderator),
        ];
        let selected = select(&["Rust".into()], &pool);
        let ids: Vec<_> = selected.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![pool[0].id, pool[1].id, pool[2].id]);
    }
}
