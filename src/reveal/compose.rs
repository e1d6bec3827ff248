//! Text of the posts and messages produced around a capsule.

use crate::capsule::Capsule;
use crate::host::{Comment, NewPost};
use crate::scheduler::NotificationJobPayload;
use crate::time;

/// Body of the teaser post created at burial.
pub const TEASER_BODY: &str = "This is a teaser post for the time capsule.";

/// Highest-scored comments first, at most `limit` of them.
///
/// Ties keep the order the publisher returned them in.
pub fn rank_guesses(mut comments: Vec<Comment>, limit: usize) -> Vec<Comment> {
    comments.sort_by(|a, b| b.score.cmp(&a.score));
    comments.truncate(limit);
    comments
}

pub fn teaser_post(capsule: &Capsule, author: &str) -> NewPost {
    NewPost {
        title: format!("Time Capsule: {} by u/{author}", capsule.title),
        body: TEASER_BODY.to_owned(),
    }
}

pub fn reveal_post(capsule: &Capsule, guesses: &[Comment]) -> NewPost {
    let mut body = String::new();
    body.push_str(&capsule.description);
    body.push_str("\n\n");
    body.push_str(&format!("Theme: {}\n", capsule.theme));
    body.push_str(&format!(
        "Buried by u/{} and revealed on {}\n",
        capsule.author_or_anonymous(),
        capsule.reveal_date_string()
    ));
    if let Some(image) = &capsule.image {
        body.push_str(&format!("Image: {image}\n"));
    }

    body.push('\n');
    if guesses.is_empty() {
        body.push_str("Nobody left a guess.\n");
    } else {
        body.push_str("Top guesses:\n");
        for (rank, guess) in guesses.iter().enumerate() {
            body.push_str(&format!(
                "{}. u/{} ({} points): {}\n",
                rank + 1,
                guess.author,
                guess.score,
                guess.body
            ));
        }
    }

    NewPost {
        title: format!("Time Capsule Revealed: {}", capsule.title),
        body,
    }
}

/// Replacement teaser body once the reveal post exists.
pub fn teaser_revealed_body(reveal_post_id: &str) -> String {
    format!("{TEASER_BODY}\n\nThis capsule has been revealed! See post {reveal_post_id}.")
}

pub fn reveal_message(capsule: &Capsule, reveal_post_id: Option<&str>) -> String {
    match reveal_post_id {
        Some(id) => format!(
            "Your time capsule \"{}\" has been revealed! See post {id}.",
            capsule.title
        ),
        None => format!("Your time capsule \"{}\" has been revealed!", capsule.title),
    }
}

pub fn notification_message(payload: &NotificationJobPayload) -> String {
    format!(
        "The time capsule \"{}\" by u/{} will be revealed on {}.",
        payload.title,
        payload.author,
        time::format_local_date_time(payload.reveal_at)
    )
}

/// Link to a post on its community.
pub fn post_url(subreddit: &str, post_id: &str) -> String {
    format!("https://www.reddit.com/r/{subreddit}/comments/{post_id}/")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::capsule::{CapsuleDraft, CapsuleId, Theme};
    use chrono::{TimeZone, Utc};

    fn comment(author: &str, score: i64) -> Comment {
        Comment {
            id: format!("c_{author}"),
            author: author.to_owned(),
            body: format!("{author} guesses"),
            score,
        }
    }

    fn capsule() -> Capsule {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let draft = CapsuleDraft {
            title: "Cup final".into(),
            description: "Blue team wins 2-1".into(),
            reveal_date: String::new(),
            theme: Theme::Prediction,
            image: None,
        };
        let mut c = Capsule::from_draft(
            CapsuleId::from_post_id("t3_c"),
            &draft,
            Utc.with_ymd_and_hms(2025, 6, 1, 15, 0, 0).unwrap(),
            now,
        );
        c.author_name = Some("oracle".into());
        c
    }

    #[test]
    fn guesses_are_top_scores_descending() {
        let ranked = rank_guesses(
            vec![comment("a", 1), comment("b", 9), comment("c", 4), comment("d", 9)],
            2,
        );
        let authors: Vec<&str> = ranked.iter().map(|c| c.author.as_str()).collect();
        assert_eq!(authors, vec!["b", "d"]);
        assert!(rank_guesses(Vec::new(), 2).is_empty());
    }

    #[test]
    fn teaser_post_names_title_and_author() {
        let post = teaser_post(&capsule(), "oracle");
        assert_eq!(post.title, "Time Capsule: Cup final by u/oracle");
        assert_eq!(post.body, TEASER_BODY);
    }

    #[test]
    fn reveal_post_lists_guesses() {
        let post = reveal_post(&capsule(), &[comment("b", 9)]);
        assert_eq!(post.title, "Time Capsule Revealed: Cup final");
        assert!(post.body.starts_with("Blue team wins 2-1"));
        assert!(post.body.contains("06/01/2025 03:00 PM"));
        assert!(post.body.contains("1. u/b (9 points): b guesses"));

        let empty = reveal_post(&capsule(), &[]);
        assert!(empty.body.contains("Nobody left a guess."));
    }

    #[test]
    fn message_texts() {
        assert!(reveal_message(&capsule(), Some("t3_r")).ends_with("See post t3_r."));
        let payload = NotificationJobPayload {
            title: "Cup final".into(),
            author: "oracle".into(),
            reveal_at: capsule().reveal_at,
            recipients: "oracle".into(),
        };
        assert_eq!(
            notification_message(&payload),
            "The time capsule \"Cup final\" by u/oracle will be revealed on 06/01/2025 03:00 PM."
        );
        assert_eq!(
            post_url("rust", "t3_1"),
            "https://www.reddit.com/r/rust/comments/t3_1/"
        );
    }
}
