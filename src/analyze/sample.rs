//! Oracle sample selection: the most negative comments, newline-joined and capped.
//!
//! The oracle is the slowest and most expensive stage, so only a bounded,
//! emotionally salient slice of the corpus is sent.

use crate::sentiment::AnnotatedComment;

pub const DEFAULT_SAMPLE_SIZE: usize = 50;
pub const DEFAULT_SAMPLE_MAX_CHARS: usize = 30_000;

/// Pick the `n` lowest-compound comments (ties keep corpus order) and join them.
/// Blank comments are skipped. The result never exceeds `max_chars` characters.
pub fn select_sample(annotated: &[AnnotatedComment<'_>], n: usize, max_chars: usize) -> String {
    let mut ranked: Vec<&AnnotatedComment<'_>> = annotated
        .iter()
        .filter(|a| !a.comment.text.trim().is_empty())
        .collect();
    // stable sort: equal scores stay in load order
    ranked.sort_by(|a, b| a.compound.total_cmp(&b.compound));

    let joined = ranked
        .into_iter()
        .take(n)
        .map(|a| a.comment.text.trim())
        .collect::<Vec<_>>()
        .join("\n");

    truncate_chars(&joined, max_chars)
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => s[..byte_idx].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::Comment;

    fn annotated<'a>(corpus: &'a [Comment], scores: &[f32]) -> Vec<AnnotatedComment<'a>> {
        corpus
            .iter()
            .zip(scores)
            .map(|(c, s)| AnnotatedComment {
                comment: c,
                compound: *s,
            })
            .collect()
    }

    #[test]
    fn picks_most_negative_first() {
        let corpus = vec![
            Comment::new("v", "fine"),
            Comment::new("v", "awful"),
            Comment::new("v", "great"),
            Comment::new("v", "bad"),
        ];
        let a = annotated(&corpus, &[0.0, -0.9, 0.8, -0.4]);
        assert_eq!(select_sample(&a, 2, 1_000), "awful\nbad");
    }

    #[test]
    fn ties_keep_load_order_and_blank_is_skipped() {
        let corpus = vec![
            Comment::new("v", "first"),
            Comment::new("v", "  "),
            Comment::new("v", "second"),
        ];
        let a = annotated(&corpus, &[-0.5, -0.9, -0.5]);
        assert_eq!(select_sample(&a, 10, 1_000), "first\nsecond");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let corpus = vec![Comment::new("v", "ééééé")];
        let a = annotated(&corpus, &[-1.0]);
        assert_eq!(select_sample(&a, 1, 3), "ééé");
    }

    #[test]
    fn empty_input_yields_empty_sample() {
        assert_eq!(select_sample(&[], DEFAULT_SAMPLE_SIZE, DEFAULT_SAMPLE_MAX_CHARS), "");
    }
}
