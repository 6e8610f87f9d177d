//! Keyword Q&A, bullet formatting and the older local summary helpers.

use once_cell::sync::Lazy;
use regex::Regex;

pub const NOT_FOUND_ANSWER: &str = "I couldn't find a specific answer in the page content.";
const MAX_ANSWER_SENTENCES: usize = 2;
const MAX_BULLET_WORDS: usize = 15;

static SENTENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^.!?]+[.!?]+").expect("sentence pattern compiles"));

/// Runs of non-terminal text closed by `.`, `!` or `?`. Text with no
/// terminal punctuation at all comes back as a single sentence.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let sentences: Vec<&str> = SENTENCE.find_iter(text).map(|m| m.as_str()).collect();
    if sentences.is_empty() {
        vec![text]
    } else {
        sentences
    }
}

/// Answers `question` with up to two sentences of `text` mentioning any of
/// its words (case-insensitive substring match).
pub fn generate_answer(text: &str, question: &str) -> String {
    let question = question.to_lowercase();
    let keywords: Vec<&str> = question.split_whitespace().collect();
    if keywords.is_empty() {
        return NOT_FOUND_ANSWER.to_string();
    }
    let relevant: Vec<&str> = split_sentences(text)
        .into_iter()
        .filter(|sentence| {
            let lower = sentence.to_lowercase();
            keywords.iter().any(|keyword| lower.contains(keyword))
        })
        .take(MAX_ANSWER_SENTENCES)
        .map(str::trim)
        .collect();
    if relevant.is_empty() {
        NOT_FOUND_ANSWER.to_string()
    } else {
        relevant.join(" ")
    }
}

/// One list item per sentence; long sentences are cut after fifteen words.
pub fn bullet_items(text: &str) -> Vec<String> {
    split_sentences(text)
        .into_iter()
        .map(|sentence| {
            let words: Vec<&str> = sentence.split_whitespace().collect();
            if words.len() > MAX_BULLET_WORDS {
                format!("{}...", words[..MAX_BULLET_WORDS].join(" "))
            } else {
                sentence.trim().to_string()
            }
        })
        .collect()
}

/// Reading-mode rendering of `text` as an HTML list.
pub fn format_as_bullets(text: &str) -> String {
    let mut html = String::from("<ul class=\"bullet-list\">");
    for item in bullet_items(text) {
        html.push_str("<li>");
        html.push_str(&escape_html(&item));
        html.push_str("</li>");
    }
    html.push_str("</ul>");
    html
}

/// Word count plus the first three sentences.
pub fn local_summary(text: &str) -> String {
    let word_count = text.split_whitespace().count();
    if word_count == 0 {
        return "No content to summarize.".to_string();
    }
    let lead: Vec<&str> = split_sentences(text).into_iter().take(3).collect();
    format!(
        "This page contains approximately {word_count} words. {}",
        lead.join(" ")
    )
}

/// First five sentences with internal whitespace collapsed.
pub fn simplify_text(text: &str) -> String {
    split_sentences(text)
        .into_iter()
        .take(5)
        .map(|sentence| sentence.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join(" ")
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_picks_matching_sentence() {
        assert_eq!(
            generate_answer("Cats are mammals. Dogs bark loudly.", "bark"),
            "Dogs bark loudly."
        );
    }

    #[test]
    fn answer_is_case_insensitive_and_capped_at_two() {
        let text = "Rust is fast. RUST is safe! Rust has crates? Go is fine.";
        assert_eq!(generate_answer(text, "rust"), "Rust is fast. RUST is safe!");
    }

    #[test]
    fn answer_reports_not_found() {
        assert_eq!(
            generate_answer("Cats are mammals. Dogs bark loudly.", "whales"),
            NOT_FOUND_ANSWER
        );
        assert_eq!(generate_answer("", "anything"), NOT_FOUND_ANSWER);
    }

    #[test]
    fn surrounding_whitespace_does_not_match_everything() {
        assert_eq!(
            generate_answer("Cats are mammals. Dogs bark loudly.", "  whales  "),
            NOT_FOUND_ANSWER
        );
    }

    #[test]
    fn unterminated_text_is_one_sentence() {
        assert_eq!(split_sentences("no punctuation here"), vec!["no punctuation here"]);
        assert_eq!(split_sentences("One. Two! tail"), vec!["One.", " Two!"]);
    }

    #[test]
    fn bullets_truncate_long_sentences() {
        let text = format!("A short one. {}.", "word ".repeat(20));
        let items = bullet_items(&text);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], "A short one.");
        assert_eq!(items[1], format!("{}...", vec!["word"; 15].join(" ")));

        let html = format_as_bullets(&text);
        assert!(html.starts_with("<ul class=\"bullet-list\"><li>A short one.</li>"));
        assert!(html.ends_with("...</li></ul>"));
    }

    #[test]
    fn bullets_escape_markup() {
        assert_eq!(
            format_as_bullets("Use <b> tags."),
            "<ul class=\"bullet-list\"><li>Use &lt;b&gt; tags.</li></ul>"
        );
    }

    #[test]
    fn local_helpers_match_legacy_output() {
        let text = "One  two. Three four! Five six? Seven eight.";
        assert_eq!(
            local_summary(text),
            "This page contains approximately 8 words. One  two.  Three four!  Five six?"
        );
        assert_eq!(local_summary("   "), "No content to summarize.");
        assert_eq!(
            simplify_text(text),
            "One two. Three four! Five six? Seven eight."
        );
    }
}
