use phc_protocol::Proposal;
use std::collections::HashSet;

const MAX_EXTRACTED_KEYWORDS: usize = 5;
const MIN_EXTRACTED_CHARS: usize = 4;

const STOPWORDS: &[&str] = &[
    "about", "after", "again", "also", "because", "before", "being", "could", "does", "from",
    "have", "into", "just", "make", "more", "should", "some", "that", "then", "there", "this",
    "those", "through", "using", "want", "when", "where", "which", "while", "will", "with",
    "would", "your",
];

/// Keywords that identify a proposal in the lessons ledger: the explicit
/// keywords when given, otherwise the first distinct content words of the
/// description.
pub fn trigger_keywords(proposal: &Proposal) -> Vec<String> {
    let mut seen = HashSet::new();
    let explicit: Vec<String> = proposal
        .keywords
        .iter()
        .map(|kw| kw.trim().to_lowercase())
        .filter(|kw| !kw.is_empty() && seen.insert(kw.clone()))
        .collect();
    if !explicit.is_empty() {
        return explicit;
    }

    proposal
        .description
        .split(|c: char| !c.is_alphanumeric() && c != '_' && c != '-')
        .map(str::to_lowercase)
        .filter(|word| word.chars().count() >= MIN_EXTRACTED_CHARS)
        .filter(|word| !STOPWORDS.contains(&word.as_str()))
        .filter(|word| seen.insert(word.clone()))
        .take(MAX_EXTRACTED_KEYWORDS)
        .collect()
}

pub fn truncate_one_line(text: &str, max_chars: usize) -> String {
    let s = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if s.chars().count() <= max_chars {
        return s;
    }
    let truncated: String = s.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{truncated}…")
}

/// Short label for a proposal: its approach when set, else its description.
pub fn proposal_subject(proposal: &Proposal, max_chars: usize) -> String {
    let subject = if proposal.approach.trim().is_empty() {
        &proposal.description
    } else {
        &proposal.approach
    };
    truncate_one_line(subject, max_chars)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_keywords_win_and_dedupe() {
        let proposal = Proposal::new("rewrite the parser")
            .with_keywords([" Parser ", "parser", "", "LEXER"]);
        assert_eq!(trigger_keywords(&proposal), vec!["parser", "lexer"]);
    }

    #[test]
    fn description_words_are_extracted() {
        let proposal = Proposal::new(
            "Retry the database migration with the same migration script before lunch",
        );
        assert_eq!(
            trigger_keywords(&proposal),
            vec!["retry", "database", "migration", "same", "script"]
        );
    }

    #[test]
    fn truncation_collapses_whitespace() {
        assert_eq!(truncate_one_line("a\n  b\tc", 10), "a b c");
        assert_eq!(truncate_one_line("abcdefgh", 5), "abcd…");
    }
}
