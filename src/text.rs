//! Small text helpers shared by the catalog search, the translator and
//! capability naming.

/// Words that carry no meaning for naming or matching.
const STOPWORDS: &[&str] = &[
    "a", "all", "an", "and", "any", "are", "as", "at", "be", "by", "can", "could", "do",
    "does", "for", "from", "get", "give", "have", "i", "in", "into", "is", "it", "its", "list",
    "me", "my", "of", "on", "or", "our", "please", "show", "some", "tell", "that", "the",
    "their", "there", "these", "this", "those", "to", "us", "we", "what", "where", "which",
    "who", "why", "with", "without", "would", "you", "find", "display", "fetch", "retrieve",
];

/// Lowercase `text` and split it into alphanumeric tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word)
}

/// Tokens of `text` that are not stopwords and longer than one character,
/// in their original order.
pub fn significant_words(text: &str) -> Vec<String> {
    tokenize(text)
        .into_iter()
        .filter(|w| w.len() > 1 && !is_stopword(w))
        .collect()
}

/// Naive English suffix stemmer, good enough for keyword matching.
pub fn naive_stem(word: &str) -> String {
    let w = word.to_lowercase();
    if w.ends_with("ies") && w.len() > 4 {
        return format!("{}y", &w[..w.len() - 3]);
    }
    if w.ends_with("ses") || w.ends_with("xes") {
        return w[..w.len() - 2].to_string();
    }
    if w.ends_with("ing") && w.len() > 5 {
        return w[..w.len() - 3].to_string();
    }
    if w.ends_with('s') && !w.ends_with("ss") && w.len() > 3 {
        return w[..w.len() - 1].to_string();
    }
    w
}

/// Join words into a lowercase hyphenated slug.
pub fn slugify<S: AsRef<str>>(words: &[S]) -> String {
    words
        .iter()
        .flat_map(|w| tokenize(w.as_ref()))
        .collect::<Vec<_>>()
        .join("-")
}

/// Truncate to at most `max` chars, appending `…` if trimmed.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn significant_words_drop_stopwords() {
        assert_eq!(
            significant_words("Show me all the AWS EC2 instances"),
            vec!["aws", "ec2", "instances"]
        );
    }

    #[test]
    fn stem_plurals() {
        assert_eq!(naive_stem("instances"), "instance");
        assert_eq!(naive_stem("policies"), "policy");
        assert_eq!(naive_stem("access"), "access");
        assert_eq!(naive_stem("running"), "runn");
    }

    #[test]
    fn slug_joins_tokens() {
        assert_eq!(slugify(&["High", "risk ec2"]), "high-risk-ec2");
    }

    #[test]
    fn truncate_on_char_boundary() {
        assert_eq!(truncate_chars("héllo", 2), "hé…");
        assert_eq!(truncate_chars("abc", 5), "abc");
    }
}
