use std::collections::HashSet;
use std::sync::LazyLock;

/// Verbs that commonly open a request or report in crisis messages. Matched
/// against the lowercased, stemmed first token of a sentence.
static REQUEST_VERBS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        // requests
        "need", "help", "send", "give", "bring", "please", "provide", "save", "rescue",
        "want", "ask", "request", "call", "come",
        // reports
        "are", "is", "am", "have", "go", "get", "find", "see", "tell", "let", "take",
        "evacuate", "stop", "look", "contact", "inform", "report", "urge", "deliver",
    ]
    .into_iter()
    .collect()
});

pub fn is_request_verb(token: &str) -> bool {
    REQUEST_VERBS.contains(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_verbs() {
        assert!(is_request_verb("need"));
        assert!(is_request_verb("send"));
        assert!(!is_request_verb("water"));
        assert!(!is_request_verb("Need"));
    }
}
