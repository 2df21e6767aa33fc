use std::sync::LazyLock;

use regex::Regex;

static USER_MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<@([A-Z0-9]+)>").expect("user mention regex is valid"));

static CHANNEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<#([A-Z0-9]+)\|([^>]+)>").expect("channel regex is valid"));

static LABELED_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([^>|]+)\|([^>]+)>").expect("labeled link regex is valid"));

static BARE_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([^>]+)>").expect("bare link regex is valid"));

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex is valid"));

/// Normalize Slack markup into plain text before NLP parsing: unescape
/// HTML entities, unwrap mention/channel/link tokens, collapse whitespace.
pub fn sanitize_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    // `&amp;` last so it cannot manufacture new entities.
    let unescaped = text
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");

    let cleaned = USER_MENTION_RE.replace_all(&unescaped, "@$1");
    let cleaned = CHANNEL_RE.replace_all(&cleaned, "#$2");
    let cleaned = LABELED_LINK_RE.replace_all(&cleaned, "$2");
    let cleaned = BARE_LINK_RE.replace_all(&cleaned, "$1");

    WHITESPACE_RE.replace_all(&cleaned, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(sanitize_text(""), "");
    }

    #[test]
    fn unescapes_entities() {
        assert_eq!(sanitize_text("milk &amp; eggs"), "milk & eggs");
    }

    #[test]
    fn unwraps_mentions_and_channels() {
        assert_eq!(
            sanitize_text("ask <@U12345> in <#C67890|general>"),
            "ask @U12345 in #general"
        );
    }

    #[test]
    fn unwraps_links() {
        assert_eq!(
            sanitize_text("see <https://example.com|the docs>"),
            "see the docs"
        );
        assert_eq!(
            sanitize_text("see <https://example.com>"),
            "see https://example.com"
        );
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(
            sanitize_text("  remind me   to\n\tpay rent  "),
            "remind me to pay rent"
        );
    }
}
