use regex::Regex;
use std::sync::LazyLock;

static TRAILING_HALLUCINATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\s+(?:(?:thanks?|thank\s+you)(?:\s+(?:so\s+much\s+)?for\s+(?:watching|listening|playing))?|okay|ok|bye(?:\s*bye)?|subtitles\s+by\s+.*?)\W*$",
    )
    .expect("valid trailing hallucination pattern")
});

/// Collapses whitespace and drops sign-off phrases Whisper invents at the end of clips.
/// A transcript made only of such a phrase is kept, since the player may have said it.
pub fn clean_transcript(raw: &str) -> String {
    let mut text = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    loop {
        let stripped = TRAILING_HALLUCINATION.replace(&text, "").trim_end().to_string();
        if stripped == text || stripped.is_empty() {
            return text;
        }
        text = stripped;
    }
}
