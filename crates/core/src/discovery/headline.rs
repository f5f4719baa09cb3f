use once_cell::sync::Lazy;
use regex_lite::Regex;

/// "<series> #<episode>", where the episode is digits and dashes ("12", "12-13").
static HEADLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.*)\s#([\d-]+)\s*$").unwrap());

/// Series name and episode label extracted from a release headline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedHeadline {
    pub title: String,
    pub episode: String,
}

/// Split a headline into series name and episode label.
///
/// The series name is everything before the last ` #<episode>` suffix.
pub fn parse_headline(headline: &str) -> Option<ParsedHeadline> {
    let captures = HEADLINE.captures(headline.trim())?;
    let title = captures.get(1)?.as_str().trim();
    let episode = captures.get(2)?.as_str();

    if title.is_empty() {
        return None;
    }

    Some(ParsedHeadline {
        title: title.to_string(),
        episode: episode.to_string(),
    })
}
