use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// Upper bound on edits per query token.
pub const DEFAULT_MAX_EDITS: usize = 2;
/// Upper bound on dictionary terms a single query token may expand to.
pub const DEFAULT_MAX_EXPANSIONS: usize = 100;
/// Results returned by a title search.
pub const DEFAULT_SEARCH_LIMIT: usize = 5;

/// Weight of every non-best matching field in a document score.
const EXTRA_FIELD_WEIGHT: f64 = 0.1;

/// Field of a title a highlight refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldPath {
    Title,
    ExtraTitles,
}

impl FieldPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldPath::Title => "title",
            FieldPath::ExtraTitles => "extraTitles",
        }
    }
}

/// A field value that matched the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    pub path: FieldPath,
    pub value: String,
    pub score: f64,
}

/// The searchable projection of a title.
#[derive(Debug, Clone)]
pub struct SearchDocument {
    pub id: String,
    pub title: String,
    pub extra_titles: Vec<String>,
}

/// A matching document with its relevance and highlights (best first).
#[derive(Debug, Clone, PartialEq)]
pub struct RankedDocument {
    pub id: String,
    pub score: f64,
    pub highlights: Vec<Highlight>,
}

/// Parameters of a fuzzy search.
#[derive(Debug, Clone)]
pub struct FuzzyQuery {
    pub text: String,
    pub max_edits: usize,
    pub max_expansions: usize,
    pub limit: usize,
}

impl FuzzyQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            max_edits: DEFAULT_MAX_EDITS,
            max_expansions: DEFAULT_MAX_EXPANSIONS,
            limit: DEFAULT_SEARCH_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_max_edits(mut self, max_edits: usize) -> Self {
        self.max_edits = max_edits;
        self
    }

    pub fn with_max_expansions(mut self, max_expansions: usize) -> Self {
        self.max_expansions = max_expansions;
        self
    }
}

/// Lowercased alphanumeric tokens of `text`.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Edits allowed for a token: none for very short tokens, growing with length.
fn edit_budget(token: &str, max_edits: usize) -> usize {
    let auto = match token.chars().count() {
        0..=2 => 0,
        3..=5 => 1,
        _ => 2,
    };
    auto.min(max_edits)
}

/// Dictionary terms a query token expands to, with their match weight.
///
/// Keeps the `max_expansions` closest terms (ties broken alphabetically).
fn expand(
    token: &str,
    dictionary: &BTreeSet<&str>,
    max_edits: usize,
    max_expansions: usize,
) -> HashMap<String, f64> {
    let budget = edit_budget(token, max_edits);
    let token_len = token.chars().count();

    let mut candidates: Vec<(usize, &str)> = dictionary
        .iter()
        .filter(|term| term.chars().count().abs_diff(token_len) <= budget)
        .filter_map(|term| {
            let distance = strsim::levenshtein(token, term);
            (distance <= budget).then_some((distance, *term))
        })
        .collect();

    // BTreeSet iteration is already alphabetical, so a stable sort on
    // distance keeps alphabetical order within equal distances.
    candidates.sort_by_key(|(distance, _)| *distance);
    candidates.truncate(max_expansions);

    candidates
        .into_iter()
        .map(|(distance, term)| (term.to_string(), 1.0 / (1.0 + distance as f64)))
        .collect()
}

/// Score one field value: matched weight scaled by how much of the value matched.
fn score_value(value_tokens: &[String], expansions: &[HashMap<String, f64>]) -> f64 {
    if value_tokens.is_empty() {
        return 0.0;
    }

    let mut matched_weight = 0.0;
    let mut covered = vec![false; value_tokens.len()];

    for expansion in expansions {
        let best = value_tokens
            .iter()
            .enumerate()
            .filter_map(|(i, token)| expansion.get(token).map(|w| (i, *w)))
            .max_by(|a, b| a.1.total_cmp(&b.1));

        if let Some((i, weight)) = best {
            matched_weight += weight;
            covered[i] = true;
        }
    }

    if matched_weight == 0.0 {
        return 0.0;
    }

    let coverage = covered.iter().filter(|c| **c).count() as f64 / value_tokens.len() as f64;
    matched_weight * (1.0 + coverage)
}

/// Rank `documents` against `query`.
///
/// Documents without any matching field are excluded. The result is ordered
/// by descending relevance (input order on ties) and truncated to
/// `query.limit`.
pub fn rank(query: &FuzzyQuery, documents: &[SearchDocument]) -> Vec<RankedDocument> {
    let query_tokens = tokenize(&query.text);
    if query_tokens.is_empty() || query.limit == 0 {
        return Vec::new();
    }

    let tokenized: Vec<Vec<(FieldPath, &str, Vec<String>)>> = documents
        .iter()
        .map(|doc| {
            std::iter::once((FieldPath::Title, doc.title.as_str()))
                .chain(
                    doc.extra_titles
                        .iter()
                        .map(|t| (FieldPath::ExtraTitles, t.as_str())),
                )
                .map(|(path, value)| (path, value, tokenize(value)))
                .collect()
        })
        .collect();

    let dictionary: BTreeSet<&str> = tokenized
        .iter()
        .flatten()
        .flat_map(|(_, _, tokens)| tokens.iter().map(String::as_str))
        .collect();

    let expansions: Vec<HashMap<String, f64>> = query_tokens
        .iter()
        .map(|t| expand(t, &dictionary, query.max_edits, query.max_expansions))
        .collect();

    let mut ranked: Vec<RankedDocument> = documents
        .iter()
        .zip(&tokenized)
        .filter_map(|(doc, fields)| {
            let mut highlights: Vec<Highlight> = fields
                .iter()
                .filter_map(|(path, value, tokens)| {
                    let score = score_value(tokens, &expansions);
                    (score > 0.0).then(|| Highlight {
                        path: *path,
                        value: value.to_string(),
                        score,
                    })
                })
                .collect();

            // stable: the primary title wins ties, then list order
            highlights.sort_by(|a, b| b.score.total_cmp(&a.score));

            let (best, rest) = highlights.split_first()?;
            let score = best.score + EXTRA_FIELD_WEIGHT * rest.iter().map(|h| h.score).sum::<f64>();

            Some(RankedDocument {
                id: doc.id.clone(),
                score,
                highlights,
            })
        })
        .collect();

    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked.truncate(query.limit);
    ranked
}

/// Display title for a search result.
///
/// Uses the field of the first highlight. When that field is the alternate
/// title list, the FIRST alternate title is returned, not necessarily the one
/// that matched.
pub fn select_best_title(title: &str, extra_titles: &[String], highlights: &[Highlight]) -> String {
    match highlights.first().map(|h| h.path) {
        Some(FieldPath::ExtraTitles) => extra_titles
            .first()
            .cloned()
            .unwrap_or_else(|| title.to_string()),
        _ => title.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, title: &str, extra: &[&str]) -> SearchDocument {
        SearchDocument {
            id: id.to_string(),
            title: title.to_string(),
            extra_titles: extra.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn ids(ranked: &[RankedDocument]) -> Vec<&str> {
        ranked.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("Kaguya-sama: Love is War!"),
            vec!["kaguya", "sama", "love", "is", "war"]
        );
        assert!(tokenize("  -- ").is_empty());
    }

    #[test]
    fn test_edit_budget_grows_with_length() {
        assert_eq!(edit_budget("no", 2), 0);
        assert_eq!(edit_budget("titan", 2), 1);
        assert_eq!(edit_budget("shingeki", 2), 2);
        assert_eq!(edit_budget("shingeki", 1), 1);
    }

    #[test]
    fn test_exact_match_ranks_first() {
        let docs = vec![
            doc("a", "Made in Abyss", &[]),
            doc("b", "Made in Abyss: Dawn of the Deep Soul", &[]),
        ];
        let ranked = rank(&FuzzyQuery::new("made in abyss"), &docs);
        assert_eq!(ids(&ranked), vec!["a", "b"]);
        assert_eq!(ranked[0].highlights[0].path, FieldPath::Title);
    }

    #[test]
    fn test_typo_still_matches() {
        let docs = vec![doc("a", "Frieren", &["Sousou no Frieren"]), doc("b", "Bocchi the Rock", &[])];
        let ranked = rank(&FuzzyQuery::new("freiren"), &docs);
        assert_eq!(ids(&ranked), vec!["a"]);
    }

    #[test]
    fn test_no_match_is_excluded() {
        let docs = vec![doc("a", "Frieren", &[]), doc("b", "Bocchi the Rock", &[])];
        assert!(rank(&FuzzyQuery::new("gundam"), &docs).is_empty());
        assert!(rank(&FuzzyQuery::new("   "), &docs).is_empty());
    }

    #[test]
    fn test_limit_truncates() {
        let docs: Vec<SearchDocument> = (0..8)
            .map(|i| doc(&format!("d{i}"), &format!("Gundam {i}"), &[]))
            .collect();
        let ranked = rank(&FuzzyQuery::new("gundam"), &docs);
        assert_eq!(ranked.len(), DEFAULT_SEARCH_LIMIT);

        let ranked = rank(&FuzzyQuery::new("gundam").with_limit(2), &docs);
        assert_eq!(ranked.len(), 2);
    }

    #[test]
    fn test_max_expansions_bounds_fuzzy_terms() {
        let docs = vec![doc("a", "abcd", &[]), doc("b", "abce", &[]), doc("c", "abcf", &[])];
        let query = FuzzyQuery::new("abcx").with_max_expansions(1);
        let ranked = rank(&query, &docs);
        // only the alphabetically first term at distance 1 survives
        assert_eq!(ids(&ranked), vec!["a"]);
    }

    #[test]
    fn test_highlights_ordered_best_first() {
        let docs = vec![doc(
            "aot",
            "Shingeki no Kyojin",
            &["Attack on Titan", "Attack on Titan Season 2"],
        )];
        let ranked = rank(&FuzzyQuery::new("attack on titan season 2"), &docs);
        let hl = &ranked[0].highlights;
        assert_eq!(hl[0].path, FieldPath::ExtraTitles);
        assert_eq!(hl[0].value, "Attack on Titan Season 2");
        assert!(hl.iter().all(|h| h.path == FieldPath::ExtraTitles));
    }

    #[test]
    fn test_best_title_uses_first_extra_title() {
        let docs = vec![doc(
            "aot",
            "Shingeki no Kyojin",
            &["Attack on Titan", "Attack on Titan Season 2"],
        )];
        let ranked = rank(&FuzzyQuery::new("attack on titan season 2"), &docs);
        let extras = docs[0].extra_titles.clone();
        let best = select_best_title(&docs[0].title, &extras, &ranked[0].highlights);
        assert_eq!(best, "Attack on Titan");
    }

    #[test]
    fn test_best_title_uses_primary_title() {
        let highlights = vec![Highlight {
            path: FieldPath::Title,
            value: "Frieren".to_string(),
            score: 2.0,
        }];
        let best = select_best_title("Frieren", &["Sousou no Frieren".to_string()], &highlights);
        assert_eq!(best, "Frieren");
        assert_eq!(select_best_title("Frieren", &[], &[]), "Frieren");
    }

    #[test]
    fn test_field_path_names() {
        assert_eq!(FieldPath::Title.as_str(), "title");
        assert_eq!(
            serde_json::to_string(&FieldPath::ExtraTitles).unwrap(),
            "\"extraTitles\""
        );
    }
}
