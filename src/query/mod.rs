//! Query normalization.
//!
//! Raw query text goes through a deterministic pipeline before embedding:
//! whitespace is trimmed and collapsed, the text is case-folded, and known
//! medical abbreviations are expanded via exact word-boundary substitution.
//! Unrecognized tokens pass through untouched.
//!
//! The abbreviation dictionary is an explicit configuration value rather than
//! a global, so tests can substitute their own dictionaries and normalization
//! stays a pure function of its inputs.

use std::collections::HashMap;

/// Dictionary of abbreviation expansions applied during query normalization.
///
/// Keys are matched at word boundaries: a lowercased token matches after any
/// leading and trailing punctuation is set aside, so "rct" and "rcts," both
/// expand, but "rctx" does not.
#[derive(Debug, Clone)]
pub struct AbbreviationDict {
    expansions: HashMap<String, String>,
}

impl AbbreviationDict {
    /// Build a dictionary from `(abbreviation, expansion)` pairs.
    ///
    /// Abbreviations are stored lowercased since normalization case-folds
    /// before lookup.
    pub fn from_pairs<I, S, T>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Into<String>,
    {
        let expansions = pairs
            .into_iter()
            .map(|(abbr, expansion)| (abbr.into().to_lowercase(), expansion.into()))
            .collect();
        Self { expansions }
    }

    /// The default dictionary of common medical abbreviations.
    pub fn medical() -> Self {
        Self::from_pairs([
            ("rct", "randomized controlled trial"),
            ("rcts", "randomized controlled trials"),
            ("covid", "covid-19 coronavirus"),
            ("ai", "artificial intelligence"),
            ("ml", "machine learning"),
            ("pt", "physical therapy physiotherapy"),
            ("oa", "osteoarthritis"),
            ("dm", "diabetes mellitus"),
            ("htn", "hypertension"),
            ("mi", "myocardial infarction"),
            ("copd", "chronic obstructive pulmonary disease"),
        ])
    }

    /// An empty dictionary; normalization then only folds case and whitespace.
    pub fn empty() -> Self {
        Self {
            expansions: HashMap::new(),
        }
    }

    /// Look up the expansion for a lowercased token.
    pub fn expand(&self, token: &str) -> Option<&str> {
        self.expansions.get(token).map(String::as_str)
    }

    /// Number of known abbreviations.
    pub fn len(&self) -> usize {
        self.expansions.len()
    }

    /// Whether the dictionary has no entries.
    pub fn is_empty(&self) -> bool {
        self.expansions.is_empty()
    }
}

impl Default for AbbreviationDict {
    fn default() -> Self {
        Self::medical()
    }
}

/// Normalize raw query text for embedding.
///
/// Steps, in order: trim and collapse internal whitespace, case-fold, expand
/// known abbreviations at word boundaries. Each token is split into a leading
/// punctuation affix, an alphanumeric core, and a trailing affix; the core is
/// looked up and the affixes are preserved around the expansion, so "rcts,"
/// becomes "randomized controlled trials,". Pure function: identical input
/// always yields identical output.
pub fn normalize(raw: &str, dict: &AbbreviationDict) -> String {
    let lowered = raw.to_lowercase();
    let mut tokens: Vec<String> = Vec::new();
    for token in lowered.split_whitespace() {
        let (prefix, core, suffix) = split_affixes(token);
        match dict.expand(core) {
            Some(expansion) if !core.is_empty() => {
                tokens.push(format!("{}{}{}", prefix, expansion, suffix));
            }
            _ => tokens.push(token.to_string()),
        }
    }
    tokens.join(" ")
}

/// Split a token into leading non-alphanumeric characters, the core word,
/// and trailing non-alphanumeric characters.
fn split_affixes(token: &str) -> (&str, &str, &str) {
    let not_word = |c: char| !c.is_alphanumeric();
    let start = token.len() - token.trim_start_matches(not_word).len();
    let end = token.trim_end_matches(not_word).len().max(start);
    (&token[..start], &token[start..end], &token[end..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_and_folds_case() {
        let dict = AbbreviationDict::empty();
        assert_eq!(normalize("  Knee   Osteoarthritis \t", &dict), "knee osteoarthritis");
        assert_eq!(normalize("UPPERCASE", &dict), "uppercase");
        assert_eq!(normalize("   ", &dict), "");
    }

    #[test]
    fn expands_known_abbreviations() {
        let dict = AbbreviationDict::medical();
        assert_eq!(
            normalize("latest RCTs on knee osteoarthritis", &dict),
            "latest randomized controlled trials on knee osteoarthritis"
        );
    }

    #[test]
    fn expands_abbreviations_adjacent_to_punctuation() {
        let dict = AbbreviationDict::medical();
        assert_eq!(
            normalize("latest RCTs, knee osteoarthritis", &dict),
            "latest randomized controlled trials, knee osteoarthritis"
        );
        assert_eq!(
            normalize("exercise (PT) outcomes", &dict),
            "exercise (physical therapy physiotherapy) outcomes"
        );
        assert_eq!(normalize("RCT?", &dict), "randomized controlled trial?");
    }

    #[test]
    fn hyphenated_compounds_are_left_alone() {
        let dict = AbbreviationDict::medical();
        // the hyphen joins the core into one word, so no entry matches
        assert_eq!(normalize("covid-19 wave", &dict), "covid-19 wave");
    }

    #[test]
    fn expansion_requires_whole_token_match() {
        let dict = AbbreviationDict::medical();
        // "rctx" contains "rct" but is not the abbreviation itself
        assert_eq!(normalize("rctx study", &dict), "rctx study");
    }

    #[test]
    fn unrecognized_tokens_pass_through() {
        let dict = AbbreviationDict::medical();
        assert_eq!(normalize("telemedicine adoption", &dict), "telemedicine adoption");
    }

    #[test]
    fn substituted_dictionary_changes_expansion() {
        let dict = AbbreviationDict::from_pairs([("tka", "total knee arthroplasty")]);
        assert_eq!(normalize("TKA outcomes", &dict), "total knee arthroplasty outcomes");
        // medical() entries are absent from the substituted dictionary
        assert_eq!(normalize("RCT outcomes", &dict), "rct outcomes");
    }

    #[test]
    fn medical_dictionary_is_populated() {
        let dict = AbbreviationDict::medical();
        assert!(!dict.is_empty());
        assert_eq!(dict.len(), 11);
        assert!(AbbreviationDict::empty().is_empty());
    }

    #[test]
    fn normalization_is_deterministic() {
        let dict = AbbreviationDict::medical();
        let a = normalize("COVID vaccine RCT", &dict);
        let b = normalize("COVID vaccine RCT", &dict);
        assert_eq!(a, b);
    }
}
