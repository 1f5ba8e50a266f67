//! Weighted keyword lexicons and the scoring reducer.
//!
//! A [`Lexicon`] is an ordered list of categories, each with one or more
//! [`TermGroup`]s. Scoring a case-folded text gives every category the sum,
//! over its groups, of `distinct keywords found × group weight`. A keyword
//! counts once no matter how often it appears, and matching is plain
//! substring containment.
//!
//! Category order is significant: [`ScoreVector::winner`] breaks ties in
//! favour of the category declared first.

use serde::{Deserialize, Serialize};

use crate::types::ScoreVector;

/// Case-fold text before scoring.
pub fn fold(text: &str) -> String {
    text.to_lowercase()
}

/// Keywords sharing one weight.
#[derive(Debug, Clone, PartialEq)]
pub struct TermGroup {
    weight: f64,
    keywords: Vec<String>,
}

impl TermGroup {
    /// Keywords are case-folded here, once.
    pub fn new<I, S>(weight: f64, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            weight,
            keywords: keywords
                .into_iter()
                .map(|k| fold(k.as_ref()))
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Number of distinct keywords contained in `folded`.
    pub fn matches(&self, folded: &str) -> usize {
        self.keywords
            .iter()
            .filter(|k| folded.contains(k.as_str()))
            .count()
    }

    pub fn matches_any(&self, folded: &str) -> bool {
        self.keywords.iter().any(|k| folded.contains(k.as_str()))
    }

    pub fn score(&self, folded: &str) -> f64 {
        self.matches(folded) as f64 * self.weight
    }
}

/// Ordered, weighted keyword categories.
#[derive(Debug, Clone, PartialEq)]
pub struct Lexicon<C> {
    categories: Vec<(C, Vec<TermGroup>)>,
}

impl<C> Default for Lexicon<C> {
    fn default() -> Self {
        Self {
            categories: Vec::new(),
        }
    }
}

impl<C: Copy + PartialEq> Lexicon<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a category scored over several weighted groups.
    pub fn category(mut self, label: C, groups: Vec<TermGroup>) -> Self {
        self.categories.push((label, groups));
        self
    }

    /// Append a category with a single group.
    pub fn flat<I, S>(self, label: C, weight: f64, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.category(label, vec![TermGroup::new(weight, keywords)])
    }

    /// Score every category against already-folded text.
    pub fn score(&self, folded: &str) -> ScoreVector<C> {
        ScoreVector::new(
            self.categories
                .iter()
                .map(|(label, groups)| (*label, groups.iter().map(|g| g.score(folded)).sum()))
                .collect(),
        )
    }

    pub fn labels(&self) -> impl Iterator<Item = C> + '_ {
        self.categories.iter().map(|(label, _)| *label)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// A labelled keyword list as it appears in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordSet<C> {
    pub label: C,
    pub keywords: Vec<String>,
}

impl<C> KeywordSet<C> {
    pub fn new(label: C, keywords: &[&str]) -> Self {
        Self {
            label,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl<C: Copy + PartialEq> Lexicon<C> {
    /// One category per set, all with the same weight, in set order.
    pub fn from_sets(sets: &[KeywordSet<C>], weight: f64) -> Self {
        sets.iter()
            .fold(Lexicon::new(), |lex, set| lex.flat(set.label, weight, &set.keywords))
    }
}
