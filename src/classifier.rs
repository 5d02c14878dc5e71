//! Keyword-substring inference of a service's category and sub-category.
//!
//! Rules are evaluated in table order. Under [`MatchStrategy::FirstMatch`]
//! the first rule with any keyword contained in the text wins, so a text
//! matching two categories goes to whichever rule comes first.
//! [`MatchStrategy::Scored`] instead picks the rule with the most distinct
//! keyword hits and uses table order only to break ties.

use crate::taxonomy::Taxonomy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchStrategy {
    #[default]
    FirstMatch,
    Scored,
}

impl std::str::FromStr for MatchStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first-match" => Ok(MatchStrategy::FirstMatch),
            "scored" => Ok(MatchStrategy::Scored),
            other => Err(format!("unknown match strategy '{}' (expected first-match or scored)", other)),
        }
    }
}

/// Pure, deterministic classifier over a borrowed [`Taxonomy`]
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'a> {
    taxonomy: &'a Taxonomy,
    strategy: MatchStrategy,
}

impl<'a> Classifier<'a> {
    pub fn new(taxonomy: &'a Taxonomy, strategy: MatchStrategy) -> Self {
        Self { taxonomy, strategy }
    }

    pub fn taxonomy(&self) -> &'a Taxonomy {
        self.taxonomy
    }

    pub fn strategy(&self) -> MatchStrategy {
        self.strategy
    }

    /// Category whose keywords match `text`, or `None` when no rule matches.
    pub fn infer_category(&self, text: &str) -> Option<&'a str> {
        let text = text.to_lowercase();
        let rules = &self.taxonomy.category_rules;
        let index = pick_rule(rules.iter().map(|r| r.keywords.as_slice()), &text, self.strategy)?;
        Some(rules[index].category.as_str())
    }

    /// Sub-category of `category_id` matching `text`, falling back to the
    /// category's default. `None` when the category has no rule set.
    pub fn infer_sub_category(&self, text: &str, category_id: &str) -> Option<&'a str> {
        let set = self.taxonomy.sub_rules_for(category_id)?;
        let text = text.to_lowercase();
        match pick_rule(set.rules.iter().map(|r| r.keywords.as_slice()), &text, self.strategy) {
            Some(index) => Some(set.rules[index].sub_category.as_str()),
            None => set.default.as_deref(),
        }
    }
}

fn hits(keywords: &[String], text: &str) -> usize {
    let mut matched: Vec<&str> = keywords
        .iter()
        .map(String::as_str)
        .filter(|k| !k.is_empty() && text.contains(k))
        .collect();
    matched.sort_unstable();
    matched.dedup();
    matched.len()
}

/// Index of the winning rule, if any rule has a hit.
fn pick_rule<'k>(
    rules: impl Iterator<Item = &'k [String]>,
    text: &str,
    strategy: MatchStrategy,
) -> Option<usize> {
    match strategy {
        MatchStrategy::FirstMatch => rules
            .enumerate()
            .find(|(_, keywords)| hits(keywords, text) > 0)
            .map(|(index, _)| index),
        MatchStrategy::Scored => {
            let mut best: Option<(usize, usize)> = None;
            for (index, keywords) in rules.enumerate() {
                let score = hits(keywords, text);
                // Strictly greater keeps the earlier rule on ties.
                if score > 0 && best.map_or(true, |(_, top)| score > top) {
                    best = Some((index, score));
                }
            }
            best.map(|(index, _)| index)
        }
    }
}
