//! Last-resort price detection by scoring every short, price-looking element.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::price_text::{contains_price, is_clean_price, parse_price};
use crate::config::{KeywordWeight, ScoringConfig};
use crate::page::{ElementSnapshot, NodeRef, PageHandle};
use crate::utils::error::PageError;

const CANDIDATE_SELECTOR: &str = "body *";

/// Elements whose text never renders as visible copy.
const NON_VISUAL_TAGS: &[&str] = &["script", "style", "noscript", "template"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceCandidate {
    pub node: NodeRef,
    pub text: String,
    pub price: Option<Decimal>,
    pub score: i32,
}

#[derive(Debug, Clone)]
pub struct LikelihoodScorer {
    config: ScoringConfig,
}

impl LikelihoodScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub async fn extract<P>(&self, page: &P) -> Result<Option<Decimal>, PageError>
    where
        P: PageHandle + ?Sized,
    {
        let elements = page.query_selector_all(CANDIDATE_SELECTOR).await?;
        let candidates = self.rank(elements);
        debug!("Scored {} price candidates", candidates.len());

        // Only the top candidate is considered; a weak winner is not second-guessed.
        let best = candidates.into_iter().next();
        if let Some(candidate) = &best {
            debug!(
                "Top candidate '{}' scored {} (node {:?})",
                candidate.text, candidate.score, candidate.node
            );
        }

        Ok(best
            .and_then(|c| c.price)
            .filter(|price| *price > Decimal::ZERO))
    }

    /// Candidates sorted by descending score. Ties keep document order.
    pub fn rank(&self, elements: Vec<ElementSnapshot>) -> Vec<PriceCandidate> {
        let mut candidates: Vec<PriceCandidate> = elements
            .into_iter()
            .filter(|e| !NON_VISUAL_TAGS.contains(&e.tag.as_str()))
            .filter_map(|element| {
                let text = element.text.trim();
                if text.chars().count() >= self.config.short_text_threshold || !contains_price(text) {
                    return None;
                }

                Some(PriceCandidate {
                    node: element.node,
                    text: text.to_string(),
                    price: parse_price(text),
                    score: self.score(&element),
                })
            })
            .collect();

        candidates.sort_by(|a, b| b.score.cmp(&a.score));
        candidates
    }

    pub fn score(&self, element: &ElementSnapshot) -> i32 {
        let class_tokens = tokens(element.class_name());
        let id_tokens = tokens(element.id());

        let keyword_score = |keywords: &[KeywordWeight]| -> i32 {
            keywords
                .iter()
                .map(|k| {
                    let hits = [&class_tokens, &id_tokens]
                        .iter()
                        .filter(|tokens| tokens.iter().any(|t| *t == k.keyword))
                        .count() as i32;
                    hits * k.weight
                })
                .sum()
        };

        let mut score = keyword_score(&self.config.positive_keywords)
            + keyword_score(&self.config.negative_keywords);

        if is_clean_price(&element.text) {
            score += self.config.clean_format_bonus;
        }

        score
    }
}

/// Lowercased words of a class or id value, split on punctuation, whitespace
/// and camelCase humps: `"priceNow sale_price"` gives `price, now, sale, price`.
fn tokens(value: &str) -> Vec<String> {
    let mut words = Vec::new();

    for chunk in value.split(|c: char| !c.is_ascii_alphanumeric()) {
        let mut current = String::new();
        let mut previous_lower = false;

        for c in chunk.chars() {
            if c.is_ascii_uppercase() && previous_lower && !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            previous_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
            current.push(c.to_ascii_lowercase());
        }

        if !current.is_empty() {
            words.push(current);
        }
    }

    words
}
