//! The fixed indicator taxonomy and per-indicator analysis results.
//!
//! Four indicators are defined once at process start and never change.
//! Keyword lists are kept in declaration order: the labeler's
//! first-match-wins rule depends on it. The scorer treats them as sets.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

/// One category of authoritarian-language signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Indicator {
    /// Stable identifier, 1 through 4. Doubles as the classifier label.
    pub id: u32,
    /// Short human-readable name.
    pub name: &'static str,
    /// One-sentence description of what the indicator captures.
    pub description: &'static str,
    /// Keyword list, in declaration order.
    pub keywords: &'static [&'static str],
}

lazy_static! {
    /// The four fixed indicators, in scan order.
    pub static ref INDICATORS: Vec<Indicator> = vec![
        Indicator {
            id: 1,
            name: "Undermining democratic institutions",
            description: "Language about overriding, suspending, or dissolving \
                          constitutional bodies and processes",
            keywords: &[
                "military",
                "coup",
                "suspend",
                "constitution",
                "dissolve parliament",
                "martial law",
                "emergency powers",
                "decree",
                "overturn the election",
                "rigged election",
                "seize power",
            ],
        },
        Indicator {
            id: 2,
            name: "Suppression of dissent",
            description: "Language about silencing, punishing, or criminalizing \
                          opposition and protest",
            keywords: &[
                "crackdown",
                "censorship",
                "arrest",
                "detain",
                "sedition",
                "dissident",
                "ban protests",
                "silence",
                "imprison",
                "persecute",
                "surveillance",
            ],
        },
        Indicator {
            id: 3,
            name: "Attacks on press freedom",
            description: "Language delegitimizing or restricting independent \
                          journalism and media",
            keywords: &[
                "fake news",
                "enemy of the people",
                "state media",
                "propaganda",
                "revoke license",
                "shut down the newspaper",
                "smear",
                "disinformation",
                "gag order",
                "journalist",
            ],
        },
        Indicator {
            id: 4,
            name: "Dehumanizing rhetoric",
            description: "Language casting opponents or minorities as subhuman, \
                          diseased, or traitorous",
            keywords: &[
                "vermin",
                "infestation",
                "parasite",
                "traitor",
                "enemy within",
                "purge",
                "cleanse",
                "invasion",
                "poison",
                "degenerate",
            ],
        },
    ];
}

/// One literal keyword occurrence with its surrounding context excerpt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchDetail {
    /// The matched text exactly as it appears in the input.
    pub original: String,
    /// Up to 30 characters of context on each side, clipped at text boundaries.
    pub context: String,
}

/// Scoring outcome for a single indicator over a single text.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    /// The indicator this result belongs to.
    pub indicator: &'static Indicator,
    /// Score in [0, 10].
    pub score: u32,
    /// Distinct matched strings, case-preserved, deduped case-insensitively,
    /// in first-seen order.
    pub matches: Vec<String>,
    /// Every occurrence with context, deduped by (original, context) pair.
    pub match_details: Vec<MatchDetail>,
}
