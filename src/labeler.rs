//! Sentence-level training-example extraction.
//!
//! Turns raw corpus text into labeled sentences: paragraphs split on blank
//! lines, sentences on `.`/`!`/`?` terminators, short sentences discarded.
//! Label assignment is first-match-wins over the fixed indicator order and
//! each indicator's keyword declaration order, using loose substring
//! containment (deliberately looser than the scorer's word-boundary match).
//! Unmatched sentences are kept as label-0 negatives with a small
//! probability so negatives do not dominate the training set.

use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AuthlexError, Result};
use crate::indicator::INDICATORS;

/// Sentences shorter than this are discarded.
const MIN_SENTENCE_CHARS: usize = 20;

/// Default inclusion probability for unmatched (label 0) sentences.
const DEFAULT_NEGATIVE_RATE: f64 = 0.10;

/// Paragraphs processed between cooperative yield points.
const PARAGRAPH_CHUNK: usize = 8;

lazy_static! {
    static ref BLANK_LINE: Regex = Regex::new(r"\n\s*\n").expect("valid paragraph pattern");
    static ref SENTENCE: Regex = Regex::new(r"[^.!?]+[.!?]").expect("valid sentence pattern");
}

/// A sentence paired with its class label.
///
/// Label 0 means "no indicator detected"; labels 1 through 4 are indicator
/// ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledExample {
    pub text: String,
    pub label: u32,
}

/// Segments text into sentences and assigns training labels.
#[derive(Debug, Clone)]
pub struct ExampleLabeler {
    negative_rate: f64,
}

impl Default for ExampleLabeler {
    fn default() -> Self {
        Self::new()
    }
}

impl ExampleLabeler {
    /// Create a labeler with the default negative-example sampling rate.
    pub fn new() -> Self {
        Self {
            negative_rate: DEFAULT_NEGATIVE_RATE,
        }
    }

    /// Override the label-0 inclusion probability. Clamped to [0, 1].
    pub fn with_negative_rate(rate: f64) -> Self {
        Self {
            negative_rate: rate.clamp(0.0, 1.0),
        }
    }

    /// Extract labeled examples from `text`.
    ///
    /// Long documents are processed in paragraph chunks with a cooperative
    /// yield between chunks, so a host task scheduler is not starved. Once
    /// started the extraction runs to completion.
    ///
    /// Fails with an extraction error when the text is empty or contains no
    /// terminated sentences at all; a text whose sentences are all discarded
    /// yields `Ok` with an empty vector.
    pub async fn extract(&self, text: &str) -> Result<Vec<LabeledExample>> {
        if text.trim().is_empty() {
            return Err(AuthlexError::extraction("source text is empty"));
        }

        let mut rng = rand::rng();
        let mut examples = Vec::new();
        let mut saw_sentence = false;

        let paragraphs: Vec<&str> = BLANK_LINE.split(text).collect();
        for chunk in paragraphs.chunks(PARAGRAPH_CHUNK) {
            for paragraph in chunk {
                for found in SENTENCE.find_iter(paragraph) {
                    saw_sentence = true;
                    let sentence = found.as_str().trim();
                    if sentence.chars().count() < MIN_SENTENCE_CHARS {
                        continue;
                    }
                    match label_sentence(sentence) {
                        Some(label) => examples.push(LabeledExample {
                            text: sentence.to_string(),
                            label,
                        }),
                        None => {
                            if rng.random::<f64>() < self.negative_rate {
                                examples.push(LabeledExample {
                                    text: sentence.to_string(),
                                    label: 0,
                                });
                            }
                        }
                    }
                }
            }
            tokio::task::yield_now().await;
        }

        if !saw_sentence {
            return Err(AuthlexError::extraction("no extractable sentences"));
        }

        Ok(examples)
    }
}

/// First-match-wins label assignment.
///
/// Indicators are scanned in fixed order 1 to 4, keywords in declaration
/// order; the first substring hit assigns the label and stops the scan.
fn label_sentence(sentence: &str) -> Option<u32> {
    let lowered = sentence.to_lowercase();
    for indicator in INDICATORS.iter() {
        for keyword in indicator.keywords {
            if lowered.contains(keyword) {
                return Some(indicator.id);
            }
        }
    }
    None
}
