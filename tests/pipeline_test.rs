//! End-to-end tests for the analysis and classification pipeline.

use authlex::classifier::NUM_CLASSES;
use authlex::prelude::*;
use authlex::vectorizer::{self, VECTOR_SIZE};

fn seed_context(context: &AnalysisContext, count: usize) {
    let texts = [
        ("the military staged a coup against the elected government", 1),
        ("the decree suspended the constitution before sunrise", 1),
        ("a sweeping crackdown saw dissidents detained overnight", 2),
        ("they moved to ban protests and imprison organizers", 2),
        ("officials smeared the newspaper as fake news propaganda", 3),
        ("the broadcaster lost its license to a gag order", 3),
        ("speeches described the minority as vermin and parasites", 4),
        ("pamphlets urged a purge of the enemy within", 4),
        ("the farmers market opened early under a clear sky", 0),
        ("the library extended its weekend reading hours", 0),
    ];
    for i in 0..count {
        let (text, label) = texts[i % texts.len()];
        context.add_training_data([LabeledExample {
            text: format!("{text} {i}"),
            label,
        }]);
    }
}

#[tokio::test]
async fn test_empty_text_yields_four_zero_results() {
    let context = AnalysisContext::new().unwrap();
    let results = context.analyze_text("").await;
    assert_eq!(results.len(), 4);
    for result in &results {
        assert_eq!(result.score, 0);
        assert!(result.matches.is_empty());
        assert!(result.match_details.is_empty());
    }
}

#[tokio::test]
async fn test_institutional_text_scores_first_indicator() {
    let context = AnalysisContext::new().unwrap();
    let results = context
        .analyze_text("military coup to suspend the constitution")
        .await;

    let first = &results[0];
    assert_eq!(first.indicator.id, 1);
    assert!(first.score > 0);
    for keyword in ["military", "coup", "suspend", "constitution"] {
        assert!(
            first.matches.iter().any(|m| m.eq_ignore_ascii_case(keyword)),
            "missing match for {keyword}"
        );
        assert!(
            first.match_details.iter().any(|d| d.context.contains(keyword)),
            "missing contextual excerpt for {keyword}"
        );
    }
}

#[tokio::test]
async fn test_scores_bounded_and_matches_deduped() {
    let context = AnalysisContext::new().unwrap();
    let text = "Coup COUP coup decree Decree purge vermin crackdown ".repeat(10);
    for result in context.analyze_text(&text).await {
        assert!(result.score <= 10);
        let mut lowered: Vec<String> = result.matches.iter().map(|m| m.to_lowercase()).collect();
        let before = lowered.len();
        lowered.sort();
        lowered.dedup();
        assert_eq!(before, lowered.len(), "case-insensitive duplicate in matches");
    }
}

#[tokio::test]
async fn test_extraction_feeds_training() {
    let context = AnalysisContext::new().unwrap();
    let corpus = "The military staged a coup against the assembly. \
                  A sweeping crackdown saw dissidents detained overnight.\n\n\
                  Officials smeared the newspaper as fake news propaganda. \
                  Speeches described the minority as vermin and parasites.";

    let examples = context.extract_training_data(corpus).await.unwrap();
    let labels: Vec<u32> = examples.iter().map(|e| e.label).collect();
    assert!(labels.contains(&1));
    assert!(labels.contains(&2));
    assert!(labels.contains(&3));
    assert!(labels.contains(&4));

    let total = context.add_training_data(examples);
    assert_eq!(total, context.training_data_size());
}

#[tokio::test]
async fn test_extraction_rejects_empty_text() {
    let context = AnalysisContext::new().unwrap();
    assert!(context.extract_training_data("").await.is_err());
    assert!(context.extract_training_data("   \n ").await.is_err());
}

#[tokio::test]
async fn test_vector_width_is_fixed() {
    assert_eq!(vectorizer::vectorize("").len(), VECTOR_SIZE);
    let long: String = (0..10_000).map(|i| format!("word{i} ")).collect();
    assert_eq!(vectorizer::vectorize(&long).len(), VECTOR_SIZE);
}

#[tokio::test]
async fn test_invalid_label_rejected() {
    let context = AnalysisContext::new().unwrap();
    let before = context.training_data_size();
    context.add_training_data([LabeledExample {
        text: "x".to_string(),
        label: 5,
    }]);
    assert_eq!(context.training_data_size(), before);
}

#[tokio::test]
async fn test_training_threshold() {
    let context = AnalysisContext::new().unwrap();
    seed_context(&context, 9);
    let result = context.train(TrainOptions::default()).await;
    assert!(matches!(
        result,
        Err(AuthlexError::InsufficientData { min: 10, actual: 9 })
    ));

    seed_context(&context, 1);
    assert!(context.train(TrainOptions::default()).await.is_ok());
}

#[tokio::test]
async fn test_predict_lifecycle() {
    let context = AnalysisContext::new().unwrap();

    // Untrained: degenerate neutral prediction.
    let prediction = context.predict("the coup suspended the constitution").await;
    assert_eq!(prediction.predicted_class, 0);
    assert_eq!(prediction.class_probabilities[0], 1.0);
    assert!(prediction.class_probabilities[1..].iter().all(|&p| p == 0.0));

    seed_context(&context, 20);
    let report = context.train(TrainOptions::default()).await.unwrap();
    assert_eq!(report.examples, 20);
    assert!(!context.training_status().is_empty());

    // Ready: probabilities form a distribution.
    let prediction = context.predict("the coup suspended the constitution").await;
    let sum: f64 = prediction.class_probabilities.iter().sum();
    assert!((sum - 1.0).abs() < 1e-3, "probabilities sum to {sum}");
    assert!(prediction.predicted_class < NUM_CLASSES);
}
