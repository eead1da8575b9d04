//! Per-session analysis context.
//!
//! One `AnalysisContext` is constructed per session and passed to all
//! operations; there is no ambient global state. It owns the scorer,
//! labeler, and classifier, plus an optional injected artifact store whose
//! writes are best-effort only: a storage failure is logged and never
//! alters in-memory state or aborts the caller's request.

use std::sync::Arc;

use crate::classifier::{Classifier, Prediction, TrainOptions, TrainingReport};
use crate::classifier::network::Network;
use crate::error::Result;
use crate::indicator::AnalysisResult;
use crate::labeler::{ExampleLabeler, LabeledExample};
use crate::scorer::IndicatorScorer;
use crate::storage::ArtifactStore;

/// Owns the analysis pipeline for one session.
pub struct AnalysisContext {
    scorer: IndicatorScorer,
    labeler: ExampleLabeler,
    classifier: Classifier,
    store: Option<Arc<dyn ArtifactStore>>,
}

impl AnalysisContext {
    /// Create a context with no persistence.
    pub fn new() -> Result<Self> {
        Ok(Self {
            scorer: IndicatorScorer::new()?,
            labeler: ExampleLabeler::new(),
            classifier: Classifier::new(),
            store: None,
        })
    }

    /// Create a context backed by an artifact store.
    ///
    /// A stored model blob, when present and decodable, restores the
    /// classifier to ready; a missing or unreadable blob is logged and the
    /// context starts untrained.
    pub fn with_store(store: Arc<dyn ArtifactStore>) -> Result<Self> {
        let classifier = match store.load_model() {
            Ok(Some(blob)) => match serde_json::from_slice::<Network>(&blob) {
                Ok(network) => {
                    log::debug!("restored model from store");
                    Classifier::with_network(network)
                }
                Err(e) => {
                    log::warn!("stored model blob is unreadable, starting untrained: {e}");
                    Classifier::new()
                }
            },
            Ok(None) => Classifier::new(),
            Err(e) => {
                log::warn!("model load failed, starting untrained: {e}");
                Classifier::new()
            }
        };

        Ok(Self {
            scorer: IndicatorScorer::new()?,
            labeler: ExampleLabeler::new(),
            classifier,
            store: Some(store),
        })
    }

    /// Score `text` against every indicator. Total: always four results.
    pub async fn analyze_text(&self, text: &str) -> Vec<AnalysisResult> {
        self.scorer.analyze(text)
    }

    /// Segment `text` into labeled training examples.
    pub async fn extract_training_data(&self, text: &str) -> Result<Vec<LabeledExample>> {
        self.labeler.extract(text).await
    }

    /// Append examples to the classifier's training set; returns the new
    /// total. Invalid entries are dropped silently. The accumulated set is
    /// mirrored to the store on a best-effort basis. Safe to call while a
    /// `train()` is in flight: appends land in the next run's snapshot.
    pub fn add_training_data<I>(&self, examples: I) -> usize
    where
        I: IntoIterator<Item = LabeledExample>,
    {
        let total = self.classifier.add_training_data(examples);
        if let Some(store) = &self.store {
            let snapshot = self.classifier.training_data_snapshot();
            if let Err(e) = store.save_examples(&snapshot) {
                log::warn!("best-effort example save failed: {e}");
            }
        }
        total
    }

    /// Number of accumulated training examples.
    pub fn training_data_size(&self) -> usize {
        self.classifier.training_data_size()
    }

    /// Train the classifier on the accumulated examples.
    ///
    /// On success the trained weights are mirrored to the store on a
    /// best-effort basis. Training failures surface to the caller but leave
    /// a usable (fallback) model in place. At most one `train()` should be
    /// in flight at a time.
    pub async fn train(&self, options: TrainOptions) -> Result<TrainingReport> {
        let report = self.classifier.train(options).await?;

        if let Some(store) = &self.store {
            match self.classifier.model_blob() {
                Ok(Some(blob)) => {
                    if let Err(e) = store.save_model(&blob) {
                        log::warn!("best-effort model save failed: {e}");
                    }
                }
                Ok(None) => {}
                Err(e) => log::warn!("model serialization for save failed: {e}"),
            }
        }

        Ok(report)
    }

    /// Classify `text` with the trained model. Total: never errors; serves
    /// the neutral prediction until a model is ready.
    pub async fn predict(&self, text: &str) -> Prediction {
        self.classifier.predict(text)
    }

    /// Latest training status line, for progress polling.
    pub fn training_status(&self) -> String {
        self.classifier.status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FileArtifactStore;
    use tempfile::TempDir;

    fn seed(context: &AnalysisContext) {
        let texts = [
            ("the military staged a coup against the assembly", 1),
            ("a crackdown detained dissidents across the capital", 2),
            ("state media dismissed the report as fake news", 3),
            ("the speech called opponents vermin and traitors", 4),
            ("the harvest festival drew a cheerful weekend crowd", 0),
        ];
        for i in 0..10 {
            let (text, label) = texts[i % texts.len()];
            context.add_training_data([LabeledExample {
                text: format!("{text} {i}"),
                label,
            }]);
        }
    }

    #[tokio::test]
    async fn test_analyze_is_total() {
        let context = AnalysisContext::new().unwrap();
        let results = context.analyze_text("").await;
        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|r| r.score == 0));
    }

    #[tokio::test]
    async fn test_predict_without_model_is_neutral() {
        let context = AnalysisContext::new().unwrap();
        let prediction = context.predict("a coup to suspend the constitution").await;
        assert_eq!(prediction, Prediction::neutral());
    }

    #[tokio::test]
    async fn test_storage_failures_do_not_abort() {
        struct FailingStore;
        impl ArtifactStore for FailingStore {
            fn save_examples(&self, _: &[LabeledExample]) -> Result<()> {
                Err(crate::error::AuthlexError::storage("backend down"))
            }
            fn save_model(&self, _: &[u8]) -> Result<()> {
                Err(crate::error::AuthlexError::storage("backend down"))
            }
            fn load_model(&self) -> Result<Option<Vec<u8>>> {
                Err(crate::error::AuthlexError::storage("backend down"))
            }
        }

        let context = AnalysisContext::with_store(Arc::new(FailingStore)).unwrap();
        seed(&context);
        assert_eq!(context.training_data_size(), 10);

        // Train succeeds even though every save fails.
        let report = context.train(TrainOptions::default()).await.unwrap();
        assert_eq!(report.examples, 10);
    }

    #[tokio::test]
    async fn test_appends_allowed_during_inflight_train() {
        let context = Arc::new(AnalysisContext::new().unwrap());
        seed(&context);

        let trainer = Arc::clone(&context);
        let handle =
            tokio::spawn(async move { trainer.train(TrainOptions::default()).await });

        // Append through the public surface while the training future is
        // parked at an epoch boundary.
        tokio::task::yield_now().await;
        context.add_training_data([LabeledExample {
            text: "appended while a training run was suspended".to_string(),
            label: 0,
        }]);

        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.examples, 10);
        assert_eq!(context.training_data_size(), 11);
    }

    #[tokio::test]
    async fn test_model_restored_across_sessions() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FileArtifactStore::new(dir.path()).unwrap());

        let context = AnalysisContext::with_store(store.clone()).unwrap();
        seed(&context);
        context.train(TrainOptions::default()).await.unwrap();

        // A fresh context over the same store starts ready.
        let restored = AnalysisContext::with_store(store).unwrap();
        let prediction = restored.predict("the crackdown detained dissidents").await;
        let sum: f64 = prediction.class_probabilities.iter().sum();
        assert!((sum - 1.0).abs() < 1e-3);
    }
}
