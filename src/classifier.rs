//! Trainable feed-forward classifier over indicator labels.
//!
//! The classifier owns the append-only training set and an explicit model
//! state machine: `Unbuilt -> Building -> Ready <-> Training -> Ready`.
//! Build and fit failures never leave the classifier unusable: the model is
//! rebuilt wholesale on the fallback architecture and stays ready, while the
//! caller is told training did not succeed as requested. Prediction is
//! total and degrades to a neutral result on any internal fault.
//!
//! All state lives behind locks so the training set can grow while a fit is
//! in flight; a run always trains on the snapshot taken when it started.
//! The design assumes at most one in-flight `train()` at a time — callers
//! serialize `train()` against itself and against `predict()`.

pub mod network;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::error::{AuthlexError, Result};
use crate::labeler::LabeledExample;
use crate::vectorizer::{self, VECTOR_SIZE};

use network::{AdamState, Network};

/// Number of output classes: label 0 plus the four indicators.
pub const NUM_CLASSES: usize = 5;

/// Minimum accumulated examples before training may run.
pub const MIN_TRAINING_EXAMPLES: usize = 10;

/// Upper bounds on caller-supplied fit parameters.
const MAX_EPOCHS: usize = 5;
const MAX_BATCH_SIZE: usize = 4;

/// Fraction of the snapshot held out for validation.
const VALIDATION_SPLIT: f64 = 0.1;

const LEARNING_RATE: f64 = 0.001;

/// Classifier lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    /// No model has been constructed yet.
    Unbuilt,
    /// Architecture construction in progress.
    Building,
    /// A model exists and can serve predictions.
    Ready,
    /// A fit over a training snapshot is in flight.
    Training,
}

/// Caller-facing training knobs. Values are clamped downward, never upward.
#[derive(Debug, Clone, Copy)]
pub struct TrainOptions {
    pub epochs: usize,
    pub batch_size: usize,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            epochs: MAX_EPOCHS,
            batch_size: MAX_BATCH_SIZE,
        }
    }
}

/// Outcome of a successful training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub epochs_run: usize,
    pub examples: usize,
    pub final_loss: f64,
    pub final_val_loss: f64,
    pub trained_at: DateTime<Utc>,
}

/// Class probabilities plus the arg-max class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Probability per class; index 0 is "not authoritarian", 1..=4 map to
    /// indicator ids.
    pub class_probabilities: [f64; NUM_CLASSES],
    /// Arg-max class, ties resolved by lowest index.
    pub predicted_class: usize,
}

impl Prediction {
    /// The degenerate default served whenever no usable model exists.
    pub fn neutral() -> Self {
        let mut class_probabilities = [0.0; NUM_CLASSES];
        class_probabilities[0] = 1.0;
        Self {
            class_probabilities,
            predicted_class: 0,
        }
    }
}

/// Feed-forward classifier with an append-only in-memory training set.
pub struct Classifier {
    state: RwLock<ModelState>,
    network: RwLock<Option<Network>>,
    /// Appends are allowed while a training snapshot is in flight.
    training_data: Mutex<Vec<LabeledExample>>,
    /// Per-epoch status text for external progress polling.
    status: RwLock<String>,
    /// Makes the next fit fail, so the fallback path can be exercised.
    #[cfg(test)]
    fail_next_fit: std::sync::atomic::AtomicBool,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier {
    /// Create an untrained classifier with an empty training set.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(ModelState::Unbuilt),
            network: RwLock::new(None),
            training_data: Mutex::new(Vec::new()),
            status: RwLock::new(String::from("untrained")),
            #[cfg(test)]
            fail_next_fit: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Create a classifier around an already-trained network, e.g. restored
    /// from a stored weight blob.
    pub fn with_network(network: Network) -> Self {
        Self {
            state: RwLock::new(ModelState::Ready),
            network: RwLock::new(Some(network)),
            training_data: Mutex::new(Vec::new()),
            status: RwLock::new(String::from("restored")),
            #[cfg(test)]
            fail_next_fit: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ModelState {
        *self.state.read()
    }

    /// Whether a model exists and can serve non-degenerate predictions.
    pub fn is_ready(&self) -> bool {
        *self.state.read() == ModelState::Ready && self.network.read().is_some()
    }

    /// Latest status line, updated once per training epoch.
    pub fn status(&self) -> String {
        self.status.read().clone()
    }

    /// Serialized weight blob for the current model, if one exists.
    pub fn model_blob(&self) -> Result<Option<Vec<u8>>> {
        match self.network.read().as_ref() {
            Some(network) => Ok(Some(serde_json::to_vec(network)?)),
            None => Ok(None),
        }
    }

    /// Validate and append training examples; returns the new total count.
    ///
    /// Invalid entries (empty text or label above 4) are dropped silently.
    /// Safe to call while a `train()` is in flight: the appended examples
    /// land in the next run's snapshot.
    pub fn add_training_data<I>(&self, examples: I) -> usize
    where
        I: IntoIterator<Item = LabeledExample>,
    {
        let mut data = self.training_data.lock();
        for example in examples {
            if example.text.trim().is_empty() || example.label as usize >= NUM_CLASSES {
                log::debug!("dropping invalid training example (label {})", example.label);
                continue;
            }
            data.push(example);
        }
        data.len()
    }

    /// Number of accumulated valid examples.
    pub fn training_data_size(&self) -> usize {
        self.training_data.lock().len()
    }

    /// Snapshot of the accumulated examples, for best-effort persistence.
    pub fn training_data_snapshot(&self) -> Vec<LabeledExample> {
        self.training_data.lock().clone()
    }

    /// Fit the model on the accumulated training set.
    ///
    /// Fails with an insufficient-data error below [`MIN_TRAINING_EXAMPLES`]
    /// without touching the existing model. The data snapshotted at the
    /// start of the call is what this run trains on; appends made while the
    /// fit is in flight land in the next run. On any build or fit failure
    /// the model is discarded and rebuilt on the fallback architecture, and
    /// the underlying cause is surfaced to the caller.
    pub async fn train(&self, options: TrainOptions) -> Result<TrainingReport> {
        let snapshot = self.training_data.lock().clone();
        if snapshot.len() < MIN_TRAINING_EXAMPLES {
            return Err(AuthlexError::insufficient_data(
                MIN_TRAINING_EXAMPLES,
                snapshot.len(),
            ));
        }

        let epochs = options.epochs.clamp(1, MAX_EPOCHS);
        let batch_size = options.batch_size.clamp(1, MAX_BATCH_SIZE);

        // Take the model out for the duration of the fit; a single in-flight
        // train is assumed, and predict serves its no-model branch meanwhile.
        let taken = self.network.write().take();
        let mut network = match taken {
            Some(network) => network,
            None => {
                *self.state.write() = ModelState::Building;
                match Network::primary(VECTOR_SIZE, NUM_CLASSES) {
                    Ok(network) => network,
                    Err(e) => {
                        // Recovered internally via the fallback; only
                        // surfaced if the fallback itself cannot be built.
                        log::warn!("primary model build failed, using fallback: {e}");
                        match Network::fallback(VECTOR_SIZE, NUM_CLASSES) {
                            Ok(network) => network,
                            Err(e) => {
                                *self.state.write() = ModelState::Unbuilt;
                                return Err(e);
                            }
                        }
                    }
                }
            }
        };
        *self.state.write() = ModelState::Training;

        match self.fit(&mut network, &snapshot, epochs, batch_size).await {
            Ok(report) => {
                *self.network.write() = Some(network);
                *self.state.write() = ModelState::Ready;
                *self.status.write() = format!(
                    "trained on {} examples - loss {:.4} - val_loss {:.4}",
                    report.examples, report.final_loss, report.final_val_loss
                );
                Ok(report)
            }
            Err(e) => {
                self.rebuild_fallback();
                Err(AuthlexError::training(format!("model fit failed: {e}")))
            }
        }
    }

    async fn fit(
        &self,
        network: &mut Network,
        snapshot: &[LabeledExample],
        epochs: usize,
        batch_size: usize,
    ) -> Result<TrainingReport> {
        #[cfg(test)]
        if self
            .fail_next_fit
            .swap(false, std::sync::atomic::Ordering::SeqCst)
        {
            return Err(AuthlexError::training("forced fit failure"));
        }

        let mut dataset: Vec<(Vec<f64>, Vec<f64>)> = snapshot
            .iter()
            .map(|example| {
                (
                    vectorizer::vectorize_f64(&example.text),
                    one_hot(example.label as usize),
                )
            })
            .collect();

        // Hold out the validation tail after shuffling once.
        {
            use rand::seq::SliceRandom;
            dataset.shuffle(&mut rand::rng());
        }
        let held_out = ((dataset.len() as f64) * VALIDATION_SPLIT).ceil() as usize;
        let split = dataset.len() - held_out.min(dataset.len().saturating_sub(1));
        let (train, validation) = dataset.split_at(split);

        let mut adam = AdamState::new(network, LEARNING_RATE);

        let mut last = None;
        for epoch in 0..epochs {
            let stats = network.run_epoch(&mut adam, train, validation, batch_size);
            if !stats.loss.is_finite() || !stats.val_loss.is_finite() {
                return Err(AuthlexError::training(format!(
                    "non-finite loss at epoch {}",
                    epoch + 1
                )));
            }
            let line = format!(
                "epoch {}/{} - loss {:.4} - val_loss {:.4}",
                epoch + 1,
                epochs,
                stats.loss,
                stats.val_loss
            );
            log::debug!("{line}");
            *self.status.write() = line;
            last = Some(stats);

            // Cooperative yield between epochs.
            tokio::task::yield_now().await;
        }

        let last = last.ok_or_else(|| AuthlexError::training("no epochs were run"))?;
        Ok(TrainingReport {
            epochs_run: epochs,
            examples: snapshot.len(),
            final_loss: last.loss,
            final_val_loss: last.val_loss,
            trained_at: Utc::now(),
        })
    }

    /// Replace the model wholesale with the fallback architecture.
    ///
    /// The classifier lands on `Ready` so prediction stays available; only
    /// a fallback that itself fails to build leaves the model absent, in
    /// which case `predict` serves its no-model branch.
    fn rebuild_fallback(&self) {
        match Network::fallback(VECTOR_SIZE, NUM_CLASSES) {
            Ok(network) => {
                *self.network.write() = Some(network);
                *self.state.write() = ModelState::Ready;
                *self.status.write() = String::from("fallback model ready");
            }
            Err(e) => {
                log::warn!("fallback model build failed: {e}");
                *self.network.write() = None;
                *self.state.write() = ModelState::Unbuilt;
                *self.status.write() = String::from("no model available");
            }
        }
    }

    /// Classify `text`. Total: never errors.
    ///
    /// Without a ready model this returns the neutral prediction; internal
    /// faults (non-finite outputs) degrade to the same neutral result.
    pub fn predict(&self, text: &str) -> Prediction {
        if *self.state.read() != ModelState::Ready {
            return Prediction::neutral();
        }
        let guard = self.network.read();
        let network = match guard.as_ref() {
            Some(network) => network,
            None => return Prediction::neutral(),
        };

        let input = vectorizer::vectorize_f64(text);
        let output = network.forward(&input);
        if output.len() != NUM_CLASSES || output.iter().any(|p| !p.is_finite()) {
            log::warn!("prediction produced an invalid distribution, returning neutral");
            return Prediction::neutral();
        }

        let mut class_probabilities = [0.0; NUM_CLASSES];
        class_probabilities.copy_from_slice(&output);

        // First occurrence of the maximum wins ties.
        let mut predicted_class = 0;
        for (idx, p) in class_probabilities.iter().enumerate() {
            if *p > class_probabilities[predicted_class] {
                predicted_class = idx;
            }
        }

        Prediction {
            class_probabilities,
            predicted_class,
        }
    }
}

fn one_hot(label: usize) -> Vec<f64> {
    let mut encoded = vec![0.0; NUM_CLASSES];
    encoded[label] = 1.0;
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    fn example(text: &str, label: u32) -> LabeledExample {
        LabeledExample {
            text: text.to_string(),
            label,
        }
    }

    fn seed_examples(classifier: &Classifier, count: usize) {
        let texts = [
            ("the military staged a coup against the elected government", 1),
            ("a sweeping crackdown saw dissidents detained overnight", 2),
            ("officials smeared the newspaper as fake news propaganda", 3),
            ("speeches described the minority as vermin and parasites", 4),
            ("the farmers market opened early under a clear spring sky", 0),
        ];
        for i in 0..count {
            let (text, label) = texts[i % texts.len()];
            classifier.add_training_data([example(&format!("{text} {i}"), label)]);
        }
    }

    #[test]
    fn test_invalid_examples_dropped_silently() {
        let classifier = Classifier::new();
        let total = classifier.add_training_data([
            example("valid example text", 2),
            example("", 1),
            example("   ", 3),
            example("label out of range", 5),
        ]);
        assert_eq!(total, 1);
        assert_eq!(classifier.training_data_size(), 1);
    }

    #[test]
    fn test_out_of_range_label_leaves_size_unchanged() {
        let classifier = Classifier::new();
        classifier.add_training_data([example("x", 5)]);
        assert_eq!(classifier.training_data_size(), 0);
    }

    #[tokio::test]
    async fn test_train_requires_minimum_examples() {
        let classifier = Classifier::new();
        seed_examples(&classifier, 9);

        let result = classifier.train(TrainOptions::default()).await;
        assert!(matches!(
            result,
            Err(AuthlexError::InsufficientData { min: 10, actual: 9 })
        ));
        // Failed precondition must not mutate model state.
        assert_eq!(classifier.state(), ModelState::Unbuilt);
        assert!(!classifier.is_ready());
    }

    #[tokio::test]
    async fn test_train_with_ten_examples_proceeds() {
        let classifier = Classifier::new();
        seed_examples(&classifier, 10);

        let report = classifier.train(TrainOptions::default()).await.unwrap();
        assert_eq!(report.examples, 10);
        assert_eq!(report.epochs_run, 5);
        assert!(report.final_loss.is_finite());
        assert_eq!(classifier.state(), ModelState::Ready);
        assert!(classifier.is_ready());
    }

    #[tokio::test]
    async fn test_options_clamped_downward() {
        let classifier = Classifier::new();
        seed_examples(&classifier, 12);

        let report = classifier
            .train(TrainOptions {
                epochs: 100,
                batch_size: 512,
            })
            .await
            .unwrap();
        assert_eq!(report.epochs_run, 5);
    }

    #[test]
    fn test_predict_before_training_is_neutral() {
        let classifier = Classifier::new();
        let prediction = classifier.predict("the military staged a coup");
        assert_eq!(prediction, Prediction::neutral());
        assert_eq!(prediction.predicted_class, 0);
        assert_eq!(prediction.class_probabilities[0], 1.0);
        assert!(prediction.class_probabilities[1..].iter().all(|&p| p == 0.0));
    }

    #[tokio::test]
    async fn test_predict_after_training_is_distribution() {
        let classifier = Classifier::new();
        seed_examples(&classifier, 20);
        classifier.train(TrainOptions::default()).await.unwrap();

        let prediction = classifier.predict("a coup to suspend the constitution");
        let sum: f64 = prediction.class_probabilities.iter().sum();
        assert!((sum - 1.0).abs() < 1e-3, "probabilities sum to {sum}");
        assert!(prediction.predicted_class < NUM_CLASSES);
    }

    #[tokio::test]
    async fn test_appends_during_snapshot_land_in_next_run() {
        let classifier = Classifier::new();
        seed_examples(&classifier, 10);
        let report = classifier.train(TrainOptions::default()).await.unwrap();
        assert_eq!(report.examples, 10);

        seed_examples(&classifier, 4);
        let report = classifier.train(TrainOptions::default()).await.unwrap();
        assert_eq!(report.examples, 14);
    }

    #[tokio::test]
    async fn test_appends_while_train_in_flight_use_start_snapshot() {
        let classifier = Arc::new(Classifier::new());
        seed_examples(&classifier, 10);

        let trainer = Arc::clone(&classifier);
        let handle =
            tokio::spawn(async move { trainer.train(TrainOptions::default()).await });

        // Let the training task take its snapshot and park at an epoch
        // boundary, then append from this task while it is suspended.
        tokio::task::yield_now().await;
        classifier.add_training_data([example("appended while training was parked", 0)]);

        let report = handle.await.unwrap().unwrap();
        // The in-flight run trained on the start-of-train snapshot; the
        // append is queued for the next run.
        assert_eq!(report.examples, 10);
        assert_eq!(classifier.training_data_size(), 11);

        let report = classifier.train(TrainOptions::default()).await.unwrap();
        assert_eq!(report.examples, 11);
    }

    #[tokio::test]
    async fn test_fit_failure_rebuilds_fallback_and_stays_ready() {
        let classifier = Classifier::new();
        seed_examples(&classifier, 10);
        classifier.fail_next_fit.store(true, Ordering::SeqCst);

        let result = classifier.train(TrainOptions::default()).await;
        assert!(matches!(result, Err(AuthlexError::Training(_))));

        // The model was discarded and rebuilt wholesale on the fallback
        // architecture; the classifier stays usable.
        assert_eq!(classifier.state(), ModelState::Ready);
        assert!(classifier.is_ready());
        assert_eq!(classifier.status(), "fallback model ready");

        let blob = classifier.model_blob().unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&blob).unwrap();
        assert_eq!(value["layers"].as_array().unwrap().len(), 2);

        let prediction = classifier.predict("the coup suspended the constitution");
        let sum: f64 = prediction.class_probabilities.iter().sum();
        assert!((sum - 1.0).abs() < 1e-3, "probabilities sum to {sum}");

        // A later train over the same data succeeds normally.
        let report = classifier.train(TrainOptions::default()).await.unwrap();
        assert_eq!(report.examples, 10);
        assert_eq!(classifier.state(), ModelState::Ready);
    }

    #[tokio::test]
    async fn test_status_reflects_progress() {
        let classifier = Classifier::new();
        assert_eq!(classifier.status(), "untrained");
        seed_examples(&classifier, 10);
        classifier.train(TrainOptions::default()).await.unwrap();
        assert!(classifier.status().starts_with("trained on 10 examples"));
    }

    #[tokio::test]
    async fn test_model_blob_round_trip() {
        let classifier = Classifier::new();
        seed_examples(&classifier, 10);
        classifier.train(TrainOptions::default()).await.unwrap();

        let blob = classifier.model_blob().unwrap().unwrap();
        let network: Network = serde_json::from_slice(&blob).unwrap();
        let restored = Classifier::with_network(network);
        assert!(restored.is_ready());

        let prediction = restored.predict("some text to classify");
        let sum: f64 = prediction.class_probabilities.iter().sum();
        assert!((sum - 1.0).abs() < 1e-3);
    }
}
