//! End-to-end training runs through the public API: event log on disk,
//! checkpoint files, and resuming from a persisted checkpoint.

use std::sync::{Arc, Mutex};

use ndarray::Array1;
use orquestar::events::EVENTS_FILE;
use orquestar::{
    Checkpoint, Event, LossTerm, Mode, Model, Optimizer, Review, StateDict, TensorState, Trainer,
    TrainerConfig, TriggerUnit,
};

type Param = Arc<Mutex<f32>>;

/// Estimates the mean of its input batches: loss = mean((mu - x)^2)
struct MeanEstimator {
    mu: Param,
    grad: Param,
    mode: Mode,
}

impl Model for MeanEstimator {
    type Batch = Array1<f32>;
    type Output = f32;

    fn forward(&mut self, _batch: &Array1<f32>) -> f32 {
        *self.mu.lock().expect("lock acquisition should succeed")
    }

    fn review(&mut self, batch: &Array1<f32>, mu: f32) -> Review {
        let residuals = batch.mapv(|x| mu - x);
        let loss = f64::from(residuals.mapv(|r| r * r).mean().unwrap_or(0.0));
        let term = match self.mode {
            Mode::Eval => LossTerm::detached(loss),
            Mode::Train => {
                let grad = Arc::clone(&self.grad);
                let mean_residual = residuals.mean().unwrap_or(0.0);
                LossTerm::with_backward(loss, move |weight| {
                    *grad.lock().expect("lock acquisition should succeed") +=
                        weight as f32 * 2.0 * mean_residual;
                })
            }
        };
        Review::new().with_loss("loss", term)
    }

    fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    fn state_dict(&self) -> StateDict {
        let mu = *self.mu.lock().expect("lock acquisition should succeed");
        let mut state = StateDict::new();
        state.insert("mu", TensorState::new(vec![1], vec![mu]));
        state
    }

    fn load_state_dict(&mut self, state: &StateDict) -> orquestar::Result<()> {
        let mu = state.get("mu").expect("checkpoint should carry `mu`");
        *self.mu.lock().expect("lock acquisition should succeed") = mu.data[0];
        Ok(())
    }

    fn num_parameters(&self) -> usize {
        1
    }
}

struct Sgd {
    mu: Param,
    grad: Param,
    lr: f32,
}

impl Optimizer for Sgd {
    fn zero_grad(&mut self) {
        *self.grad.lock().expect("lock acquisition should succeed") = 0.0;
    }

    fn step(&mut self) {
        let grad = *self.grad.lock().expect("lock acquisition should succeed");
        *self.mu.lock().expect("lock acquisition should succeed") -= self.lr * grad;
    }

    fn clip_grad(&mut self) -> f64 {
        f64::from(
            self.grad
                .lock()
                .expect("lock acquisition should succeed")
                .abs(),
        )
    }

    fn state_dict(&self) -> StateDict {
        let mut state = StateDict::new();
        state.insert("lr", TensorState::new(vec![1], vec![self.lr]));
        state
    }

    fn load_state_dict(&mut self, state: &StateDict) -> orquestar::Result<()> {
        let lr = state.get("lr").expect("checkpoint should carry `lr`");
        self.lr = lr.data[0];
        Ok(())
    }
}

fn setup_trainer(config: TrainerConfig) -> (Trainer<MeanEstimator, Sgd>, Param) {
    let mu = Arc::new(Mutex::new(0.0f32));
    let grad = Arc::new(Mutex::new(0.0f32));
    let model = MeanEstimator {
        mu: Arc::clone(&mu),
        grad: Arc::clone(&grad),
        mode: Mode::Train,
    };
    let optimizer = Sgd {
        mu: Arc::clone(&mu),
        grad,
        lr: 0.2,
    };
    let trainer = Trainer::new(model, optimizer, config).expect("config should be valid");
    (trainer, mu)
}

/// Batches centered on 3.0
fn batches() -> Vec<Array1<f32>> {
    vec![
        Array1::from(vec![2.5f32, 3.5]),
        Array1::from(vec![3.0f32, 3.0]),
        Array1::from(vec![2.0f32, 4.0]),
    ]
}

fn read_events(storage_dir: &std::path::Path) -> Vec<Event> {
    let contents = std::fs::read_to_string(storage_dir.join(EVENTS_FILE))
        .expect("the event log should exist after training");
    contents
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line should be one event"))
        .collect()
}

#[test]
fn test_full_run_writes_events_and_checkpoints() {
    let dir = tempfile::tempdir().expect("operation should succeed");
    let config = TrainerConfig::new(dir.path())
        .with_max_iterations(6)
        .with_checkpoint_step((3, TriggerUnit::Iteration))
        .with_summary_step((2, TriggerUnit::Iteration));
    let (mut trainer, _) = setup_trainer(config);

    let report = trainer.train(batches, batches).expect("training should finish");
    assert_eq!(report.iterations, 6);
    assert_eq!(report.epochs, 2);
    assert!(report.elapsed_secs >= 0.0);

    let checkpoints = dir.path().join("checkpoints");
    assert!(checkpoints.join("ckpt_1").is_file());
    assert!(checkpoints.join("ckpt_3").is_file());
    assert!(checkpoints.join("ckpt_6").is_file());

    let events = read_events(dir.path());
    assert!(!events.is_empty());
    assert!(events.iter().any(|event| event.tag() == "training/loss"));
    assert!(events.iter().any(|event| event.tag() == "validation/loss"));

    // Flush iterations never go backwards within the log.
    let iterations: Vec<usize> = events.iter().map(Event::iteration).collect();
    assert!(iterations.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[test]
fn test_training_estimates_the_batch_mean() {
    let dir = tempfile::tempdir().expect("operation should succeed");
    let config = TrainerConfig::new(dir.path()).with_max_iterations(100);
    let (mut trainer, mu) = setup_trainer(config);

    trainer.train(batches, batches).expect("training should finish");
    let estimate = *mu.lock().expect("lock acquisition should succeed");
    assert!((estimate - 3.0).abs() < 0.05, "estimate: {estimate}");
}

#[test]
fn test_checkpoint_file_is_readable_and_resumable() {
    let dir = tempfile::tempdir().expect("operation should succeed");
    let config = TrainerConfig::new(dir.path()).with_max_iterations(5);
    let (mut trainer, mu) = setup_trainer(config);
    trainer.train(batches, batches).expect("training should finish");
    let trained_mu = *mu.lock().expect("lock acquisition should succeed");

    let path = dir.path().join("checkpoints").join("ckpt_5");
    let checkpoint = Checkpoint::read_from(&path).expect("checkpoint should parse");
    assert_eq!(checkpoint.iteration, 5);
    assert_eq!(checkpoint.epoch, 1);

    // A fresh trainer restores the parameters at construction and
    // continues at the next iteration.
    let (resumed, resumed_mu) = setup_trainer(
        TrainerConfig::new(dir.path())
            .with_max_iterations(20)
            .with_init_checkpoint(&path),
    );
    assert_eq!(resumed.iteration(), 6);
    let restored = *resumed_mu.lock().expect("lock acquisition should succeed");
    assert!((restored - trained_mu).abs() < 1e-6);
}

#[test]
fn test_separate_runs_share_nothing() {
    let dir_a = tempfile::tempdir().expect("operation should succeed");
    let dir_b = tempfile::tempdir().expect("operation should succeed");

    let (mut first, _) = setup_trainer(TrainerConfig::new(dir_a.path()).with_max_iterations(2));
    let (mut second, _) = setup_trainer(TrainerConfig::new(dir_b.path()).with_max_iterations(4));
    first.train(batches, batches).expect("training should finish");
    second.train(batches, batches).expect("training should finish");

    assert_eq!(first.iteration(), 2);
    assert_eq!(second.iteration(), 4);
    assert!(dir_a.path().join(EVENTS_FILE).is_file());
    assert!(dir_b.path().join(EVENTS_FILE).is_file());
}
