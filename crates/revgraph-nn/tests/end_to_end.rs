//! Toy-dataset training runs through the public API.

use std::fs;
use std::path::PathBuf;

use candle_nn::VarMap;
use revgraph_core::{Dataset, IdSpace, Sample, SyntheticConfig};
use revgraph_nn::{
    Error, ExecutionContext, GraphRatingModel, Mode, ModelConfig, OptimizerKind, TrainConfig,
    Trainer,
};

fn get_test_dir() -> PathBuf {
    let dir = PathBuf::from("target/tmp/tests");
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn build(dataset: Dataset, dim: usize) -> (VarMap, GraphRatingModel, Vec<Sample>, Vec<Sample>) {
    let (graph, train, test) = dataset.into_parts().unwrap();
    let ctx = ExecutionContext::cpu();
    let varmap = VarMap::new();
    let model = GraphRatingModel::new(
        &ModelConfig::default().with_embed_dim(dim),
        &graph,
        ctx.var_builder(&varmap),
    )
    .unwrap();
    (varmap, model, train, test)
}

#[test]
fn toy_one_epoch_batch_two() {
    let dataset = Dataset::toy();
    assert_eq!(dataset.num_users, 3);
    assert_eq!(dataset.num_reviews, 3);
    for u in 0..3 {
        assert_eq!(dataset.user_history.get(u).unwrap().0.len(), 2);
    }

    let (varmap, mut model, train, test) = build(dataset, 64);
    let mut trainer = Trainer::new(
        TrainConfig::default().with_batch_size(2).with_epochs(1),
        &varmap,
    )
    .unwrap();

    let report = trainer.fit(&mut model, &train, &test).unwrap();
    assert_eq!(report.history.len(), 1);

    let epoch = &report.history[0];
    assert!(epoch.train.mean_loss.is_finite());
    assert!(epoch.test.rmse.is_finite() && epoch.test.rmse >= 0.0);
    assert!(epoch.test.mae.is_finite() && epoch.test.mae >= 0.0);
    assert_eq!(epoch.test.num_samples, test.len());
}

#[test]
fn training_changes_parameters() {
    let (varmap, mut model, train, _) = build(Dataset::toy(), 8);
    let snapshot = |varmap: &VarMap| -> Vec<f32> {
        let data = varmap.data().lock().unwrap();
        data["head.w_ur3.weight"]
            .as_tensor()
            .flatten_all()
            .unwrap()
            .to_vec1()
            .unwrap()
    };

    let before = snapshot(&varmap);
    let mut trainer = Trainer::new(
        TrainConfig::default()
            .with_batch_size(2)
            .with_learning_rate(0.01),
        &varmap,
    )
    .unwrap();
    trainer.train_epoch(&mut model, &train, 1).unwrap();
    assert_eq!(model.mode(), Mode::Train);
    assert_ne!(before, snapshot(&varmap));
}

#[test]
fn synthetic_loss_decreases_with_adamw() {
    let config = SyntheticConfig::default()
        .with_sizes(30, 40, 5)
        .with_interactions_per_user(6)
        .with_seed(3);
    let (varmap, mut model, train, test) = build(Dataset::synthetic(&config).unwrap(), 16);
    let mut trainer = Trainer::new(
        TrainConfig::default()
            .with_batch_size(16)
            .with_epochs(8)
            .with_patience(100)
            .with_learning_rate(0.01)
            .with_optimizer(OptimizerKind::AdamW),
        &varmap,
    )
    .unwrap();

    let report = trainer.fit(&mut model, &train, &test).unwrap();
    let first = report.history.first().unwrap().train.mean_loss;
    let last = report.history.last().unwrap().train.mean_loss;
    assert!(last < first, "loss did not decrease: {first} -> {last}");
}

#[test]
fn unknown_ids_surface_through_model() {
    let (_varmap, mut model, _, _) = build(Dataset::toy(), 8);
    model.eval();
    match model.predict(&[0, 3], &[0, 0]) {
        Err(Error::UnknownId { space, id, len }) => {
            assert_eq!(space, IdSpace::User);
            assert_eq!(id, 3);
            assert_eq!(len, 3);
        }
        Err(other) => panic!("expected UnknownId, got {other}"),
        Ok(_) => panic!("expected UnknownId, got predictions"),
    }
}

#[test]
fn saved_weights_restore_predictions() {
    let path = get_test_dir().join("toy_weights.safetensors");
    let users = [0, 1, 2, 2];
    let reviews = [2, 1, 0, 1];

    let (varmap, mut model, train, _) = build(Dataset::toy(), 8);
    let mut trainer = Trainer::new(
        TrainConfig::default()
            .with_batch_size(2)
            .with_learning_rate(0.01),
        &varmap,
    )
    .unwrap();
    trainer.train_epoch(&mut model, &train, 1).unwrap();
    model.eval();
    let trained = model.predict_vec(&users, &reviews).unwrap();
    varmap.save(&path).unwrap();

    let (mut restored_map, mut restored, _, _) = build(Dataset::toy(), 8);
    restored.eval();
    assert_ne!(trained, restored.predict_vec(&users, &reviews).unwrap());

    restored_map.load(&path).unwrap();
    assert_eq!(trained, restored.predict_vec(&users, &reviews).unwrap());

    fs::remove_file(path).unwrap();
}
