//! Loading model and metadata artifacts from disk.

use appraisal_features::{AreaUnit, RawInput, RawValue};
use appraisal_model::{ArtifactPaths, InferenceError, MetadataSource, ModelError, SharedModel};
use approx::assert_relative_eq;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

const ORDER: [&str; 3] = ["GrLivArea", "OverallQual", "YearBuilt"];

struct TempDir(PathBuf);

impl TempDir {
    fn new(name: &str) -> Self {
        let dir = std::env::temp_dir().join(format!("appraisal-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        Self(dir)
    }

    fn write(&self, file: &str, content: &str) -> PathBuf {
        let path = self.0.join(file);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

const MODEL: &str = r#"{
    "kind": "tree_ensemble",
    "base_score": 150000.0,
    "n_features": 3,
    "trees": [
        { "nodes": [
            { "type": "split", "feature": 1, "threshold": 7.0, "left": 1, "right": 2 },
            { "type": "leaf", "value": -20000.0 },
            { "type": "leaf", "value": 40000.0 }
        ]},
        { "nodes": [
            { "type": "split", "feature": 0, "threshold": 2000.0, "left": 1, "right": 2 },
            { "type": "leaf", "value": 0.0 },
            { "type": "leaf", "value": 60000.0 }
        ]}
    ]
}"#;

const METADATA: &str = r#"{
    "feature_names": ["GrLivArea", "OverallQual", "YearBuilt"],
    "feature_ranges": { "GrLivArea": { "min": 334.0, "max": 5642.0 } },
    "model_stats": { "test_r2": 0.9, "rmse_score": 25000.0, "train_samples": 1168,
                     "mean_price": 180000.0, "min_price": 35000.0, "max_price": 755000.0 },
    "feature_importance": [{ "feature": "OverallQual", "importance": 0.6 }]
}"#;

fn order() -> Vec<String> {
    ORDER.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_load_and_predict_from_disk() {
    let dir = TempDir::new("load");
    let paths = ArtifactPaths {
        model: dir.write("model.json", MODEL),
        metadata: dir.write("feature_info.json", METADATA),
    };
    let shared = SharedModel::from_paths(paths.clone(), order());
    let context = shared.get().unwrap();

    assert_eq!(
        context.source(),
        &MetadataSource::Loaded {
            path: paths.metadata.clone()
        }
    );
    assert_eq!(context.statistics().error_margin, 25_000.0);

    let input = RawInput::new()
        .with("living_area", RawValue::area(200.0, AreaUnit::SquareMeters))
        .with("quality", RawValue::scalar(8.0));
    let vector = context.schema().resolve(&input).unwrap();
    let result = context.engine().predict(&vector).unwrap();

    // 200 m² = 2152.8 sq ft, quality 8: both trees take the right branch
    assert_relative_eq!(result.point_estimate, 250_000.0);
    assert!(!result.is_degraded());
}

#[test]
fn test_missing_metadata_degrades() {
    let dir = TempDir::new("fallback");
    let paths = ArtifactPaths {
        model: dir.write("model.json", MODEL),
        metadata: dir.path().join("feature_info.json"),
    };
    let context = SharedModel::from_paths(paths, order()).get().unwrap();

    assert_eq!(context.source(), &MetadataSource::Fallback);
    assert_eq!(context.statistics().mean_price, 180_921.0);
    assert_eq!(context.schema().names(), ORDER.to_vec());

    let vector = context.schema().resolve(&RawInput::new()).unwrap();
    let result = context.engine().predict(&vector).unwrap();
    assert!(result.is_degraded());
    assert_eq!(result.error_margin, 15_000.0);
}

#[test]
fn test_metadata_order_must_match_model() {
    let dir = TempDir::new("mismatch");
    let paths = ArtifactPaths {
        model: dir.write("model.json", MODEL),
        metadata: dir.write(
            "feature_info.json",
            r#"{ "feature_names": ["GrLivArea", "OverallQual"], "model_stats": { "mean_price": 1.0 } }"#,
        ),
    };
    let err = SharedModel::from_paths(paths, order()).get().unwrap_err();
    assert!(matches!(*err, ModelError::InvalidArtifact(_)));
}

#[test]
fn test_parallel_requests_share_one_context() {
    let dir = TempDir::new("parallel");
    let paths = ArtifactPaths {
        model: dir.write("model.json", MODEL),
        metadata: dir.write("feature_info.json", METADATA),
    };
    let shared = SharedModel::from_paths(paths, order());

    let estimates: Vec<Result<f64, InferenceError>> = (1..=10)
        .into_par_iter()
        .map(|quality| {
            let context = shared.get().unwrap();
            let input = RawInput::new().with("quality", RawValue::scalar(f64::from(quality)));
            let vector = context.schema().resolve(&input).unwrap();
            context.engine().predict(&vector).map(|r| r.point_estimate)
        })
        .collect();

    for (quality, estimate) in (1..=10).zip(estimates) {
        let expected = if quality < 7 { 130_000.0 } else { 190_000.0 };
        assert_relative_eq!(estimate.unwrap(), expected);
    }
}
