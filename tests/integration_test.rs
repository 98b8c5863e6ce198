//! Integration tests for loading example files and predicting over them.
//!
//! These tests cover the whole path from a file on disk to an `ExampleTable`:
//! suffix dispatch, the three format readers, parallel and sequential
//! materialization, and vectorization. The last section runs a saved model
//! over loaded tables.
//!
//! # Test Strategy
//!
//! The same three logical examples are written in all three formats by
//! `write_all_formats()`, with and without labels. Because each format builds
//! its own column space, matrices are compared through `rows_by_name()`, which
//! maps every row back to `feature name -> value`.
//!
//! # Sample Data
//!
//! | id | label | features |
//! |---|---|---|
//! | ex1 | A | f1=1.0, f2=2.5, color=green |
//! | ex2 | B | f2=-1.0, color=red |
//! | ex3 | A | f1=4.0, color=blue |

use anyhow::Result;
use featio::formats::open_examples;
use featio::model::{load_model, model_path, save_model, LinearModel};
use featio::predict::{ModelType, Prediction, Predictor};
use featio::{
    load_examples, ExampleTable, LoadOptions, Materialization, ReadOptions, UnsupportedFormat,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const TSV_LABELLED: &str = "y\tid\tf1\tf2\tcolor\n\
A\tex1\t1.0\t2.5\tgreen\n\
B\tex2\t0\t-1.0\tred\n\
A\tex3\t4\t0.0\tblue\n";

const TSV_UNLABELLED: &str = "id\tf1\tf2\tcolor\n\
ex1\t1.0\t2.5\tgreen\n\
ex2\t0\t-1.0\tred\n\
ex3\t4\t0.0\tblue\n";

const JSONLINES_LABELLED: &str = r#"{"id": "ex1", "y": "A", "x": {"f1": 1.0, "f2": 2.5, "color": "green"}}
{"id": "ex2", "y": "B", "x": {"f2": -1.0, "color": "red"}}
{"id": "ex3", "y": "A", "x": {"f1": 4, "color": "blue"}}
"#;

const JSONLINES_UNLABELLED: &str = r#"{"id": "ex1", "x": {"f1": 1.0, "f2": 2.5, "color": "green"}}
{"id": "ex2", "x": {"f2": -1.0, "color": "red"}}
{"id": "ex3", "x": {"f1": 4, "color": "blue"}}
"#;

const MEGAM_LABELLED: &str = "TRAIN\n#ex1\nA f1 1.0 f2 2.5 color green\n\
#ex2\nB f2 -1.0 color red\n\
#ex3\nA f1 4 color blue\n";

const MEGAM_UNLABELLED: &str = "#ex1\nf1 1.0 f2 2.5 color green\n\
#ex2\nf2 -1.0 color red\n\
#ex3\nf1 4 color blue\n";

/// Helper: write `content` to `name` inside `dir` and return the path.
fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

/// Helper: write the sample data in every format, returning `(labelled, unlabelled)` pairs.
fn write_all_formats(dir: &Path) -> Vec<(PathBuf, PathBuf)> {
    vec![
        (
            write_file(dir, "labelled.tsv", TSV_LABELLED),
            write_file(dir, "unlabelled.tsv", TSV_UNLABELLED),
        ),
        (
            write_file(dir, "labelled.jsonlines", JSONLINES_LABELLED),
            write_file(dir, "unlabelled.jsonlines", JSONLINES_UNLABELLED),
        ),
        (
            write_file(dir, "labelled.megam", MEGAM_LABELLED),
            write_file(dir, "unlabelled.megam", MEGAM_UNLABELLED),
        ),
    ]
}

fn options(has_labels: bool) -> LoadOptions {
    LoadOptions {
        has_labels,
        quiet: true,
        ..LoadOptions::default()
    }
}

/// Each row as `column name -> value`, skipping zeros.
fn rows_by_name(table: &ExampleTable) -> Vec<BTreeMap<String, f64>> {
    let names = table.vectorizer.feature_names();
    (0..table.features.n_rows())
        .map(|i| {
            table
                .features
                .row_entries(i)
                .into_iter()
                .map(|(col, value)| (names[col].clone(), value))
                .collect()
        })
        .collect()
}

fn expected_rows() -> Vec<BTreeMap<String, f64>> {
    let row = |entries: &[(&str, f64)]| {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect::<BTreeMap<_, _>>()
    };
    vec![
        row(&[("f1", 1.0), ("f2", 2.5), ("color=green", 1.0)]),
        row(&[("f2", -1.0), ("color=red", 1.0)]),
        row(&[("f1", 4.0), ("color=blue", 1.0)]),
    ]
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_worked_tsv_example() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_file(
        dir.path(),
        "example.tsv",
        "id\tlabel\tf1\tf2\nex1\tA\t1.0\t0.0\nex2\tB\t0.0\t3.5\n",
    );

    let table = load_examples(&path, &options(true))?;
    assert_eq!(table.ids, vec!["ex1", "ex2"]);
    assert_eq!(table.label_values(), vec!["A", "B"]);
    assert_eq!(table.vectorizer.feature_names(), &["f1", "f2"]);

    let dense = table.features.to_dense();
    assert_eq!(dense.shape(), &[2, 2]);
    assert_eq!(dense[[0, 0]], 1.0);
    assert_eq!(dense[[0, 1]], 0.0);
    assert_eq!(dense[[1, 0]], 0.0);
    assert_eq!(dense[[1, 1]], 3.5);
    Ok(())
}

#[test]
fn test_formats_agree() -> Result<()> {
    let dir = TempDir::new()?;
    for (labelled, _) in write_all_formats(dir.path()) {
        let table = load_examples(&labelled, &options(true))?;
        assert_eq!(table.ids, vec!["ex1", "ex2", "ex3"], "{}", labelled.display());
        assert_eq!(table.label_values(), vec!["A", "B", "A"], "{}", labelled.display());
        assert_eq!(rows_by_name(&table), expected_rows(), "{}", labelled.display());
    }
    Ok(())
}

#[test]
fn test_labels_do_not_change_features() -> Result<()> {
    let dir = TempDir::new()?;
    for (labelled, unlabelled) in write_all_formats(dir.path()) {
        let with = load_examples(&labelled, &options(true))?;
        let without = load_examples(&unlabelled, &options(false))?;

        assert_eq!(with.ids, without.ids, "{}", labelled.display());
        assert_eq!(with.vectorizer, without.vectorizer, "{}", labelled.display());
        assert_eq!(
            with.features.to_dense(),
            without.features.to_dense(),
            "{}",
            labelled.display()
        );
        assert!(with.has_labels());
        assert!(!without.has_labels());
        assert_eq!(without.labels, vec![None::<String>; 3]);
    }
    Ok(())
}

#[test]
fn test_strategies_and_matrix_kinds_agree() -> Result<()> {
    let dir = TempDir::new()?;
    for (labelled, _) in write_all_formats(dir.path()) {
        let reference = load_examples(&labelled, &options(true))?;
        for strategy in [Materialization::Parallel, Materialization::Sequential] {
            for sparse in [true, false] {
                let table = load_examples(
                    &labelled,
                    &LoadOptions {
                        sparse,
                        strategy,
                        ..options(true)
                    },
                )?;
                assert_eq!(table.features.is_sparse(), sparse);
                assert_eq!(table.ids, reference.ids);
                assert_eq!(table.labels, reference.labels);
                assert_eq!(table.vectorizer, reference.vectorizer);
                assert_eq!(table.features.to_dense(), reference.features.to_dense());
            }
        }
    }
    Ok(())
}

#[test]
fn test_progress_output_does_not_change_results() -> Result<()> {
    let dir = TempDir::new()?;
    let files = write_all_formats(dir.path());
    let (labelled, _) = &files[2];
    let quiet = load_examples(labelled, &options(true))?;
    let verbose = load_examples(
        labelled,
        &LoadOptions {
            quiet: false,
            ..options(true)
        },
    )?;
    assert_eq!(quiet.ids, verbose.ids);
    assert_eq!(quiet.features, verbose.features);
    Ok(())
}

#[test]
fn test_tsv_zero_omitted_but_jsonlines_zero_kept() -> Result<()> {
    let dir = TempDir::new()?;
    let tsv = write_file(dir.path(), "zeros.tsv", "y\ta\tb\nA\t0\t1\n");
    let json = write_file(
        dir.path(),
        "zeros.jsonlines",
        "{\"y\": \"A\", \"x\": {\"a\": 0, \"b\": 1}}\n",
    );

    let tsv_table = load_examples(&tsv, &options(true))?;
    assert_eq!(tsv_table.vectorizer.feature_names(), &["b"]);

    let json_table = load_examples(&json, &options(true))?;
    assert_eq!(json_table.vectorizer.feature_names(), &["a", "b"]);
    Ok(())
}

#[test]
fn test_columns_follow_file_order_not_name_order() -> Result<()> {
    let dir = TempDir::new()?;
    let files = [
        write_file(dir.path(), "order.tsv", "y\tzeta\talpha\nA\t1\t2\n"),
        write_file(dir.path(), "order.megam", "A zeta 1 alpha 2\n"),
        write_file(
            dir.path(),
            "order.jsonlines",
            "{\"y\": \"A\", \"x\": {\"zeta\": 1, \"alpha\": 2}}\n",
        ),
    ];
    for path in &files {
        for strategy in [Materialization::Parallel, Materialization::Sequential] {
            let table = load_examples(
                path,
                &LoadOptions {
                    strategy,
                    ..options(true)
                },
            )?;
            assert_eq!(
                table.vectorizer.feature_names(),
                &["zeta", "alpha"],
                "{}",
                path.display()
            );
            assert_eq!(table.features.row_entries(0), vec![(0, 1.0), (1, 2.0)]);
        }
    }
    Ok(())
}

#[test]
fn test_large_file_ids_and_ticks() -> Result<()> {
    let dir = TempDir::new()?;
    let mut content = String::from("TEST\n");
    for i in 0..250 {
        content.push_str(&format!("L{} f{} {}\n", i % 3, i % 7, i + 1));
        if i % 50 == 0 {
            content.push_str("DEV\n");
        }
    }
    let path = write_file(dir.path(), "big.megam", &content);

    let table = load_examples(
        &path,
        &LoadOptions {
            quiet: false,
            ..options(true)
        },
    )?;
    assert_eq!(table.len(), 250);
    assert_eq!(table.ids[0], "EXAMPLE_0");
    assert_eq!(table.ids[249], "EXAMPLE_249");
    assert_eq!(table.vectorizer.len(), 7);
    Ok(())
}

#[test]
fn test_unsupported_suffix_rejected() {
    let err = load_examples("/no/such/file.csv", &options(true)).unwrap_err();
    let unsupported = err.downcast_ref::<UnsupportedFormat>().unwrap();
    assert_eq!(unsupported.path, "/no/such/file.csv");
}

#[test]
fn test_missing_file_fails() {
    assert!(load_examples("/no/such/file.megam", &options(true)).is_err());
}

#[test]
fn test_malformed_inputs_fail_whole_load() -> Result<()> {
    let dir = TempDir::new()?;
    let bad_tsv = write_file(dir.path(), "bad.tsv", "y\tf1\nA\t1\nB\t2\textra\n");
    let bad_json = write_file(dir.path(), "bad.jsonlines", "{\"y\": \"A\", \"x\": {\"f\": [1]}}\n");
    let unlabelled_json = write_file(dir.path(), "nolabel.jsonlines", "{\"x\": {\"f\": 1}}\n");

    for path in [&bad_tsv, &bad_json, &unlabelled_json] {
        for strategy in [Materialization::Parallel, Materialization::Sequential] {
            let result = load_examples(
                path,
                &LoadOptions {
                    strategy,
                    ..options(true)
                },
            );
            assert!(result.is_err(), "{} should fail", path.display());
        }
    }
    Ok(())
}

#[test]
fn test_vectorizer_reuse_on_new_file() -> Result<()> {
    let dir = TempDir::new()?;
    let train = write_file(dir.path(), "train.tsv", TSV_LABELLED);
    let test = write_file(
        dir.path(),
        "test.jsonlines",
        "{\"x\": {\"f2\": 7.0, \"unseen\": 1.0, \"color\": \"red\"}}\n",
    );

    let train_table = load_examples(&train, &options(true))?;
    let vectorizer = &train_table.vectorizer;

    let maps = open_examples(&test, ReadOptions { has_labels: false, quiet: true })?
        .map(|example| example.map(|e| e.features))
        .collect::<Result<Vec<_>>>()?;

    let matrix = vectorizer.transform(&maps, false);
    assert_eq!(matrix.shape(), (1, vectorizer.len()));
    let f2 = vectorizer.index_of("f2").unwrap();
    let red = vectorizer.index_of("color=red").unwrap();
    assert_eq!(matrix.row_entries(0), {
        let mut expected = vec![(f2, 7.0), (red, 1.0)];
        expected.sort_by_key(|(col, _)| *col);
        expected
    });
    Ok(())
}

// ============================================================================
// Prediction
// ============================================================================

fn train_vectorizer(dir: &Path) -> Result<featio::Vectorizer> {
    let train = write_file(dir, "train.tsv", TSV_LABELLED);
    Ok(load_examples(&train, &options(true))?.vectorizer)
}

#[test]
fn test_predict_labels_from_saved_model() -> Result<()> {
    let dir = TempDir::new()?;
    let vectorizer = train_vectorizer(dir.path())?;

    // Positive score means label "B"; red pushes towards B, f1 towards A
    let mut weights = vec![0.0; vectorizer.len()];
    weights[vectorizer.index_of("color=red").unwrap()] = 5.0;
    weights[vectorizer.index_of("f1").unwrap()] = -1.0;
    let model = LinearModel::classifier(
        ModelType::LinearSvc,
        vectorizer,
        vec!["A".into(), "B".into()],
        vec![weights],
        vec![0.0],
        false,
    )?;

    let prefix = dir.path().join("clf");
    let path = model_path(prefix.to_str().unwrap());
    save_model(&model, &path)?;

    let predictor = Predictor::new(load_model(&path)?, 1, None);
    for (labelled, unlabelled) in write_all_formats(dir.path()) {
        for (path, has_labels) in [(labelled, true), (unlabelled, false)] {
            let table = load_examples(&path, &options(has_labels))?;
            let predictions = predictor.predict(&table)?;
            assert_eq!(
                predictions,
                vec![
                    Prediction::Label("A".into()),
                    Prediction::Label("B".into()),
                    Prediction::Label("A".into()),
                ],
                "{}",
                path.display()
            );
        }
    }
    Ok(())
}

#[test]
fn test_predict_probabilities_and_threshold() -> Result<()> {
    let dir = TempDir::new()?;
    let vectorizer = train_vectorizer(dir.path())?;

    let mut weights = vec![0.0; vectorizer.len()];
    weights[vectorizer.index_of("color=red").unwrap()] = 3.0;
    let model = LinearModel::classifier(
        ModelType::LogisticRegression,
        vectorizer,
        vec!["A".into(), "B".into()],
        vec![weights],
        vec![-1.0],
        true,
    )?;

    let data = write_file(dir.path(), "data.jsonlines", JSONLINES_UNLABELLED);
    let table = load_examples(&data, &options(false))?;

    let probabilities = Predictor::new(model.clone(), 1, None).predict(&table)?;
    let p_red = 1.0 / (1.0 + (-2.0f64).exp());
    let p_other = 1.0 / (1.0 + 1.0f64.exp());
    match (&probabilities[0], &probabilities[1]) {
        (Prediction::Probability(a), Prediction::Probability(b)) => {
            assert!((a - p_other).abs() < 1e-12);
            assert!((b - p_red).abs() < 1e-12);
        }
        other => panic!("unexpected predictions: {:?}", other),
    }

    let decisions = Predictor::new(model.clone(), 1, Some(0.5)).predict(&table)?;
    assert_eq!(
        decisions,
        vec![
            Prediction::Decision(0),
            Prediction::Decision(1),
            Prediction::Decision(0),
        ]
    );

    let negative = Predictor::new(model, 0, Some(0.5)).predict(&table)?;
    assert_eq!(
        negative,
        vec![
            Prediction::Decision(1),
            Prediction::Decision(0),
            Prediction::Decision(1),
        ]
    );
    Ok(())
}

#[test]
fn test_predict_regression_values() -> Result<()> {
    let dir = TempDir::new()?;
    let vectorizer = train_vectorizer(dir.path())?;

    let mut weights = vec![0.0; vectorizer.len()];
    weights[vectorizer.index_of("f1").unwrap()] = 2.0;
    weights[vectorizer.index_of("f2").unwrap()] = 1.0;
    let model = LinearModel::regressor(ModelType::LinearRegression, vectorizer, weights, 0.5)?;

    let data = write_file(dir.path(), "data.megam", MEGAM_UNLABELLED);
    let table = load_examples(&data, &options(false))?;
    let values = Predictor::new(model, 1, Some(0.9)).predict(&table)?;
    assert_eq!(
        values,
        vec![
            Prediction::Value(5.0),
            Prediction::Value(-0.5),
            Prediction::Value(8.5),
        ]
    );
    Ok(())
}
