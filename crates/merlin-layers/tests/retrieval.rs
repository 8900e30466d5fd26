//! End-to-end retrieval: encode items, index them, score queries.

use merlin_data::{Column, ColumnSchema, DataFrame, Dataset, Schema, SyntheticData, Tag};
use merlin_layers::prelude::*;

fn schema() -> Schema {
    Schema::new(vec![
        ColumnSchema::categorical("user_id", 12).with_tag(Tag::UserId),
        ColumnSchema::categorical("item_id", 30).with_tag(Tag::ItemId),
        ColumnSchema::continuous("price"),
    ])
}

fn model() -> MatrixFactorizationBlock {
    let options = EmbeddingOptions::new(8).with_seed(7);
    MatrixFactorizationBlock::from_schema_with(&schema(), options, Tag::UserId, Tag::ItemId).unwrap()
}

fn catalog(ids: Vec<i64>) -> Dataset {
    let n = ids.len();
    let frame = DataFrame::new()
        .with_column("item_id", Column::Int64(ids))
        .unwrap()
        .with_column("price", Column::Float32(vec![1.0; n]))
        .unwrap();
    Dataset::new(frame).repartition(3).unwrap()
}

#[test]
fn test_item_encoder_populates_index() {
    let mf = model();
    let encoder = mf.item_encoder().unwrap();
    let ids: Vec<i64> = (0..30).rev().collect();
    let index = TopKIndexBlock::from_block(&encoder, &catalog(ids.clone()), 5, None).unwrap();

    assert_eq!(index.num_candidates(), 30);
    assert_eq!(index.dim(), 8);
    assert_eq!(index.ids().to_vec(), ids);

    // Row i of the index is the item embedding of ids[i].
    let table = encoder.table("item_id").unwrap();
    let expected = table.lookup_ids(&[ids[4] as usize]).unwrap();
    assert_eq!(index.lookup(&[4]).unwrap().to_vec(), expected.to_vec());
}

#[test]
fn test_smaller_k_is_prefix_of_full_ranking() {
    let mf = model();
    let encoder = mf.item_encoder().unwrap();
    let index = TopKIndexBlock::from_block(&encoder, &catalog((0..30).collect()), 3, None).unwrap();

    // A smaller k returns a prefix of the full ranking.
    let queries = index.lookup(&[2, 17]).unwrap();
    let top = index.score(&queries, None).unwrap();
    assert_eq!(top.scores.shape(), &[2, 3]);

    let all = index.score(&queries, Some(30)).unwrap();
    assert_eq!(all.ids.dim(), (2, 30));
    for row in 0..2 {
        for col in 0..3 {
            assert_eq!(top.ids[[row, col]], all.ids[[row, col]]);
        }
    }
}

#[test]
fn test_duplicate_item_ids_are_rejected() {
    let encoder = model().item_encoder().unwrap();
    let err = IndexBlock::from_block(&encoder, &catalog(vec![1, 2, 3, 2]), None).unwrap_err();
    assert!(matches!(err, LayerError::ValidationError { .. }));
}

#[test]
fn test_missing_id_column_is_config_error() {
    let encoder = ContinuousFeatures::from_features(&["price"]).unwrap();
    let err = IndexBlock::from_block(&encoder, &catalog(vec![1, 2]), None).unwrap_err();
    assert!(matches!(err, LayerError::ConfigError { .. }));

    let index = IndexBlock::from_block(&encoder, &catalog(vec![1, 2]), Some("item_id")).unwrap();
    assert_eq!(index.ids().to_vec(), vec![1, 2]);
    assert_eq!(index.values().shape(), &[2, 1]);
}

#[test]
fn test_config_driven_build_and_evaluation() {
    let mf = model();
    let config = IndexConfig::from_json_str(r#"{"k": 4, "id_column": "item_id"}"#).unwrap();
    let index = TopKIndexBlock::from_config(&config, &mf.item_encoder().unwrap(), &catalog((0..30).collect()))
        .unwrap();
    assert_eq!(index.k(), 4);

    let data = SyntheticData::generate(&schema(), 16, 3).unwrap();
    let batch = data.frame().to_tabular().unwrap();
    let queries = mf.query_encoder().unwrap().call_features(&batch).unwrap();
    let positives = mf.call_features(&batch).unwrap();

    let context = BlockContext::new().with(QUERY_CONTEXT_KEY, queries);
    let output = index.evaluation_view(&positives, &context).unwrap();
    assert_eq!(output.predictions.shape(), &[16, 5]);
    assert_eq!(output.targets.shape(), &[16, 5]);

    let recall = recall_at_k(&output, 5).unwrap();
    assert!((recall - 1.0).abs() < 1e-6);
    let recall = recall_at_k(&output, 1).unwrap();
    assert!((0.0..=1.0).contains(&recall));
}

#[test]
fn test_update_then_export() {
    let encoder = model().item_encoder().unwrap();
    let mut index = IndexBlock::from_block(&encoder, &catalog((0..6).collect()), None).unwrap();

    index.update(Tensor::ones(&[2, 8]), Some(vec![40, 41])).unwrap();
    let exported = index.to_dataset().unwrap();
    let rebuilt = IndexBlock::from_dataset(&exported, true).unwrap();
    assert_eq!(rebuilt.values(), index.values());
    assert_eq!(rebuilt.ids().to_vec(), vec![0, 1]);
}
