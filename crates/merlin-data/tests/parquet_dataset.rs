use merlin_data::{
    read_parquet, write_parquet, Column, ColumnSchema, DataError, DataFrame, Dataset, Schema,
    SyntheticData, Tag,
};

#[test]
fn test_keyed_item_table_survives_parquet() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("items.parquet");

    let items = DataFrame::new()
        .with_column("item_id", Column::Int64(vec![42, 7, 19]))
        .unwrap()
        .with_column("0", Column::Float32(vec![0.25, -1.0, 3.5]))
        .unwrap()
        .with_column("1", Column::Float32(vec![1.0, 0.0, -0.5]))
        .unwrap();
    let mut keyed = items.clone();
    keyed.set_index("item_id").unwrap();

    write_parquet(&keyed, &path).unwrap();
    let restored = read_parquet(&path).unwrap();

    assert_eq!(restored.index_values(), vec![42, 7, 19]);
    assert_eq!(
        restored.to_tensor().unwrap().to_rows().unwrap(),
        vec![vec![0.25, 1.0], vec![-1.0, 0.0], vec![3.5, -0.5]]
    );
}

#[test]
fn test_unnamed_index_is_restored_without_a_name() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("unnamed.parquet");

    let frame = DataFrame::new()
        .with_column("0", Column::Float32(vec![1.0, 2.0]))
        .unwrap()
        .with_index(None, vec![3, 4])
        .unwrap();
    write_parquet(&frame, &path).unwrap();

    let restored = read_parquet(&path).unwrap();
    assert_eq!(restored, frame);
    assert_eq!(restored.column_names(), vec!["0"]);
}

#[test]
fn test_synthetic_dataset_partitions_round_trip() {
    let tmp = tempfile::tempdir().unwrap();
    let schema = Schema::new(vec![
        ColumnSchema::categorical("item_id", 1000).with_tag(Tag::ItemId),
        ColumnSchema::continuous("price"),
    ]);
    let dataset = SyntheticData::generate(&schema, 25, 11)
        .unwrap()
        .into_dataset()
        .repartition(4)
        .unwrap();

    let paths = dataset.write_parquet(tmp.path().join("parts")).unwrap();
    assert_eq!(paths.len(), 4);

    let pattern = format!("{}/parts/part_*.parquet", tmp.path().display());
    let loaded = Dataset::read_parquet(&pattern).unwrap();
    assert_eq!(loaded.num_partitions(), 4);
    assert_eq!(loaded.to_frame().unwrap(), dataset.to_frame().unwrap());
}

#[test]
fn test_many_partitions_keep_their_order() {
    let tmp = tempfile::tempdir().unwrap();
    let frame = DataFrame::new()
        .with_column("x", Column::Int64((0..12).collect()))
        .unwrap();
    let dataset = Dataset::new(frame).repartition(12).unwrap();
    let paths = dataset.write_parquet(tmp.path()).unwrap();
    assert!(paths[10].ends_with("part_00010.parquet"));

    let pattern = format!("{}/*.parquet", tmp.path().display());
    let loaded = Dataset::read_parquet(&pattern).unwrap().to_frame().unwrap();
    assert_eq!(loaded.column("x").unwrap(), &Column::Int64((0..12).collect()));
}

#[test]
fn test_rewrite_removes_stale_partitions() {
    let tmp = tempfile::tempdir().unwrap();
    let frame = DataFrame::new()
        .with_column("x", Column::Int64((0..6).collect()))
        .unwrap();
    let notes = tmp.path().join("notes.txt");
    std::fs::write(&notes, "kept").unwrap();

    Dataset::new(frame.clone()).repartition(6).unwrap().write_parquet(tmp.path()).unwrap();
    Dataset::new(frame).repartition(2).unwrap().write_parquet(tmp.path()).unwrap();

    let pattern = format!("{}/*.parquet", tmp.path().display());
    let loaded = Dataset::read_parquet(&pattern).unwrap();
    assert_eq!(loaded.num_partitions(), 2);
    assert_eq!(loaded.num_rows(), 6);
    assert!(notes.exists());
}

#[test]
fn test_reading_missing_file_is_io_error() {
    let tmp = tempfile::tempdir().unwrap();
    let err = read_parquet(tmp.path().join("missing.parquet")).unwrap_err();
    assert!(matches!(err, DataError::Io(_)));
}
