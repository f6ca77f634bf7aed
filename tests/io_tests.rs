//! Runner I/O tests: local files in, RowBatch partitions out


use parx_core::schema::{DataType, Field, Schema};
use parx_core::types::{Column, RowBatch, Scalar};
use parx_exec::{LocalRunner, PartitionPlan, Runner, TaskError};
use parx_io::readers::{CsvReader, JsonlReader};
use parx_io::writers::CsvWriter;
use parx_io::{FileFormat, LocalRunnerIo, RunnerIo};
use parx_core::config::RunnerConfig;
use std::fs;
use std::sync::Arc;
use test_data_gen::{cleanup_dir, create_temp_dir, write_test_csv, write_test_jsonl};

#[test]
fn test_csv_reader_header_schema() {
    let data = "id,name\n1,alice\n2,bob\n3,\n";
    let mut rdr = CsvReader::from_reader(data.as_bytes()).unwrap();
    assert_eq!(rdr.schema().names(), vec!["id", "name"]);

    let batch = rdr.next_batch(2).unwrap().expect("first batch");
    assert_eq!(batch.num_rows(), 2);
    assert_eq!(batch.columns[0].values[1], Scalar::Str("2".into()));

    let batch = rdr.next_batch(2).unwrap().expect("second batch");
    assert_eq!(batch.num_rows(), 1);
    assert_eq!(batch.columns[1].values[0], Scalar::Str("".into()));

    assert!(rdr.next_batch(2).unwrap().is_none());
}

#[test]
fn test_csv_reader_typed_schema() {
    let data = "name,id,score\nalice,1,0.5\nbob,x,1.5\n";
    let schema = Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("score", DataType::Float64, true),
    ]);
    let mut rdr = CsvReader::from_reader_with_schema(data.as_bytes(), schema).unwrap();
    let batch = rdr.next_batch(10).unwrap().unwrap();

    assert_eq!(batch.num_columns(), 2);
    assert_eq!(
        batch.column("id").unwrap().values,
        vec![Scalar::I64(1), Scalar::Null]
    );
    assert_eq!(
        batch.column("score").unwrap().values,
        vec![Scalar::F64(0.5), Scalar::F64(1.5)]
    );
}

#[test]
fn test_csv_reader_missing_column() {
    let schema = Schema::new(vec![Field::new("missing", DataType::Utf8, true)]);
    let err = CsvReader::from_reader_with_schema("a,b\n1,2\n".as_bytes(), schema)
        .err()
        .expect("missing column should fail");
    assert!(err.to_string().contains("missing required column"));
}

#[test]
fn test_jsonl_reader_unions_keys() {
    let data = "{\"a\": 1}\n\n{\"b\": \"x\", \"a\": 2.5}\n{\"c\": [1, 2]}\n";
    let mut rdr = JsonlReader::from_reader(data.as_bytes());
    let batch = rdr.next_batch(usize::MAX).unwrap().unwrap();

    assert_eq!(batch.num_rows(), 3);
    assert_eq!(rdr.schema().names(), vec!["a", "b", "c"]);
    assert_eq!(
        batch.column("a").unwrap().values,
        vec![Scalar::I64(1), Scalar::F64(2.5), Scalar::Null]
    );
    assert_eq!(batch.column("c").unwrap().values[2], Scalar::Str("[1,2]".into()));
    assert!(rdr.next_batch(10).unwrap().is_none());
}

#[test]
fn test_jsonl_reader_rejects_non_objects() {
    let mut rdr = JsonlReader::from_reader("{\"a\": 1}\n[1, 2]\n".as_bytes());
    let err = rdr.next_batch(10).unwrap_err();
    assert!(err.to_string().contains("line 2"), "{err}");
}

#[test]
fn test_csv_writer_round_trip() {
    let batch = RowBatch::new(vec![
        Column::new("id", vec![Scalar::I64(1), Scalar::I64(2)]),
        Column::new("note", vec![Scalar::Str("hi, there".into()), Scalar::Null]),
    ]);
    let mut wtr = CsvWriter::to_writer(Vec::new());
    wtr.write_batch(&batch).unwrap();
    let out = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
    assert_eq!(out, "id,note\n1,\"hi, there\"\n2,\n");

    let mut wtr = CsvWriter::to_writer(Vec::new());
    wtr.write_batch(&batch).unwrap();
    let other = RowBatch::new(vec![Column::new("x", vec![])]);
    assert!(wtr.write_batch(&other).is_err());
}

#[test]
fn test_list_files_filters_and_sorts() {
    let dir = create_temp_dir("list");
    write_test_csv(&dir.join("b.csv"), 2, 0);
    write_test_csv(&dir.join("a.csv"), 2, 0);
    write_test_jsonl(&dir.join("c.jsonl"), 2, 0);
    fs::write(dir.join("notes.txt"), "ignore me").unwrap();

    let io = LocalRunnerIo::new();
    let csvs = io.list_files(&dir, FileFormat::Csv).unwrap();
    let names: Vec<_> = csvs
        .iter()
        .map(|f| f.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.csv", "b.csv"]);
    assert!(csvs.iter().all(|f| f.size_bytes > 0 && f.format == FileFormat::Csv));

    let single = io.list_files(&dir.join("c.jsonl"), FileFormat::Jsonl).unwrap();
    assert_eq!(single.len(), 1);

    assert!(io.list_files(&dir.join("nope"), FileFormat::Csv).is_err());
    cleanup_dir(&dir);
}

#[test]
fn test_read_partition_and_infer_schema() {
    let dir = create_temp_dir("read");
    let csv_path = dir.join("people.csv");
    let jsonl_path = dir.join("people.jsonl");
    write_test_csv(&csv_path, 25, 0);
    write_test_jsonl(&jsonl_path, 7, 0);

    let io = LocalRunnerIo::with_batch_rows(10);
    let batch = io.read_partition(&csv_path, FileFormat::Csv).unwrap();
    assert_eq!(batch.num_rows(), 25);
    assert_eq!(batch.num_columns(), 3);

    let schema = io.infer_schema(&csv_path, FileFormat::Csv).unwrap();
    assert_eq!(schema.names(), vec!["id", "name", "age"]);

    let batch = io.read_partition(&jsonl_path, FileFormat::Jsonl).unwrap();
    assert_eq!(batch.num_rows(), 7);
    let schema = io.infer_schema(&jsonl_path, FileFormat::Jsonl).unwrap();
    assert_eq!(schema.names(), vec!["id", "name"]);

    let err = io
        .read_partition(&dir.join("absent.csv"), FileFormat::Csv)
        .unwrap_err();
    assert!(err.to_string().contains("absent.csv"), "{err}");
    cleanup_dir(&dir);
}

#[test]
fn test_header_only_csv_keeps_columns() {
    let dir = create_temp_dir("header_only");
    let path = dir.join("empty.csv");
    write_test_csv(&path, 0, 0);

    let batch = LocalRunnerIo::new()
        .read_partition(&path, FileFormat::Csv)
        .unwrap();
    assert_eq!(batch.num_columns(), 3);
    assert_eq!(batch.num_rows(), 0);
    cleanup_dir(&dir);
}

#[test]
fn test_write_partition() {
    let dir = create_temp_dir("write");
    let io = LocalRunnerIo::new();
    let batch = RowBatch::new(vec![Column::new("id", vec![Scalar::I32(7)])]);

    let path = dir.join("out.csv");
    io.write_partition(&batch, &path, FileFormat::Csv).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "id\n7\n");

    let err = io
        .write_partition(&batch, &dir.join("out.jsonl"), FileFormat::Jsonl)
        .unwrap_err();
    assert!(err.to_string().contains("not implemented"));
    cleanup_dir(&dir);
}

#[test]
fn test_file_format_parsing() {
    assert_eq!("csv".parse::<FileFormat>().unwrap(), FileFormat::Csv);
    assert_eq!("ndjson".parse::<FileFormat>().unwrap(), FileFormat::Jsonl);
    assert!("parquet".parse::<FileFormat>().is_err());
    assert_eq!(
        FileFormat::from_path(std::path::Path::new("x/y.jsonl")),
        Some(FileFormat::Jsonl)
    );
    assert_eq!(FileFormat::from_path(std::path::Path::new("x/y")), None);
    assert_eq!(FileFormat::Csv.to_string(), "csv");
}

#[test]
fn test_scan_plan_through_runner() {
    let dir = create_temp_dir("scan");
    write_test_csv(&dir.join("part0.csv"), 5, 0);
    write_test_csv(&dir.join("part1.csv"), 8, 5);
    write_test_csv(&dir.join("part2.csv"), 3, 13);

    let runner: LocalRunner<RowBatch> =
        LocalRunner::new(RunnerConfig::default().with_num_workers(2)).unwrap();
    let files = runner.runner_io().list_files(&dir, FileFormat::Csv).unwrap();
    let plan = PartitionPlan::scan_files(runner.io_handle(), &files);
    assert_eq!(plan.num_partitions(), 3);
    assert!(plan.task_names()[0].starts_with("scan:"));

    let entry = runner.run(&plan).unwrap();
    assert_eq!(entry.num_partitions(), 3);
    assert_eq!(entry.num_rows(), 16);

    let set = entry.partition_set().unwrap();
    let first_ids: Vec<Scalar> = set
        .iter()
        .map(|b| b.column("id").unwrap().values[0].clone())
        .collect();
    assert_eq!(
        first_ids,
        vec![
            Scalar::Str("0".into()),
            Scalar::Str("5".into()),
            Scalar::Str("13".into())
        ]
    );
    cleanup_dir(&dir);
}

#[test]
fn test_scan_plan_missing_file_fails_run() {
    let dir = create_temp_dir("scan_missing");
    let path = dir.join("gone.csv");
    write_test_csv(&path, 2, 0);

    let io = Arc::new(LocalRunnerIo::new());
    let files = io.list_files(&path, FileFormat::Csv).unwrap();
    let plan = PartitionPlan::scan_files(Arc::clone(&io), &files);
    fs::remove_file(&path).unwrap();

    let runner: LocalRunner<RowBatch> =
        LocalRunner::new(RunnerConfig::default().with_num_workers(1)).unwrap();
    let err = runner.run(&plan).unwrap_err();
    let source = std::error::Error::source(&err).expect("task error source");
    assert!(matches!(source.downcast_ref::<TaskError>(), Some(TaskError::Io(_))));
    assert_eq!(runner.num_cached_partition_sets(), 0);
    cleanup_dir(&dir);
}

#[test]
fn test_transient_io_errors_are_recoverable() {
    let err = parx_io::error::Error::Io(std::io::Error::new(
        std::io::ErrorKind::TimedOut,
        "slow disk",
    ))
    .with_context("reading 'x.csv'");
    assert!(TaskError::from(err).is_recoverable());

    let err = parx_io::error::Error::Io(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        "gone",
    ));
    assert!(!TaskError::from(err).is_recoverable());

    let err = parx_io::error::Error::Schema("bad column".into());
    assert!(matches!(TaskError::from(err), TaskError::Schema(_)));
}
