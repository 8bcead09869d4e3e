use std::fs;

use tagcsv::csv_codec::Dialect;
use tagcsv::exchange::{CancelToken, export_to_csv, import_from_csv};
use tagcsv::tree::{ArrayUpdateMode, DataType, NodeData, ProjectTree, TagStore};
use tagcsv::TagCsvError;
use tempfile::TempDir;

fn plant() -> ProjectTree {
    let mut tree = ProjectTree::new("Plant");
    tree.add("", NodeData::object("Driver")).unwrap();
    tree.add("Driver", NodeData::folder("Line1")).unwrap();
    tree.add("Driver/Line1", NodeData::tag("Speed", DataType::Float))
        .unwrap();
    tree.add("Driver/Line1", NodeData::structure_group("Motor"))
        .unwrap();

    let mut rpm = NodeData::tag("Rpm", DataType::Int32);
    let spec = rpm.tag_spec_mut().unwrap();
    spec.array_dimensions = vec![8];
    spec.array_update_mode = ArrayUpdateMode::Array;
    spec.symbol_name = "Motor.Rpm".to_string();
    tree.add("Driver/Line1/Motor", rpm).unwrap();
    tree.add("Driver/Line1/Motor", NodeData::tag("Run", DataType::Boolean))
        .unwrap();
    tree.add("Driver", NodeData::tag("Alarm", DataType::UInt16))
        .unwrap();
    tree
}

/// Every path with its node, sorted by path.
fn dump(tree: &ProjectTree, prefix: &str) -> Vec<(String, NodeData)> {
    let mut nodes: Vec<(String, NodeData)> = tree
        .iter_paths()
        .into_iter()
        .filter(|(path, _)| path.starts_with(prefix))
        .map(|(path, node)| (path, node.clone()))
        .collect();
    nodes.sort_by(|a, b| a.0.cmp(&b.0));
    nodes
}

#[test]
fn export_then_import_rebuilds_the_tree() {
    let dir = TempDir::new().unwrap();
    let csv_path = dir.path().join("tags.csv");
    let source = plant();

    let dialect = Dialect::new(';', false).unwrap();
    let exported = export_to_csv(&source, "Plant/Driver", &csv_path, dialect, &CancelToken::new())
        .unwrap();
    assert_eq!(exported.exported, 4);

    let mut target = ProjectTree::new("Copy");
    let imported = import_from_csv(&mut target, &csv_path, ';', &CancelToken::new()).unwrap();
    assert_eq!(imported.imported, 4);
    assert_eq!(imported.groups_created, 1);
    assert_eq!(imported.rows_failed, 0);

    // Driver comes back as a folder; everything below it matches.
    assert!(target.get("Driver").unwrap().kind.is_container());
    assert_eq!(dump(&target, "Driver/"), dump(&source, "Driver/"));

    // A second export of the copy produces the same file.
    let second = dir.path().join("again.csv");
    export_to_csv(&target, "Driver", &second, dialect, &CancelToken::new()).unwrap();
    let mut first_lines: Vec<String> = fs::read_to_string(&csv_path)
        .unwrap()
        .lines()
        .map(String::from)
        .collect();
    let mut second_lines: Vec<String> = fs::read_to_string(&second)
        .unwrap()
        .lines()
        .map(String::from)
        .collect();
    first_lines.sort();
    second_lines.sort();
    assert_eq!(first_lines, second_lines);
}

#[test]
fn wrapped_fields_keep_separators_and_quotes() {
    let dir = TempDir::new().unwrap();
    let csv_path = dir.path().join("tags.csv");

    let mut source = ProjectTree::new("Plant");
    source.add("", NodeData::folder("D")).unwrap();
    source.add("D", NodeData::folder("a,b")).unwrap();
    let mut tag = NodeData::tag("say \"hi\", twice", DataType::String);
    tag.tag_spec_mut().unwrap().symbol_name = "x,\"y\"".to_string();
    source.add("D/a,b", tag).unwrap();

    let wrapped = Dialect::new(',', true).unwrap();
    let stats = export_to_csv(&source, "D", &csv_path, wrapped, &CancelToken::new()).unwrap();
    assert_eq!(stats.exported, 1);
    assert_eq!(stats.filtered, 0);

    let mut target = ProjectTree::new("Plant");
    import_from_csv(&mut target, &csv_path, ',', &CancelToken::new()).unwrap();
    let spec = target
        .get("D/a,b/say \"hi\", twice")
        .unwrap()
        .tag_spec()
        .unwrap();
    assert_eq!(spec.symbol_name, "x,\"y\"");
    assert_eq!(spec.data_type, "String");
}

#[test]
fn unwrapped_export_leaves_out_conflicting_names() {
    let dir = TempDir::new().unwrap();
    let csv_path = dir.path().join("tags.csv");

    let mut source = ProjectTree::new("Plant");
    source.add("", NodeData::folder("D")).unwrap();
    source.add("D", NodeData::tag("ok", DataType::Int16))
        .unwrap();
    source.add("D", NodeData::tag("not;ok", DataType::Int16))
        .unwrap();

    let dialect = Dialect::new(';', false).unwrap();
    let stats = export_to_csv(&source, "D", &csv_path, dialect, &CancelToken::new()).unwrap();
    assert_eq!(stats.exported, 1);
    assert_eq!(stats.filtered, 1);

    let text = fs::read_to_string(&csv_path).unwrap();
    assert_eq!(text.lines().count(), 2);
    assert!(!text.contains("not;ok"));
}

#[test]
fn missing_csv_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let mut tree = ProjectTree::new("Plant");
    let err = import_from_csv(
        &mut tree,
        &dir.path().join("missing.csv"),
        ',',
        &CancelToken::new(),
    )
    .unwrap_err();
    assert!(matches!(err, TagCsvError::Io(_)));
}

#[test]
fn project_file_survives_an_import() {
    let dir = TempDir::new().unwrap();
    let csv_path = dir.path().join("tags.csv");
    let project_path = dir.path().join("plant.json");

    let source = plant();
    let dialect = Dialect::new(',', false).unwrap();
    export_to_csv(&source, "Driver", &csv_path, dialect, &CancelToken::new()).unwrap();

    let mut target = ProjectTree::new("Copy");
    import_from_csv(&mut target, &csv_path, ',', &CancelToken::new()).unwrap();
    target.save(&project_path).unwrap();

    let reloaded = ProjectTree::load(&project_path).unwrap();
    assert_eq!(reloaded.project_name(), "Copy");
    assert_eq!(dump(&reloaded, ""), dump(&target, ""));
}

#[test]
fn structure_groups_with_folders_and_nested_groups_round_trip() {
    let dir = TempDir::new().unwrap();
    let csv_path = dir.path().join("tags.csv");

    let mut source = ProjectTree::new("Plant");
    source.add("", NodeData::folder("D")).unwrap();
    source.add("D", NodeData::structure_group("G")).unwrap();
    source.add("D/G", NodeData::tag("a", DataType::Int32))
        .unwrap();
    source.add("D/G", NodeData::folder("F")).unwrap();
    source.add("D/G/F", NodeData::tag("x", DataType::Float))
        .unwrap();
    source.add("D/G", NodeData::structure_group("S")).unwrap();
    source.add("D/G/S", NodeData::tag("y", DataType::Byte))
        .unwrap();
    source.add("D/G", NodeData::tag("b", DataType::Boolean))
        .unwrap();

    let dialect = Dialect::new(',', false).unwrap();
    export_to_csv(&source, "D", &csv_path, dialect, &CancelToken::new()).unwrap();

    let mut target = ProjectTree::new("Plant");
    let stats = import_from_csv(&mut target, &csv_path, ',', &CancelToken::new()).unwrap();
    assert_eq!(stats.imported, 4);
    assert_eq!(stats.groups_created, 2);
    assert_eq!(dump(&target, "D/"), dump(&source, "D/"));
}
