//! End-to-end tests for the broker: registration, import and export through
//! every locator kind, record streaming, modules and collection.

use std::fs::{self, File};
use std::io::{Seek, SeekFrom, Write};
use std::sync::Arc;

use parking_lot::Mutex;
use proptest::prelude::*;
use tessera_containers::{
    Container, ContainerRef, ContainerShape, Dataset, Family, Geometry, Grid, GridHeader, Region,
    Registration,
};
use tessera_system::prelude::*;

// ─────────────────────────────────────────────────────────────────────────
// Fixtures
// ─────────────────────────────────────────────────────────────────────────

fn table(rows: &[[f64; 2]]) -> ContainerRef {
    let mut dataset = Dataset::with_shape(1, 1, rows.len(), 2);
    dataset.tables[0].segments[0].columns = vec![
        rows.iter().map(|r| r[0]).collect(),
        rows.iter().map(|r| r[1]).collect(),
    ];
    ContainerRef::new(Container::Dataset(dataset))
}

fn grid_text() -> Vec<u8> {
    let header =
        GridHeader::new(Region::new(0.0, 3.0, 0.0, 2.0), [1.0, 1.0], Registration::Gridline)
            .unwrap();
    let values: Vec<f32> = (0..12).map(|v| v as f32).collect();
    let grid = Grid::from_values(header, &values).unwrap();
    let mut out = Vec::new();
    Container::Grid(grid).encode(&mut out).unwrap();
    out
}

fn reader(text: &str) -> SharedReader {
    Arc::new(Mutex::new(std::io::Cursor::new(text.as_bytes().to_vec())))
}

fn drain(session: &mut Session) -> Vec<Record> {
    let mut records = Vec::new();
    loop {
        let record = session.get_record().unwrap();
        let done = record == Record::EndOfAllResources;
        records.push(record);
        if done {
            return records;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn ids_are_unique_and_increasing(n in 1usize..40) {
        let mut session = Session::new("ids");
        let ids: Vec<ResourceId> = (0..n)
            .map(|i| {
                session
                    .register(ResourceRequest::input(
                        Family::Dataset,
                        Method::ByPath,
                        Locator::path(format!("in-{i}.txt")),
                    ))
                    .unwrap()
            })
            .collect();
        prop_assert!(ids.windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(session.resource_count(), n);
    }
}

#[test]
fn registering_a_host_twice_is_idempotent() {
    let mut session = Session::new("dedup");
    let host = table(&[[1.0, 2.0]]);
    let request = || {
        ResourceRequest::input(Family::Dataset, Method::ReferenceInMemory, Locator::memory(&host))
    };
    let a = session.register(request()).unwrap();
    let b = session.register(request()).unwrap();
    assert_eq!(a, b);
    assert_eq!(session.resource_count(), 1);
}

#[test]
fn direction_is_checked_on_lookup() {
    let mut session = Session::new("lookup");
    let id = session
        .register(ResourceRequest::output(
            Family::Dataset,
            Method::ByPath,
            Locator::path("out.txt"),
        ))
        .unwrap();
    assert!(matches!(
        session.lookup(id, Direction::Input),
        Err(BrokerError::NotInputResource(_))
    ));
    assert_eq!(
        session.lookup_first_unused(Family::Dataset, Direction::Output),
        Some(id)
    );
    session.unregister(id).unwrap();
    assert!(matches!(session.unregister(id), Err(BrokerError::NotAValidId(_))));
}

#[test]
fn read_only_cannot_be_an_output() {
    let mut session = Session::new("methods");
    let host = table(&[[1.0, 2.0]]);
    assert!(matches!(
        session.register(ResourceRequest::output(
            Family::Dataset,
            Method::ReadOnlyInMemory,
            Locator::memory(&host),
        )),
        Err(BrokerError::NotAValidMethod(_))
    ));
}

// ─────────────────────────────────────────────────────────────────────────
// Import and export
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn inputs_are_read_once() {
    let mut session = Session::new("once");
    let id = session
        .register(ResourceRequest::input(
            Family::Dataset,
            Method::ByStream,
            Locator::reader(reader("1 2\n")),
        ))
        .unwrap();
    session.import(Family::Dataset, id, IoMode::ALL).unwrap();
    assert!(matches!(
        session.import(Family::Dataset, id, IoMode::ALL),
        Err(BrokerError::ReadOnce(_))
    ));
    // Streams cannot rewind, so a reset is not honored.
    assert!(matches!(
        session.import(Family::Dataset, id, IoMode::ALL.with_reset()),
        Err(BrokerError::ReadOnce(_))
    ));
}

#[test]
fn tables_round_trip_through_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("points.txt");
    let mut session = Session::new("files");
    let source = table(&[[1.0, 2.0], [3.5, -4.0]]);

    session
        .write_data(
            Family::Dataset,
            Method::ByPath,
            Locator::path(&path),
            IoMode::ALL,
            &source,
        )
        .unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "1\t2\n3.5\t-4\n");

    let back = session
        .read_data(Family::Dataset, Method::ByPath, Locator::path(&path), IoMode::ALL)
        .unwrap();
    let dataset = back.dataset().unwrap();
    assert_eq!(dataset.n_records(), 2);
    let segment = dataset.segments().next().unwrap();
    assert_eq!(segment.row(1), Some(vec![3.5, -4.0]));
}

#[test]
fn grid_header_then_payload_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("relief.grd");
    fs::write(&path, grid_text()).unwrap();

    let mut session = Session::new("two-phase");
    let pad = session.config().pad();
    let id = session
        .register(ResourceRequest::input(
            Family::Grid,
            Method::ByPath,
            Locator::path(&path),
        ))
        .unwrap();
    let header = session.import(Family::Grid, id, IoMode::HEADER_ONLY).unwrap();
    let (nx, ny) = {
        let grid = header.grid().unwrap();
        assert!(grid.is_header_only());
        (grid.header.nx, grid.header.ny)
    };
    assert_eq!((nx, ny), (4, 3));

    let full = session.import(Family::Grid, id, IoMode::DATA_ONLY).unwrap();
    assert!(full.same_as(&header));
    let grid = full.grid().unwrap();
    assert_eq!(
        grid.data.len(),
        (nx + pad.west + pad.east) * (ny + pad.south + pad.north)
    );
    assert_eq!(grid.values().len(), 12);
}

#[test]
fn grid_header_then_payload_from_descriptor() {
    let mut file = tempfile::tempfile().unwrap();
    file.write_all(&grid_text()).unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();

    let mut session = Session::new("descriptor");
    let id = session
        .register(ResourceRequest::input(
            Family::Grid,
            Method::ByDescriptor,
            Locator::descriptor(&file).unwrap(),
        ))
        .unwrap();
    session.import(Family::Grid, id, IoMode::HEADER_ONLY).unwrap();
    let full = session.import(Family::Grid, id, IoMode::DATA_ONLY).unwrap();
    let values = full.grid().unwrap().values();
    assert_eq!(values.len(), 12);
    assert_eq!(values.iter().sum::<f32>(), 66.0);
}

#[test]
fn descriptor_output_writes_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.txt");
    let file = File::create(&path).unwrap();

    let mut session = Session::new("descriptor");
    session
        .write_data(
            Family::Dataset,
            Method::ByDescriptor,
            Locator::descriptor(&file).unwrap(),
            IoMode::ALL,
            &table(&[[7.0, 8.0]]),
        )
        .unwrap();
    drop(file);
    assert_eq!(fs::read_to_string(&path).unwrap(), "7\t8\n");
}

#[test]
fn oversized_grid_header_is_an_error() {
    let header = |nx: u64, ny: u64| {
        format!(
            "{{\"nx\":{nx},\"ny\":{ny},\
             \"region\":{{\"west\":0,\"east\":1,\"south\":0,\"north\":1}},\
             \"inc\":[1,1],\"registration\":\"Gridline\"}}\n1 2 3 4\n"
        )
    };
    let mut session = Session::new("oversized");
    for (nx, ny) in [(1_000_000_000_000, 1_000_000_000), (100_000_000, 100_000_000)] {
        let id = session
            .register(ResourceRequest::input(
                Family::Grid,
                Method::ByStream,
                Locator::reader(reader(&header(nx, ny))),
            ))
            .unwrap();
        let err = session.import(Family::Grid, id, IoMode::ALL).unwrap_err();
        assert!(matches!(err, BrokerError::Container(_)), "{err}");
    }
    assert_eq!(session.destroy().unwrap().frees, 0);
}

#[test]
fn oversized_empty_grid_is_refused() {
    let session = Session::new("oversized");
    let shape = ContainerShape::Grid {
        region: Region::new(0.0, 1.0e300, 0.0, 1.0e300),
        inc: [1.0e-300, 1.0e-300],
        registration: Registration::Gridline,
    };
    assert!(session.create_empty_container(shape).is_err());
}

#[test]
fn rewindable_inputs_can_be_read_again() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("points.txt");
    fs::write(&path, "1 2\n3 4\n").unwrap();
    let host = table(&[[1.0, 2.0], [3.0, 4.0]]);

    let mut session = Session::new("reset");
    let requests = [
        ResourceRequest::input(Family::Dataset, Method::ByPath, Locator::path(&path)),
        ResourceRequest::input(
            Family::Dataset,
            Method::ReferenceInMemory,
            Locator::memory(&host),
        ),
        ResourceRequest::input(
            Family::Dataset,
            Method::ReadOnlyInMemory,
            Locator::memory(&host),
        ),
    ];
    for request in requests {
        let id = session.register(request).unwrap();
        let first = session.import(Family::Dataset, id, IoMode::ALL).unwrap();
        let first_rows = first.dataset().unwrap().n_records();
        assert!(matches!(
            session.import(Family::Dataset, id, IoMode::ALL),
            Err(BrokerError::ReadOnce(_))
        ));
        let again = session
            .import(Family::Dataset, id, IoMode::ALL.with_reset())
            .unwrap();
        let dataset = again.dataset().unwrap();
        assert_eq!(dataset.n_records(), first_rows);
        assert_eq!(dataset.segments().next().unwrap().row(1), Some(vec![3.0, 4.0]));
    }
    assert_eq!(host.dataset().unwrap().n_records(), 2);
}

#[test]
fn files_round_trip_through_memory_copies() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("survey.txt");
    fs::write(&path, "# survey\n> north\n1 2\n3 4\n> south\n5 6\n").unwrap();

    let mut session = Session::new("round-trip");
    let original = session
        .read_data(Family::Dataset, Method::ByPath, Locator::path(&path), IoMode::ALL)
        .unwrap();
    let out = session
        .write_data(
            Family::Dataset,
            Method::CopyInMemory,
            Locator::empty_slot(),
            IoMode::ALL,
            &original,
        )
        .unwrap();
    let copy = session.retrieve_realized(out).unwrap();
    assert!(!copy.same_as(&original));

    let back = session
        .read_data(
            Family::Dataset,
            Method::CopyInMemory,
            Locator::memory(&copy),
            IoMode::ALL,
        )
        .unwrap();
    assert!(!back.same_as(&copy));

    let expected = original.dataset().unwrap();
    let actual = back.dataset().unwrap();
    assert_eq!(actual.n_tables(), expected.n_tables());
    assert_eq!(actual.n_segments(), 2);
    assert_eq!(actual.n_records(), 3);
    let first_rows: Vec<_> = actual.segments().map(|s| s.row(0)).collect();
    assert_eq!(first_rows, vec![Some(vec![1.0, 2.0]), Some(vec![5.0, 6.0])]);
    assert_eq!(*actual, *expected);
}

// ─────────────────────────────────────────────────────────────────────────
// Record streaming
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn file_rows_stream_until_exhausted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("points.txt");
    fs::write(&path, "1 2\n3 4\n5 6\n").unwrap();

    let mut session = Session::new("stream");
    session
        .register(ResourceRequest::input(
            Family::Dataset,
            Method::ByPath,
            Locator::path(&path),
        ))
        .unwrap();
    session
        .begin_record_io(Family::Dataset, Direction::Input, RecordIoOptions::default())
        .unwrap();
    assert_eq!(
        drain(&mut session),
        vec![
            Record::Data(vec![1.0, 2.0]),
            Record::Data(vec![3.0, 4.0]),
            Record::Data(vec![5.0, 6.0]),
            Record::EndOfAllResources,
        ]
    );
    assert_eq!(session.get_record().unwrap(), Record::EndOfAllResources);
    session.end_record_io(Direction::Input).unwrap();
}

#[test]
fn missing_file_is_skipped_after_its_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = Session::new("stream");
    let missing = session
        .register(ResourceRequest::input(
            Family::Dataset,
            Method::ByPath,
            Locator::path(dir.path().join("absent.txt")),
        ))
        .unwrap();
    session
        .register(ResourceRequest::input(
            Family::Dataset,
            Method::ByStream,
            Locator::reader(reader("1 2\n")),
        ))
        .unwrap();
    session
        .begin_record_io(Family::Dataset, Direction::Input, RecordIoOptions::default())
        .unwrap();

    assert!(matches!(session.get_record(), Err(BrokerError::Io(_))));
    assert_eq!(
        session.lookup(missing, Direction::Input).unwrap().status(),
        Status::Used
    );
    assert_eq!(session.get_record().unwrap(), Record::Data(vec![1.0, 2.0]));
    assert_eq!(session.get_record().unwrap(), Record::EndOfAllResources);
    session.end_record_io(Direction::Input).unwrap();
}

#[test]
fn streaming_marks_every_input_used() {
    let mut session = Session::new("stream");
    let first = session
        .register(ResourceRequest::input(
            Family::TextTable,
            Method::ByStream,
            Locator::reader(reader("alpha\n")),
        ))
        .unwrap();
    let second = session
        .register(ResourceRequest::input(
            Family::TextTable,
            Method::ByStream,
            Locator::reader(reader("beta\n")),
        ))
        .unwrap();
    let options = RecordIoOptions {
        report_boundaries: true,
        ..RecordIoOptions::default()
    };
    session
        .begin_record_io(Family::TextTable, Direction::Input, options)
        .unwrap();
    assert_eq!(
        drain(&mut session),
        vec![
            Record::Text("alpha".into()),
            Record::EndOfResource,
            Record::Text("beta".into()),
            Record::EndOfResource,
            Record::EndOfAllResources,
        ]
    );
    session.end_record_io(Direction::Input).unwrap();
    for id in [first, second] {
        assert_eq!(
            session.lookup(id, Direction::Input).unwrap().status(),
            Status::Used
        );
    }
    assert!(matches!(
        session.begin_record_io(Family::TextTable, Direction::Input, options),
        Err(BrokerError::NoResourcesRegistered { .. })
    ));
}

#[test]
fn records_build_an_in_memory_dataset() {
    let mut session = Session::new("sink");
    let id = session
        .register(ResourceRequest::output(
            Family::Dataset,
            Method::CopyInMemory,
            Locator::empty_slot(),
        ))
        .unwrap();
    session
        .begin_record_io(Family::Dataset, Direction::Output, RecordIoOptions::default())
        .unwrap();
    session.put_record(OutputRecord::SegmentHeader("")).unwrap();
    session.put_record(OutputRecord::DataRow(&[1.0, 2.0])).unwrap();
    session.put_record(OutputRecord::DataRow(&[3.0, 4.0])).unwrap();
    session.end_record_io(Direction::Output).unwrap();

    let out = session.retrieve_realized(id).unwrap();
    let dataset = out.dataset().unwrap();
    assert_eq!(dataset.n_tables(), 1);
    assert_eq!(dataset.n_segments(), 1);
    let segment = dataset.segments().next().unwrap();
    assert_eq!(segment.row(0), Some(vec![1.0, 2.0]));
    assert_eq!(segment.row(1), Some(vec![3.0, 4.0]));
    assert_eq!(
        session.lookup(id, Direction::Output).unwrap().ownership(),
        Ownership::Allocated
    );
}

#[test]
fn records_stream_to_a_writer() {
    let sink = Arc::new(Mutex::new(Vec::<u8>::new()));
    let writer: SharedWriter = sink.clone();
    let mut session = Session::new("sink");
    session
        .register(ResourceRequest::output(
            Family::TextTable,
            Method::ByStream,
            Locator::writer(writer),
        ))
        .unwrap();
    session
        .begin_record_io(Family::TextTable, Direction::Output, RecordIoOptions::default())
        .unwrap();
    session.put_record(OutputRecord::TableHeader("log")).unwrap();
    session.put_record(OutputRecord::TextRow("started")).unwrap();
    session.end_record_io(Direction::Output).unwrap();
    assert_eq!(String::from_utf8(sink.lock().clone()).unwrap(), "# log\nstarted\n");
}

// ─────────────────────────────────────────────────────────────────────────
// Modules, virtual locators and collection
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn modules_reach_host_containers_through_virtual_names() {
    let mut session = Session::new("host");
    let input = table(&[[1.0, 2.0], [3.0, 4.0]]);
    let (_, in_name) = session
        .open_virtual_input(Family::Dataset, Geometry::None, &input)
        .unwrap();
    let (out_id, out_name) = session
        .open_virtual_output(Family::Dataset, Geometry::None)
        .unwrap();

    let swap_columns = |session: &mut Session| -> Result<()> {
        let id = session.register(ResourceRequest::input(
            Family::Dataset,
            Method::ByPath,
            Locator::path(&in_name),
        ))?;
        let data = session.import(Family::Dataset, id, IoMode::ALL)?;
        let swapped = session.duplicate(&data)?;
        if let Some(mut dataset) = swapped.dataset_mut() {
            dataset.tables[0].segments[0].columns.swap(0, 1);
        }
        let out = session.register(ResourceRequest::output(
            Family::Dataset,
            Method::ByPath,
            Locator::path(&out_name),
        ))?;
        session.export(Family::Dataset, out, IoMode::ALL, &swapped)
    };
    session.run_module(&swap_columns).unwrap();

    let result = session.retrieve_realized(out_id).unwrap();
    let row = result.dataset().unwrap().segments().next().unwrap().row(0);
    assert_eq!(row, Some(vec![2.0, 1.0]));
    let original = input.dataset().unwrap().segments().next().unwrap().row(0);
    assert_eq!(original, Some(vec![1.0, 2.0]));
}

#[test]
fn shared_container_is_freed_once() {
    let mut session = Session::new("alias");
    let out = session
        .register(ResourceRequest::output(
            Family::Dataset,
            Method::CopyInMemory,
            Locator::empty_slot(),
        ))
        .unwrap();
    session
        .export(Family::Dataset, out, IoMode::ALL, &table(&[[1.0, 1.0]]))
        .unwrap();
    let realized = session.retrieve_realized(out).unwrap();

    let input = session
        .register(ResourceRequest::input(
            Family::Dataset,
            Method::ReferenceInMemory,
            Locator::memory(&realized),
        ))
        .unwrap();
    let imported = session.import(Family::Dataset, input, IoMode::ALL).unwrap();
    assert!(imported.same_as(&realized));

    let stats = session.destroy().unwrap();
    assert_eq!(stats.frees, 1);
}

#[test]
fn references_are_never_freed() {
    let mut session = Session::new("owner");
    let host = table(&[[5.0, 6.0]]);
    let id = session
        .register(ResourceRequest::input(
            Family::Dataset,
            Method::ReferenceInMemory,
            Locator::memory(&host),
        ))
        .unwrap();
    session.import(Family::Dataset, id, IoMode::ALL).unwrap();
    assert!(matches!(
        session.destroy_container(host.addr()),
        Err(BrokerError::MemoryModeError { .. })
    ));
    let stats = session.destroy().unwrap();
    assert_eq!(stats.frees, 0);
    assert!(stats.refusals >= 1);
    assert_eq!(host.dataset().unwrap().n_records(), 1);
}

#[test]
fn read_only_containers_are_never_freed() {
    let mut session = Session::new("owner");
    let host = table(&[[5.0, 6.0], [7.0, 8.0]]);
    let id = session
        .register(ResourceRequest::input(
            Family::Dataset,
            Method::ReadOnlyInMemory,
            Locator::memory(&host),
        ))
        .unwrap();
    let imported = session.import(Family::Dataset, id, IoMode::ALL).unwrap();
    assert!(imported.same_as(&host));
    assert!(matches!(
        session.destroy_container(host.addr()),
        Err(BrokerError::MemoryModeError {
            ownership: Ownership::ReadOnly,
            ..
        })
    ));
    assert_eq!(session.gc_stats().frees, 0);

    let dataset = host.dataset().unwrap();
    assert_eq!(dataset.n_records(), 2);
    assert_eq!(dataset.segments().next().unwrap().row(1), Some(vec![7.0, 8.0]));
}

#[test]
fn unknown_container_cannot_be_destroyed() {
    let mut session = Session::new("owner");
    let stranger = table(&[[0.0, 0.0]]);
    assert!(matches!(
        session.destroy_container(stranger.addr()),
        Err(BrokerError::UnknownContainer(_))
    ));
}
