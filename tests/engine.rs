use chrono::NaiveDate;
use sas_reader_step::{
    catalog::Catalog,
    convert::{convert, convert_cell},
    data::{OutputValue, RawValue, Row},
    error::EngineError,
    projector::{ProjectorState, RowProjector},
    sampler::{SamplingOptions, infer_types},
    schema::{FieldMapping, OutputKind, SourceColumn, SourceKind},
    source::{MemorySource, TabularSource},
};

fn id_and_name(rows: Vec<Row>) -> MemorySource {
    MemorySource::new(
        vec![
            SourceColumn::numeric(1, "ID"),
            SourceColumn::character(2, "NAME", 5),
        ],
        rows,
    )
}

fn alice() -> Row {
    vec![
        Some(RawValue::Long(42)),
        Some(RawValue::String("Alice".to_string())),
    ]
}

#[test]
fn resolve_sample_and_stream_a_single_row() {
    let mut mappings = vec![
        FieldMapping::new("id", SourceKind::Numeric),
        FieldMapping::new("missing", SourceKind::Numeric).optional(),
    ];

    let mut sampling_source = id_and_name(vec![alice()]);
    let catalog = Catalog::from_source(&sampling_source);
    assert_eq!(catalog.resolve_all(&mut mappings), vec![1, 0]);
    assert_eq!(mappings[0].resolved_id, Some(1));
    assert_eq!(mappings[1].resolved_id, None);

    let report = infer_types(&mut mappings, &mut sampling_source, SamplingOptions::default());
    assert_eq!(report.rows_sampled(), 1);
    assert_eq!(mappings[0].output_kind, OutputKind::Integer);
    assert_eq!(report.undetermined(), ["missing".to_string()]);
    drop(sampling_source);

    let mut untyped = RowProjector::new(id_and_name(vec![alice()]), mappings.clone());
    let err = untyped.next_row().unwrap_err();
    assert!(matches!(err, EngineError::UndeterminedType { ref name } if name == "missing"));

    mappings[1].output_kind = OutputKind::Number;
    let mut projector = RowProjector::new(id_and_name(vec![alice()]), mappings);
    let rows: Vec<_> = projector.by_ref().collect::<Result<_, _>>().unwrap();
    assert_eq!(rows, vec![vec![Some(OutputValue::Integer(42))]]);
    assert_eq!(projector.state(), ProjectorState::Done);
    assert!(!projector.ended_abnormally());
}

#[test]
fn short_rows_keep_later_fields_on_their_own_slots() {
    let source = MemorySource::new(
        vec![
            SourceColumn::numeric(1, "A"),
            SourceColumn::numeric(2, "B"),
            SourceColumn::numeric(3, "C"),
        ],
        vec![
            vec![
                Some(RawValue::Long(1)),
                Some(RawValue::Long(2)),
                Some(RawValue::Long(3)),
            ],
            vec![Some(RawValue::Long(4))],
        ],
    );
    let mappings = vec![
        FieldMapping::new("C", SourceKind::Numeric).with_output(OutputKind::Integer),
        FieldMapping::new("A", SourceKind::Numeric).with_output(OutputKind::Integer),
    ];
    let mut projector = RowProjector::new(source, mappings);
    let rows: Vec<_> = projector.projected().collect::<Result<_, _>>().unwrap();

    assert_eq!(rows[0].slots, [0, 1]);
    assert_eq!(
        rows[0].values,
        [Some(OutputValue::Integer(3)), Some(OutputValue::Integer(1))]
    );
    assert_eq!(rows[1].slots, [1]);
    assert_eq!(rows[1].values, [Some(OutputValue::Integer(4))]);
    assert_eq!(rows[1].spread(2), [None, Some(&OutputValue::Integer(4))]);
    assert!(!projector.ended_abnormally());
}

#[test]
fn floats_declared_as_dates_become_epoch_timestamps() {
    let one_day = NaiveDate::from_ymd_opt(1970, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    assert_eq!(
        convert(&RawValue::Double(86_400_000.0), OutputKind::Date),
        Ok(Some(OutputValue::Date(one_day)))
    );

    let source = MemorySource::new(
        vec![SourceColumn::numeric(1, "WHEN")],
        vec![vec![Some(RawValue::Double(86_400_000.0))]],
    );
    let mapping = FieldMapping::new("when", SourceKind::Numeric).with_output(OutputKind::Date);
    let rows: Vec<_> = RowProjector::new(source, vec![mapping])
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(rows, vec![vec![Some(OutputValue::Date(one_day))]]);
}

#[test]
fn nulls_convert_to_null_for_every_output_kind() {
    for kind in OutputKind::ALL {
        assert_eq!(convert_cell(None, kind), Ok(None));
    }
}

#[test]
fn ambiguous_columns_are_bound_but_rejected() {
    let source = MemorySource::new(
        vec![
            SourceColumn::numeric(1, "DUP"),
            SourceColumn::numeric(2, "other"),
            SourceColumn::numeric(3, "dup"),
        ],
        vec![vec![Some(RawValue::Long(1)), None, Some(RawValue::Long(3))]],
    );
    let mut mapping = FieldMapping::new("Dup", SourceKind::Numeric)
        .with_output(OutputKind::Integer)
        .optional();
    assert_eq!(Catalog::from_source(&source).resolve(&mut mapping), 2);
    assert_eq!(mapping.resolved_id, Some(3));

    let mut projector = RowProjector::new(source, vec![mapping]);
    let err = projector.next_row().unwrap_err();
    assert!(matches!(
        err,
        EngineError::DuplicateColumn { ref name, count: 2 } if name == "Dup"
    ));
    assert_eq!(projector.state(), ProjectorState::Done);
}

#[test]
fn unparsable_text_is_null_and_streaming_continues() {
    let source = MemorySource::new(
        vec![SourceColumn::character(1, "AMOUNT", 8)],
        vec![
            vec![Some(RawValue::String("n/a".into()))],
            vec![Some(RawValue::String("12.5".into()))],
        ],
    );
    let mapping =
        FieldMapping::new("AMOUNT", SourceKind::Character).with_output(OutputKind::Number);
    let rows: Vec<_> = RowProjector::new(source, vec![mapping])
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(
        rows,
        vec![vec![None], vec![Some(OutputValue::Number(12.5))]]
    );
}

#[test]
fn read_failures_keep_earlier_rows_and_flag_the_session() {
    let rows = (1..=3)
        .map(|id| vec![Some(RawValue::Long(id)), None])
        .collect();
    let source = id_and_name(rows).failing_after(2, "disk went away");
    let mapping = FieldMapping::new("ID", SourceKind::Numeric).with_output(OutputKind::Integer);
    let mut projector = RowProjector::new(source, vec![mapping]);

    let mut emitted = Vec::new();
    let mut failure = None;
    for result in projector.by_ref() {
        match result {
            Ok(row) => emitted.push(row),
            Err(err) => failure = Some(err),
        }
    }

    assert_eq!(emitted.len(), 2);
    assert!(matches!(failure, Some(EngineError::SourceRead { row: 3, .. })));
    assert!(projector.ended_abnormally());
    assert_eq!(projector.rows_read(), 2);
    assert_eq!(projector.source().delivered(), 2);
    assert_eq!(projector.source().row_count(), 3);
}

#[test]
fn corrupted_cells_name_the_field_and_position() {
    let source = id_and_name(vec![vec![
        Some(RawValue::Long(1)),
        Some(RawValue::Bytes(vec![0xff])),
    ]]);
    let mappings = vec![
        FieldMapping::new("ID", SourceKind::Numeric).with_output(OutputKind::Integer),
        FieldMapping::new("NAME", SourceKind::Character)
            .renamed("name")
            .with_output(OutputKind::String),
    ];
    let err = RowProjector::new(source, mappings)
        .next()
        .expect("one result")
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "converting attribute 'NAME' - 2(bytes) -> 'name'(String) failed at source row 1"
    );
}
