use flatcell::{
    compose_to_string, parse_reader, parse_str, record, Alignment, CellType, CellValue,
    ComposeConfig, Composer, Error, ErrorPolicy, Line, Occurs, ParseConfig, Parser, QuoteBehavior,
    QuoteSyntax, Schema, SchemaCell, SchemaLine, ValidationAction,
};
use std::io::Cursor;
use std::sync::Arc;
use std::thread;

fn strings(line: &Line) -> Vec<&str> {
    line.iter().map(|c| c.value().as_str().unwrap_or("")).collect()
}

fn unnamed_cells(n: usize) -> Vec<SchemaCell> {
    (0..n).map(|_| SchemaCell::unnamed()).collect()
}

#[test]
fn test_scenario_a_plain_delimited() {
    let schema = Schema::delimited(";")
        .line(SchemaLine::new("Person").cells_from(unnamed_cells(5)))
        .build()
        .unwrap();

    let lines = parse_str(&schema, "Jonas;Stenberg;Hemvägen 19;111 22;Stockholm").unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].number(), Some(1));
    assert_eq!(
        strings(&lines[0]),
        vec!["Jonas", "Stenberg", "Hemvägen 19", "111 22", "Stockholm"]
    );
}

#[test]
fn test_scenario_b_quoted_separator() {
    let schema = Schema::delimited(";")
        .quote_char('"')
        .line(SchemaLine::new("Person").cells_from(unnamed_cells(4)))
        .build()
        .unwrap();

    let lines = parse_str(&schema, "Jonas;Stenberg;\"Hemvägen ;19\";111 22").unwrap();
    assert_eq!(strings(&lines[0])[2], "Hemvägen ;19");
}

#[test]
fn test_scenario_c_fixed_width() {
    let schema = Schema::fixed()
        .line(
            SchemaLine::new("Person")
                .cell(SchemaCell::new("First name").width(5))
                .cell(SchemaCell::new("Last name").width(8))
                .cell(SchemaCell::new("Street").width(14))
                .cell(SchemaCell::new("Zip").width(6))
                .cell(SchemaCell::new("City").width(8)),
        )
        .build()
        .unwrap();

    let lines = parse_str(&schema, "JonasStenbergSpiselvägen 19141 59Huddinge").unwrap();
    assert_eq!(
        strings(&lines[0]),
        vec!["Jonas", "Stenberg", "Spiselvägen 19", "141 59", "Huddinge"]
    );
}

#[test]
fn test_scenario_d_compose_with_default() {
    let schema = Schema::delimited(";")
        .line(
            SchemaLine::new("Person")
                .cell(SchemaCell::new("First name"))
                .cell(SchemaCell::new("Last name").default_value("Svensson")),
        )
        .build()
        .unwrap();

    let out = compose_to_string(&schema, vec![record!("Person", { "First name" => "Jonas" })]).unwrap();
    assert_eq!(out, "Jonas;Svensson");
}

#[test]
fn test_scenario_e_control_cells() {
    let schema = Schema::fixed()
        .line_separator("")
        .control_cell(1)
        .line(
            SchemaLine::new("Name")
                .control_value("N")
                .cell(SchemaCell::new("First").width(5))
                .cell(SchemaCell::new("Last").width(8)),
        )
        .line(
            SchemaLine::new("Address")
                .control_value("A")
                .cell(SchemaCell::new("Street").width(10))
                .cell(SchemaCell::new("Zip").width(6)),
        )
        .build()
        .unwrap();

    let input = "NJonasStenbergAStorgatan 123 45";
    let lines = parse_str(&schema, input).unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].line_type(), "Name");
    assert_eq!(strings(&lines[0]), vec!["Jonas", "Stenberg"]);
    assert_eq!(lines[1].line_type(), "Address");
    assert_eq!(strings(&lines[1]), vec!["Storgatan ", "123 45"]);

    // and back again, byte for byte
    assert_eq!(compose_to_string(&schema, lines).unwrap(), input);
}

#[test]
fn test_fixed_round_trip_is_byte_identical() {
    let schema = Schema::fixed()
        .line_separator("\r\n")
        .line(
            SchemaLine::new("Row")
                .cell(SchemaCell::new("name").width(8))
                .cell(SchemaCell::new("amount").width(6).alignment(Alignment::Right))
                .cell(SchemaCell::new("code").width(3).pad_char('_').alignment(Alignment::Center)),
        )
        .build()
        .unwrap();

    let input = "Jonas       42_A_\r\nÅsa     123456XY_";
    let lines = parse_str(&schema, input).unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(compose_to_string(&schema, lines).unwrap(), input);
}

#[test]
fn test_zero_padded_numbers_round_trip() {
    let schema = Schema::fixed()
        .line(
            SchemaLine::new("Row").cell(
                SchemaCell::new("n")
                    .cell_type(CellType::Integer)
                    .width(5)
                    .pad_char('0')
                    .alignment(Alignment::Right),
            ),
        )
        .build()
        .unwrap();

    let text = compose_to_string(&schema, vec![record!("Row", { "n" => 0 }), record!("Row", { "n" => 120 })])
        .unwrap();
    assert_eq!(text, "00000\n00120");

    let lines = parse_str(&schema, &text).unwrap();
    assert_eq!(lines[0].value("n"), Some(&CellValue::Integer(0)));
    assert_eq!(lines[1].value("n"), Some(&CellValue::Integer(120)));
    assert_eq!(compose_to_string(&schema, lines).unwrap(), text);
}

#[test]
fn test_typed_cell_text_never_breaks_the_line() {
    let schema = Schema::delimited(";")
        .quote_char('"')
        .line(
            SchemaLine::new("R")
                .cell(SchemaCell::new("n").cell_type(CellType::Integer))
                .cell(SchemaCell::new("y")),
        )
        .build()
        .unwrap();

    let text = compose_to_string(&schema, vec![record!("R", { "n" => "1;2", "y" => "z" })]).unwrap();
    assert_eq!(text, "\"1;2\";z");

    let config = ParseConfig::new().on_line_overflow(ValidationAction::Raise);
    let mut errors = Vec::new();
    let mut lines = Vec::new();
    Parser::with_config(&schema, text.as_bytes(), config)
        .parse_with(|l| lines.push(l), |e| errors.push(e))
        .unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].get_str("y"), Some("z"));
    // "1;2" is not an integer, but it stayed in its own cell
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].cell.as_deref(), Some("n"));
}

#[test]
fn test_clashing_locale_and_bad_date_pattern_are_rejected_at_build() {
    let result = Schema::delimited(",")
        .quote_char('"')
        .locale(flatcell::Locale::new(','))
        .line(
            SchemaLine::new("R")
                .cell(SchemaCell::new("x").cell_type(CellType::Float))
                .cell(SchemaCell::new("y")),
        )
        .build();
    assert!(matches!(result, Err(Error::Schema(_))));

    let result = Schema::delimited(";")
        .line(
            SchemaLine::new("R").cell(
                SchemaCell::new("d")
                    .cell_type(CellType::Date)
                    .pattern("%Y-%m-%d %H:%M"),
            ),
        )
        .build();
    assert!(matches!(result, Err(Error::Schema(ref m)) if m.contains("%H:%M")));
}

#[test]
fn test_delimited_round_trip_with_multiline_cells() {
    let schema = Schema::delimited(",")
        .quote_char('"')
        .line_separator("\r\n")
        .line(
            SchemaLine::new("Note")
                .cell(SchemaCell::new("id").cell_type(CellType::Integer))
                .cell(SchemaCell::new("text")),
        )
        .build()
        .unwrap();

    let input = "1,\"first\r\nsecond\"\r\n2,\"say \"\"hi\"\"\"\r\n3,plain";
    let lines = parse_str(&schema, input).unwrap();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0].get_str("text"), Some("first\r\nsecond"));
    assert_eq!(lines[1].get_str("text"), Some("say \"hi\""));
    assert_eq!(compose_to_string(&schema, lines).unwrap(), input);
}

#[test]
fn test_escape_syntax() {
    let schema = Schema::delimited(";")
        .quote_char('"')
        .quote_syntax(QuoteSyntax::Escape('\\'))
        .line(SchemaLine::new("R").cell(SchemaCell::new("a")).cell(SchemaCell::new("b")))
        .build()
        .unwrap();

    let lines = parse_str(&schema, "\"a\\\"b\";c").unwrap();
    assert_eq!(lines[0].get_str("a"), Some("a\"b"));

    let out = compose_to_string(&schema, lines).unwrap();
    assert_eq!(out, "\"a\\\"b\";c");
}

#[test]
fn test_multi_character_separators() {
    let schema = Schema::delimited("::")
        .line_separator("|~")
        .line(SchemaLine::new("R").cells_from(unnamed_cells(3)))
        .build()
        .unwrap();

    let lines = parse_str(&schema, "a:b::c::d|~e::f::g").unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(strings(&lines[0]), vec!["a:b", "c", "d"]);
    assert_eq!(strings(&lines[1]), vec!["e", "f", "g"]);
}

#[test]
fn test_typed_cells_and_locale() {
    let schema = Schema::delimited(";")
        .locale(flatcell::Locale::new(',').with_grouping(' '))
        .line(
            SchemaLine::new("Payment")
                .cell(SchemaCell::new("amount").cell_type(CellType::Decimal).pattern("0.00"))
                .cell(SchemaCell::new("paid").cell_type(CellType::Boolean).pattern("ja;nej"))
                .cell(SchemaCell::new("due").cell_type(CellType::Date).pattern("%Y%m%d")),
        )
        .build()
        .unwrap();

    let lines = parse_str(&schema, "1234,50;ja;20240131").unwrap();
    let line = &lines[0];
    assert!(matches!(line.value("amount"), Some(CellValue::Decimal(_))));
    assert_eq!(line.value("paid"), Some(&CellValue::Boolean(true)));
    assert!(matches!(line.value("due"), Some(CellValue::Date(_))));

    let out = compose_to_string(&schema, lines).unwrap();
    assert_eq!(out, "1234,50;ja;20240131");
}

#[test]
fn test_error_policy_abort_is_the_default() {
    let schema = Schema::delimited(";")
        .line(SchemaLine::new("R").cell(SchemaCell::new("n").cell_type(CellType::Integer)))
        .build()
        .unwrap();

    match parse_str(&schema, "1\nx\ny") {
        Err(Error::Validation(err)) => {
            assert_eq!(err.line, 2);
            assert_eq!(err.value.as_deref(), Some("x"));
        }
        other => panic!("expected a validation error, got {:?}", other),
    }
}

#[test]
fn test_error_consumer_collects_and_continues() {
    let schema = Schema::delimited(";")
        .line(
            SchemaLine::new("R")
                .cell(SchemaCell::new("id").mandatory())
                .cell(SchemaCell::new("n").cell_type(CellType::Integer)),
        )
        .build()
        .unwrap();

    let mut lines = Vec::new();
    let mut errors = Vec::new();
    let count = Parser::new(&schema, "a;1\n;2\nb;x\nc;3".as_bytes())
        .parse_with(|l| lines.push(l), |e| errors.push(e))
        .unwrap();

    assert_eq!(count, 4);
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].line, 2);
    assert_eq!(errors[0].cell.as_deref(), Some("id"));
    assert_eq!(errors[1].line, 3);
    assert_eq!(errors[1].cell.as_deref(), Some("n"));
}

#[test]
fn test_bounded_error_policy() {
    let schema = Schema::delimited(";")
        .line(SchemaLine::new("R").cell(SchemaCell::new("n").cell_type(CellType::Integer)))
        .build()
        .unwrap();

    let config = ParseConfig::new().with_error_policy(ErrorPolicy::CollectUpTo(2));
    let mut seen = 0;
    let result = Parser::with_config(&schema, "a\nb\n1\nc\nd".as_bytes(), config)
        .parse_with(|_| {}, |_| seen += 1);

    match result {
        Err(Error::TooManyErrors(all)) => {
            assert_eq!(all.len(), 3);
            assert_eq!(all.iter().map(|e| e.line).collect::<Vec<_>>(), vec![1, 2, 4]);
        }
        other => panic!("expected TooManyErrors, got {:?}", other),
    }
    assert_eq!(seen, 3);
}

#[test]
fn test_raise_overrides_collecting() {
    let schema = Schema::delimited(";")
        .line(SchemaLine::new("R").cell(SchemaCell::new("a")))
        .build()
        .unwrap();

    let config = ParseConfig::new()
        .with_error_policy(ErrorPolicy::Collect)
        .on_line_overflow(ValidationAction::Raise);
    let result: flatcell::Result<Vec<Line>> =
        Parser::with_config(&schema, "a\nb;c".as_bytes(), config).collect();
    assert!(matches!(result, Err(Error::Validation(ref e)) if e.line == 2));
}

#[test]
fn test_empty_line_handling() {
    let ignoring = Schema::delimited(";")
        .line(SchemaLine::new("R").cell(SchemaCell::new("a")))
        .build()
        .unwrap();
    let lines = parse_str(&ignoring, "x\n\ny").unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1].number(), Some(3));

    let keeping = Schema::delimited(";")
        .line(SchemaLine::new("R").ignore_empty_lines(false).cell(SchemaCell::new("a")))
        .build()
        .unwrap();
    let lines = parse_str(&keeping, "x\n\ny").unwrap();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].is_empty());
    assert_eq!(lines[1].number(), Some(2));
}

#[test]
fn test_occurs_sections() {
    let schema = Schema::delimited(";")
        .line(
            SchemaLine::new("Header")
                .occurs(Occurs::Exactly(1))
                .cell(SchemaCell::new("title")),
        )
        .line(
            SchemaLine::new("Item")
                .cell(SchemaCell::new("name"))
                .cell(SchemaCell::new("qty").cell_type(CellType::Integer)),
        )
        .build()
        .unwrap();

    let lines = parse_str(&schema, "Order 42\nscrew;10\nnut;20").unwrap();
    let types: Vec<_> = lines.iter().map(Line::line_type).collect();
    assert_eq!(types, vec!["Header", "Item", "Item"]);
    assert_eq!(lines[2].value("qty"), Some(&CellValue::Integer(20)));
}

#[test]
fn test_undefined_control_value() {
    let schema = Schema::delimited(";")
        .control_cell(0)
        .line(SchemaLine::new("Name").control_value("N").cell(SchemaCell::new("name")))
        .build()
        .unwrap();

    let result = parse_str(&schema, "N;Jonas\nX;what\nN;Anna");
    assert!(matches!(
        result,
        Err(Error::UndefinedLineType { line: 2, control_value: Some(ref v) }) if v == "X"
    ));

    let config = ParseConfig::new().on_undefined_line_type(ValidationAction::Ignore);
    let lines: Vec<Line> = Parser::with_config(&schema, "N;Jonas\nX;what\nN;Anna".as_bytes(), config)
        .collect::<flatcell::Result<_>>()
        .unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1].get_str("name"), Some("Anna"));
}

#[test]
fn test_header_line_round_trip() {
    let schema = Schema::delimited(",")
        .quote_char('"')
        .line(
            SchemaLine::new("Row")
                .first_line_as_header()
                .cell(SchemaCell::new("id").cell_type(CellType::Integer))
                .cell(SchemaCell::new("name")),
        )
        .build()
        .unwrap();

    let lines = parse_reader(&schema, Cursor::new(b"\xEF\xBB\xBFid,name\n1,Jonas\n2,\"Anna, Maria\"".to_vec())).unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].value("id"), Some(&CellValue::Integer(1)));
    assert_eq!(lines[1].get_str("name"), Some("Anna, Maria"));

    let out = compose_to_string(&schema, lines).unwrap();
    assert_eq!(out, "id,name\n1,Jonas\n2,\"Anna, Maria\"");
}

#[test]
fn test_quote_behaviors_on_compose() {
    let schema = Schema::delimited(";")
        .quote_char('"')
        .replacement("_")
        .line(
            SchemaLine::new("R")
                .cell(SchemaCell::new("auto"))
                .cell(SchemaCell::new("always").quote(QuoteBehavior::Always))
                .cell(SchemaCell::new("never").quote(QuoteBehavior::Never).max_length(3))
                .cell(SchemaCell::new("replace").quote(QuoteBehavior::Replace)),
        )
        .build()
        .unwrap();

    let line = record!("R", {
        "auto" => "a;b",
        "always" => "x",
        "never" => "abcdef",
        "replace" => "c;d",
    });
    let out = compose_to_string(&schema, vec![line]).unwrap();
    assert_eq!(out, "\"a;b\";\"x\";abc;c_d");
}

#[test]
fn test_composer_streams_to_writer() {
    let schema = Schema::delimited(",")
        .line(SchemaLine::new("R").cell(SchemaCell::new("n").cell_type(CellType::Integer)))
        .build()
        .unwrap();

    let config = ComposeConfig::new().with_trailing_line_separator(true);
    let mut composer = Composer::with_config(&schema, Vec::new(), config);
    for n in 0..3 {
        composer.compose_line(&record!("R", { "n" => n })).unwrap();
    }
    assert_eq!(composer.lines_written(), 3);
    assert_eq!(composer.finish().unwrap(), b"0\n1\n2\n");
}

#[test]
fn test_line_too_long() {
    let schema = Schema::delimited(";")
        .line_separator("\r\n")
        .line(SchemaLine::new("R").cell(SchemaCell::new("a")))
        .build()
        .unwrap();

    let input = "x".repeat(200);
    let config = ParseConfig::new().with_max_line_length(50).with_read_buffer_size(16);
    let result: flatcell::Result<Vec<Line>> =
        Parser::with_config(&schema, input.as_bytes(), config).collect();
    match result {
        Err(e @ Error::LineTooLong { .. }) => assert!(e.to_string().contains("line separator")),
        other => panic!("expected LineTooLong, got {:?}", other),
    }
}

#[test]
fn test_invalid_utf8_is_fatal() {
    let schema = Schema::delimited(";")
        .line(SchemaLine::new("R").cell(SchemaCell::new("a")))
        .build()
        .unwrap();
    let result = parse_reader(&schema, Cursor::new(vec![b'o', b'k', b'\n', 0xff, b'\n']));
    assert!(matches!(result, Err(Error::Encoding { offset: 3 })));
}

#[test]
fn test_shared_schema_across_threads() {
    let schema = Arc::new(
        Schema::delimited(";")
            .line(
                SchemaLine::new("R")
                    .cell(SchemaCell::new("worker").cell_type(CellType::Integer))
                    .cell(SchemaCell::new("n").cell_type(CellType::Integer)),
            )
            .build()
            .unwrap(),
    );

    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let schema = Arc::clone(&schema);
            thread::spawn(move || {
                let input: String = (0..100)
                    .map(|n| format!("{};{}", worker, n))
                    .collect::<Vec<_>>()
                    .join("\n");
                let lines = parse_str(&schema, &input).unwrap();
                let out = compose_to_string(&schema, lines.clone()).unwrap();
                assert_eq!(out, input);
                lines.len()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 100);
    }
}
