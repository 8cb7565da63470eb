use doccheck::Extraction;
use doccheck::block::{Mode, PrologLine};
use doccheck::source::Document;

fn blocks(text: &str) -> Vec<doccheck::block::Block> {
    Extraction::new(Document::from_text("doc.adoc", text)).blocks
}

#[test]
fn document_without_blocks() {
    assert!(blocks("= Title\n\nJust prose.\n").is_empty());
}

#[test]
fn block_records_code_and_start_line() {
    let b = blocks("intro\n----\nlet x = 1;\nx\n----\noutro\n");
    assert_eq!(b.len(), 1);
    assert_eq!(b[0].code, vec!["let x = 1;", "x"]);
    assert_eq!(b[0].start, 2);
    assert_eq!(b[0].mode, Mode::Isolated);
}

#[test]
fn longer_fences_open_and_close() {
    let b = blocks("------\na\n-----\n");
    assert_eq!(b.len(), 1);
    assert_eq!(b[0].code, vec!["a"]);
}

#[test]
fn mode_directives() {
    let b = blocks(
        "// test:off\n----\na\n----\n// testcode:lint\n----\nb\n----\n// test:ctx\n----\nc\n----\n----\nd\n----\n",
    );
    assert_eq!(b[0].mode, Mode::Off);
    assert_eq!(b[1].mode, Mode::Lint);
    assert_eq!(b[2].mode, Mode::Shared("ctx".into()));
    assert_eq!(b[3].mode, Mode::Isolated);
}

#[test]
fn name_directive_selects_shared_context() {
    let b = blocks("// test=shop\n----\na\n----\n");
    assert_eq!(b[0].mode, Mode::Shared("shop".into()));
}

#[test]
fn off_wins_over_name() {
    let b = blocks("// test=shop\n// test:off\n----\na\n----\n");
    assert_eq!(b[0].mode, Mode::Off);
}

#[test]
fn later_mode_overwrites_earlier() {
    let b = blocks("// test:off\n// test:\n----\na\n----\n");
    assert_eq!(b[0].mode, Mode::Isolated);
}

#[test]
fn prolog_lines_accumulate_and_reset() {
    let b = blocks("// test> let a = 1;\n// test> let b = 2;\n----\na + b\n----\n----\nc\n----\n");
    assert_eq!(
        b[0].prolog,
        vec![
            PrologLine {
                text: "let a = 1;".into(),
                line: 0
            },
            PrologLine {
                text: "let b = 2;".into(),
                line: 1
            },
        ]
    );
    assert_eq!(b[0].prolog_source().as_deref(), Some("let a = 1;\nlet b = 2;"));
    assert!(b[1].prolog.is_empty());
}

#[test]
fn directives_inside_a_block_are_code() {
    let b = blocks("----\n// test:off\n----\n----\nx\n----\n");
    assert_eq!(b[0].code, vec!["// test:off"]);
    assert_eq!(b[1].mode, Mode::Isolated);
}

#[test]
fn indented_directive_is_ignored() {
    let b = blocks("  // test:off\n----\nx\n----\n");
    assert_eq!(b[0].mode, Mode::Isolated);
}

#[test]
fn trailing_directives_are_dropped() {
    let b = blocks("----\nx\n----\n// test:off\n");
    assert_eq!(b.len(), 1);
    assert_eq!(b[0].mode, Mode::Isolated);
}

#[test]
fn unterminated_block_is_dropped() {
    let b = blocks("----\nx\n----\n----\ny\n");
    assert_eq!(b.len(), 1);
}
