use std::fs;

use doccheck::source::Document;
use sandbox::config::{Config, ValueStrategy};
use sandbox::lint::StrictLinter;
use sandbox::{CheckError, DocumentReport, FailureKind, Overrides, check, check_document};

fn quiet() -> Config {
    let mut config = Config::default();
    config.lint.enabled = false;
    config
}

fn run(text: &str) -> DocumentReport {
    check(Document::from_text("doc.adoc", text), &quiet(), &StrictLinter::new())
}

fn run_linted(text: &str) -> DocumentReport {
    check(
        Document::from_text("doc.adoc", text),
        &Config::default(),
        &StrictLinter::new(),
    )
}

#[test]
fn empty_document() {
    let report = run("= Title\n\nNo code here.\n");
    assert_eq!(report.blocks, 0);
    assert_eq!(report.blocks_ran, 0);
    assert_eq!(report.assertions, 0);
    assert!(report.is_clean());
    assert_eq!(
        report.summary(),
        "doc.adoc: 0 code blocks and 0 assertions passed."
    );
}

#[test]
fn passing_arrow_assertion() {
    let report = run("----\n1 + 1 // => 2\n----\n");
    assert!(report.is_clean(), "{:?}", report.failures);
    assert_eq!(report.blocks_ran, 1);
    assert_eq!(report.assertions, 1);
}

#[test]
fn failing_arrow_assertion_reports_values() {
    let report = run("----\n1 + 1 // => 3\n----\n");
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.blocks_ran, 0);

    let failure = &report.failures[0];
    assert_eq!(failure.kind, FailureKind::Run);
    let assertion = failure.assertion.as_ref().unwrap();
    assert_eq!(assertion.actual, "2");
    assert_eq!(assertion.expected, "3");
    assert_eq!(assertion.label, "1 + 1 // => 3");

    let located = report.located_failures();
    assert_eq!(located[0].location.to_string(), "doc.adoc:2");
    assert_eq!(
        located[0].to_string(),
        "assertion failed: expected 2 to equal 3 at doc.adoc:2\n    actual:   2\n    expected: 3\n    source:   1 + 1 // => 3"
    );
}

#[test]
fn equality_is_strict() {
    let report = run("----\n2 // => 2.0\n----\n");
    assert_eq!(report.failures.len(), 1);
}

#[test]
fn object_literal_values_keep_their_colons() {
    let report = run("----\nlet o = #{a: 1};\no // => #{a: 1}\no // => #{a: 1}: an object\n----\n");
    assert!(report.is_clean(), "{:?}", report.failures);
    assert_eq!(report.assertions, 2);
}

#[test]
fn arrow_commentary_after_semicolon() {
    let report = run("----\n[1, 2].len() // => 2; two items\n----\n");
    assert!(report.is_clean(), "{:?}", report.failures);
}

#[test]
fn named_equality_assertion() {
    let report = run("----\nlet total = 2 + 3 // total == 5; the sum\n----\n");
    assert!(report.is_clean(), "{:?}", report.failures);
    assert_eq!(report.assertions, 1);
}

#[test]
fn named_equality_after_a_closing_brace() {
    let report = run(concat!(
        "----\n",
        "let m = #{a: 1}  // m.a == 1\n",
        "let t = 0;\n",
        "if true { t = 1; }  // t == 1\n",
        "----\n",
    ));
    assert!(report.is_clean(), "{:?}", report.failures);
    assert_eq!(report.assertions, 2);
}

#[test]
fn throws_assertion() {
    let report = run("----\n1 / 0 // !division by zero\n----\n");
    assert!(report.is_clean(), "{:?}", report.failures);
    assert_eq!(report.assertions, 1);
}

#[test]
fn throws_assertion_without_error_fails_once() {
    let report = run("----\n1 + 1 // !should have thrown\n----\n");
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].is_assertion());
    assert_eq!(report.assertions, 0);
}

#[test]
fn shared_contexts_see_earlier_blocks() {
    let report = run(concat!(
        "// test=ctx\n",
        "----\n",
        "let x = 1;\n",
        "fn double(n) { n * 2 }\n",
        "----\n",
        "// test=ctx\n",
        "----\n",
        "x // => 1\n",
        "double(x) // => 2\n",
        "----\n",
        "----\n",
        "x\n",
        "----\n",
    ));
    assert_eq!(report.blocks_ran, 2);
    assert_eq!(report.assertions, 2);
    assert_eq!(report.failures.len(), 1);

    let failure = &report.failures[0];
    assert_eq!(failure.kind, FailureKind::Run);
    assert!(failure.message.contains('x'), "{}", failure.message);
    assert_eq!(failure.line, 11);
}

#[test]
fn legacy_mode_token_names_a_context() {
    let report = run("// testcode:ctx\n----\nlet y = 4;\n----\n// test:ctx\n----\ny // => 4\n----\n");
    assert!(report.is_clean(), "{:?}", report.failures);
    assert_eq!(report.assertions, 1);
}

#[test]
fn different_contexts_are_isolated() {
    let report = run("// test=a\n----\nlet z = 1;\n----\n// test=b\n----\nz\n----\n");
    assert_eq!(report.failures.len(), 1);
}

#[test]
fn off_blocks_never_run() {
    let report = run("// test:off\n----\nthis is not code\n1 // => 2\n----\n");
    assert!(report.is_clean());
    assert_eq!(report.blocks_ran, 0);
    assert_eq!(report.advisories.len(), 1);

    let advisories = report.located_advisories();
    assert_eq!(advisories[0].location.line, 4);
}

#[test]
fn compile_error_does_not_stop_later_blocks() {
    let report = run("----\nlet = ;\n----\n----\n1 // => 1\n----\n");
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].kind, FailureKind::Compile);
    assert_eq!(report.failures[0].line, 1);
    assert_eq!(report.blocks_ran, 1);
    assert_eq!(report.assertions, 1);
}

#[test]
fn passed_assertions_stand_after_a_failure() {
    let report = run("----\n1 // => 1\n2 // => 3\n3 // => 3\n----\n");
    assert_eq!(report.assertions, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].line, 2);
}

#[test]
fn prolog_runs_before_the_block() {
    let report = run("// test> let base = 10;\n----\nbase + 1 // => 11\n----\n");
    assert!(report.is_clean(), "{:?}", report.failures);
}

#[test]
fn prolog_failure_points_at_its_directive() {
    let report = run("text\n// test> throw \"boom\";\n----\n1 // => 1\n----\n");
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].line, 1);
    assert!(report.failures[0].message.contains("boom"));
    assert_eq!(report.assertions, 0);
}

#[test]
fn runaway_block_times_out() {
    let mut config = quiet();
    config.timeout_ms = 100;
    let report = check(
        Document::from_text("doc.adoc", "----\nlet i = 0;\nloop { i += 1; }\n----\n----\n1 // => 1\n----\n"),
        &config,
        &StrictLinter::new(),
    );
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].message, "execution timed out after 100 ms");
    assert_eq!(report.blocks_ran, 1);
}

#[test]
fn host_url_utilities() {
    let report = run(concat!(
        "----\n",
        "let u = url_parse(\"https://example.com/a?b=1\");\n",
        "u.host // => \"example.com\"\n",
        "u.query // => \"b=1\"\n",
        "url_join(\"https://example.com/a/\", \"c\") // => \"https://example.com/a/c\"\n",
        "----\n",
    ));
    assert!(report.is_clean(), "{:?}", report.failures);
    assert_eq!(report.assertions, 3);
}

#[test]
fn errors_inside_functions_carry_frames() {
    let report = run("----\nfn explode() { throw \"bang\"; }\nexplode();\n----\n");
    assert_eq!(report.failures.len(), 1);
    let failure = &report.failures[0];
    assert_eq!(failure.line, 2);
    assert_eq!(failure.context, vec!["in call to 'explode'".to_string()]);
}

#[test]
fn lint_mode_is_linted_not_run() {
    let report = run_linted("// test:lint\n----\nlet a = missing;\n----\n");
    assert_eq!(report.blocks_ran, 0);
    assert!(report.failures.is_empty());
    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.findings[0].finding.rule, "undefined-variable");
    assert_eq!(report.located_findings()[0].location.line, 3);
}

#[test]
fn lint_knows_the_prelude_and_shared_variables() {
    let report = run_linted(concat!(
        "// test=ctx\n",
        "----\n",
        "let x = 1;\n",
        "exports.x = x;\n",
        "----\n",
        "// test=ctx\n",
        "----\n",
        "x // => 1\n",
        "----\n",
    ));
    assert!(report.findings.is_empty(), "{:?}", report.findings);
    assert!(report.is_clean());
}

#[test]
fn lint_findings_count_as_errors() {
    let report = run_linted("----\nlet a = 1;\n----\n// test:lint\n----\nb\n----\n");
    assert_eq!(report.error_count(), 1);
}

#[test]
fn failing_assertion_in_included_file_is_located_there() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("chapters")).unwrap();
    fs::write(
        dir.path().join("book.adoc"),
        "= Book\n\ninclude::chapters/one.adoc[]\n\n----\n1 // => 1\n----\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("chapters/one.adoc"),
        "== One\n----\nlet y = 2;\ny // => 3\n----\n",
    )
    .unwrap();

    let report = check_document(dir.path().join("book.adoc"), &Overrides::default()).unwrap();
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.blocks_ran, 1);

    let located = report.located_failures();
    assert!(located[0].location.path.ends_with("chapters/one.adoc"));
    assert_eq!(located[0].location.line, 4);
}

#[test]
fn config_is_found_in_ancestor_directories() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("docs")).unwrap();
    fs::write(
        dir.path().join("doccheck.toml"),
        "timeout_ms = 250\n\n[lint]\nenabled = false\nglobals = [\"fixture\"]\n",
    )
    .unwrap();

    let config = Config::resolve(&dir.path().join("docs")).unwrap();
    assert_eq!(config.timeout_ms, 250);
    assert!(!config.lint.enabled);
    assert!(config.lint_config().readonly.contains("fixture"));
    assert!(config.lint_config().readonly.contains("assert"));
}

#[test]
fn malformed_config_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("doccheck.toml"), "timeout_ms = \"soon\"\n").unwrap();
    fs::write(dir.path().join("doc.adoc"), "----\n1\n----\n").unwrap();

    let err = check_document(dir.path().join("doc.adoc"), &Overrides::default()).unwrap_err();
    assert!(matches!(err, CheckError::Config { .. }));
}

#[test]
fn missing_include_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("doc.adoc"), "include::nope.adoc[]\n").unwrap();

    let err = check_document(dir.path().join("doc.adoc"), &Overrides::default()).unwrap_err();
    assert!(matches!(err, CheckError::Load(_)));
}

#[test]
fn overrides_win_over_config() {
    let mut config = Config::default();
    config.apply(&Overrides {
        timeout: Some(std::time::Duration::from_millis(42)),
        lint: Some(false),
    });
    assert_eq!(config.timeout_ms, 42);
    assert!(!config.lint.enabled);
}

fn module_fixture() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("util.rhai"), "fn twice(x) { x * 2 }\n").unwrap();
    fs::write(
        dir.path().join("doc.adoc"),
        concat!(
            "// test=ctx\n",
            "----\n",
            "import \"util\" as util;\n",
            "util::twice(2) // => 4\n",
            "----\n",
            "// test=ctx\n",
            "----\n",
            "util::twice(3) // => 6\n",
            "----\n",
        ),
    )
    .unwrap();
    dir
}

#[test]
fn imported_modules_stay_available_in_a_shared_context() {
    let dir = module_fixture();
    let report = check_document(dir.path().join("doc.adoc"), &Overrides::default()).unwrap();
    assert!(report.is_clean(), "{:?} {:?}", report.failures, report.findings);
    assert_eq!(report.blocks_ran, 2);
    assert_eq!(report.assertions, 2);
}

#[test]
fn imported_modules_do_not_leak_into_other_blocks() {
    let dir = module_fixture();
    fs::write(
        dir.path().join("other.adoc"),
        "// test=ctx\n----\nimport \"util\" as util;\n----\n----\nutil::twice(1)\n----\n",
    )
    .unwrap();

    let overrides = Overrides {
        lint: Some(false),
        ..Overrides::default()
    };
    let report = check_document(dir.path().join("other.adoc"), &overrides).unwrap();
    assert_eq!(report.blocks_ran, 1);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].message.contains("util"), "{}", report.failures[0].message);
    assert_eq!(report.failures[0].line, 5);
}

#[test]
fn arrow_value_strategy_is_configurable() {
    let text = "----\nlet o = #{a: 1};\no // => #{a: 1}: an object\n----\n";

    let mut config = quiet();
    config.arrow_values = ValueStrategy::Heuristic;
    let report = check(Document::from_text("doc.adoc", text), &config, &StrictLinter::new());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].kind, FailureKind::Compile);

    let report = run(text);
    assert!(report.is_clean(), "{:?}", report.failures);

    let parsed = Config::from_toml("arrow_values = \"heuristic\"\n").unwrap();
    assert_eq!(parsed.arrow_values, ValueStrategy::Heuristic);
    assert_eq!(Config::default().arrow_values, ValueStrategy::Parse);
}
