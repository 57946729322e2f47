use indexmap::IndexSet;
use std::path::PathBuf;
use vjassp_emit::generate;
use vjassp_lower::lower;
use vjassp_package::load_units;
use vjassp_syntax::{ErrorManager, ErrorReporter, FileManager};

fn entry_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("testdata")
        .join(name)
        .join("main.jp")
}

fn compile(name: &str, defines: &[&str]) -> (Option<String>, ErrorManager, FileManager) {
    let entry = entry_path(name);
    let defines: IndexSet<String> = defines.iter().map(|s| s.to_string()).collect();

    let mut error_manager = ErrorManager::default();
    let mut file_manager = FileManager::default();

    let units = load_units(&mut file_manager, &error_manager, &entry, &defines)
        .expect("entry file must be readable");
    if error_manager.has_errors() {
        return (None, error_manager, file_manager);
    }

    let program = lower(
        &error_manager,
        units.into_iter().map(|unit| (unit.path, unit.ast)).collect(),
    );
    if error_manager.has_errors() {
        return (None, error_manager, file_manager);
    }

    let output = generate(&error_manager, &program);
    if error_manager.has_errors() {
        return (None, error_manager, file_manager);
    }

    (Some(output), error_manager, file_manager)
}

/// Every line inside a `function` body must start with a target-dialect
/// statement keyword; bare calls and naked assignments are not allowed to
/// leak through.
fn assert_function_lines_prefixed(output: &str) {
    const STATEMENT_KEYWORDS: &[&str] = &[
        "local", "set", "call", "loop", "endloop", "exitwhen", "if", "elseif", "else", "endif",
        "return",
    ];

    let mut in_function = false;
    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "endfunction" {
            in_function = false;
            continue;
        }
        if line.contains("function ") && line.contains(" takes ") {
            in_function = true;
            continue;
        }
        if in_function {
            let first = line.split_whitespace().next().unwrap();
            assert!(
                STATEMENT_KEYWORDS.contains(&first),
                "line inside a function body is missing its statement keyword: {line:?}"
            );
        }
    }
}

#[test]
fn counter_library_compiles_with_wrapped_init() {
    let (output, _, _) = compile("counter", &[]);
    let output = output.expect("compilation must succeed");

    let lines: Vec<&str> = output.lines().map(str::trim).collect();
    assert_eq!(lines[0], "library Counter initializer onInit");
    assert!(lines.iter().any(|l| l.starts_with("private function VJPI")));
    assert!(lines.contains(&"local integer i = 1"));
    assert!(lines.contains(&"exitwhen i > 10"));
    assert!(lines.contains(&"set i = i + 1"));
    assert!(lines.contains(&"private function onInit takes nothing returns nothing"));
    assert_function_lines_prefixed(&output);
}

#[test]
fn tick_example_is_deterministic() {
    let (first, _, _) = compile("ticks", &[]);
    let first = first.expect("compilation must succeed");
    let (second, _, _) = compile("ticks", &[]);
    let second = second.expect("compilation must succeed");

    assert_eq!(first, second, "identical input must reproduce identical output");

    assert!(first.contains("library Ticks initializer onInit"));
    assert!(first.contains("integer tickCount = 0"));
    assert!(first.contains("private constant integer period = 32"));
    assert!(first.contains("function TickNow takes nothing returns integer"));
    assert!(first.contains("call TimerStart(CreateTimer(), 1.0 / period, true, function Advance)"));

    // the anonymous content block gets a stable synthetic scope name
    let scope_line = first
        .lines()
        .find(|l| l.starts_with("scope VJPS"))
        .expect("anonymous scope must be emitted");
    assert!(scope_line.ends_with("initializer onInit"));
    assert_function_lines_prefixed(&first);
}

#[test]
fn duplicate_imports_collapse_to_one_unit() {
    let (output, _, _) = compile("dedup", &[]);
    let output = output.expect("compilation must succeed");

    let util_count = output
        .lines()
        .filter(|l| l.starts_with("library Util"))
        .count();
    assert_eq!(util_count, 1, "the unit must be inlined exactly once");

    // dependencies precede their importer
    let util_at = output.find("library Util").unwrap();
    let content_at = output.find("scope VJPS").unwrap();
    assert!(util_at < content_at);
}

#[test]
fn interleaved_locals_are_hoisted_to_the_top() {
    let (output, _, _) = compile("hoist", &[]);
    let output = output.expect("compilation must succeed");

    let lines: Vec<&str> = output.lines().map(str::trim).collect();
    let header = lines
        .iter()
        .position(|l| l.starts_with("private function Work"))
        .unwrap();
    assert_eq!(lines[header + 1], "local integer a = seed");
    assert_eq!(lines[header + 2], "local integer b");
    assert_eq!(lines[header + 3], "local integer c");
    assert_eq!(lines[header + 4], "set a = a + 1");
    assert_eq!(lines[header + 5], "set b = a * 2");
    assert_eq!(lines[header + 6], "set b = b + a");
    assert_eq!(lines[header + 7], "set c = b - 1");
    assert_eq!(lines[header + 8], "return c");
    assert_function_lines_prefixed(&output);
}

#[test]
fn inconsistent_dedent_is_reported_with_location() {
    let (output, mut error_manager, file_manager) = compile("bad_indent", &[]);
    assert!(output.is_none());
    assert!(!error_manager.has_bugs());

    let errors = error_manager.take();
    let first = errors.first().expect("a diagnostic must be produced");
    let rendered = format!("{}", first.display(&file_manager));
    assert!(rendered.contains("Inconsistent dedent"), "got: {rendered}");
    assert!(rendered.contains("main.jp:4:7"), "got: {rendered}");
}

#[test]
fn conditional_import_depends_on_defines() {
    let (without, _, _) = compile("conditional", &[]);
    let without = without.expect("compilation must succeed");
    assert!(!without.contains("DebugTools"));

    let (with, _, _) = compile("conditional", &["DEBUG"]);
    let with = with.expect("compilation must succeed");
    assert!(with.contains("library DebugTools"));
    let debug_at = with.find("library DebugTools").unwrap();
    let app_at = with.find("library App").unwrap();
    assert!(debug_at < app_at, "imported unit must precede the importer");
}

#[test]
fn mass_import_pulls_every_unit_in_sorted_order() {
    let (output, _, _) = compile("mass", &[]);
    let output = output.expect("compilation must succeed");

    let armor_at = output.find("library Armor").expect("armor unit");
    let blink_at = output.find("library Blink").expect("blink unit");
    assert!(armor_at < blink_at, "mass imports are sorted by path");

    assert_eq!(output.matches("library Armor").count(), 1);
    assert_eq!(output.matches("library Blink").count(), 1);
}

#[test]
fn latin1_fallback_warns_but_compiles() {
    let (output, mut error_manager, _) = compile("latin1", &[]);
    assert!(output.is_some(), "latin-1 input must still compile");

    let diagnostics = error_manager.take();
    assert!(
        diagnostics
            .iter()
            .any(|err| err.severity == vjassp_syntax::Severity::Warning),
        "a decode warning must be reported"
    );
}
