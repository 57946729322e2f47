use std::path::PathBuf;
use vjassp_emit::generate;
use vjassp_lower::lower;
use vjassp_syntax::{parse, ErrorManager, ErrorReporter, FileManager};

fn compile(source: &str) -> (String, ErrorManager) {
    let errors = ErrorManager::default();
    let mut files = FileManager::default();
    let file = files.add_file("main.jp".into(), source.into());
    let unit = parse(&errors, &file);
    let program = lower(&errors, vec![(PathBuf::from("main.jp"), unit)]);
    let output = generate(&errors, &program);
    (output, errors)
}

fn trimmed_lines(output: &str) -> Vec<&str> {
    output.lines().map(str::trim).filter(|l| !l.is_empty()).collect()
}

#[test]
fn library_with_init_and_until_loop() {
    let source = "\
library Counter:
    init:
        int i = 1
        until i > 10:
            i++
";
    let (output, errors) = compile(source);
    assert!(!errors.has_errors());

    let lines = trimmed_lines(&output);
    assert_eq!(lines[0], "library Counter initializer onInit");
    assert_eq!(lines[1], "globals");
    assert_eq!(lines[2], "endglobals");
    assert!(lines[3].starts_with("private function VJPI"));
    assert!(lines[3].ends_with("takes nothing returns nothing"));
    assert_eq!(lines[4], "local integer i = 1");
    assert_eq!(lines[5], "loop");
    assert_eq!(lines[6], "exitwhen i > 10");
    assert_eq!(lines[7], "set i = i + 1");
    assert_eq!(lines[8], "endloop");
    assert_eq!(lines[9], "endfunction");
    assert_eq!(
        lines[10],
        "private function onInit takes nothing returns nothing"
    );
    assert!(lines[11].starts_with("call VJPI"));
    assert_eq!(lines[12], "endfunction");
    assert_eq!(lines[13], "endlibrary");
}

#[test]
fn call_and_set_prefixes_inside_functions() {
    let source = "\
library Fight:
    Attack(unit target) -> bool:
        int damage = 7
        damage = damage + 1
        DealDamage(target, damage)
        return true
";
    let (output, errors) = compile(source);
    assert!(!errors.has_errors());

    for line in trimmed_lines(&output) {
        let first = line.split_whitespace().next().unwrap();
        if line.contains("DealDamage") {
            assert_eq!(first, "call");
        }
        if line.contains("= damage + 1") {
            assert_eq!(first, "set");
        }
    }
    assert!(output.contains("function Attack takes unit target returns boolean"));
}

#[test]
fn visibility_rules_in_output() {
    let source = "\
library Api:
    global:
        Exported():
            return
    Hidden():
        return
";
    let (output, errors) = compile(source);
    assert!(!errors.has_errors());

    assert!(output.contains("\n    function Exported takes nothing returns nothing"));
    assert!(output.contains("\n    private function Hidden takes nothing returns nothing"));
}

#[test]
fn globals_render_constants_arrays_and_hashtables() {
    let source = "\
library Data:
    global:
        int MAX ~ 100
    int counter = 0
    unit *slots
    hashtable table = {}
";
    let (output, errors) = compile(source);
    assert!(!errors.has_errors());

    assert!(output.contains("constant integer MAX = 100"));
    assert!(!output.contains("private constant integer MAX"));
    assert!(output.contains("private integer counter = 0"));
    assert!(output.contains("private unit array slots"));
    assert!(output.contains("private constant hashtable table = InitHashtable()"));
}

#[test]
fn fstrings_render_as_concatenation() {
    let source = "\
library Log:
    Report(int n):
        Print(f\"count={n} done\")
        Print(f\"\")
";
    let (output, errors) = compile(source);
    assert!(!errors.has_errors());

    assert!(output.contains("call Print(\"count=\" + (n) + \" done\")"));
    assert!(output.contains("call Print(\"\")"));
}

#[test]
fn while_loop_and_break_render_to_exitwhen() {
    let source = "\
library Loops:
    Spin(int n):
        while n > 0:
            n--
        loop:
            break
";
    let (output, errors) = compile(source);
    assert!(!errors.has_errors());

    assert!(output.contains("exitwhen not (n > 0)"));
    assert!(output.contains("set n = n - 1"));
    assert!(output.contains("exitwhen true"));
}

#[test]
fn if_elseif_else_chain_renders_flat() {
    let source = "\
library Choice:
    Pick(int x) -> int:
        if x > 10:
            return 2
        elseif x > 5:
            return 1
        else:
            return 0
";
    let (output, errors) = compile(source);
    assert!(!errors.has_errors());

    let lines = trimmed_lines(&output);
    let if_idx = lines.iter().position(|l| *l == "if x > 10 then").unwrap();
    assert_eq!(lines[if_idx + 1], "return 2");
    assert_eq!(lines[if_idx + 2], "elseif x > 5 then");
    assert_eq!(lines[if_idx + 3], "return 1");
    assert_eq!(lines[if_idx + 4], "else");
    assert_eq!(lines[if_idx + 5], "return 0");
    assert_eq!(lines[if_idx + 6], "endif");
}

#[test]
fn struct_native_and_requirements() {
    let source = "\
library Ticks:
    uses optional TimerUtils
    type tick extends handle
    type pool extends int
    native GetTick() -> int
";
    let (output, errors) = compile(source);
    assert!(!errors.has_errors());

    assert!(output.contains("library Ticks requires optional TimerUtils"));
    assert!(output.contains("private struct tick\n"));
    assert!(output.contains("private struct pool extends array"));
    assert!(output.contains("private native GetTick takes nothing returns integer"));
}

#[test]
fn system_blocks_force_the_shared_library() {
    let source = "\
library Core:
    init:
        Boot()
system Spawner:
    init:
        Start()
";
    let (output, errors) = compile(source);
    assert!(!errors.has_errors());

    assert!(output.contains("library Spawner initializer onInit requires VJPLIBS"));
    let tail: Vec<&str> = trimmed_lines(&output);
    let idx = tail
        .iter()
        .position(|l| *l == "library VJPLIBS requires Core")
        .expect("trailing shared library");
    assert_eq!(tail[idx + 1], "endlibrary");
}

#[test]
fn anonymous_content_emits_scope_with_stable_name() {
    let source = "\
content:
    init:
        Boot()
";
    let (first, errors) = compile(source);
    assert!(!errors.has_errors());
    let (second, _) = compile(source);
    assert_eq!(first, second);

    let lines = trimmed_lines(&first);
    assert!(lines[0].starts_with("scope VJPS"));
    assert!(lines[0].ends_with("initializer onInit"));
    assert_eq!(lines.last(), Some(&"endscope"));
}

#[test]
fn function_reference_and_operators_keep_shape() {
    let source = "\
library Sched:
    Arm(timer t):
        TimerStart(t, 0.5 * (2 + 1), true, function OnTick)
        if not (A() and B()):
            Stop(t)
";
    let (output, errors) = compile(source);
    assert!(!errors.has_errors());

    assert!(output.contains("call TimerStart(t, 0.5 * (2 + 1), true, function OnTick)"));
    assert!(output.contains("if not (A() and B()) then"));
}

#[test]
fn compound_assignment_preserves_grouping() {
    let source = "\
library Math:
    Apply(int x, int d):
        x += d + 1
        x /= d - 1
";
    let (output, errors) = compile(source);
    assert!(!errors.has_errors());

    assert!(output.contains("set x = x + (d + 1)"));
    assert!(output.contains("set x = x / (d - 1)"));
}

#[test]
fn nested_scope_renders_inside_library() {
    let source = "\
library Outer:
    scope Inner:
        init:
            Boot()
";
    let (output, errors) = compile(source);
    assert!(!errors.has_errors());

    let lines = trimmed_lines(&output);
    assert_eq!(lines[0], "library Outer");
    assert!(lines.contains(&"scope Inner initializer onInit"));
    assert!(lines.contains(&"endscope"));
    assert_eq!(lines.last(), Some(&"endlibrary"));
}
