// ABOUTME: End-to-end tests running the boop binary against script files

use assert_cmd::Command;
use indoc::indoc;
use std::io::Write;
use tempfile::NamedTempFile;

const SUCCESS: i32 = 0;
const BUILD_ERROR: i32 = 65;
const RUNTIME_ERROR: i32 = 70;

fn run_script_with_args(source: &str, extra_args: &[&str]) -> (String, String, i32) {
    let mut script = NamedTempFile::new().expect("failed to create temp file");
    write!(script, "{source}").expect("failed to write script");

    let mut cmd = Command::cargo_bin("boop").expect("binary not found");
    cmd.arg(script.path());
    cmd.args(extra_args);

    let output = cmd.output().expect("failed to run binary");
    (
        String::from_utf8_lossy(&output.stdout).into_owned(),
        String::from_utf8_lossy(&output.stderr).into_owned(),
        output.status.code().unwrap_or(-1),
    )
}

fn run_script(source: &str) -> (String, String, i32) {
    run_script_with_args(source, &[])
}

fn assert_runs(source: &str, expected_stdout: &str) {
    let (stdout, stderr, code) = run_script(source);
    assert_eq!(stdout, expected_stdout, "stdout mismatch for: {source}");
    assert_eq!(stderr, "", "unexpected stderr for: {source}");
    assert_eq!(code, SUCCESS);
}

#[test]
fn arithmetic_precedence() {
    assert_runs("print 1 + 2 * 3;", "> 7\n");
}

#[test]
fn string_concatenation() {
    assert_runs(
        indoc! {r#"
            var a = "hi";
            print a + " there";
        "#},
        "> hi there\n",
    );
}

#[test]
fn recursive_factorial() {
    assert_runs(
        "fun f(n){ if (n<=1) return 1; return n*f(n-1);} print f(5);",
        "> 120\n",
    );
}

#[test]
fn closure_counter() {
    assert_runs(
        "fun make(){ var x=0; fun inc(){ x = x+1; return x;} return inc;} \
         var c = make(); print c(); print c();",
        "> 1\n> 2\n",
    );
}

#[test]
fn class_method_call() {
    assert_runs("class A { greet(){ print \"hi\"; } } A().greet();", "> hi\n");
}

#[test]
fn super_method_call() {
    assert_runs(
        "class A{speak(){print \"A\";}} \
         class B<A{speak(){super.speak(); print \"B\";}} \
         B().speak();",
        "> A\n> B\n",
    );
}

#[test]
fn value_stringification() {
    assert_runs(
        indoc! {r#"
            print 2.5;
            print 4.0;
            print true;
            print nil;
            print clock;
            class Box { }
            print Box;
            print Box();
        "#},
        indoc! {"
            > 2.5
            > 4
            > true
            > nil
            > <fn clock>
            > Box
            > Instance of Box
        "},
    );
}

#[test]
fn division_by_zero_is_a_runtime_error() {
    let (stdout, stderr, code) = run_script("print 1 / 0;");
    assert_eq!(stdout, "");
    assert!(stderr.contains("[Line 1] Error: Division by zero is illegal"));
    assert_eq!(code, RUNTIME_ERROR);
}

#[test]
fn runtime_errors_recover_at_statement_boundaries() {
    let (stdout, stderr, code) = run_script("ghost; print 3;");
    assert_eq!(stdout, "> 3\n");
    assert!(stderr.contains("undefined variable"));
    assert_eq!(code, RUNTIME_ERROR);
}

#[test]
fn too_many_runtime_errors_abort_evaluation() {
    let mut source = "ghost;".repeat(25);
    source.push_str("print \"unreachable\";");
    let (stdout, stderr, code) = run_script(&source);
    assert_eq!(stdout, "");
    assert!(stderr.contains("Too many errors occurred."));
    assert_eq!(code, RUNTIME_ERROR);
}

#[test]
fn parse_error_reports_line_and_lexeme() {
    let (stdout, stderr, code) = run_script("var 1 = 2;");
    assert_eq!(stdout, "");
    assert!(stderr.contains("[Line 1] Error"));
    assert!(stderr.contains("Expect variable name."));
    assert_eq!(code, BUILD_ERROR);
}

#[test]
fn scan_error_still_reports_later_parse_state() {
    let (_, stderr, code) = run_script("var @ = 1;");
    assert!(stderr.contains("Unexpected character: @"));
    assert_eq!(code, BUILD_ERROR);
}

#[test]
fn missing_left_operand_error_production() {
    let (_, stderr, code) = run_script("<= 7;");
    assert!(stderr.contains("Missing left hand operand"));
    assert_eq!(code, BUILD_ERROR);
}

#[test]
fn top_level_return_ends_execution_cleanly() {
    let (stdout, _, code) = run_script("print 1; return; print 2;");
    assert_eq!(stdout, "> 1\n");
    assert_eq!(code, SUCCESS);
}

#[test]
fn missing_file_is_an_error() {
    let mut cmd = Command::cargo_bin("boop").expect("binary not found");
    cmd.arg("does-not-exist.boop");
    let output = cmd.output().expect("failed to run binary");
    assert_eq!(output.status.code(), Some(BUILD_ERROR));
}

#[test]
fn dump_ast_prints_canonical_source() {
    let (stdout, stderr, code) = run_script_with_args(
        "print 1+2   * 3;  // spacing and comments vanish",
        &["--dump-ast"],
    );
    assert_eq!(stdout, "print 1 + 2 * 3;\n");
    assert_eq!(stderr, "");
    assert_eq!(code, SUCCESS);
}

#[test]
fn strict_uninitialized_flag_rejects_nil_reads() {
    let source = "var x; print x;";
    let (stdout, _, code) = run_script(source);
    assert_eq!(stdout, "> nil\n");
    assert_eq!(code, SUCCESS);

    let (_, stderr, code) = run_script_with_args(source, &["--strict-uninitialized"]);
    assert!(stderr.contains("uninitialized variable"));
    assert_eq!(code, RUNTIME_ERROR);
}

#[test]
fn postfix_on_non_variable_is_a_runtime_error() {
    let (_, stderr, code) = run_script("print \"x\"++;");
    assert!(stderr.contains("must be a variable"));
    assert_eq!(code, RUNTIME_ERROR);
}

#[test]
fn arity_mismatch_reports_both_counts() {
    let (_, stderr, code) = run_script("fun g(a, b){ return a; } g(1, 2, 3);");
    assert!(stderr.contains("Expected 2 arguments. Got 3 arguments."));
    assert_eq!(code, RUNTIME_ERROR);
}
