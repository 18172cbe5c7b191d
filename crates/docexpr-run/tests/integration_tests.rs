use assert_cmd::cargo;
use rstest::rstest;
use std::io::Write;

fn create_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write to temp file");
    file
}

#[test]
fn test_cli_run_with_stdin() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = cargo::cargo_bin_cmd!("docexpr");

    let assert = cmd
        .arg("--compact")
        .arg("$.a.b[@ > 15]")
        .write_stdin(r#"{"a": {"b": [10, 20, 30]}}"#)
        .assert();
    assert.success().code(0).stdout("20\n30\n");

    Ok(())
}

#[rstest]
#[case::precedence(vec!["--compact", "1 + 2 * 3"], "{}", "7\n")]
#[case::per_document(vec!["--compact", "UPPER($.name)"], r#"{"name":"ann"} {"name":"bob"}"#, "\"ANN\"\n\"BOB\"\n")]
#[case::aggregate(vec!["--compact", "--aggregate", "COUNT(*)"], r#"{"a":1} {"a":2} {"a":3}"#, "3\n")]
#[case::aggregate_map(vec!["--compact", "-A", "SUM(*.a)"], r#"{"a":1} {"a":2}"#, "3\n")]
#[case::param(vec!["--compact", "--param", "min=2", "$.a >= @min"], r#"{"a":1} {"a":2}"#, "false\ntrue\n")]
#[case::document(vec!["--compact", "{ a, a }"], r#"{"a":1}"#, "{\"a\":1,\"a1\":1}\n")]
#[case::quantified(vec!["--compact", "$.a.b[*] ANY = 20"], r#"{"a":{"b":[10,20,30]}}"#, "true\n")]
#[case::binary_collation(vec!["--compact", "--collation", "binary", "$.s = 'A'"], r#"{"s":"a"}"#, "false\n")]
#[case::ignore_case_collation(vec!["--compact", "$.s = 'A'"], r#"{"s":"a"}"#, "true\n")]
#[case::closure_backend(vec!["--compact", "--backend", "closure", "MAP($.a[*] => @ * 2)"], r#"{"a":[1,2]}"#, "2\n4\n")]
fn test_cli_commands(#[case] args: Vec<&str>, #[case] input: &str, #[case] expected: &str) {
    let mut cmd = cargo::cargo_bin_cmd!("docexpr");
    let assert = cmd.args(args).write_stdin(input).assert();

    assert.success().code(0).stdout(expected.to_string());
}

#[test]
fn test_cli_run_with_files() -> Result<(), Box<dyn std::error::Error>> {
    let first = create_file(r#"{"_id": 1}"#);
    let second = create_file(r#"{"_id": 2}"#);
    let mut cmd = cargo::cargo_bin_cmd!("docexpr");

    let assert = cmd
        .arg("--compact")
        .arg("{i:_id}")
        .arg(first.path())
        .arg(second.path())
        .assert();
    assert.success().stdout("{\"i\":1}\n{\"i\":2}\n");

    Ok(())
}

#[test]
fn test_cli_explain() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = cargo::cargo_bin_cmd!("docexpr");

    let output = cmd.arg("--explain").arg("$.a + 1").env("NO_COLOR", "1").output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert!(output.status.success());
    assert!(stdout.contains("type: Add"));
    assert!(stdout.contains("immutable: false"));
    assert!(stdout.contains("fields: a"));
    assert!(stdout.contains("source: $.a+1"));

    Ok(())
}

#[rstest]
#[case::parse_error(vec!["1 +"], "{}")]
#[case::left_not_scalar(vec!["$.a[*] = 1"], "{}")]
#[case::zero_division(vec!["$.a / 0"], r#"{"a":1}"#)]
#[case::sort_on_closure(vec!["--backend", "closure", "SORT($.a[*] => @)"], "{}")]
#[case::unknown_backend(vec!["--backend", "jit", "1"], "{}")]
#[case::invalid_param(vec!["--param", "novalue", "1"], "{}")]
#[case::invalid_json(vec!["$.a"], "{not json")]
fn test_cli_failures(#[case] args: Vec<&str>, #[case] input: &str) {
    let mut cmd = cargo::cargo_bin_cmd!("docexpr");
    cmd.args(args).write_stdin(input).assert().failure();
}

#[test]
fn test_cli_logging_goes_to_stderr() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = cargo::cargo_bin_cmd!("docexpr");

    let output = cmd
        .arg("--compact")
        .arg("-v")
        .arg("1")
        .env_remove("DOCEXPR_LOG")
        .write_stdin("{}")
        .output()?;

    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stdout)?, "1\n");
    assert!(String::from_utf8(output.stderr)?.contains("compiling expression"));

    Ok(())
}
