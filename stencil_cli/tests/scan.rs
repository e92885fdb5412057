mod common;

use predicates::prelude::PredicateBooleanExt;
use serde_json::Value;
use stencil_core::AnyEmptyResult;

const LETTER: &str = "Dear <<customer_name>>, total <<order_total>>.";

#[test]
fn scan_lists_markers_with_offsets() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let file = common::write_file(tmp.path(), "letter.txt", LETTER)?;

	common::stencil_cmd()
		.arg("scan")
		.arg(&file)
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("<<customer_name>> 5..22"))
		.stdout(predicates::str::contains("<<order_total>> 30..45"))
		.stdout(predicates::str::contains("2 marker(s) found"));

	Ok(())
}

#[test]
fn scan_json_output() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let file = common::write_file(tmp.path(), "letter.txt", LETTER)?;

	let output = common::stencil_cmd()
		.arg("scan")
		.arg(&file)
		.arg("--format")
		.arg("json")
		.arg("--path")
		.arg(tmp.path())
		.output()?;
	assert!(output.status.success());

	let value: Value = serde_json::from_slice(&output.stdout)?;
	let markers = value.as_array().ok_or("expected an array")?;
	assert_eq!(markers.len(), 2);
	assert_eq!(markers[0]["raw_body"], "customer_name");
	assert_eq!(markers[1]["start"], 30);
	assert_eq!(markers[1]["end"], 45);

	Ok(())
}

#[test]
fn scan_decodes_entities_first() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let file = common::write_file(tmp.path(), "page.html", "<p>&lt;&lt;name&gt;&gt;</p>")?;

	common::stencil_cmd()
		.arg("scan")
		.arg(&file)
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("<<name>> 3..11"));

	Ok(())
}

#[test]
fn scan_without_markers() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let file = common::write_file(tmp.path(), "plain.txt", "Nothing to see << here")?;

	common::stencil_cmd()
		.arg("scan")
		.arg(&file)
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("No markers found."));

	Ok(())
}

#[test]
fn scan_uses_config_grammar() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_file(
		tmp.path(),
		"stencil.toml",
		"[markers]\nstart = \"{{\"\nend = \"}}\"\n",
	)?;
	let file = common::write_file(tmp.path(), "hi.txt", "Hi {{name}} <<ignored>>")?;

	common::stencil_cmd()
		.arg("scan")
		.arg(&file)
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("{{name}} 3..11"))
		.stdout(predicates::str::contains("ignored").not());

	Ok(())
}

#[test]
fn scan_flags_override_config() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_file(
		tmp.path(),
		"stencil.toml",
		"[markers]\nstart = \"{{\"\nend = \"}}\"\n",
	)?;
	let file = common::write_file(tmp.path(), "hi.txt", "Hi [name] {{other}}")?;

	common::stencil_cmd()
		.arg("scan")
		.arg(&file)
		.arg("--start")
		.arg("[")
		.arg("--end")
		.arg("]")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("[name] 3..9"))
		.stdout(predicates::str::contains("other").not());

	Ok(())
}

#[test]
fn scan_rejects_empty_delimiter() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let file = common::write_file(tmp.path(), "letter.txt", LETTER)?;

	common::stencil_cmd()
		.arg("scan")
		.arg(&file)
		.arg("--start=")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("must not be empty"));

	Ok(())
}

#[test]
fn scan_rejects_invalid_config() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_file(tmp.path(), "stencil.toml", "[markers\n")?;
	let file = common::write_file(tmp.path(), "letter.txt", LETTER)?;

	common::stencil_cmd()
		.arg("scan")
		.arg(&file)
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("failed to parse config file"));

	Ok(())
}

#[test]
fn scan_missing_file() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	common::stencil_cmd()
		.arg("scan")
		.arg(tmp.path().join("missing.txt"))
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2);

	Ok(())
}
