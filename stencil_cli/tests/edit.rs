mod common;

use predicates::prelude::PredicateBooleanExt;
use serde_json::Value;
use stencil_core::AnyEmptyResult;

#[test]
fn edit_prints_records_then_markup() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let file = common::write_file(
		tmp.path(),
		"page.html",
		"<p>Hi &lt;&lt;name&gt;&gt;, bye &lt;&lt;name&gt;&gt; from &lt;&lt;city&gt;&gt;</p>",
	)?;

	let output = common::stencil_cmd()
		.arg("edit")
		.arg(&file)
		.arg("--set")
		.arg("name=Ada")
		.arg("--set")
		.arg("city=<Oslo>")
		.arg("--path")
		.arg(tmp.path())
		.output()?;
	assert!(output.status.success());

	let stdout = String::from_utf8(output.stdout)?;
	let lines: Vec<_> = stdout.lines().collect();
	assert_eq!(lines.len(), 4);

	let records = lines[..3]
		.iter()
		.map(|line| serde_json::from_str::<Value>(line))
		.collect::<Result<Vec<_>, _>>()?;
	let markers: Vec<_> = records.iter().map(|record| &record["markerName"]).collect();
	assert_eq!(markers, vec!["name", "name", "city"]);
	assert_eq!(records[2]["currentText"], "<Oslo>");
	assert_ne!(records[0]["sourceUnitId"], records[1]["sourceUnitId"]);

	let markup = lines[3];
	assert!(markup.starts_with("<p>Hi <div contenteditable=\"true\""));
	assert_eq!(markup.matches(">Ada</div>").count(), 2);
	assert!(markup.contains(">&lt;Oslo&gt;</div></p>"));

	Ok(())
}

#[test]
fn edit_unknown_marker_warns() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let file = common::write_file(tmp.path(), "page.html", "<p>&lt;&lt;name&gt;&gt;</p>")?;

	common::stencil_cmd()
		.arg("edit")
		.arg(&file)
		.arg("--set")
		.arg("other=x")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains(">name</div></p>"))
		.stderr(predicates::str::contains("no editable unit for marker"));

	Ok(())
}

#[test]
fn edit_class_overrides_config() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_file(tmp.path(), "stencil.toml", "[editable]\nclass = \"from-config\"\n")?;
	let file = common::write_file(tmp.path(), "page.html", "<p>&lt;&lt;name&gt;&gt;</p>")?;

	common::stencil_cmd()
		.arg("edit")
		.arg(&file)
		.arg("--set")
		.arg("name=Ada")
		.arg("--class")
		.arg("field")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("class=\"field\""))
		.stdout(predicates::str::contains("from-config").not())
		.stdout(predicates::str::contains(">Ada</div></p>"));

	Ok(())
}
