mod common;

use stencil_core::AnyEmptyResult;
use stencil_core::MarkerGrammar;
use stencil_core::StencilConfig;

#[test]
fn can_init() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	common::stencil_cmd()
		.arg("init")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("Created stencil.toml"));

	let config_path = tmp.path().join("stencil.toml");
	let content = std::fs::read_to_string(&config_path)?;
	assert!(content.contains("[markers]"));
	assert!(content.contains("# [editable]"));

	Ok(())
}

#[test]
fn init_creates_valid_config() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	common::stencil_cmd()
		.arg("init")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success();

	let config = StencilConfig::load(tmp.path())?.ok_or("config was not created")?;
	assert_eq!(config.markers, MarkerGrammar::default());
	assert_eq!(config.editable.class, None);

	Ok(())
}

#[test]
fn init_does_not_overwrite() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let config_path = common::write_file(tmp.path(), ".stencil.toml", "existing config")?;

	common::stencil_cmd()
		.arg("init")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("already exists"));

	assert_eq!(std::fs::read_to_string(&config_path)?, "existing config");
	assert!(!tmp.path().join("stencil.toml").exists());

	Ok(())
}
