use std::path::Path;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use owo_colors::OwoColorize;
use stencil_cli::Commands;
use stencil_cli::FillFormat;
use stencil_cli::OutputFormat;
use stencil_cli::StencilCli;
use stencil_core::IdGenerator;
use stencil_core::MarkerGrammar;
use stencil_core::Node;
use stencil_core::StencilConfig;
use stencil_core::StencilError;
use stencil_core::StencilResult;
use stencil_core::TemplateSession;
use stencil_core::TemplateValues;
use stencil_core::decode_html;
use stencil_core::expand;
use stencil_core::fill;
use stencil_core::materialize;
use stencil_core::parse_html;
use stencil_core::parse_json;
use stencil_core::scan;
use tracing_subscriber::EnvFilter;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

const SAMPLE_CONFIG: &str = "# stencil configuration\n\n# Delimiters bounding a marker. Both must \
                             be non-empty.\n[markers]\nstart = \"<<\"\nend = \">>\"\n\n# CSS class \
                             for materialized editable units. Without it the units are\n# styled \
                             inline.\n# [editable]\n# class = \"editable-field\"\n";

fn main() {
	let args = StencilCli::parse();

	// Respect NO_COLOR env var and --no-color flag.
	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	init_logging(args.verbose, use_color);

	// Install miette's fancy handler for rich error diagnostics.
	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	let result = match &args.command {
		Some(Commands::Init) => run_init(&args),
		Some(Commands::Scan { file, format }) => run_scan(&args, file, *format),
		Some(Commands::Materialize { file, class }) => {
			run_materialize(&args, file, class.as_deref())
		}
		Some(Commands::Expand { file, from_json }) => run_expand(&args, file, *from_json),
		Some(Commands::Fill {
			file,
			values,
			values_file,
			format,
		}) => run_fill(&args, file, values, values_file.as_deref(), *format),
		Some(Commands::Edit {
			file,
			values,
			class,
		}) => run_edit(&args, file, values, class.as_deref()),
		None => {
			eprintln!("No subcommand specified. Run `stencil --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(e) = result {
		// Render stencil errors through miette for help text and codes.
		match e.downcast::<StencilError>() {
			Ok(stencil_err) => {
				let report: miette::Report = (*stencil_err).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

/// Log to stderr. `STENCIL_LOG` takes precedence over `--verbose`.
fn init_logging(verbose: bool, use_color: bool) {
	let filter = match EnvFilter::try_from_env("STENCIL_LOG") {
		Ok(filter) => filter,
		Err(_) if verbose => EnvFilter::new("debug"),
		Err(_) => EnvFilter::new("warn"),
	};

	let _ = tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(use_color)
		.try_init();
}

fn resolve_root(args: &StencilCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// The effective settings: the config file overridden by command line
/// flags.
struct Settings {
	grammar: MarkerGrammar,
	class: Option<String>,
}

fn load_settings(args: &StencilCli) -> StencilResult<Settings> {
	let root = resolve_root(args);
	let config = StencilConfig::load(&root)?.unwrap_or_default();

	let mut grammar = config.markers;
	if let Some(start) = &args.start {
		grammar.start.clone_from(start);
	}
	if let Some(end) = &args.end {
		grammar.end.clone_from(end);
	}
	grammar.validate()?;

	Ok(Settings {
		grammar,
		class: config.editable.class,
	})
}

fn read_template(file: &Path) -> StencilResult<String> {
	let content = std::fs::read_to_string(file)?;
	tracing::debug!(path = %file.display(), bytes = content.len(), "read template");

	Ok(content)
}

/// Split `name=value` arguments.
fn parse_assignments(values: &[String]) -> Result<Vec<(String, String)>, String> {
	values
		.iter()
		.map(|value| {
			value
				.split_once('=')
				.map(|(name, value)| (name.to_string(), value.to_string()))
				.ok_or_else(|| format!("invalid value `{value}`, expected NAME=VALUE"))
		})
		.collect()
}

fn run_init(args: &StencilCli) -> CliResult {
	let root = resolve_root(args);

	if let Some(existing) = StencilConfig::resolve_path(&root) {
		println!("Config file already exists: {}", existing.display());
		return Ok(());
	}

	let config_path = root.join("stencil.toml");
	std::fs::write(&config_path, SAMPLE_CONFIG)?;
	println!("Created stencil.toml");
	println!();
	println!("Next steps:");
	println!("  1. Add markers such as <<customer_name>> to a template");
	println!("  2. Run `stencil scan <FILE>` to list them");
	println!("  3. Run `stencil fill <FILE> --set customer_name=Ada` to fill them in");

	Ok(())
}

fn run_scan(args: &StencilCli, file: &Path, format: OutputFormat) -> CliResult {
	let settings = load_settings(args)?;
	let decoded = decode_html(&read_template(file)?);
	let occurrences = scan(&decoded, &settings.grammar)?;

	match format {
		OutputFormat::Json => {
			println!("{}", serde_json::to_string_pretty(&occurrences)?);
		}
		OutputFormat::Text => {
			if occurrences.is_empty() {
				println!("No markers found.");
				return Ok(());
			}

			println!("{}", colored!("Markers:", bold));
			for occurrence in &occurrences {
				let marker = settings.grammar.wrap(&occurrence.raw_body);
				println!(
					"  {} {}..{}",
					colored!(marker, green),
					occurrence.start,
					occurrence.end
				);
			}
			println!("\n{} marker(s) found", occurrences.len());
		}
	}

	Ok(())
}

fn run_materialize(args: &StencilCli, file: &Path, class: Option<&str>) -> CliResult {
	let settings = load_settings(args)?;
	let content = read_template(file)?;
	let class = class.or(settings.class.as_deref());

	let output = materialize(&content, class, &settings.grammar, IdGenerator::now())?;
	println!("{}", output.html);

	Ok(())
}

fn parse_document(content: &str, from_json: bool, grammar: &MarkerGrammar) -> StencilResult<Node> {
	if from_json {
		parse_json(content)
	} else {
		parse_html(content, grammar)
	}
}

fn run_expand(args: &StencilCli, file: &Path, from_json: bool) -> CliResult {
	let settings = load_settings(args)?;
	let document = parse_document(&read_template(file)?, from_json, &settings.grammar)?;
	let expanded = expand(&document, &settings.grammar)?;

	println!("{}", serde_json::to_string_pretty(&expanded)?);

	Ok(())
}

fn run_fill(
	args: &StencilCli,
	file: &Path,
	assignments: &[String],
	values_file: Option<&Path>,
	format: FillFormat,
) -> CliResult {
	let settings = load_settings(args)?;

	let mut values = match values_file {
		Some(path) => {
			serde_json::from_str::<TemplateValues>(&read_template(path)?)
				.map_err(|e| StencilError::Json(e.to_string()))?
		}
		None => TemplateValues::new(),
	};
	values.extend(parse_assignments(assignments)?);

	let document = parse_html(&read_template(file)?, &settings.grammar)?;
	let filled = fill(&expand(&document, &settings.grammar)?, &values);

	match format {
		FillFormat::Html => println!("{}", filled.to_html()),
		FillFormat::Text => println!("{}", filled.to_text()),
	}

	Ok(())
}

fn run_edit(
	args: &StencilCli,
	file: &Path,
	assignments: &[String],
	class: Option<&str>,
) -> CliResult {
	let settings = load_settings(args)?;
	let assignments = parse_assignments(assignments)?;
	let content = read_template(file)?;
	let class = class.map(str::to_string).or(settings.class);

	let mut session = TemplateSession::new(settings.grammar, class);
	session.load(&content)?;

	for (name, value) in &assignments {
		let records = session.edit_marker(name, value)?;
		if records.is_empty() {
			tracing::warn!(marker = %name, "no editable unit for marker");
		}

		for record in &records {
			println!("{}", serde_json::to_string(record)?);
		}
	}

	if let Some(markup) = session.render() {
		println!("{markup}");
	}

	Ok(())
}
