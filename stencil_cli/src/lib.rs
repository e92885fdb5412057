use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Turn `<<marker>>` placeholders in templates into editable units and variables.",
	long_about = "stencil finds delimited placeholders such as `<<customer_name>>` in template \
	              documents and turns them into something an editor can work with: editable \
	              units in flat markup, or typed variable nodes in a structured document \
	              tree.\n\nQuick start:\n  stencil init         Create a stencil.toml\n  stencil \
	              scan FILE    List the markers in a template\n  stencil fill FILE    Replace \
	              markers with values"
)]
pub struct StencilCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the project root directory holding `stencil.toml`.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Start delimiter. Overrides `[markers] start` from the config.
	#[arg(long, global = true)]
	pub start: Option<String>,

	/// End delimiter. Overrides `[markers] end` from the config.
	#[arg(long, global = true)]
	pub end: Option<String>,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Create a sample `stencil.toml` in the project root.
	///
	/// If a config file already exists this command is a no-op and exits
	/// successfully.
	Init,
	/// List the markers found in a template.
	///
	/// The file is entity-decoded first, so markers written as
	/// `&lt;&lt;name&gt;&gt;` are found too. Offsets are byte offsets into
	/// the decoded text.
	Scan {
		/// The template file to scan.
		file: PathBuf,

		/// Output format for the marker list.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,
	},
	/// Replace every marker with an editable unit and print the markup.
	///
	/// Each unit is a `contenteditable` element carrying the encoded marker
	/// body in `data-marker` and a unique id in `data-editable-id`.
	Materialize {
		/// The template file to materialize.
		file: PathBuf,

		/// CSS class for editable units. Overrides `[editable] class`. When
		/// neither is set the units are styled inline.
		#[arg(long)]
		class: Option<String>,
	},
	/// Expand markers into variable nodes and print the document as JSON.
	Expand {
		/// The template file to expand.
		file: PathBuf,

		/// Read the file as a JSON document tree instead of markup.
		#[arg(long, default_value_t = false)]
		from_json: bool,
	},
	/// Replace markers with values and print the result.
	///
	/// Markers without a value are kept as variables in HTML output and as
	/// their name in text output.
	Fill {
		/// The template file to fill.
		file: PathBuf,

		/// A value for a marker, as `name=value`. May be repeated.
		#[arg(long = "set", value_name = "NAME=VALUE")]
		values: Vec<String>,

		/// A JSON file with an object mapping marker names to values. Values
		/// given with `--set` take precedence.
		#[arg(long = "values", value_name = "FILE")]
		values_file: Option<PathBuf>,

		/// Output format for the filled document.
		#[arg(long, value_enum, default_value_t = FillFormat::Html)]
		format: FillFormat,
	},
	/// Materialize a template, edit its units and print the update records.
	///
	/// Every unit of each named marker is edited in document order. One JSON
	/// update record is printed per edit, followed by the final markup.
	Edit {
		/// The template file to edit.
		file: PathBuf,

		/// The new text for every unit of a marker, as `name=value`. May be
		/// repeated.
		#[arg(long = "set", value_name = "NAME=VALUE")]
		values: Vec<String>,

		/// CSS class for editable units. Overrides `[editable] class`.
		#[arg(long)]
		class: Option<String>,
	},
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text output.
	Text,
	/// JSON output for programmatic consumption.
	Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FillFormat {
	/// HTML markup with unfilled markers rendered as variable chips.
	Html,
	/// Plain text with one line per block.
	Text,
}
