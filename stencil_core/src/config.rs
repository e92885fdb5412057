use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::StencilError;
use crate::StencilResult;

/// The default start delimiter.
pub const DEFAULT_START_MARKER: &str = "<<";

/// The default end delimiter.
pub const DEFAULT_END_MARKER: &str = ">>";

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] =
	["stencil.toml", ".stencil.toml", ".config/stencil.toml"];

/// The pair of literal delimiters bounding a marker, e.g. `<<` and `>>`.
///
/// Both delimiters are matched literally. Use [`MarkerGrammar::new`] to
/// validate a pair up front; the scanner validates again when it is built so
/// a grammar assembled by hand can never produce an unbounded match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerGrammar {
	/// Delimiter opening a marker.
	#[serde(default = "default_start")]
	pub start: String,
	/// Delimiter closing a marker.
	#[serde(default = "default_end")]
	pub end: String,
}

impl MarkerGrammar {
	pub fn new(start: impl Into<String>, end: impl Into<String>) -> StencilResult<Self> {
		let grammar = Self {
			start: start.into(),
			end: end.into(),
		};
		grammar.validate()?;

		Ok(grammar)
	}

	/// Reject degenerate delimiter pairs.
	pub fn validate(&self) -> StencilResult<()> {
		if self.start.is_empty() {
			return Err(StencilError::EmptyDelimiter { which: "start" });
		}

		if self.end.is_empty() {
			return Err(StencilError::EmptyDelimiter { which: "end" });
		}

		Ok(())
	}

	/// Wrap a marker body in this grammar's delimiters.
	pub fn wrap(&self, body: &str) -> String {
		format!("{}{body}{}", self.start, self.end)
	}
}

impl Default for MarkerGrammar {
	fn default() -> Self {
		Self {
			start: DEFAULT_START_MARKER.to_string(),
			end: DEFAULT_END_MARKER.to_string(),
		}
	}
}

fn default_start() -> String {
	DEFAULT_START_MARKER.to_string()
}

fn default_end() -> String {
	DEFAULT_END_MARKER.to_string()
}

/// Settings for materialized editable units.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EditableConfig {
	/// CSS class applied to every editable unit. When absent the units are
	/// given [`DEFAULT_UNIT_STYLE`](crate::DEFAULT_UNIT_STYLE) inline.
	#[serde(default)]
	pub class: Option<String>,
}

/// Configuration loaded from a `stencil.toml` file.
///
/// ```toml
/// [markers]
/// start = "{{"
/// end = "}}"
///
/// [editable]
/// class = "editable-field"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StencilConfig {
	/// The marker grammar. Missing keys fall back to `<<` and `>>`.
	#[serde(default)]
	pub markers: MarkerGrammar,
	/// Editable unit settings.
	#[serde(default)]
	pub editable: EditableConfig,
}

impl StencilConfig {
	/// Returns the first existing config file path at `root`.
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if the file does not exist.
	pub fn load(root: &Path) -> StencilResult<Option<StencilConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		let config = Self::from_toml(&content)?;
		tracing::debug!(path = %config_path.display(), "loaded config");

		Ok(Some(config))
	}

	/// Parse and validate config content.
	pub fn from_toml(content: &str) -> StencilResult<StencilConfig> {
		let config: StencilConfig =
			toml::from_str(content).map_err(|e| StencilError::ConfigParse(e.to_string()))?;
		config.markers.validate()?;

		Ok(config)
	}
}
