use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum StencilError {
	#[error(transparent)]
	#[diagnostic(code(stencil::io_error))]
	Io(#[from] std::io::Error),

	#[error("the {which} marker delimiter must not be empty")]
	#[diagnostic(
		code(stencil::empty_delimiter),
		help("set both `start` and `end` under `[markers]`, e.g. `start = \"<<\"` and `end = \">>\"`")
	)]
	EmptyDelimiter { which: &'static str },

	#[error("invalid marker grammar: {0}")]
	#[diagnostic(code(stencil::invalid_grammar))]
	InvalidGrammar(String),

	#[error("malformed markup at byte {offset}: {reason}")]
	#[diagnostic(code(stencil::malformed_markup))]
	MalformedMarkup { offset: usize, reason: String },

	#[error("unknown document node type: `{0}`")]
	#[diagnostic(
		code(stencil::unknown_node_type),
		help(
			"supported node types: doc, paragraph, heading, blockquote, bulletList, \
			 orderedList, listItem, codeBlock, text, variable, hardBreak, horizontalRule"
		)
	)]
	UnknownNodeType(String),

	#[error("invalid document node: {0}")]
	#[diagnostic(code(stencil::invalid_node))]
	InvalidNode(String),

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(stencil::config_parse),
		help("check that stencil.toml is valid TOML with [markers] and/or [editable] sections")
	)]
	ConfigParse(String),

	#[error("invalid json: {0}")]
	#[diagnostic(code(stencil::json))]
	Json(String),

	#[error("no editable unit with id `{0}`")]
	#[diagnostic(
		code(stencil::unknown_unit),
		help("unit ids change on every materialization pass; look them up again after `load`")
	)]
	UnknownUnit(String),
}

pub type StencilResult<T> = Result<T, StencilError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
