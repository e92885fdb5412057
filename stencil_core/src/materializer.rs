use std::fmt::Write as _;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::MarkerGrammar;
use crate::Scanner;
use crate::StencilResult;
use crate::decode_html;
use crate::encode_html;

/// Inline style given to editable units when no class is configured.
pub const DEFAULT_UNIT_STYLE: &str = "display:inline-block; min-width:60px; border-bottom:1px \
                                      dotted #888; background:#f0f0f0; padding:2px 4px; \
                                      border-radius:3px; font-family: 'Inter', sans-serif;";

/// Prefix shared by every generated unit id.
pub const UNIT_ID_PREFIX: &str = "editable-marker";

/// Attribute holding the encoded marker body of a unit.
pub const MARKER_ATTRIBUTE: &str = "data-marker";

/// Attribute holding the unique id of a unit.
pub const UNIT_ID_ATTRIBUTE: &str = "data-editable-id";

/// Produces unit ids of the form `editable-marker-{timestamp}-{counter}`.
///
/// The generator is a plain value: [`IdGenerator::next_id`] consumes it and
/// hands back the successor, so a materialization pass is fully determined by
/// the generator it starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdGenerator {
	timestamp: u128,
	counter: u64,
}

impl IdGenerator {
	/// Start a generator at an explicit timestamp with the counter at zero.
	pub fn new(timestamp: u128) -> Self {
		Self {
			timestamp,
			counter: 0,
		}
	}

	/// Start a generator at the current wall-clock time in milliseconds.
	pub fn now() -> Self {
		let timestamp = SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.map_or(0, |duration| duration.as_millis());

		Self::new(timestamp)
	}

	pub fn timestamp(&self) -> u128 {
		self.timestamp
	}

	pub fn counter(&self) -> u64 {
		self.counter
	}

	/// Returns the next id together with the generator state that follows it.
	#[must_use]
	pub fn next_id(self) -> (String, IdGenerator) {
		let id = format!("{UNIT_ID_PREFIX}-{}-{}", self.timestamp, self.counter);
		let next = Self {
			timestamp: self.timestamp,
			counter: self.counter + 1,
		};

		(id, next)
	}
}

impl Default for IdGenerator {
	fn default() -> Self {
		Self::now()
	}
}

/// One materialized marker occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditableUnit {
	/// Unique within the pass that produced it.
	pub id: String,
	/// The decoded marker body.
	pub marker_body: String,
	/// The HTML-encoded marker body, used both as content and as the
	/// `data-marker` attribute.
	pub rendered_content: String,
	/// The class applied to the unit, if any.
	pub style_class: Option<String>,
}

impl EditableUnit {
	/// Render the self-contained markup fragment for this unit.
	pub fn to_markup(&self) -> String {
		let mut markup = String::from("<div contenteditable=\"true\" ");

		match &self.style_class {
			Some(class) => {
				let _ = write!(markup, "class=\"{}\"", encode_html(class));
			}
			None => {
				let _ = write!(markup, "style=\"{DEFAULT_UNIT_STYLE}\"");
			}
		}

		let _ = write!(
			markup,
			" {MARKER_ATTRIBUTE}=\"{content}\" {UNIT_ID_ATTRIBUTE}=\"{id}\">{content}</div>",
			content = self.rendered_content,
			id = self.id,
		);

		markup
	}
}

/// The result of one materialization pass.
#[derive(Debug, Clone)]
pub struct Materialization {
	/// The annotated markup with every marker replaced by an editable unit.
	pub html: String,
	/// The units in document order.
	pub units: Vec<EditableUnit>,
	/// The generator state after the last id handed out in this pass.
	pub next: IdGenerator,
}

/// Replace every marker in `raw` with an independently editable unit.
///
/// The input is entity-decoded first so pre-encoded delimiters such as
/// `&lt;&lt;name&gt;&gt;` are found. Everything outside the markers is
/// passed through as decoded text without validation. An empty delimiter in
/// `grammar` is rejected before any work is done.
pub fn materialize(
	raw: &str,
	style_class: Option<&str>,
	grammar: &MarkerGrammar,
	ids: IdGenerator,
) -> StencilResult<Materialization> {
	let scanner = Scanner::new(grammar)?;
	let decoded = decode_html(raw);
	let style_class = style_class.filter(|class| !class.is_empty());

	let mut html = String::with_capacity(decoded.len());
	let mut units = Vec::new();
	let mut generator = ids;
	let mut cursor = 0;

	for occurrence in scanner.scan(&decoded) {
		html.push_str(&decoded[cursor..occurrence.start]);

		let (id, next) = generator.next_id();
		generator = next;

		let unit = EditableUnit {
			id,
			rendered_content: encode_html(&occurrence.raw_body),
			marker_body: occurrence.raw_body,
			style_class: style_class.map(ToString::to_string),
		};
		tracing::trace!(id = %unit.id, marker = %unit.marker_body, "materialized unit");

		html.push_str(&unit.to_markup());
		units.push(unit);
		cursor = occurrence.end;
	}

	html.push_str(&decoded[cursor..]);
	tracing::debug!(units = units.len(), "materialization pass complete");

	Ok(Materialization {
		html,
		units,
		next: generator,
	})
}
