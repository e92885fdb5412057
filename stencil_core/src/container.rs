use crate::ChangeEvent;
use crate::MARKER_ATTRIBUTE;
use crate::StencilError;
use crate::StencilResult;
use crate::UNIT_ID_ATTRIBUTE;
use crate::UnitHandle;
use crate::UnitHost;
use crate::encode_html;
use crate::markup::MarkupKind;
use crate::markup::tokenize_lenient;

/// A piece of an [`EditableDocument`].
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
	/// Markup outside any editable unit, kept verbatim.
	Raw(String),
	Unit(UnitSegment),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct UnitSegment {
	id: String,
	/// The `data-marker` value as written.
	marker_attr: String,
	/// The decoded `data-marker` value.
	marker: String,
	start_tag: String,
	/// Markup between the start and end tag.
	inner: String,
	/// Live text content of the unit.
	text: String,
	/// Empty when the unit was never closed.
	end_tag: String,
}

/// Annotated markup held in memory with its editable units addressable by
/// id.
///
/// This is the container the [`UpdateObserver`](crate::UpdateObserver)
/// attaches to outside a browser. Markup around the units is kept byte for
/// byte, so an unedited document renders back to its input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditableDocument {
	segments: Vec<Segment>,
}

impl EditableDocument {
	/// Find every element carrying a `data-editable-id` attribute in
	/// `markup`.
	///
	/// Materialized markup holds decoded text, so a `<!--` without a closing
	/// `-->` is kept as text rather than rejected.
	pub fn parse(markup: &str) -> StencilResult<Self> {
		let events = tokenize_lenient(markup)?;
		let mut segments = Vec::new();
		let mut cursor = 0;
		let mut index = 0;

		while index < events.len() {
			let event = &events[index];
			index += 1;

			let MarkupKind::Start(tag) = &event.kind else {
				continue;
			};
			let Some(id) = tag.attribute(UNIT_ID_ATTRIBUTE) else {
				continue;
			};
			if tag.self_closing {
				continue;
			}

			if event.span.start > cursor {
				segments.push(Segment::Raw(markup[cursor..event.span.start].to_string()));
			}

			let content_start = event.span.end;
			let mut content_end = markup.len();
			let mut end_tag = String::new();
			let mut text = String::new();
			let mut depth = 1;

			while index < events.len() {
				let inner = &events[index];
				index += 1;

				match &inner.kind {
					MarkupKind::Start(nested) if nested.name == tag.name && !nested.self_closing => {
						depth += 1;
					}
					MarkupKind::End(name) if *name == tag.name => {
						depth -= 1;
						if depth == 0 {
							content_end = inner.span.start;
							end_tag = inner.raw.to_string();
							break;
						}
					}
					_ => {}
				}

				if let Some(decoded) = inner.text() {
					text.push_str(&decoded);
				}
			}

			cursor = content_end + end_tag.len();
			segments.push(Segment::Unit(UnitSegment {
				id: id.to_string(),
				marker_attr: tag
					.raw_attribute(MARKER_ATTRIBUTE)
					.unwrap_or_default()
					.to_string(),
				marker: tag.attribute(MARKER_ATTRIBUTE).unwrap_or_default().to_string(),
				start_tag: event.raw.to_string(),
				inner: markup[content_start..content_end].to_string(),
				text,
				end_tag,
			}));
		}

		if cursor < markup.len() {
			segments.push(Segment::Raw(markup[cursor..].to_string()));
		}

		let document = Self { segments };
		tracing::debug!(units = document.units().count(), "parsed editable document");

		Ok(document)
	}

	fn units(&self) -> impl Iterator<Item = &UnitSegment> {
		self.segments.iter().filter_map(|segment| {
			match segment {
				Segment::Unit(unit) => Some(unit),
				Segment::Raw(_) => None,
			}
		})
	}

	fn unit_mut(&mut self, id: &str) -> Option<&mut UnitSegment> {
		self.segments.iter_mut().find_map(|segment| {
			match segment {
				Segment::Unit(unit) if unit.id == id => Some(unit),
				_ => None,
			}
		})
	}

	/// Replace the text content of a unit, as a user typing into it would.
	///
	/// No observer is notified: the returned event has to be dispatched by
	/// whoever drives the edit.
	pub fn set_text(&mut self, id: &str, text: &str) -> StencilResult<ChangeEvent> {
		let unit = self
			.unit_mut(id)
			.ok_or_else(|| StencilError::UnknownUnit(id.to_string()))?;

		unit.inner = encode_html(text);
		unit.text = text.to_string();

		Ok(ChangeEvent::new(id))
	}

	/// Ids of the units whose decoded marker body is `name`.
	pub fn units_for_marker(&self, name: &str) -> Vec<String> {
		self.units()
			.filter(|unit| unit.marker == name)
			.map(|unit| unit.id.clone())
			.collect()
	}

	/// Number of editable units.
	pub fn unit_count(&self) -> usize {
		self.units().count()
	}

	/// Render the document back to markup with the live unit content.
	pub fn render(&self) -> String {
		let mut markup = String::new();

		for segment in &self.segments {
			match segment {
				Segment::Raw(raw) => markup.push_str(raw),
				Segment::Unit(unit) => {
					markup.push_str(&unit.start_tag);
					markup.push_str(&unit.inner);
					markup.push_str(&unit.end_tag);
				}
			}
		}

		markup
	}
}

impl UnitHost for EditableDocument {
	fn editable_units(&self) -> Vec<UnitHandle> {
		self.units()
			.map(|unit| {
				UnitHandle {
					id: unit.id.clone(),
					marker_attr: unit.marker_attr.clone(),
				}
			})
			.collect()
	}

	fn text_content(&self, id: &str) -> Option<String> {
		self.units()
			.find(|unit| unit.id == id)
			.map(|unit| unit.text.clone())
	}
}
