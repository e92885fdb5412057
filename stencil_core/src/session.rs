use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use derive_more::Deref;
use derive_more::DerefMut;
use serde::Deserialize;
use serde::Serialize;

use crate::EditableDocument;
use crate::IdGenerator;
use crate::MarkerGrammar;
use crate::Materialization;
use crate::Scanner;
use crate::StencilResult;
use crate::UpdateObserver;
use crate::UpdateRecord;
use crate::materialize;

/// The current value of every edited marker, ordered by marker name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Deref, DerefMut)]
#[serde(transparent)]
pub struct TemplateValues(
	#[deref]
	#[deref_mut]
	BTreeMap<String, String>,
);

impl TemplateValues {
	pub fn new() -> Self {
		Self::default()
	}

	/// Record the text of an update as the value of its marker.
	pub fn apply(&mut self, record: &UpdateRecord) {
		self.0
			.insert(record.marker_name.clone(), record.current_text.clone());
	}
}

impl<K, V> FromIterator<(K, V)> for TemplateValues
where
	K: Into<String>,
	V: Into<String>,
{
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Self(
			iter.into_iter()
				.map(|(key, value)| (key.into(), value.into()))
				.collect(),
		)
	}
}

/// Substitute every marker in `text` that has a value. Markers without a
/// value are left as written.
pub fn fill_text(
	text: &str,
	grammar: &MarkerGrammar,
	values: &TemplateValues,
) -> StencilResult<String> {
	let scanner = Scanner::new(grammar)?;

	Ok(scanner.replace_all(text, |body| {
		values
			.get(body)
			.cloned()
			.unwrap_or_else(|| grammar.wrap(body))
	}))
}

/// Ties a materialization pass, its editable container and an observer
/// together.
///
/// Every [`TemplateSession::load`] tears down the previous attachments before
/// the new units are observed, so records are never emitted for units of an
/// earlier pass. The id generator is carried from pass to pass.
#[derive(Debug)]
pub struct TemplateSession {
	grammar: MarkerGrammar,
	style_class: Option<String>,
	ids: IdGenerator,
	document: Option<EditableDocument>,
	observer: UpdateObserver,
	values: Rc<RefCell<TemplateValues>>,
}

impl TemplateSession {
	pub fn new(grammar: MarkerGrammar, style_class: Option<String>) -> Self {
		Self::with_ids(grammar, style_class, IdGenerator::now())
	}

	/// Create a session whose unit ids start from `ids`.
	pub fn with_ids(grammar: MarkerGrammar, style_class: Option<String>, ids: IdGenerator) -> Self {
		let values = Rc::new(RefCell::new(TemplateValues::new()));
		let mut observer = UpdateObserver::new();
		let sink = Rc::clone(&values);
		observer.on_update(move |record| sink.borrow_mut().apply(record));

		Self {
			grammar,
			style_class,
			ids,
			document: None,
			observer,
			values,
		}
	}

	/// Materialize `raw` and observe the resulting units. Values recorded
	/// from earlier passes are kept.
	pub fn load(&mut self, raw: &str) -> StencilResult<Materialization> {
		self.observer.detach();
		self.document = None;

		let materialization = materialize(
			raw,
			self.style_class.as_deref(),
			&self.grammar,
			self.ids,
		)?;
		self.ids = materialization.next;

		let document = EditableDocument::parse(&materialization.html)?;
		self.observer.observe(Some(&document));
		self.document = Some(document);

		Ok(materialization)
	}

	/// Replace the text of one unit and dispatch the change.
	///
	/// Returns `Ok(None)` when nothing is loaded or the unit is not observed.
	pub fn edit(&mut self, unit_id: &str, text: &str) -> StencilResult<Option<UpdateRecord>> {
		let Some(document) = self.document.as_mut() else {
			return Ok(None);
		};

		let event = document.set_text(unit_id, text)?;

		Ok(self.observer.dispatch(&*document, &event))
	}

	/// Edit every unit whose marker body is `name`, in document order.
	pub fn edit_marker(&mut self, name: &str, text: &str) -> StencilResult<Vec<UpdateRecord>> {
		let ids = self
			.document
			.as_ref()
			.map(|document| document.units_for_marker(name))
			.unwrap_or_default();

		let mut records = Vec::with_capacity(ids.len());
		for id in ids {
			if let Some(record) = self.edit(&id, text)? {
				records.push(record);
			}
		}

		Ok(records)
	}

	/// A snapshot of the values recorded so far.
	pub fn values(&self) -> TemplateValues {
		self.values.borrow().clone()
	}

	/// The live markup of the loaded document.
	pub fn render(&self) -> Option<String> {
		self.document.as_ref().map(EditableDocument::render)
	}

	pub fn document(&self) -> Option<&EditableDocument> {
		self.document.as_ref()
	}

	pub fn observer(&self) -> &UpdateObserver {
		&self.observer
	}

	pub fn grammar(&self) -> &MarkerGrammar {
		&self.grammar
	}
}
