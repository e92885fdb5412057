use std::collections::HashMap;

use serde::Serialize;

use crate::decode_html;

/// An editable unit as seen by a host container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitHandle {
	/// The `data-editable-id` of the unit.
	pub id: String,
	/// The `data-marker` attribute exactly as stored, still entity-encoded.
	pub marker_attr: String,
}

/// A container holding materialized editable units.
pub trait UnitHost {
	/// The units currently present, in document order.
	fn editable_units(&self) -> Vec<UnitHandle>;

	/// The live text content of a unit, or `None` when the unit is gone.
	fn text_content(&self, id: &str) -> Option<String>;
}

/// A content change on a single unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
	pub unit_id: String,
}

impl ChangeEvent {
	pub fn new(unit_id: impl Into<String>) -> Self {
		Self {
			unit_id: unit_id.into(),
		}
	}
}

/// The normalized output of observing a change to an editable unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRecord {
	pub source_unit_id: String,
	/// The decoded marker body of the unit.
	pub marker_name: String,
	pub current_text: String,
}

/// Callback receiving every emitted [`UpdateRecord`].
pub type UpdateCallback = Box<dyn FnMut(&UpdateRecord)>;

/// The units newly attached by one [`UpdateObserver::observe`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subscription {
	attached: Vec<String>,
}

impl Subscription {
	/// Ids of the units attached by this call, in document order.
	pub fn attached(&self) -> &[String] {
		&self.attached
	}

	pub fn len(&self) -> usize {
		self.attached.len()
	}

	pub fn is_empty(&self) -> bool {
		self.attached.is_empty()
	}
}

/// Attachment state for one unit.
#[derive(Debug, Clone)]
struct Attachment {
	/// Decoded once when the unit is attached.
	marker_name: String,
}

/// Watches the editable units of a [`UnitHost`] and turns change events into
/// [`UpdateRecord`]s.
///
/// Which units are attached is tracked in a side table keyed by unit id, so
/// the host's units are never annotated. Attaching is idempotent per unit and
/// [`UpdateObserver::detach`] clears the whole table.
#[derive(Default)]
pub struct UpdateObserver {
	attachments: HashMap<String, Attachment>,
	callback: Option<UpdateCallback>,
}

impl std::fmt::Debug for UpdateObserver {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("UpdateObserver")
			.field("attachments", &self.attachments)
			.field("callback", &self.callback.is_some())
			.finish()
	}
}

impl UpdateObserver {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register the callback, replacing any previous one.
	pub fn on_update(&mut self, callback: impl FnMut(&UpdateRecord) + 'static) {
		self.callback = Some(Box::new(callback));
	}

	/// Attach to every unit of `host` that is not attached yet.
	///
	/// A missing host is not an error: a warning is logged and nothing is
	/// attached, so the caller can simply observe again once the container
	/// exists.
	pub fn observe<H: UnitHost + ?Sized>(&mut self, host: Option<&H>) -> Subscription {
		let Some(host) = host else {
			tracing::warn!("editable container is not available, skipping attachment");
			return Subscription::default();
		};

		let mut attached = Vec::new();
		for unit in host.editable_units() {
			if self.attachments.contains_key(&unit.id) {
				tracing::trace!(id = %unit.id, "unit already attached");
				continue;
			}

			let marker_name = decode_html(&unit.marker_attr);
			self.attachments
				.insert(unit.id.clone(), Attachment { marker_name });
			attached.push(unit.id);
		}

		tracing::debug!(
			attached = attached.len(),
			total = self.attachments.len(),
			"observed editable units"
		);

		Subscription { attached }
	}

	/// Handle one change event.
	///
	/// Returns the emitted record, or `None` when the unit is not attached or
	/// no longer present in `host`. The callback, if any, is invoked exactly
	/// once per emitted record.
	pub fn dispatch<H: UnitHost + ?Sized>(
		&mut self,
		host: &H,
		event: &ChangeEvent,
	) -> Option<UpdateRecord> {
		let attachment = self.attachments.get(&event.unit_id)?;
		let current_text = host.text_content(&event.unit_id)?;

		let record = UpdateRecord {
			source_unit_id: event.unit_id.clone(),
			marker_name: attachment.marker_name.clone(),
			current_text,
		};

		if let Some(callback) = self.callback.as_mut() {
			callback(&record);
		}

		Some(record)
	}

	/// Remove every attachment, returning how many were removed.
	pub fn detach(&mut self) -> usize {
		let removed = self.attachments.len();
		self.attachments.clear();
		tracing::debug!(removed, "detached editable units");

		removed
	}

	pub fn is_attached(&self, id: &str) -> bool {
		self.attachments.contains_key(id)
	}

	/// Number of attached units.
	pub fn attached_count(&self) -> usize {
		self.attachments.len()
	}
}
