use crate::EditableDocument;
use crate::IdGenerator;
use crate::MarkerGrammar;
use crate::Materialization;
use crate::Node;
use crate::materialize;

pub const LETTER: &str = "Dear <<customer_name>>, total <<order_total>>.";

pub fn default_grammar() -> MarkerGrammar {
	MarkerGrammar::default()
}

pub fn grammar(start: &str, end: &str) -> MarkerGrammar {
	MarkerGrammar {
		start: start.to_string(),
		end: end.to_string(),
	}
}

/// The letter as a document with a single paragraph.
pub fn letter_document() -> Node {
	Node::document(vec![Node::paragraph(vec![Node::text(LETTER)])])
}

/// The five nodes the letter expands into.
pub fn letter_fragments() -> Vec<Node> {
	vec![
		Node::text("Dear "),
		Node::variable("customer_name"),
		Node::text(", total "),
		Node::variable("order_total"),
		Node::text("."),
	]
}

/// Materialize `raw` with the default grammar, the `field` class and ids
/// starting at timestamp zero.
pub fn materialized(raw: &str) -> Materialization {
	materialize(raw, Some("field"), &default_grammar(), IdGenerator::new(0))
		.unwrap_or_else(|e| panic!("materialize: {e}"))
}

/// A container with two units for `name` and one for `city`.
pub fn greeting_container() -> EditableDocument {
	let output = materialized(
		"<p>Hi &lt;&lt;name&gt;&gt; from &lt;&lt;city&gt;&gt;. Bye &lt;&lt;name&gt;&gt;</p>",
	);

	EditableDocument::parse(&output.html).unwrap_or_else(|e| panic!("parse: {e}"))
}
