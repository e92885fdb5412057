use crate::Block;
use crate::Fragment;
use crate::MarkerGrammar;
use crate::Node;
use crate::Scanner;
use crate::StencilResult;
use crate::TemplateValues;
use crate::TextRun;
use crate::Variable;

/// Expand every marker found in the text runs of `document` into a variable
/// node.
///
/// The input is not modified. A text run containing markers is replaced in
/// its parent by the ordered fragments `[text, variable, text, ...]`; empty
/// text fragments are dropped and variables inherit the run's marks. The
/// result is always a [`Node::Document`]: a document root keeps its shape and
/// any other root is wrapped in a document holding its expansion.
pub fn expand(document: &Node, grammar: &MarkerGrammar) -> StencilResult<Node> {
	let scanner = Scanner::new(grammar)?;
	let mut expanded = expand_node(document, &scanner);

	let result = if matches!(expanded.as_slice(), [Node::Document(_)]) {
		expanded.remove(0)
	} else {
		Node::Document(expanded)
	};
	tracing::debug!(
		variables = result.variable_names().len(),
		"expanded document markers"
	);

	Ok(result)
}

/// Expand a single node into the sibling nodes that replace it.
fn expand_node(node: &Node, scanner: &Scanner) -> Vec<Node> {
	match node {
		Node::Text(run) => split_run(run, scanner),
		Node::Document(content) => vec![Node::Document(expand_children(content, scanner))],
		Node::Block(block) => {
			vec![Node::Block(Block {
				kind: block.kind,
				content: expand_children(&block.content, scanner),
			})]
		}
		Node::Variable(_) | Node::Leaf(_) => vec![node.clone()],
	}
}

fn expand_children(content: &[Node], scanner: &Scanner) -> Vec<Node> {
	content
		.iter()
		.flat_map(|child| expand_node(child, scanner))
		.collect()
}

fn split_run(run: &TextRun, scanner: &Scanner) -> Vec<Node> {
	if !scanner.has_markers(&run.text) {
		return vec![Node::Text(run.clone())];
	}

	scanner
		.split(&run.text)
		.into_iter()
		.map(|fragment| match fragment {
			Fragment::Text(text) => Node::Text(TextRun {
				text: text.to_string(),
				marks: run.marks.clone(),
			}),
			Fragment::Marker(name) => Node::Variable(Variable {
				name: name.to_string(),
				marks: run.marks.clone(),
			}),
		})
		.collect()
}

/// Replace variables that have a value in `values` with text runs carrying
/// that value. Variables without a value are kept, and neighbouring runs
/// with identical marks are merged.
pub fn fill(document: &Node, values: &TemplateValues) -> Node {
	match document {
		Node::Document(content) => Node::Document(fill_children(content, values)),
		Node::Block(block) => Node::Block(Block {
			kind: block.kind,
			content: fill_children(&block.content, values),
		}),
		Node::Variable(variable) => match values.get(&variable.name) {
			Some(value) => Node::Text(TextRun {
				text: value.clone(),
				marks: variable.marks.clone(),
			}),
			None => document.clone(),
		},
		Node::Text(_) | Node::Leaf(_) => document.clone(),
	}
}

fn fill_children(content: &[Node], values: &TemplateValues) -> Vec<Node> {
	let mut filled: Vec<Node> = Vec::with_capacity(content.len());

	for child in content {
		let node = fill(child, values);

		if let (Some(Node::Text(previous)), Node::Text(run)) = (filled.last_mut(), &node) {
			if previous.marks == run.marks {
				previous.text.push_str(&run.text);
				continue;
			}
		}

		if matches!(&node, Node::Text(run) if run.text.is_empty()) {
			continue;
		}

		filled.push(node);
	}

	filled
}
