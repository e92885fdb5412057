use std::borrow::Cow;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::MarkerGrammar;
use crate::Scanner;
use crate::StencilError;
use crate::StencilResult;
use crate::encode_html;
use crate::markup::MarkupKind;
use crate::markup::StartTag;
use crate::markup::tokenize;

/// Inline style of a rendered variable chip.
pub const VARIABLE_CHIP_STYLE: &str = "background: #d1fae5; padding: 2px 4px; border-radius: \
                                       4px; font-weight: 500; font-family: monospace;";

/// Attribute identifying a rendered variable node.
pub const VARIABLE_ATTRIBUTE: &str = "data-variable";

/// A node of the structured document tree.
///
/// The JSON form follows the ProseMirror shape used by rich-text editors:
///
/// ```json
/// {"type": "doc", "content": [
///   {"type": "paragraph", "content": [
///     {"type": "text", "text": "Dear "},
///     {"type": "variable", "attrs": {"name": "customer_name"}}
///   ]}
/// ]}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawNode", into = "RawNode")]
#[non_exhaustive]
pub enum Node {
	/// The root of a document.
	Document(Vec<Node>),
	/// A block with ordered children.
	Block(Block),
	/// A run of text sharing the same marks.
	Text(TextRun),
	/// An atomic placeholder. It has no children and cannot be split.
	Variable(Variable),
	/// A node with neither text nor children.
	Leaf(LeafKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
	pub kind: BlockKind,
	pub content: Vec<Node>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum BlockKind {
	Paragraph,
	Heading { level: u8 },
	Blockquote,
	BulletList,
	OrderedList,
	ListItem,
	CodeBlock,
}

impl BlockKind {
	/// Textblocks hold inline content directly.
	pub fn is_textblock(self) -> bool {
		matches!(self, Self::Paragraph | Self::Heading { .. } | Self::CodeBlock)
	}

	fn type_name(self) -> &'static str {
		match self {
			Self::Paragraph => "paragraph",
			Self::Heading { .. } => "heading",
			Self::Blockquote => "blockquote",
			Self::BulletList => "bulletList",
			Self::OrderedList => "orderedList",
			Self::ListItem => "listItem",
			Self::CodeBlock => "codeBlock",
		}
	}

	fn from_tag(name: &str) -> Option<Self> {
		let kind = match name {
			"p" => Self::Paragraph,
			"h1" | "h2" | "h3" | "h4" | "h5" | "h6" => Self::Heading {
				level: name[1..].parse().unwrap_or(1),
			},
			"blockquote" => Self::Blockquote,
			"ul" => Self::BulletList,
			"ol" => Self::OrderedList,
			"li" => Self::ListItem,
			"pre" => Self::CodeBlock,
			_ => return None,
		};

		Some(kind)
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
	pub text: String,
	pub marks: Vec<Mark>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
	/// The decoded marker body.
	pub name: String,
	/// Marks inherited from the text the variable was found in.
	pub marks: Vec<Mark>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum LeafKind {
	HardBreak,
	HorizontalRule,
}

/// Inline formatting carried by text runs and variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
#[non_exhaustive]
pub enum Mark {
	Bold,
	Italic,
	Strike,
	Underline,
	Code,
	Link { attrs: LinkAttrs },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkAttrs {
	pub href: String,
}

impl Mark {
	fn from_tag(tag: &StartTag) -> Option<Self> {
		let mark = match tag.name.as_str() {
			"b" | "strong" => Self::Bold,
			"i" | "em" => Self::Italic,
			"s" | "strike" | "del" => Self::Strike,
			"u" => Self::Underline,
			"code" => Self::Code,
			"a" => Self::Link {
				attrs: LinkAttrs {
					href: tag.attribute("href")?.to_string(),
				},
			},
			_ => return None,
		};

		Some(mark)
	}

	fn open_tag(&self) -> String {
		match self {
			Self::Bold => "<strong>".to_string(),
			Self::Italic => "<em>".to_string(),
			Self::Strike => "<s>".to_string(),
			Self::Underline => "<u>".to_string(),
			Self::Code => "<code>".to_string(),
			Self::Link { attrs } => format!("<a href=\"{}\">", encode_html(&attrs.href)),
		}
	}

	fn close_tag(&self) -> &'static str {
		match self {
			Self::Bold => "</strong>",
			Self::Italic => "</em>",
			Self::Strike => "</s>",
			Self::Underline => "</u>",
			Self::Code => "</code>",
			Self::Link { .. } => "</a>",
		}
	}
}

impl Node {
	pub fn document(content: Vec<Node>) -> Self {
		Self::Document(content)
	}

	pub fn block(kind: BlockKind, content: Vec<Node>) -> Self {
		Self::Block(Block { kind, content })
	}

	pub fn paragraph(content: Vec<Node>) -> Self {
		Self::block(BlockKind::Paragraph, content)
	}

	pub fn text(text: impl Into<String>) -> Self {
		Self::Text(TextRun {
			text: text.into(),
			marks: vec![],
		})
	}

	pub fn marked_text(text: impl Into<String>, marks: Vec<Mark>) -> Self {
		Self::Text(TextRun {
			text: text.into(),
			marks,
		})
	}

	pub fn variable(name: impl Into<String>) -> Self {
		Self::Variable(Variable {
			name: name.into(),
			marks: vec![],
		})
	}

	/// The text payload of a text run.
	pub fn text_payload(&self) -> Option<&str> {
		match self {
			Self::Text(run) => Some(&run.text),
			_ => None,
		}
	}

	/// The ordered children of a document or block.
	pub fn children(&self) -> Option<&[Node]> {
		match self {
			Self::Document(content) | Self::Block(Block { content, .. }) => Some(content),
			_ => None,
		}
	}

	/// Block-level nodes are separated by line breaks in plain text.
	fn is_block_level(&self) -> bool {
		matches!(
			self,
			Self::Document(_) | Self::Block(_) | Self::Leaf(LeafKind::HorizontalRule)
		)
	}

	/// Names of all variable nodes in document order.
	pub fn variable_names(&self) -> Vec<&str> {
		let mut names = Vec::new();
		self.collect_variable_names(&mut names);
		names
	}

	fn collect_variable_names<'a>(&'a self, names: &mut Vec<&'a str>) {
		match self {
			Self::Variable(variable) => names.push(&variable.name),
			Self::Document(content) | Self::Block(Block { content, .. }) => {
				for child in content {
					child.collect_variable_names(names);
				}
			}
			Self::Text(_) | Self::Leaf(_) => {}
		}
	}

	/// Render the node as HTML. Variables become `span[data-variable]`
	/// chips, which [`parse_html`] reads back as variables.
	pub fn to_html(&self) -> String {
		let mut html = String::new();
		self.write_html(&mut html);
		html
	}

	fn write_html(&self, html: &mut String) {
		match self {
			Self::Document(content) => {
				for child in content {
					child.write_html(html);
				}
			}
			Self::Block(block) => {
				let (open, close) = match block.kind {
					BlockKind::Paragraph => ("<p>".to_string(), "</p>".to_string()),
					BlockKind::Heading { level } => (format!("<h{level}>"), format!("</h{level}>")),
					BlockKind::Blockquote => {
						("<blockquote>".to_string(), "</blockquote>".to_string())
					}
					BlockKind::BulletList => ("<ul>".to_string(), "</ul>".to_string()),
					BlockKind::OrderedList => ("<ol>".to_string(), "</ol>".to_string()),
					BlockKind::ListItem => ("<li>".to_string(), "</li>".to_string()),
					BlockKind::CodeBlock => {
						("<pre><code>".to_string(), "</code></pre>".to_string())
					}
				};

				html.push_str(&open);
				for child in &block.content {
					child.write_html(html);
				}
				html.push_str(&close);
			}
			Self::Text(run) => {
				write_marked(html, &run.marks, &encode_html(&run.text));
			}
			Self::Variable(variable) => {
				let name = encode_html(&variable.name);
				let chip = format!(
					"<span {VARIABLE_ATTRIBUTE}=\"{name}\" style=\"{VARIABLE_CHIP_STYLE}\">{name}</span>"
				);
				write_marked(html, &variable.marks, &chip);
			}
			Self::Leaf(LeafKind::HardBreak) => html.push_str("<br>"),
			Self::Leaf(LeafKind::HorizontalRule) => html.push_str("<hr>"),
		}
	}

	/// Plain serialized text: block-level siblings are separated by newlines,
	/// hard breaks become newlines and variables are written as their name.
	pub fn to_text(&self) -> String {
		match self {
			Self::Document(content) | Self::Block(Block { content, .. }) => {
				let mut lines: Vec<String> = Vec::new();
				let mut inline = None::<String>;

				for child in content {
					if child.is_block_level() {
						if let Some(line) = inline.take() {
							lines.push(line);
						}
						lines.push(child.to_text());
					} else {
						inline.get_or_insert_with(String::new).push_str(&child.to_text());
					}
				}

				if let Some(line) = inline {
					lines.push(line);
				}

				lines.join("\n")
			}
			Self::Text(run) => run.text.clone(),
			Self::Variable(variable) => variable.name.clone(),
			Self::Leaf(LeafKind::HardBreak) => "\n".to_string(),
			Self::Leaf(LeafKind::HorizontalRule) => "---".to_string(),
		}
	}
}

fn write_marked(html: &mut String, marks: &[Mark], inner: &str) {
	for mark in marks {
		html.push_str(&mark.open_tag());
	}
	html.push_str(inner);
	for mark in marks.iter().rev() {
		html.push_str(mark.close_tag());
	}
}

/// The serialized shape of a [`Node`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawNode {
	#[serde(rename = "type")]
	r#type: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	attrs: Option<Map<String, Value>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	content: Option<Vec<RawNode>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	text: Option<String>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	marks: Vec<Mark>,
}

impl RawNode {
	fn new(r#type: &str) -> Self {
		Self {
			r#type: r#type.to_string(),
			attrs: None,
			content: None,
			text: None,
			marks: vec![],
		}
	}

	fn attr(&self, name: &str) -> Option<&Value> {
		self.attrs.as_ref().and_then(|attrs| attrs.get(name))
	}
}

impl From<Node> for RawNode {
	fn from(node: Node) -> Self {
		match node {
			Node::Document(content) => RawNode {
				content: Some(raw_children(content)),
				..RawNode::new("doc")
			},
			Node::Block(block) => {
				let attrs = match block.kind {
					BlockKind::Heading { level } => {
						let mut attrs = Map::new();
						attrs.insert("level".to_string(), Value::from(level));
						Some(attrs)
					}
					_ => None,
				};

				RawNode {
					attrs,
					content: Some(raw_children(block.content)),
					..RawNode::new(block.kind.type_name())
				}
			}
			Node::Text(run) => RawNode {
				text: Some(run.text),
				marks: run.marks,
				..RawNode::new("text")
			},
			Node::Variable(variable) => {
				let mut attrs = Map::new();
				attrs.insert("name".to_string(), Value::from(variable.name));

				RawNode {
					attrs: Some(attrs),
					marks: variable.marks,
					..RawNode::new("variable")
				}
			}
			Node::Leaf(LeafKind::HardBreak) => RawNode::new("hardBreak"),
			Node::Leaf(LeafKind::HorizontalRule) => RawNode::new("horizontalRule"),
		}
	}
}

fn raw_children(content: Vec<Node>) -> Vec<RawNode> {
	content.into_iter().map(RawNode::from).collect()
}

fn node_children(content: Option<Vec<RawNode>>) -> StencilResult<Vec<Node>> {
	content
		.unwrap_or_default()
		.into_iter()
		.map(Node::try_from)
		.collect()
}

impl TryFrom<RawNode> for Node {
	type Error = StencilError;

	fn try_from(raw: RawNode) -> Result<Self, Self::Error> {
		let kind = match raw.r#type.as_str() {
			"doc" => return Ok(Node::Document(node_children(raw.content)?)),
			"text" => {
				let Some(text) = raw.text else {
					return Err(StencilError::InvalidNode(
						"text node without `text`".to_string(),
					));
				};
				return Ok(Node::Text(TextRun {
					text,
					marks: raw.marks,
				}));
			}
			"variable" => {
				let name = raw
					.attr("name")
					.and_then(Value::as_str)
					.unwrap_or_default()
					.to_string();
				return Ok(Node::Variable(Variable {
					name,
					marks: raw.marks,
				}));
			}
			"hardBreak" => return Ok(Node::Leaf(LeafKind::HardBreak)),
			"horizontalRule" => return Ok(Node::Leaf(LeafKind::HorizontalRule)),
			"paragraph" => BlockKind::Paragraph,
			"heading" => {
				let level = raw.attr("level").and_then(Value::as_u64).unwrap_or(1);
				let level = u8::try_from(level)
					.ok()
					.filter(|level| (1..=6).contains(level))
					.ok_or_else(|| {
						StencilError::InvalidNode(format!("heading level {level} is out of range"))
					})?;
				BlockKind::Heading { level }
			}
			"blockquote" => BlockKind::Blockquote,
			"bulletList" => BlockKind::BulletList,
			"orderedList" => BlockKind::OrderedList,
			"listItem" => BlockKind::ListItem,
			"codeBlock" => BlockKind::CodeBlock,
			other => return Err(StencilError::UnknownNodeType(other.to_string())),
		};

		Ok(Node::block(kind, node_children(raw.content)?))
	}
}

/// Parse a document from its JSON form.
///
/// Malformed JSON is a [`StencilError::Json`] error. Well-formed JSON that
/// does not describe a node is reported as [`StencilError::UnknownNodeType`]
/// or [`StencilError::InvalidNode`].
pub fn parse_json(json: &str) -> StencilResult<Node> {
	let raw: RawNode = serde_json::from_str(json).map_err(|e| StencilError::Json(e.to_string()))?;

	Node::try_from(raw)
}

/// A block that is still accepting content while markup is parsed.
struct OpenBlock {
	/// The element that opened the block. `None` for the root and for
	/// implicit paragraphs.
	tag: Option<String>,
	/// `None` for the document root.
	kind: Option<BlockKind>,
	content: Vec<Node>,
}

impl OpenBlock {
	fn is_textblock(&self) -> bool {
		self.kind.is_some_and(BlockKind::is_textblock)
	}

	fn is_implicit(&self) -> bool {
		self.tag.is_none() && self.kind.is_some()
	}
}

/// Builds a document tree from markup events.
struct DocumentBuilder {
	stack: Vec<OpenBlock>,
	marks: Vec<(String, Mark)>,
	/// Element name and nesting depth of a variable chip whose content is
	/// being skipped.
	skip: Option<(String, usize)>,
}

impl DocumentBuilder {
	fn new() -> Self {
		Self {
			stack: vec![OpenBlock {
				tag: None,
				kind: None,
				content: vec![],
			}],
			marks: vec![],
			skip: None,
		}
	}

	fn top(&mut self) -> &mut OpenBlock {
		let last = self.stack.len() - 1;
		&mut self.stack[last]
	}

	fn in_code_block(&self) -> bool {
		self.stack
			.iter()
			.any(|block| block.kind == Some(BlockKind::CodeBlock))
	}

	fn current_marks(&self) -> Vec<Mark> {
		if self.in_code_block() {
			return vec![];
		}

		self.marks.iter().map(|(_, mark)| mark.clone()).collect()
	}

	fn open_block(&mut self, tag: Option<String>, kind: BlockKind) {
		self.stack.push(OpenBlock {
			tag,
			kind: Some(kind),
			content: vec![],
		});
	}

	/// Pop the top block and append it to its parent.
	fn close_top(&mut self) {
		if self.stack.len() < 2 {
			return;
		}

		let Some(mut block) = self.stack.pop() else {
			return;
		};
		let Some(kind) = block.kind else {
			return;
		};

		if kind.is_textblock() && kind != BlockKind::CodeBlock {
			trim_trailing_space(&mut block.content);
		}

		if block.is_implicit() && block.content.is_empty() {
			return;
		}

		self.top().content.push(Node::block(kind, block.content));
	}

	/// Close open textblocks so block content can be added.
	fn close_textblocks(&mut self) {
		while self.stack.len() > 1 && self.top().is_textblock() {
			self.close_top();
		}
	}

	/// Make sure the top of the stack accepts inline content.
	fn ensure_textblock(&mut self) {
		if !self.top().is_textblock() {
			self.open_block(None, BlockKind::Paragraph);
		}
	}

	fn push_inline(&mut self, node: Node) {
		self.ensure_textblock();
		self.top().content.push(node);
	}

	fn push_text(&mut self, text: &str) {
		if self.in_code_block() {
			self.ensure_textblock();
			self.append_text(text.to_string(), vec![]);
			return;
		}

		let collapsed = collapse_whitespace(text);
		if collapsed.trim().is_empty() && !self.top().is_textblock() {
			return;
		}

		self.ensure_textblock();
		let at_line_start = match self.top().content.last() {
			None | Some(Node::Leaf(LeafKind::HardBreak)) => true,
			Some(Node::Text(run)) => run.text.ends_with(' '),
			Some(_) => false,
		};
		let text = if at_line_start {
			collapsed.trim_start()
		} else {
			collapsed.as_str()
		};

		if !text.is_empty() {
			let marks = self.current_marks();
			self.append_text(text.to_string(), marks);
		}
	}

	/// Append to the last run when the marks match, otherwise start a new run.
	fn append_text(&mut self, text: String, marks: Vec<Mark>) {
		let content = &mut self.top().content;

		if let Some(Node::Text(run)) = content.last_mut() {
			if run.marks == marks {
				run.text.push_str(&text);
				return;
			}
		}

		content.push(Node::Text(TextRun { text, marks }));
	}

	fn start_tag(&mut self, tag: StartTag) {
		if let Some((name, depth)) = &mut self.skip {
			if *name == tag.name && !tag.self_closing {
				*depth += 1;
			}
			return;
		}

		if let Some(name) = tag.attribute(VARIABLE_ATTRIBUTE) {
			let variable = Node::Variable(Variable {
				name: name.to_string(),
				marks: self.current_marks(),
			});
			self.push_inline(variable);
			if !tag.self_closing {
				self.skip = Some((tag.name, 1));
			}
			return;
		}

		match tag.name.as_str() {
			"br" => {
				if self.in_code_block() {
					self.push_text("\n");
				} else {
					self.push_inline(Node::Leaf(LeafKind::HardBreak));
				}
			}
			"hr" => {
				self.close_textblocks();
				self.top().content.push(Node::Leaf(LeafKind::HorizontalRule));
			}
			_ => self.structural_tag(tag),
		}
	}

	/// Open a block or a mark for `tag`. Other elements are transparent.
	fn structural_tag(&mut self, tag: StartTag) {
		if let Some(kind) = BlockKind::from_tag(&tag.name) {
			if tag.self_closing {
				return;
			}
			self.close_textblocks();
			if kind == BlockKind::ListItem && self.top().kind == Some(BlockKind::ListItem) {
				self.close_top();
			}
			self.open_block(Some(tag.name), kind);
		} else if let Some(mark) = Mark::from_tag(&tag) {
			if !tag.self_closing {
				self.marks.push((tag.name, mark));
			}
		}
	}

	fn end_tag(&mut self, name: &str) {
		if let Some((skip_name, depth)) = &mut self.skip {
			if skip_name == name {
				*depth -= 1;
				if *depth == 0 {
					self.skip = None;
				}
			}
			return;
		}

		if BlockKind::from_tag(name).is_some() {
			let Some(index) = self
				.stack
				.iter()
				.rposition(|block| block.tag.as_deref() == Some(name))
			else {
				tracing::warn!(tag = name, "ignoring unbalanced end tag");
				return;
			};

			while self.stack.len() > index {
				self.close_top();
			}
		} else if let Some(index) = self.marks.iter().rposition(|(tag, _)| tag == name) {
			self.marks.remove(index);
		}
	}

	fn finish(mut self) -> Node {
		while self.stack.len() > 1 {
			self.close_top();
		}

		let root = self.stack.pop().map(|block| block.content).unwrap_or_default();
		Node::Document(root)
	}
}

fn collapse_whitespace(text: &str) -> String {
	let mut collapsed = String::with_capacity(text.len());
	let mut in_space = false;

	for ch in text.chars() {
		if matches!(ch, ' ' | '\t' | '\n' | '\r' | '\u{c}') {
			if !in_space {
				collapsed.push(' ');
			}
			in_space = true;
		} else {
			collapsed.push(ch);
			in_space = false;
		}
	}

	collapsed
}

fn trim_trailing_space(content: &mut Vec<Node>) {
	if let Some(Node::Text(run)) = content.last_mut() {
		let trimmed_len = run.text.trim_end_matches(' ').len();
		run.text.truncate(trimmed_len);
		if run.text.is_empty() {
			content.pop();
		}
	}
}

/// Returns `true` when `literal` is exactly one tag, comment or declaration,
/// as with a grammar of `<` and `>`.
fn is_single_tag(literal: &str) -> bool {
	match tokenize(literal).as_deref() {
		Ok([event]) => !matches!(event.kind, MarkupKind::Text),
		_ => false,
	}
}

/// Entity-encode the delimiters of markers of `grammar` written literally in
/// `html`, so `<<name>>` is read as text and not as a `<name>` tag. Markers
/// whose body holds `<` or `>`, and markers that are a tag on their own, are
/// left to the tokenizer.
fn protect_markers<'h>(html: &'h str, grammar: &MarkerGrammar) -> StencilResult<Cow<'h, str>> {
	let start = encode_html(&grammar.start);
	let end = encode_html(&grammar.end);
	if start == grammar.start && end == grammar.end {
		return Ok(Cow::Borrowed(html));
	}

	let scanner = Scanner::new(grammar)?;
	let mut protected = String::with_capacity(html.len());
	let mut cursor = 0;

	for occurrence in scanner.scan(html) {
		let literal = &html[occurrence.span()];
		if occurrence.raw_body.contains(['<', '>']) || is_single_tag(literal) {
			continue;
		}

		protected.push_str(&html[cursor..occurrence.start]);
		protected.push_str(&start);
		protected.push_str(&occurrence.raw_body);
		protected.push_str(&end);
		cursor = occurrence.end;
	}

	if cursor == 0 {
		return Ok(Cow::Borrowed(html));
	}

	protected.push_str(&html[cursor..]);
	tracing::trace!("protected literal markers in markup");

	Ok(Cow::Owned(protected))
}

/// Parse markup into a [`Node::Document`].
///
/// Paragraphs, headings, block quotes, lists and `pre` map to blocks, common
/// formatting elements map to marks and `span[data-variable]` maps to a
/// variable node. Unknown elements are transparent. Inline content outside a
/// textblock is wrapped in a paragraph and whitespace is collapsed outside
/// `pre`. Markers of `grammar` may be written literally or entity-encoded;
/// both end up as text. Parsing is best effort: only an unterminated comment
/// is an error.
pub fn parse_html(html: &str, grammar: &MarkerGrammar) -> StencilResult<Node> {
	let html = protect_markers(html, grammar)?;
	let mut builder = DocumentBuilder::new();

	for event in tokenize(&html)? {
		let text = event.text();
		match event.kind {
			MarkupKind::Start(tag) => builder.start_tag(tag),
			MarkupKind::End(name) => builder.end_tag(&name),
			MarkupKind::Text => {
				if builder.skip.is_none() {
					builder.push_text(text.as_deref().unwrap_or_default());
				}
			}
			MarkupKind::Comment | MarkupKind::Declaration => {}
		}
	}

	Ok(builder.finish())
}
