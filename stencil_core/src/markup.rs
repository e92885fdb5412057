use std::ops::Range;

use logos::Lexer;
use logos::Logos;

use crate::StencilError;
use crate::StencilResult;
use crate::decode_html;

/// Raw tokens produced by logos. Only the `<` boundaries are found by the
/// lexer, the tag grammar is resolved by the walker.
#[derive(Logos, Debug, PartialEq)]
enum RawToken {
	#[token("<")]
	Lt,
	#[regex(r"[^<]+")]
	Text,
}

/// Elements that never have content or an end tag.
const VOID_ELEMENTS: [&str; 14] = [
	"area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
	"track", "wbr",
];

/// Elements whose content is raw text up to the matching end tag.
const RAW_TEXT_ELEMENTS: [&str; 3] = ["script", "style", "textarea"];

/// An attribute on a start tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Attribute {
	pub name: String,
	/// Entity-decoded value.
	pub value: String,
	/// The value as written in the source, without quotes.
	pub raw_value: String,
}

/// A parsed start tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StartTag {
	/// Lowercase element name.
	pub name: String,
	pub attributes: Vec<Attribute>,
	/// Written as `<name />` or a void element.
	pub self_closing: bool,
}

impl StartTag {
	pub fn attribute(&self, name: &str) -> Option<&str> {
		self.attributes
			.iter()
			.find(|attribute| attribute.name == name)
			.map(|attribute| attribute.value.as_str())
	}

	pub fn raw_attribute(&self, name: &str) -> Option<&str> {
		self.attributes
			.iter()
			.find(|attribute| attribute.name == name)
			.map(|attribute| attribute.raw_value.as_str())
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MarkupKind {
	Start(StartTag),
	/// Lowercase element name.
	End(String),
	/// Text content, still entity-encoded.
	Text,
	/// `<!-- ... -->`
	Comment,
	/// `<!DOCTYPE ...>` and friends.
	Declaration,
}

/// One event of the markup stream together with its source span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MarkupEvent<'a> {
	pub kind: MarkupKind,
	/// The exact source text of the event.
	pub raw: &'a str,
	pub span: Range<usize>,
}

impl MarkupEvent<'_> {
	/// Decoded text for `Text` events, `None` otherwise.
	pub fn text(&self) -> Option<String> {
		matches!(self.kind, MarkupKind::Text).then(|| decode_html(self.raw))
	}
}

/// Walks the logos token stream and resolves tags, comments and text.
struct MarkupWalker<'a> {
	source: &'a str,
	lexer: Lexer<'a, RawToken>,
	events: Vec<MarkupEvent<'a>>,
	/// Start of a pending run of text, merged until the next tag.
	text_start: Option<usize>,
	/// Keep an unterminated comment as text instead of failing.
	lenient: bool,
}

impl<'a> MarkupWalker<'a> {
	fn new(source: &'a str, lenient: bool) -> Self {
		Self {
			source,
			lexer: RawToken::lexer(source),
			events: vec![],
			text_start: None,
			lenient,
		}
	}

	fn extend_text(&mut self, start: usize) {
		self.text_start.get_or_insert(start);
	}

	fn flush_text(&mut self, end: usize) {
		if let Some(start) = self.text_start.take() {
			if start < end {
				self.push(MarkupKind::Text, start..end);
			}
		}
	}

	fn push(&mut self, kind: MarkupKind, span: Range<usize>) {
		self.events.push(MarkupEvent {
			kind,
			raw: &self.source[span.clone()],
			span,
		});
	}

	fn process(mut self) -> StencilResult<Vec<MarkupEvent<'a>>> {
		while let Some(token) = self.lexer.next() {
			let span = self.lexer.span();

			match token {
				Ok(RawToken::Lt) => self.process_lt(span.start)?,
				Ok(RawToken::Text) | Err(()) => self.extend_text(span.start),
			}
		}

		self.flush_text(self.source.len());

		Ok(self.events)
	}

	/// Resolve whatever starts at a `<`. Anything that is not a well-formed
	/// tag, comment or declaration is kept as text.
	fn process_lt(&mut self, start: usize) -> StencilResult<()> {
		let rest = &self.source[start..];

		let resolved = if rest.starts_with("<!--") {
			match memstr(&rest.as_bytes()[4..], b"-->") {
				Some(close) => Some((MarkupKind::Comment, 4 + close + 3)),
				None if self.lenient => None,
				None => {
					return Err(StencilError::MalformedMarkup {
						offset: start,
						reason: "unterminated comment".to_string(),
					});
				}
			}
		} else if rest.starts_with("<!") || rest.starts_with("<?") {
			rest.find('>').map(|end| (MarkupKind::Declaration, end + 1))
		} else if let Some(after) = rest.strip_prefix("</") {
			parse_end_tag(after).map(|(name, len)| (MarkupKind::End(name), len + 2))
		} else {
			parse_start_tag(&rest[1..]).map(|(tag, len)| (MarkupKind::Start(tag), len + 1))
		};

		let Some((kind, len)) = resolved else {
			self.extend_text(start);
			return Ok(());
		};

		self.flush_text(start);
		self.lexer.bump(len - 1);

		let raw_text_element = match &kind {
			MarkupKind::Start(tag) if !tag.self_closing => RAW_TEXT_ELEMENTS
				.contains(&tag.name.as_str())
				.then(|| tag.name.clone()),
			_ => None,
		};

		self.push(kind, start..start + len);

		if let Some(name) = raw_text_element {
			self.skip_raw_text(&name, start + len);
		}

		Ok(())
	}

	/// Emit the content of a raw text element as a single text event, leaving
	/// the lexer at its end tag.
	fn skip_raw_text(&mut self, name: &str, from: usize) {
		let needle = format!("</{name}");
		let rest = self.source[from..].to_ascii_lowercase();
		let len = memstr(rest.as_bytes(), needle.as_bytes()).unwrap_or(rest.len());

		if len > 0 {
			self.push(MarkupKind::Text, from..from + len);
			self.lexer.bump(len);
		}
	}
}

/// Parse `name>` or `name  >` after `</`, returning the lowercase name and the
/// consumed length.
fn parse_end_tag(after: &str) -> Option<(String, usize)> {
	let name_len = tag_name_len(after)?;
	let close = after[name_len..].find('>')?;

	if !after[name_len..name_len + close].trim().is_empty() {
		return None;
	}

	Some((after[..name_len].to_ascii_lowercase(), name_len + close + 1))
}

/// Parse a start tag after the `<`, returning the tag and the consumed length.
fn parse_start_tag(after: &str) -> Option<(StartTag, usize)> {
	let name_len = tag_name_len(after)?;
	let name = after[..name_len].to_ascii_lowercase();
	let bytes = after.as_bytes();

	let first = *bytes.get(name_len)?;
	if !matches!(first, b'>' | b'/' | b' ' | b'\t' | b'\r' | b'\n') {
		return None;
	}

	let mut attributes = Vec::new();
	let mut index = name_len;
	let mut self_closing = false;

	loop {
		while index < bytes.len() && bytes[index].is_ascii_whitespace() {
			index += 1;
		}

		match bytes.get(index)? {
			b'>' => {
				index += 1;
				break;
			}
			b'/' => {
				self_closing = bytes.get(index + 1) == Some(&b'>');
				index += 1;
				continue;
			}
			_ => {}
		}

		let name_start = index;
		while index < bytes.len()
			&& !bytes[index].is_ascii_whitespace()
			&& !matches!(bytes[index], b'=' | b'>' | b'/')
		{
			index += 1;
		}
		let attribute_name = after[name_start..index].to_ascii_lowercase();

		while index < bytes.len() && bytes[index].is_ascii_whitespace() {
			index += 1;
		}

		let mut raw_value = "";
		if bytes.get(index) == Some(&b'=') {
			index += 1;
			while index < bytes.len() && bytes[index].is_ascii_whitespace() {
				index += 1;
			}

			match bytes.get(index)? {
				quote @ (b'"' | b'\'') => {
					let close = after[index + 1..].find(*quote as char)?;
					raw_value = &after[index + 1..index + 1 + close];
					index += close + 2;
				}
				_ => {
					let value_start = index;
					while index < bytes.len()
						&& !bytes[index].is_ascii_whitespace()
						&& bytes[index] != b'>'
					{
						index += 1;
					}
					raw_value = &after[value_start..index];
				}
			}
		}

		attributes.push(Attribute {
			name: attribute_name,
			value: decode_html(raw_value),
			raw_value: raw_value.to_string(),
		});
	}

	let self_closing = self_closing || VOID_ELEMENTS.contains(&name.as_str());

	Some((
		StartTag {
			name,
			attributes,
			self_closing,
		},
		index,
	))
}

/// Length of a tag name (`[a-zA-Z][a-zA-Z0-9-]*`) at the start of `value`.
fn tag_name_len(value: &str) -> Option<usize> {
	let bytes = value.as_bytes();
	if !bytes.first()?.is_ascii_alphabetic() {
		return None;
	}

	Some(
		bytes
			.iter()
			.position(|byte| !(byte.is_ascii_alphanumeric() || *byte == b'-'))
			.unwrap_or(bytes.len()),
	)
}

pub(crate) fn memstr(haystack: &[u8], needle: &[u8]) -> Option<usize> {
	haystack
		.windows(needle.len())
		.position(|window| window == needle)
}

/// Split markup into tags, text, comments and declarations. Text events are
/// merged across stray `<` characters and are not decoded.
pub(crate) fn tokenize(source: &str) -> StencilResult<Vec<MarkupEvent<'_>>> {
	MarkupWalker::new(source, false).process()
}

/// Like [`tokenize`], but an unterminated comment opener is kept as text.
pub(crate) fn tokenize_lenient(source: &str) -> StencilResult<Vec<MarkupEvent<'_>>> {
	MarkupWalker::new(source, true).process()
}
