//! HTML entity encoding and decoding.
//!
//! Markup handed to stencil is frequently pre-encoded (`&lt;&lt;name&gt;&gt;`),
//! so marker delimiters only become visible to the scanner after decoding.
//! Marker bodies are encoded again before they are written back into markup.

use logos::Logos;

/// Raw tokens for a single pass over encoded text. Every prefix of a
/// `Reference` is itself a match, so the lexer never has to backtrack.
#[derive(Logos, Debug, PartialEq)]
enum EntityToken {
	/// `&amp;`, `&#60;`, `&#x3C;`, or a bare `&` followed by name characters.
	#[regex(r"&[#a-zA-Z0-9]*;?")]
	Reference,
	/// Anything up to the next `&`.
	#[regex(r"[^&]+")]
	Text,
}

/// Escape `&`, `<`, `>`, `"` and `'` so the result is safe both as element
/// content and inside a double- or single-quoted attribute value.
pub fn encode_html(value: &str) -> String {
	let mut encoded = String::with_capacity(value.len());

	for ch in value.chars() {
		match ch {
			'&' => encoded.push_str("&amp;"),
			'<' => encoded.push_str("&lt;"),
			'>' => encoded.push_str("&gt;"),
			'"' => encoded.push_str("&quot;"),
			'\'' => encoded.push_str("&#39;"),
			_ => encoded.push(ch),
		}
	}

	encoded
}

/// Decode named, decimal and hexadecimal character references.
///
/// References must be terminated by `;`. Unknown names and references to
/// invalid code points are kept verbatim.
pub fn decode_html(value: &str) -> String {
	if !value.contains('&') {
		return value.to_string();
	}

	let mut decoded = String::with_capacity(value.len());
	let mut lexer = EntityToken::lexer(value);

	while let Some(token) = lexer.next() {
		let slice = lexer.slice();
		let replacement = match token {
			Ok(EntityToken::Reference) => decode_reference(slice),
			Ok(EntityToken::Text) | Err(()) => None,
		};

		match replacement {
			Some(ch) => decoded.push(ch),
			None => decoded.push_str(slice),
		}
	}

	decoded
}

/// Decode a single `&...;` reference, returning `None` when it should be kept
/// verbatim.
fn decode_reference(slice: &str) -> Option<char> {
	let inner = slice.strip_prefix('&')?.strip_suffix(';')?;

	if let Some(number) = inner.strip_prefix('#') {
		let value = match number.strip_prefix(['x', 'X']) {
			Some(hex) => u32::from_str_radix(hex, 16).ok(),
			None => number.parse::<u32>().ok(),
		};
		return code_point(value);
	}

	named_entity(inner)
}

fn code_point(value: Option<u32>) -> Option<char> {
	match value? {
		0 => None,
		value => char::from_u32(value),
	}
}

fn named_entity(name: &str) -> Option<char> {
	let ch = match name {
		"amp" => '&',
		"lt" => '<',
		"gt" => '>',
		"quot" => '"',
		"apos" => '\'',
		"nbsp" => '\u{a0}',
		"copy" => '©',
		"reg" => '®',
		"trade" => '™',
		"hellip" => '…',
		"mdash" => '—',
		"ndash" => '–',
		"lsquo" => '‘',
		"rsquo" => '’',
		"ldquo" => '“',
		"rdquo" => '”',
		"laquo" => '«',
		"raquo" => '»',
		"middot" => '·',
		"bull" => '•',
		"euro" => '€',
		"pound" => '£',
		"yen" => '¥',
		"cent" => '¢',
		"sect" => '§',
		"deg" => '°',
		"times" => '×',
		"divide" => '÷',
		_ => return None,
	};

	Some(ch)
}
