use regex::CaptureMatches;
use regex::Regex;
use serde::Serialize;

use crate::MarkerGrammar;
use crate::StencilError;
use crate::StencilResult;

/// A single marker found in scanned text.
///
/// Offsets are byte offsets into the scanned text: `start` points at the first
/// byte of the start delimiter and `end` one past the last byte of the end
/// delimiter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkerOccurrence {
	/// The text between the delimiters, verbatim.
	pub raw_body: String,
	/// Offset of the start delimiter.
	pub start: usize,
	/// Offset just past the end delimiter.
	pub end: usize,
}

impl MarkerOccurrence {
	/// The byte range covered by the marker including its delimiters.
	pub fn span(&self) -> std::ops::Range<usize> {
		self.start..self.end
	}
}

/// A piece of text partitioned by [`Scanner::split`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment<'t> {
	/// Plain text between markers. Never empty.
	Text(&'t str),
	/// A marker body.
	Marker(&'t str),
}

/// Finds marker occurrences for one [`MarkerGrammar`].
///
/// A marker is the shortest span from a start delimiter to the next end
/// delimiter on the same line. Matching resumes after the previous match so
/// occurrences never overlap, and an unterminated start delimiter is left as
/// literal text.
#[derive(Debug, Clone)]
pub struct Scanner {
	regex: Regex,
}

impl Scanner {
	pub fn new(grammar: &MarkerGrammar) -> StencilResult<Self> {
		grammar.validate()?;

		let pattern = format!(
			"{}(.*?){}",
			regex::escape(&grammar.start),
			regex::escape(&grammar.end)
		);
		let regex = Regex::new(&pattern).map_err(|e| StencilError::InvalidGrammar(e.to_string()))?;

		Ok(Self { regex })
	}

	/// Lazily enumerate the markers in `text`, left to right. The returned
	/// iterator borrows the scanner, so the same text can be scanned again
	/// with identical results.
	pub fn scan<'r, 't>(&'r self, text: &'t str) -> Occurrences<'r, 't> {
		Occurrences {
			captures: self.regex.captures_iter(text),
		}
	}

	/// Returns `true` if `text` contains at least one marker.
	pub fn has_markers(&self, text: &str) -> bool {
		self.regex.is_match(text)
	}

	/// Partition `text` into alternating text and marker fragments. Empty text
	/// fragments between adjacent markers are dropped.
	pub fn split<'t>(&self, text: &'t str) -> Vec<Fragment<'t>> {
		let mut fragments = Vec::new();
		let mut cursor = 0;

		for captures in self.regex.captures_iter(text) {
			let (Some(whole), Some(body)) = (captures.get(0), captures.get(1)) else {
				continue;
			};

			if whole.start() > cursor {
				fragments.push(Fragment::Text(&text[cursor..whole.start()]));
			}

			fragments.push(Fragment::Marker(body.as_str()));
			cursor = whole.end();
		}

		if cursor < text.len() {
			fragments.push(Fragment::Text(&text[cursor..]));
		}

		fragments
	}

	/// Replace every marker in `text` with the output of `replacement`, which
	/// receives the marker body. Substitutions are applied left to right.
	pub fn replace_all(&self, text: &str, mut replacement: impl FnMut(&str) -> String) -> String {
		let mut output = String::with_capacity(text.len());

		for fragment in self.split(text) {
			match fragment {
				Fragment::Text(text) => output.push_str(text),
				Fragment::Marker(body) => output.push_str(&replacement(body)),
			}
		}

		output
	}
}

/// Iterator over the markers of one text, produced by [`Scanner::scan`].
pub struct Occurrences<'r, 't> {
	captures: CaptureMatches<'r, 't>,
}

impl Iterator for Occurrences<'_, '_> {
	type Item = MarkerOccurrence;

	fn next(&mut self) -> Option<Self::Item> {
		loop {
			let captures = self.captures.next()?;
			let (Some(whole), Some(body)) = (captures.get(0), captures.get(1)) else {
				continue;
			};

			return Some(MarkerOccurrence {
				raw_body: body.as_str().to_string(),
				start: whole.start(),
				end: whole.end(),
			});
		}
	}
}

/// Scan `text` for markers of `grammar`, collecting every occurrence.
pub fn scan(text: &str, grammar: &MarkerGrammar) -> StencilResult<Vec<MarkerOccurrence>> {
	let scanner = Scanner::new(grammar)?;
	let occurrences: Vec<_> = scanner.scan(text).collect();
	tracing::trace!(count = occurrences.len(), "scanned markers");

	Ok(occurrences)
}
