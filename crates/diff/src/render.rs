//! Rendering of diff trees as text.
//!
//! Two renderers are provided:
//! - [`AsciiRenderer`] prints the compared structure as JSON with a marker
//!   column (` `, `-`, `+`) in front of every line.
//! - [`UnifiedRenderer`] serializes both sides to YAML and prints a unified
//!   text diff, highlighted with syntect when color is requested.

use std::{
	fmt::{self, Write as _},
	sync::OnceLock,
};

use nu_ansi_term::{Color, Style};
use serde_json::Value;
use similar::TextDiff;
use syntect::{
	easy::HighlightLines,
	highlighting::{self, FontStyle, Theme, ThemeSet},
	parsing::SyntaxSet,
};
use thiserror::Error;

use crate::{
	tree::{Delta, DiffTree},
	yaml,
};

/// Errors that can occur while rendering a diff.
#[derive(Debug, Error)]
pub enum RenderError {
	#[error("formatting diff text")]
	Format(#[from] fmt::Error),

	#[error("converting {side} state to YAML")]
	Yaml {
		side: &'static str,
		#[source]
		source: serde_yaml_with_quirks::Error,
	},

	#[error("syntax highlighting not available: {0}")]
	SyntaxNotFound(String),

	#[error("highlighting diff text")]
	Highlight(#[source] syntect::Error),
}

/// Turns a diff tree into text.
pub trait DiffRenderer {
	fn render(&self, tree: &DiffTree, use_color: bool) -> Result<String, RenderError>;
}

/// JSON-shaped rendering with a marker column.
///
/// ```text
///  {
///    "data": {
/// -    "key": "old",
/// +    "key": "new"
///    },
///    "kind": "ConfigMap"
///  }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct AsciiRenderer;

impl DiffRenderer for AsciiRenderer {
	fn render(&self, tree: &DiffTree, use_color: bool) -> Result<String, RenderError> {
		let mut writer = AsciiWriter {
			out: String::new(),
			use_color,
		};
		writer.delta(0, &Label::Root, tree.root(), false)?;
		Ok(writer.out)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
	Same,
	Removed,
	Added,
}

impl Marker {
	fn symbol(self) -> char {
		match self {
			Self::Same => ' ',
			Self::Removed => '-',
			Self::Added => '+',
		}
	}
}

enum Label<'a> {
	Root,
	Key(&'a str),
	Index(usize),
}

impl fmt::Display for Label<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Root => Ok(()),
			Self::Key(key) => write!(f, "{}: ", Value::String((*key).to_string())),
			Self::Index(index) => write!(f, "{index}: "),
		}
	}
}

struct AsciiWriter {
	out: String,
	use_color: bool,
}

impl AsciiWriter {
	fn line(&mut self, marker: Marker, depth: usize, text: &str) -> fmt::Result {
		let line = format!("{}{}{}", marker.symbol(), "  ".repeat(depth), text);
		let style = match marker {
			Marker::Same => None,
			Marker::Removed => Some(Color::Red.normal()),
			Marker::Added => Some(Color::Green.normal()),
		};
		match style {
			Some(style) if self.use_color => writeln!(self.out, "{}", style.paint(line)),
			_ => writeln!(self.out, "{line}"),
		}
	}

	fn delta(&mut self, depth: usize, label: &Label<'_>, delta: &Delta, comma: bool) -> fmt::Result {
		match delta {
			Delta::Same(v) => self.value(Marker::Same, depth, label, v, comma),
			Delta::Removed(v) => self.value(Marker::Removed, depth, label, v, comma),
			Delta::Added(v) => self.value(Marker::Added, depth, label, v, comma),
			Delta::Replaced { old, new } => {
				self.value(Marker::Removed, depth, label, old, comma)?;
				self.value(Marker::Added, depth, label, new, comma)
			}
			Delta::Object(children) => {
				self.open(Marker::Same, depth, label, '{', children.is_empty(), comma)?;
				if children.is_empty() {
					return Ok(());
				}
				for (i, (key, child)) in children.iter().enumerate() {
					self.delta(depth + 1, &Label::Key(key), child, i + 1 < children.len())?;
				}
				self.close(Marker::Same, depth, '}', comma)
			}
			Delta::Array(items) => {
				self.open(Marker::Same, depth, label, '[', items.is_empty(), comma)?;
				if items.is_empty() {
					return Ok(());
				}
				for (i, child) in items.iter().enumerate() {
					self.delta(depth + 1, &Label::Index(i), child, i + 1 < items.len())?;
				}
				self.close(Marker::Same, depth, ']', comma)
			}
		}
	}

	fn value(
		&mut self,
		marker: Marker,
		depth: usize,
		label: &Label<'_>,
		value: &Value,
		comma: bool,
	) -> fmt::Result {
		match value {
			Value::Object(map) => {
				self.open(marker, depth, label, '{', map.is_empty(), comma)?;
				if map.is_empty() {
					return Ok(());
				}
				let mut entries: Vec<_> = map.iter().collect();
				entries.sort_by(|(a, _), (b, _)| a.cmp(b));
				for (i, (key, child)) in entries.iter().enumerate() {
					self.value(marker, depth + 1, &Label::Key(key), child, i + 1 < entries.len())?;
				}
				self.close(marker, depth, '}', comma)
			}
			Value::Array(items) => {
				self.open(marker, depth, label, '[', items.is_empty(), comma)?;
				if items.is_empty() {
					return Ok(());
				}
				for (i, child) in items.iter().enumerate() {
					self.value(marker, depth + 1, &Label::Index(i), child, i + 1 < items.len())?;
				}
				self.close(marker, depth, ']', comma)
			}
			scalar => {
				let text = format!("{label}{scalar}{}", trailing(comma));
				self.line(marker, depth, &text)
			}
		}
	}

	/// Opening bracket line; empty containers are closed on the same line.
	fn open(
		&mut self,
		marker: Marker,
		depth: usize,
		label: &Label<'_>,
		bracket: char,
		empty: bool,
		comma: bool,
	) -> fmt::Result {
		let text = if empty {
			format!("{label}{bracket}{}{}", closing(bracket), trailing(comma))
		} else {
			format!("{label}{bracket}")
		};
		self.line(marker, depth, &text)
	}

	fn close(&mut self, marker: Marker, depth: usize, bracket: char, comma: bool) -> fmt::Result {
		let text = format!("{bracket}{}", trailing(comma));
		self.line(marker, depth, &text)
	}
}

fn closing(bracket: char) -> char {
	if bracket == '{' {
		'}'
	} else {
		']'
	}
}

fn trailing(comma: bool) -> &'static str {
	if comma {
		","
	} else {
		""
	}
}

/// Unified text diff of both sides serialized as YAML.
#[derive(Debug, Clone, Copy)]
pub struct UnifiedRenderer {
	context_radius: usize,
}

impl Default for UnifiedRenderer {
	fn default() -> Self {
		Self { context_radius: 3 }
	}
}

impl DiffRenderer for UnifiedRenderer {
	fn render(&self, tree: &DiffTree, use_color: bool) -> Result<String, RenderError> {
		let live = yaml::to_yaml(&tree.live()).map_err(|source| RenderError::Yaml {
			side: "live",
			source,
		})?;
		let config = yaml::to_yaml(&tree.config()).map_err(|source| RenderError::Yaml {
			side: "config",
			source,
		})?;

		let diff = TextDiff::from_lines(&live, &config)
			.unified_diff()
			.context_radius(self.context_radius)
			.header("a/live", "b/config")
			.to_string();

		if use_color {
			highlight(&diff)
		} else {
			Ok(diff)
		}
	}
}

static SYNTAX_SET: OnceLock<SyntaxSet> = OnceLock::new();
static THEME_SET: OnceLock<ThemeSet> = OnceLock::new();

fn syntax_set() -> &'static SyntaxSet {
	SYNTAX_SET.get_or_init(SyntaxSet::load_defaults_newlines)
}

fn theme() -> &'static Theme {
	&THEME_SET.get_or_init(ThemeSet::load_defaults).themes["base16-ocean.dark"]
}

/// Highlight unified diff text with the `diff` grammar.
fn highlight(diff: &str) -> Result<String, RenderError> {
	let ss = syntax_set();
	let syntax = ss
		.find_syntax_by_extension("diff")
		.ok_or_else(|| RenderError::SyntaxNotFound("diff".to_string()))?;
	let mut highlighter = HighlightLines::new(syntax, theme());

	let mut out = String::with_capacity(diff.len() * 2);
	for line in diff.lines() {
		let regions = highlighter
			.highlight_line(line, ss)
			.map_err(RenderError::Highlight)?;
		for (style, text) in regions {
			write!(out, "{}", escaped(style, text))?;
		}
		out.push('\n');
	}
	Ok(out)
}

/// Terminal color for a syntect color.
///
/// Themes encode palette colors with alpha 0 and the palette index in the
/// red channel; alpha 1 means the terminal default.
fn to_ansi_color(color: highlighting::Color) -> Option<Color> {
	match color.a {
		0 => Some(match color.r {
			0x00 => Color::Black,
			0x01 => Color::Red,
			0x02 => Color::Green,
			0x03 => Color::Yellow,
			0x04 => Color::Blue,
			0x05 => Color::Purple,
			0x06 => Color::Cyan,
			0x07 => Color::White,
			n => Color::Fixed(n),
		}),
		1 => None,
		_ => Some(Color::Rgb(color.r, color.g, color.b)),
	}
}

fn escaped(style: highlighting::Style, text: &str) -> String {
	if text.is_empty() {
		return String::new();
	}

	let mut ansi = Style {
		foreground: to_ansi_color(style.foreground),
		..Style::default()
	};
	if style.font_style.contains(FontStyle::BOLD) {
		ansi = ansi.bold();
	}
	if style.font_style.contains(FontStyle::UNDERLINE) {
		ansi = ansi.underline();
	}
	if style.font_style.contains(FontStyle::ITALIC) {
		ansi = ansi.italic();
	}
	ansi.paint(text).to_string()
}

#[cfg(test)]
mod tests {
	use indoc::indoc;
	use serde_json::json;

	use super::*;

	fn ascii(live: &Value, config: &Value) -> String {
		AsciiRenderer
			.render(&DiffTree::compute(live, config), false)
			.unwrap()
	}

	#[test]
	fn test_ascii_replaced_scalar() {
		let out = ascii(
			&json!({"kind": "ConfigMap", "data": {"key": "old"}}),
			&json!({"kind": "ConfigMap", "data": {"key": "new"}}),
		);

		assert_eq!(
			out,
			indoc! {r#"
				 {
				   "data": {
				-    "key": "old"
				+    "key": "new"
				   },
				   "kind": "ConfigMap"
				 }
			"#}
		);
	}

	#[test]
	fn test_ascii_added_and_removed_containers() {
		let out = ascii(
			&json!({"status": {"ready": true}, "spec": {"ports": [80]}}),
			&json!({"spec": {"ports": [80, 443]}, "labels": {}}),
		);

		assert_eq!(
			out,
			indoc! {r#"
				 {
				+  "labels": {},
				   "spec": {
				     "ports": [
				       0: 80,
				+      1: 443
				     ]
				   },
				-  "status": {
				-    "ready": true
				-  }
				 }
			"#}
		);
	}

	#[test]
	fn test_ascii_unchanged_tree_has_no_markers() {
		let value = json!({"a": [1, {"b": null}]});
		let out = ascii(&value, &value);
		assert!(out.lines().all(|line| line.starts_with(' ')));
	}

	#[test]
	fn test_ascii_color_marks_changed_lines_only() {
		let tree = DiffTree::compute(&json!({"a": 1, "b": 2}), &json!({"a": 1, "b": 3}));
		let out = AsciiRenderer.render(&tree, true).unwrap();

		let lines: Vec<_> = out.lines().collect();
		assert_eq!(lines[1], "   \"a\": 1,");
		assert_eq!(
			lines[2],
			Color::Red.normal().paint("-  \"b\": 2").to_string()
		);
		assert_eq!(
			lines[3],
			Color::Green.normal().paint("+  \"b\": 3").to_string()
		);
	}

	#[test]
	fn test_unified_headers_and_hunk() {
		let tree = DiffTree::compute(
			&json!({"data": {"key": "old"}, "kind": "ConfigMap"}),
			&json!({"data": {"key": "new"}, "kind": "ConfigMap"}),
		);
		let out = UnifiedRenderer::default().render(&tree, false).unwrap();

		let patch = patch::Patch::from_single(&out).expect("valid unified diff");
		assert_eq!(patch.old.path, "a/live");
		assert_eq!(patch.new.path, "b/config");
		assert!(out.contains("-  key: old\n"));
		assert!(out.contains("+  key: new\n"));
	}

	#[test]
	fn test_to_ansi_color() {
		let palette = highlighting::Color {
			r: 0x02,
			g: 0,
			b: 0,
			a: 0,
		};
		assert_eq!(to_ansi_color(palette), Some(Color::Green));

		let default = highlighting::Color {
			r: 255,
			g: 255,
			b: 255,
			a: 1,
		};
		assert_eq!(to_ansi_color(default), None);

		let rgb = highlighting::Color {
			r: 100,
			g: 150,
			b: 200,
			a: 255,
		};
		assert_eq!(to_ansi_color(rgb), Some(Color::Rgb(100, 150, 200)));
	}
}
