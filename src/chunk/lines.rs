//! Source line attribution.
//!
//! Structured chunks are re-rendered from the canonical tree, so their text
//! no longer matches the file byte for byte. [`LineLocator`] finds them again
//! by header: it builds a pattern for `kind "label" ... {`, finds the n-th
//! occurrence outside comments and follows braces to the closing line.
//!
//! When no header matches, the first line of the rendered content is looked
//! up instead. When that fails too, the whole file is attributed.

use crate::types::{ChunkKind, LineSpan, RawChunk};
use regex::Regex;

/// Line index over one file's text.
#[derive(Debug)]
pub struct LineLocator<'a> {
    text: &'a str,
    lines: Vec<&'a str>,
    starts: Vec<usize>,
    /// Per line: true when it is blank, a comment, or inside `/* */`.
    skip: Vec<bool>,
}

impl<'a> LineLocator<'a> {
    /// Index `text`.
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        let lines: Vec<&str> = text.lines().collect();
        let starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .take(lines.len())
            .collect();
        let skip = comment_mask(&lines);
        Self { text, lines, starts, skip }
    }

    /// Number of lines in the file (at least 1).
    #[must_use]
    pub fn total(&self) -> usize {
        self.lines.len().max(1)
    }

    /// 1-indexed line containing byte `offset`.
    #[must_use]
    pub fn line_of(&self, offset: usize) -> usize {
        match self.starts.binary_search(&offset) {
            Ok(i) => i + 1,
            Err(i) => i.max(1),
        }
        .min(self.total())
    }

    /// Attribute a line span to `chunk`, whose rendered text is `rendered`.
    ///
    /// Always returns `1 <= start <= end <= total`.
    pub fn locate(&self, chunk: &RawChunk, rendered: &str) -> LineSpan {
        if let Some(span) = chunk.span {
            return self.clamp(span);
        }

        if let Some(span) = self.by_header(chunk.kind, &chunk.labels, chunk.occurrence) {
            return span;
        }

        if let Some(span) = self.by_content(rendered) {
            tracing::debug!(
                address = %chunk.address,
                lines = %span,
                "Header not found, located chunk by content"
            );
            return span;
        }

        tracing::warn!(
            address = %chunk.address,
            kind = %chunk.kind,
            "Could not locate chunk, attributing the whole file"
        );
        LineSpan::whole(self.total())
    }

    /// Find the `occurrence`-th header of a block and follow its braces.
    pub fn by_header(&self, kind: ChunkKind, labels: &[String], occurrence: usize) -> Option<LineSpan> {
        let pattern = header_pattern(kind, labels)?;

        let index = self
            .lines
            .iter()
            .enumerate()
            .filter(|(i, line)| !self.skip[*i] && pattern.is_match(line.trim_start()))
            .map(|(i, _)| i)
            .nth(occurrence)?;

        let start = index + 1;
        let end = match matching_brace(self.text, self.starts[index]) {
            Some(close) => self.line_of(close),
            None => {
                tracing::debug!(kind = %kind, line = start, "Unclosed block header");
                self.total()
            }
        };
        Some(self.clamp(LineSpan::new(start, end)))
    }

    /// Match the first meaningful rendered line against the file.
    fn by_content(&self, rendered: &str) -> Option<LineSpan> {
        let rendered_lines: Vec<&str> = rendered
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !is_comment(l))
            .collect();
        let first = *rendered_lines.first()?;
        let first_token = first.split_whitespace().next()?;
        let wanted = squash(first);

        let candidates = || {
            self.lines
                .iter()
                .enumerate()
                .filter(|(i, _)| !self.skip[*i])
                .map(|(i, line)| (i, line.trim()))
        };

        let index = candidates()
            .find(|(_, line)| line.contains(first) || squash(line) == wanted)
            .or_else(|| candidates().find(|(_, line)| line.starts_with(first_token)))
            .map(|(i, _)| i)?;

        let start = index + 1;
        let height = rendered.lines().count().max(1);
        Some(self.clamp(LineSpan::new(start, start + height - 1)))
    }

    fn clamp(&self, span: LineSpan) -> LineSpan {
        let total = self.total();
        LineSpan::new(span.start.min(total), span.end.min(total))
    }
}

/// Header regex for a block kind and its labels, matched on a trimmed line.
fn header_pattern(kind: ChunkKind, labels: &[String]) -> Option<Regex> {
    if matches!(kind, ChunkKind::Fallback | ChunkKind::Tfvars) {
        return None;
    }

    let mut pattern = format!("^{}", regex::escape(kind.as_str()));
    for label in labels {
        let escaped = regex::escape(label);
        pattern.push_str(&format!(r#"\s+(?:"{escaped}"|{escaped})"#));
    }
    pattern.push_str(r"\s*\{");

    Regex::new(&pattern).ok()
}

fn is_comment(trimmed: &str) -> bool {
    trimmed.starts_with('#') || trimmed.starts_with("//")
}

/// Collapse whitespace and drop quotes, for formatting-insensitive comparison.
fn squash(line: &str) -> String {
    line.split_whitespace()
        .collect::<String>()
        .replace('"', "")
}

/// Mark blank lines, comment lines and lines starting inside `/* ... */`.
fn comment_mask(lines: &[&str]) -> Vec<bool> {
    let mut in_block = false;
    lines
        .iter()
        .map(|line| {
            let started_in_block = in_block;
            in_block = block_comment_open_after(line, in_block);
            let trimmed = line.trim();
            started_in_block || trimmed.starts_with("/*") || trimmed.is_empty() || is_comment(trimmed)
        })
        .collect()
}

/// Whether a `/* ... */` comment is still open at the end of `line`.
///
/// `/*` opens one anywhere outside a string literal or a line comment.
fn block_comment_open_after(line: &str, mut in_block: bool) -> bool {
    let bytes = line.as_bytes();
    let mut in_string = false;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        let next = bytes.get(i + 1).copied();
        if in_block {
            if b == b'*' && next == Some(b'/') {
                in_block = false;
                i += 1;
            }
        } else if in_string {
            match b {
                b'\\' => i += 1,
                b'"' => in_string = false,
                _ => {}
            }
        } else {
            match (b, next) {
                (b'"', _) => in_string = true,
                (b'#', _) | (b'/', Some(b'/')) => break,
                (b'/', Some(b'*')) => {
                    in_block = true;
                    i += 1;
                }
                _ => {}
            }
        }
        i += 1;
    }

    in_block
}

/// Byte offset of the `}` closing the first `{` found at or after `from`.
///
/// Braces inside string literals and comments are ignored. Returns `None`
/// when the block never closes.
pub(crate) fn matching_brace(text: &str, from: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut opened = false;
    let mut in_string = false;
    let mut i = from;

    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            match b {
                b'\\' => i += 1,
                b'"' | b'\n' => in_string = false,
                _ => {}
            }
        } else {
            match b {
                b'"' => in_string = true,
                b'#' => i = end_of_line(bytes, i),
                b'/' if bytes.get(i + 1) == Some(&b'/') => i = end_of_line(bytes, i),
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    let close = text.get(i + 2..)?.find("*/")?;
                    i += close + 3;
                }
                b'{' => {
                    depth += 1;
                    opened = true;
                }
                b'}' if opened => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
        }
        i += 1;
    }

    None
}

fn end_of_line(bytes: &[u8], from: usize) -> usize {
    bytes[from..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |p| from + p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChunkContent;
    use test_case::test_case;

    const FILE: &str = r#"# network
provider "aws" {
  region = "us-east-1"
}

# resource "aws_instance" "web" {
resource "aws_instance" "web" {
  ami = "x"
  tags = {
    Name = "web }"
  }
}

locals {
  a = 1
}

locals { b = 2 }
"#;

    fn chunk(kind: ChunkKind, labels: &[&str], occurrence: usize) -> RawChunk {
        RawChunk {
            content: ChunkContent::Text(String::new()),
            kind,
            address: kind.to_string(),
            labels: labels.iter().map(|l| (*l).to_string()).collect(),
            occurrence,
            span: None,
        }
    }

    #[test_case(ChunkKind::Provider, &["aws"], 0, 2, 4 ; "provider")]
    #[test_case(ChunkKind::Resource, &["aws_instance", "web"], 0, 7, 12 ; "resource skips commented header")]
    #[test_case(ChunkKind::Locals, &[], 0, 14, 16 ; "first locals")]
    #[test_case(ChunkKind::Locals, &[], 1, 18, 18 ; "one-line locals")]
    fn test_locate_by_header(kind: ChunkKind, labels: &[&str], occurrence: usize, start: usize, end: usize) {
        let locator = LineLocator::new(FILE);
        let span = locator.locate(&chunk(kind, labels, occurrence), "");
        assert_eq!(span, LineSpan { start, end });
    }

    #[test]
    fn test_unquoted_labels_match() {
        let locator = LineLocator::new("provider aws {\n  region = \"x\"\n}\n");
        assert_eq!(
            locator.by_header(ChunkKind::Provider, &["aws".to_string()], 0),
            Some(LineSpan { start: 1, end: 3 })
        );
    }

    #[test]
    fn test_label_text_is_escaped() {
        let locator = LineLocator::new("module \"a.b\" {\n}\nmodule \"aXb\" {\n}\n");
        assert_eq!(
            locator.by_header(ChunkKind::Module, &["aXb".to_string()], 0),
            Some(LineSpan { start: 3, end: 4 })
        );
    }

    #[test]
    fn test_unclosed_block_runs_to_end() {
        let locator = LineLocator::new("terraform {\n  required_version = \">= 1.0\"\n");
        assert_eq!(
            locator.by_header(ChunkKind::Terraform, &[], 0),
            Some(LineSpan { start: 1, end: 2 })
        );
    }

    #[test]
    fn test_content_heuristic() {
        let locator = LineLocator::new("x = 1\nvariable  \"region\"   {\n  default = \"a\"\n}\n");
        let rendered = "variable \"region\" {\n  default = \"a\"\n}";
        let mut missing = chunk(ChunkKind::Output, &["nope"], 0);
        missing.address = "nope".to_string();
        // Header pattern for `output "nope"` fails; content heuristic finds the block.
        let span = locator.locate(&missing, rendered);
        assert_eq!(span, LineSpan { start: 2, end: 4 });
    }

    #[test]
    fn test_whole_file_when_nothing_matches() {
        let locator = LineLocator::new("a = 1\nb = 2\n");
        let span = locator.locate(&chunk(ChunkKind::Module, &["vpc"], 0), "module \"vpc\" {\n}");
        assert_eq!(span, LineSpan { start: 1, end: 2 });
    }

    #[test]
    fn test_known_span_is_clamped() {
        let locator = LineLocator::new("a\nb\nc\n");
        let mut c = chunk(ChunkKind::Fallback, &[], 0);
        c.span = Some(LineSpan::new(2, 10));
        assert_eq!(locator.locate(&c, ""), LineSpan { start: 2, end: 3 });
    }

    #[test]
    fn test_matching_brace_ignores_strings_and_comments() {
        let text = "a {\n  s = \"}{\" # }\n  // }\n  /* } */\n}\n";
        let close = matching_brace(text, 0).unwrap();
        assert_eq!(&text[close..=close], "}");
        assert_eq!(LineLocator::new(text).line_of(close), 5);
        assert_eq!(matching_brace("a {\n  b {\n}\n", 0), None);
    }

    #[test]
    fn test_block_comment_lines_skipped() {
        let locator = LineLocator::new("/*\nlocals {\n*/\nlocals {\n}\n");
        assert_eq!(
            locator.by_header(ChunkKind::Locals, &[], 0),
            Some(LineSpan { start: 4, end: 5 })
        );
    }

    #[test]
    fn test_block_comment_opened_mid_line() {
        let text = "locals {\n  x = 1 /* old:\nresource \"aws_s3_bucket\" \"logs\" {\n*/\n}\n\nresource \"aws_s3_bucket\" \"logs\" {\n}\n";
        let labels = vec!["aws_s3_bucket".to_string(), "logs".to_string()];
        assert_eq!(
            LineLocator::new(text).by_header(ChunkKind::Resource, &labels, 0),
            Some(LineSpan { start: 7, end: 8 })
        );
    }

    #[test]
    fn test_comment_markers_inside_strings_ignored() {
        let text = "locals {\n  glob = \"src/*\" # /*\n}\nlocals {\n}\n";
        assert_eq!(
            LineLocator::new(text).by_header(ChunkKind::Locals, &[], 1),
            Some(LineSpan { start: 4, end: 5 })
        );
    }
}
