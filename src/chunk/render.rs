//! HCL rendering of structured chunk content.

use crate::parser::{Block, Body, Entry};
use hcl::Value;
use regex::Regex;
use std::fmt::Write;
use std::sync::LazyLock;

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").expect("Invalid regex"));

const INDENT: &str = "  ";

/// Render a block with its header, e.g. `resource "aws_instance" "web" { ... }`.
#[must_use]
pub fn render_block(keyword: &str, block: &Block) -> String {
    let mut out = String::new();
    write_block(&mut out, keyword, block, 0);
    out.truncate(out.trim_end().len());
    out
}

fn write_block(out: &mut String, keyword: &str, block: &Block, depth: usize) {
    let pad = INDENT.repeat(depth);
    out.push_str(&pad);
    out.push_str(keyword);
    for label in &block.labels {
        out.push(' ');
        out.push_str(&quote(label));
    }

    if block.body.is_empty() {
        out.push_str(" {}\n");
        return;
    }

    out.push_str(" {\n");
    write_body(out, &block.body, depth + 1);
    out.push_str(&pad);
    out.push_str("}\n");
}

fn write_body(out: &mut String, body: &Body, depth: usize) {
    let pad = INDENT.repeat(depth);
    for (key, entry) in body.iter() {
        match entry {
            Entry::Attribute(value) => {
                let _ = writeln!(out, "{pad}{} = {}", render_key(key), render_value(value, depth));
            }
            Entry::Blocks(blocks) => {
                for block in blocks {
                    write_block(out, key, block, depth);
                }
            }
        }
    }
}

/// Render a value as an HCL expression at the given nesting depth.
#[must_use]
pub fn render_value(value: &Value, depth: usize) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote(s),
        Value::Array(items) if items.is_empty() => "[]".to_string(),
        Value::Array(items) if items.iter().all(is_scalar) => {
            let inner: Vec<String> = items.iter().map(|v| render_value(v, depth)).collect();
            format!("[{}]", inner.join(", "))
        }
        Value::Array(items) => {
            let pad = INDENT.repeat(depth + 1);
            let mut out = String::from("[\n");
            for item in items {
                let _ = writeln!(out, "{pad}{},", render_value(item, depth + 1));
            }
            out.push_str(&INDENT.repeat(depth));
            out.push(']');
            out
        }
        Value::Object(map) if map.is_empty() => "{}".to_string(),
        Value::Object(map) => {
            let pad = INDENT.repeat(depth + 1);
            let mut out = String::from("{\n");
            for (key, v) in map {
                let _ = writeln!(out, "{pad}{} = {}", render_key(key), render_value(v, depth + 1));
            }
            out.push_str(&INDENT.repeat(depth));
            out.push('}');
            out
        }
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

fn render_key(key: &str) -> String {
    if IDENTIFIER.is_match(key) {
        key.to_string()
    } else {
        quote(key)
    }
}

/// Quote a string literal. JSON escapes are valid HCL escapes.
fn quote(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{s}\""))
}
