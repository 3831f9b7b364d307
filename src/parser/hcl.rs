//! HCL file parser implementation.
//!
//! This module provides the structural parse using the `hcl-rs` crate and
//! converts its syntax tree into the crate's [`ParsedConfig`] model.

use crate::error::{IacDriftError, Result};
use crate::parser::tree::{Block, Body, ParsedConfig};
use crate::parser::Parser;

use hcl::expr::TemplateExpr;
use hcl::{Expression, ObjectKey, Value};
use std::path::Path;

/// HCL parser for Terraform/OpenTofu files.
///
/// Stateless; one instance can be shared by every worker thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct HclParser;

impl HclParser {
    /// Create a new HCL parser.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Parser for HclParser {
    fn parse_content(&self, content: &str, file_path: &Path) -> Result<ParsedConfig> {
        let body: hcl::Body = hcl::from_str(content).map_err(|e| {
            IacDriftError::hcl_parse(file_path.to_path_buf(), e.to_string(), file!(), line!())
        })?;

        let config = ParsedConfig::new(convert_body(body));
        tracing::trace!(
            file = %file_path.display(),
            entries = config.body().len(),
            "Parsed HCL body"
        );
        Ok(config)
    }
}

/// Convert an `hcl-rs` body, keeping declaration order.
fn convert_body(body: hcl::Body) -> Body {
    let mut out = Body::new();

    for structure in body.into_inner() {
        match structure {
            hcl::Structure::Attribute(attr) => {
                let key = attr.key.as_str().to_string();
                out.insert_attribute(key, expression_to_value(attr.expr));
            }
            hcl::Structure::Block(block) => {
                let keyword = block.identifier.as_str().to_string();
                let labels = block
                    .labels
                    .iter()
                    .map(|label| label.as_str().to_string())
                    .collect();
                out.push_block(keyword, Block::new(labels, convert_body(block.body)));
            }
        }
    }

    out
}

/// Convert an expression to a value.
///
/// Literals map directly. Anything that needs evaluation (references,
/// function calls, conditionals, `for` expressions) is kept as its
/// interpolation string so it survives re-rendering unchanged.
fn expression_to_value(expr: Expression) -> Value {
    match expr {
        Expression::Null => Value::Null,
        Expression::Bool(b) => Value::Bool(b),
        Expression::Number(n) => Value::Number(n),
        Expression::String(s) => Value::String(s),
        Expression::Array(items) => {
            Value::Array(items.into_iter().map(expression_to_value).collect())
        }
        Expression::Object(object) => Value::Object(
            object
                .into_iter()
                .map(|(key, value)| (object_key_to_string(&key), expression_to_value(value)))
                .collect(),
        ),
        Expression::TemplateExpr(template) => match *template {
            TemplateExpr::QuotedString(text) => Value::String(text),
            TemplateExpr::Heredoc(heredoc) => Value::String(heredoc.template),
        },
        other => Value::String(interpolation(&other)),
    }
}

/// Render a non-literal expression as `${...}`.
fn interpolation(expr: &Expression) -> String {
    let text = hcl::format::to_string(expr).unwrap_or_else(|_| format!("{expr:?}"));
    format!("${{{text}}}")
}

/// Convert an object key to a string.
fn object_key_to_string(key: &ObjectKey) -> String {
    match key {
        ObjectKey::Identifier(id) => id.as_str().to_string(),
        ObjectKey::Expression(Expression::String(s)) => s.clone(),
        ObjectKey::Expression(expr) => hcl::format::to_string(expr).unwrap_or_default(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Entry, ParseOutcome};
    use crate::types::SourceFile;

    fn parse(content: &str) -> ParsedConfig {
        HclParser::new()
            .parse_content(content, Path::new("test.tf"))
            .unwrap()
    }

    #[test]
    fn test_parse_resource_and_provider() {
        let config = parse(
            r#"
resource "aws_instance" "web" {
  ami = "x"
}

provider "aws" {
  region = "us-east-1"
}
"#,
        );

        let resources = config.blocks("resource");
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].labels, vec!["aws_instance", "web"]);
        assert_eq!(
            resources[0].body.attribute("ami"),
            Some(&Value::String("x".to_string()))
        );

        let providers = config.blocks("provider");
        assert_eq!(providers[0].label(0), Some("aws"));
        assert_eq!(
            providers[0].body.attribute("region"),
            Some(&Value::String("us-east-1".to_string()))
        );
    }

    #[test]
    fn test_parse_keeps_declaration_order_of_blocks() {
        let config = parse(
            r#"
resource "aws_s3_bucket" "b" {}
resource "aws_s3_bucket" "a" {}
"#,
        );

        let names: Vec<_> = config
            .blocks("resource")
            .iter()
            .filter_map(|b| b.label(1))
            .collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn test_parse_nested_blocks() {
        let config = parse(
            r#"
resource "aws_security_group" "sg" {
  name = "sg"

  ingress {
    from_port = 443
  }

  ingress {
    from_port = 80
  }
}
"#,
        );

        let sg = &config.blocks("resource")[0];
        match sg.body.get("ingress") {
            Some(Entry::Blocks(blocks)) => assert_eq!(blocks.len(), 2),
            other => panic!("expected nested blocks, got {other:?}"),
        }
    }

    #[test]
    fn test_template_keeps_interpolation_text() {
        let config = parse(
            r#"
resource "aws_instance" "web" {
  instance_type = "${var.instance_type}"
}
"#,
        );

        let web = &config.blocks("resource")[0];
        assert_eq!(
            web.body.attribute("instance_type"),
            Some(&Value::String("${var.instance_type}".to_string()))
        );
    }

    #[test]
    fn test_heredoc_keeps_template_text() {
        let config = parse(
            "resource \"aws_iam_policy\" \"p\" {\n  policy = <<EOT\nallow ${var.bucket}\nEOT\n}\n",
        );

        let policy = &config.blocks("resource")[0];
        match policy.body.attribute("policy") {
            Some(Value::String(text)) => assert!(text.starts_with("allow ${var.bucket}")),
            other => panic!("expected heredoc text, got {other:?}"),
        }
    }

    #[test]
    fn test_traversal_becomes_interpolation() {
        let config = parse(
            r#"
provider "aws" {
  region = var.region
}
"#,
        );

        let aws = &config.blocks("provider")[0];
        assert_eq!(
            aws.body.attribute("region"),
            Some(&Value::String("${var.region}".to_string()))
        );
    }

    #[test]
    fn test_object_values() {
        let config = parse(
            r#"
locals {
  tags = {
    Name = "web"
    Env  = "prod"
  }
}
"#,
        );

        let locals = &config.blocks("locals")[0];
        match locals.body.attribute("tags") {
            Some(Value::Object(map)) => {
                assert_eq!(map.get("Name"), Some(&Value::String("web".to_string())));
                assert_eq!(map.len(), 2);
            }
            other => panic!("expected object, got {other:?}"),
        }
    }

    #[test]
    fn test_tfvars_attributes() {
        let config = parse("instance_type = \"t3.micro\"\ncount_hint = true\n");
        let attrs: Vec<_> = config.attributes().map(|(k, _)| k).collect();
        assert_eq!(attrs, vec!["instance_type", "count_hint"]);
    }

    #[test]
    fn test_parse_invalid_hcl() {
        let result = HclParser::new().parse_content("this is not valid { hcl", Path::new("test.tf"));
        assert!(matches!(result, Err(IacDriftError::HclParse { .. })));
    }

    #[test]
    fn test_parse_outcome_unparsed() {
        let source = SourceFile::new("bad.tf", "bad.tf", "resource \"a\" \"b\" {\n  x = 1\n");
        match HclParser::new().parse(&source) {
            ParseOutcome::Unparsed { reason } => assert!(!reason.is_empty()),
            ParseOutcome::Parsed(_) => panic!("unbalanced braces must not parse"),
        }
    }
}
