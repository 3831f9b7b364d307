//! Canonicalizer.

use crate::parser::{Body, CanonicalConfig, Entry, ParsedConfig};
use hcl::Value;

/// Sort every mapping's keys, recursively.
///
/// Block sequences and arrays keep their order: repeated blocks of one type
/// are meaningful in declaration order. Running this on an already canonical
/// tree changes nothing.
#[must_use]
pub fn canonicalize(mut config: ParsedConfig) -> CanonicalConfig {
    sort_body(config.body_mut());
    CanonicalConfig::from_sorted(config)
}

fn sort_body(body: &mut Body) {
    body.sort_keys();
    for (_, entry) in body.iter_mut() {
        match entry {
            Entry::Attribute(value) => sort_value(value),
            Entry::Blocks(blocks) => {
                for block in blocks {
                    sort_body(&mut block.body);
                }
            }
        }
    }
}

pub(crate) fn sort_value(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.sort_keys();
            for (_, v) in map.iter_mut() {
                sort_value(v);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(sort_value),
        _ => {}
    }
}
