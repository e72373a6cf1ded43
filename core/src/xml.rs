//! XML response bodies as generic JSON-like trees.
//!
//! Attributes are ignored. An element with no child elements becomes its
//! text; an element with children becomes an object whose repeated child
//! names collapse into arrays in document order. Non-whitespace text next to
//! child elements is kept under `_`.

use serde_json::{Map, Value};

use crate::error::ApiError;

const TEXT_KEY: &str = "_";

/// Parse `body` into `{rootName: rootValue}`.
pub fn parse(body: &str) -> Result<Value, ApiError> {
    let doc = roxmltree::Document::parse(body).map_err(|e| ApiError::malformed(e.to_string()))?;
    let root = doc.root_element();
    let mut tree = Map::new();
    tree.insert(root.tag_name().name().to_string(), element_value(root));
    Ok(Value::Object(tree))
}

fn element_value(node: roxmltree::Node<'_, '_>) -> Value {
    let text: String = node
        .children()
        .filter(|c| c.is_text())
        .filter_map(|c| c.text())
        .collect();

    let mut children = node.children().filter(|c| c.is_element()).peekable();
    if children.peek().is_none() {
        return Value::String(text);
    }

    let mut fields = Map::new();
    if !text.trim().is_empty() {
        fields.insert(TEXT_KEY.to_string(), Value::String(text.trim().to_string()));
    }
    for child in children {
        let name = child.tag_name().name().to_string();
        let value = element_value(child);
        match fields.get_mut(&name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                fields.insert(name, value);
            }
        }
    }
    Value::Object(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn leaves_become_text_and_repeats_become_arrays() {
        let tree = parse(
            r#"<?xml version="1.0"?>
            <SearchHITsResponse>
              <SearchHITsResult>
                <NumResults>2</NumResults>
                <HIT><HITId>A</HITId></HIT>
                <HIT><HITId>B</HITId></HIT>
                <Empty/>
              </SearchHITsResult>
            </SearchHITsResponse>"#,
        )
        .unwrap();
        assert_eq!(
            tree,
            json!({"SearchHITsResponse": {"SearchHITsResult": {
                "NumResults": "2",
                "HIT": [{"HITId": "A"}, {"HITId": "B"}],
                "Empty": ""
            }}})
        );
    }

    #[test]
    fn attributes_are_ignored() {
        let tree = parse(r#"<R xmlns="http://example.com/"><Q lang="en">hi</Q></R>"#).unwrap();
        assert_eq!(tree, json!({"R": {"Q": "hi"}}));
    }

    #[test]
    fn mixed_text_is_kept_under_underscore() {
        let tree = parse("<R>note<A>1</A></R>").unwrap();
        assert_eq!(tree, json!({"R": {"_": "note", "A": "1"}}));
    }

    #[test]
    fn cdata_is_text() {
        let tree = parse("<R><Q><![CDATA[<b>x</b>]]></Q></R>").unwrap();
        assert_eq!(tree, json!({"R": {"Q": "<b>x</b>"}}));
    }

    #[test]
    fn malformed_xml_is_rejected() {
        for body in ["", "not xml", "<R><A></R>", "<R></R><S/>"] {
            let err = parse(body).unwrap_err();
            assert!(matches!(err, ApiError::MalformedResponse(_)), "{body:?}");
        }
    }
}
