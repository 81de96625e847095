use crate::tokenizer::{is_raw_text_element, is_void_element};
use crate::types::Node;

pub fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{00A0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

pub fn escape_attribute(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{00A0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

/// Writes `<name a="v" b>`.
pub fn write_start_tag<'a>(
    name: &str,
    attributes: impl IntoIterator<Item = (&'a str, Option<&'a str>)>,
    out: &mut String,
) {
    out.push('<');
    out.push_str(name);
    for (key, value) in attributes {
        out.push(' ');
        out.push_str(key);
        if let Some(value) = value {
            out.push_str("=\"");
            escape_attribute(value, out);
            out.push('"');
        }
    }
    out.push('>');
}

/// Writes the closing tag, or nothing for void elements.
pub fn write_end_tag(name: &str, out: &mut String) {
    if is_void_element(name) {
        return;
    }
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

/// Text children of rawtext parents are emitted verbatim.
pub fn write_text(parent: Option<&str>, text: &str, out: &mut String) {
    if parent.is_some_and(is_raw_text_element) {
        out.push_str(text);
    } else {
        escape_text(text, out);
    }
}

pub fn write_comment(text: &str, out: &mut String) {
    out.push_str("<!--");
    out.push_str(text);
    out.push_str("-->");
}

/// Serialize detached nodes back to markup.
pub fn serialize_nodes(nodes: &[Node]) -> String {
    fn walk(node: &Node, parent: Option<&str>, out: &mut String) {
        match node {
            Node::Element {
                name,
                attributes,
                children,
            } => {
                write_start_tag(
                    name,
                    attributes.iter().map(|(k, v)| (k.as_str(), v.as_deref())),
                    out,
                );
                for child in children {
                    walk(child, Some(name), out);
                }
                write_end_tag(name, out);
            }
            Node::Text { text } => write_text(parent, text, out),
            Node::Comment { text } => write_comment(text, out),
        }
    }

    let mut out = String::new();
    for node in nodes {
        walk(node, None, &mut out);
    }
    out
}
