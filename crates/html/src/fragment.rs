use crate::tokenizer::tokenize;
use crate::types::{Attributes, Node, Token};

/// Parse markup into its top-level nodes, in source order.
///
/// Unmatched end tags are dropped; an end tag closes every element opened after its
/// matching start tag; elements still open at the end of input are closed implicitly.
/// Doctypes are ignored in fragment context.
pub fn parse_fragment(markup: &str) -> Vec<Node> {
    build_fragment(tokenize(markup))
}

struct OpenElement {
    name: String,
    attributes: Attributes,
    children: Vec<Node>,
}

impl OpenElement {
    fn close(self) -> Node {
        Node::Element {
            name: self.name,
            attributes: self.attributes,
            children: self.children,
        }
    }
}

pub fn build_fragment(tokens: Vec<Token>) -> Vec<Node> {
    let mut roots: Vec<Node> = Vec::new();
    let mut open: Vec<OpenElement> = Vec::new();

    fn push_node(roots: &mut Vec<Node>, open: &mut [OpenElement], node: Node) {
        match open.last_mut() {
            Some(parent) => parent.children.push(node),
            None => roots.push(node),
        }
    }

    fn pop_one(roots: &mut Vec<Node>, open: &mut Vec<OpenElement>) {
        if let Some(done) = open.pop() {
            let node = done.close();
            push_node(roots, open, node);
        }
    }

    for token in tokens {
        match token {
            Token::Doctype(_) => {}
            Token::Comment(text) => push_node(&mut roots, &mut open, Node::Comment { text }),
            Token::Text(text) => {
                // Merge adjacent runs so `a < b` stays one text node.
                let siblings = match open.last_mut() {
                    Some(parent) => &mut parent.children,
                    None => &mut roots,
                };
                if let Some(Node::Text { text: prev }) = siblings.last_mut() {
                    prev.push_str(&text);
                } else {
                    siblings.push(Node::Text { text });
                }
            }
            Token::StartTag {
                name,
                attributes,
                self_closing,
            } => {
                if self_closing {
                    push_node(
                        &mut roots,
                        &mut open,
                        Node::Element {
                            name,
                            attributes,
                            children: Vec::new(),
                        },
                    );
                } else {
                    open.push(OpenElement {
                        name,
                        attributes,
                        children: Vec::new(),
                    });
                }
            }
            Token::EndTag(name) => {
                let Some(depth) = open.iter().rposition(|e| e.name == name) else {
                    continue;
                };
                while open.len() > depth {
                    pop_one(&mut roots, &mut open);
                }
            }
        }
    }

    while !open.is_empty() {
        pop_one(&mut roots, &mut open);
    }

    roots
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Node {
        Node::Text {
            text: s.to_string(),
        }
    }

    fn el(name: &str, children: Vec<Node>) -> Node {
        Node::Element {
            name: name.to_string(),
            attributes: Vec::new(),
            children,
        }
    }

    #[test]
    fn keeps_top_level_order() {
        let nodes = parse_fragment("<p>x</p>tail<!--c--><span>y</span>");
        assert_eq!(
            nodes,
            vec![
                el("p", vec![text("x")]),
                text("tail"),
                Node::Comment {
                    text: "c".to_string()
                },
                el("span", vec![text("y")]),
            ]
        );
    }

    #[test]
    fn end_tag_closes_intervening_elements() {
        let nodes = parse_fragment("<div><b>bold<i>both</div>after");
        assert_eq!(
            nodes,
            vec![
                el(
                    "div",
                    vec![el("b", vec![text("bold"), el("i", vec![text("both")])])]
                ),
                text("after"),
            ]
        );
    }

    #[test]
    fn drops_unmatched_end_tags_and_closes_open_ones() {
        let nodes = parse_fragment("</nope><outer-widget><inner-widget>");
        assert_eq!(
            nodes,
            vec![el("outer-widget", vec![el("inner-widget", Vec::new())])]
        );
    }

    #[test]
    fn merges_split_text_runs() {
        let nodes = parse_fragment("<p>a < b</p>");
        assert_eq!(nodes, vec![el("p", vec![text("a < b")])]);
    }

    #[test]
    fn deep_nesting_builds_without_recursion_limits() {
        let depth = 5_000;
        let markup = "<div>".repeat(depth);
        let nodes = parse_fragment(&markup);
        let mut current = &nodes[0];
        let mut seen = 1;
        while let [child] = current.children() {
            current = child;
            seen += 1;
        }
        assert_eq!(seen, depth);
    }
}
