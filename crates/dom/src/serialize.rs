use crate::document::Document;
use crate::types::{NodeKey, NodeKind};

impl Document {
    /// Markup for `key` and its light-DOM descendants. Shadow trees are not serialized.
    pub fn outer_html(&self, key: NodeKey) -> String {
        let mut out = String::new();
        self.write_node(key, None, &mut out);
        out
    }

    pub fn inner_html(&self, key: NodeKey) -> String {
        let mut out = String::new();
        let parent = self.tag_name(key);
        for &child in self.children(key) {
            self.write_node(child, parent, &mut out);
        }
        out
    }

    fn write_node(&self, key: NodeKey, parent: Option<&str>, out: &mut String) {
        match self.kind(key) {
            Some(NodeKind::Element(data)) => {
                html::write_start_tag(
                    &data.name,
                    data.attributes
                        .iter()
                        .map(|(k, v)| (k.as_str(), v.as_deref())),
                    out,
                );
                for &child in self.children(key) {
                    self.write_node(child, Some(&data.name), out);
                }
                html::write_end_tag(&data.name, out);
            }
            Some(NodeKind::Text(text)) => html::write_text(parent, text, out),
            Some(NodeKind::Comment(text)) => html::write_comment(text, out),
            Some(NodeKind::Document | NodeKind::Fragment | NodeKind::ShadowRoot { .. }) => {
                for &child in self.children(key) {
                    self.write_node(child, None, out);
                }
            }
            None => {}
        }
    }
}
