use dom::{Document, DomError, NodeKey};
use log::debug;

/// Find the element with `id` in the document tree, or create a `div` with that id at
/// the end of `<body>`. Repeated calls return the same element.
pub fn resolve_container(doc: &mut Document, id: &str) -> Result<NodeKey, DomError> {
    if let Some(existing) = doc.get_element_by_id(id) {
        return Ok(existing);
    }
    let body = doc.body().ok_or(DomError::MissingBody)?;
    let container = doc.create_element("div");
    doc.set_attribute(container, "id", id)?;
    doc.append_child(body, container)?;
    debug!("created container #{id}");
    Ok(container)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolving_twice_returns_the_same_element() {
        let mut doc = Document::new();
        let first = resolve_container(&mut doc, "_chips").unwrap();
        let second = resolve_container(&mut doc, "_chips").unwrap();
        assert_eq!(first, second);

        let body = doc.body().unwrap();
        let with_id: Vec<_> = doc
            .descendants(doc.document())
            .into_iter()
            .filter(|k| doc.attribute(*k, "id") == Some("_chips"))
            .collect();
        assert_eq!(with_id, vec![first]);
        assert_eq!(doc.parent(first), Some(body));
        assert_eq!(doc.tag_name(first), Some("div"));
    }

    #[test]
    fn reuses_a_container_the_page_already_has() {
        let mut doc = Document::with_body_html("<section id=\"slot\"></section>").unwrap();
        let existing = doc.get_element_by_id("slot").unwrap();
        assert_eq!(resolve_container(&mut doc, "slot").unwrap(), existing);
    }
}
