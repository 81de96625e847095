use dom::{Document, DomError, NodeKey};

/// Parse `markup` into a detached document fragment. Empty or absent markup yields
/// `Ok(None)`: there is nothing to inject. Whitespace is still markup and comes back as
/// a text node.
///
/// The markup goes through an inert `div`, so scripts come out already started and will
/// not run unless they are replaced (see `reactivate_scripts`).
pub fn inject_markup(doc: &mut Document, markup: Option<&str>) -> Result<Option<NodeKey>, DomError> {
    let Some(markup) = markup.filter(|m| !m.is_empty()) else {
        return Ok(None);
    };

    let scratch = doc.create_element("div");
    doc.set_inner_html(scratch, markup)?;
    let fragment = doc.create_document_fragment();
    let children = doc.children(scratch).to_vec();
    for child in children {
        doc.append_child(fragment, child)?;
    }
    Ok(Some(fragment))
}
