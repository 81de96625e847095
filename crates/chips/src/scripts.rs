use dom::{Document, DomError, NodeKey};
use log::trace;

/// Swap every script in `fragment` for a fresh copy that will run once connected.
///
/// Copies keep `type="module"` and the original text, and take the original's place
/// under the same parent. Returns the number of scripts replaced.
pub fn reactivate_scripts(doc: &mut Document, fragment: Option<NodeKey>) -> Result<usize, DomError> {
    let Some(fragment) = fragment else {
        return Ok(0);
    };

    let scripts = doc.elements_by_tag_name(fragment, "script");
    for &original in &scripts {
        let parent = doc.parent(original).unwrap_or(fragment);
        let fresh = doc.create_element("script");
        if doc.attribute(original, "type") == Some("module") {
            doc.set_attribute(fresh, "type", "module")?;
        }
        let source = doc.text_content(original);
        let text = doc.create_text(&source);
        doc.append_child(fresh, text)?;

        doc.insert_before(parent, fresh, Some(original))?;
        doc.remove_child(parent, original)?;
        trace!("reactivated script {} as {}", original.0, fresh.0);
    }
    Ok(scripts.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inject::inject_markup;
    use dom::{ScriptKind, ScriptRun};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recording(doc: &mut Document) -> Rc<RefCell<Vec<ScriptRun>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        doc.set_script_host(Box::new(
            move |_doc: &mut Document, run: &ScriptRun| -> Result<(), DomError> {
                sink.borrow_mut().push(run.clone());
                Ok(())
            },
        ));
        log
    }

    #[test]
    fn nothing_to_do_without_a_fragment() {
        let mut doc = Document::new();
        assert_eq!(reactivate_scripts(&mut doc, None), Ok(0));
    }

    #[test]
    fn replaced_script_runs_once_connected() {
        let mut doc = Document::new();
        let log = recording(&mut doc);
        let fragment = inject_markup(&mut doc, Some("<p>a</p><script>hello()</script>"))
            .unwrap();
        let frag = fragment.unwrap();
        let original = doc.elements_by_tag_name(frag, "script")[0];

        assert_eq!(reactivate_scripts(&mut doc, fragment), Ok(1));
        let scripts = doc.elements_by_tag_name(frag, "script");
        assert_eq!(scripts.len(), 1);
        assert_ne!(scripts[0], original);
        assert!(!doc.script_already_started(scripts[0]));
        assert_eq!(doc.inner_html(frag), "<p>a</p><script>hello()</script>");

        let body = doc.body().unwrap();
        doc.append_child(body, frag).unwrap();
        assert_eq!(doc.flush_scripts(), 1);
        assert_eq!(log.borrow()[0].source, "hello()");
        assert_eq!(log.borrow()[0].kind, ScriptKind::Classic);
    }

    #[test]
    fn module_type_survives_and_nested_scripts_stay_in_place() {
        let mut doc = Document::new();
        let fragment = inject_markup(
            &mut doc,
            Some("<div><script type=\"module\">m()</script><span></span></div>"),
        )
        .unwrap();
        reactivate_scripts(&mut doc, fragment).unwrap();

        let frag = fragment.unwrap();
        assert_eq!(
            doc.inner_html(frag),
            "<div><script type=\"module\">m()</script><span></span></div>"
        );
        let script = doc.elements_by_tag_name(frag, "script")[0];
        assert_eq!(doc.attribute(script, "type"), Some("module"));
    }

    #[test]
    fn scripts_run_in_document_order() {
        let mut doc = Document::new();
        let log = recording(&mut doc);
        let fragment = inject_markup(
            &mut doc,
            Some("<script>one()</script><div><script>two()</script></div><script type=\"module\">three()</script>"),
        )
        .unwrap();
        reactivate_scripts(&mut doc, fragment).unwrap();
        let body = doc.body().unwrap();
        doc.append_child(body, fragment.unwrap()).unwrap();
        doc.flush_scripts();

        let sources: Vec<String> = log.borrow().iter().map(|r| r.source.clone()).collect();
        assert_eq!(sources, ["one()", "two()", "three()"]);
        assert_eq!(log.borrow()[2].kind, ScriptKind::Module);
    }
}
