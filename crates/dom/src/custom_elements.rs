use crate::document::Document;
use crate::error::DomError;
use crate::types::NodeKey;
use log::warn;
use std::collections::HashMap;
use std::rc::Rc;

/// Runs once per element when it is upgraded, the way a custom element constructor does.
pub type ElementConstructor = Rc<dyn Fn(&mut Document, NodeKey) -> Result<(), DomError>>;

#[derive(Default)]
pub(crate) struct CustomElementRegistry {
    definitions: HashMap<String, Option<ElementConstructor>>,
    newly_defined: Vec<String>,
}

impl Document {
    /// Defines `name` and synchronously upgrades every connected element with that name,
    /// in shadow-including tree order. The name is also queued for `take_defined_names`.
    pub fn define_custom_element(
        &mut self,
        name: &str,
        constructor: Option<ElementConstructor>,
    ) -> Result<(), DomError> {
        let name = name.to_ascii_lowercase();
        if !html::is_custom_tag(&name) {
            return Err(DomError::InvalidCustomElementName(name));
        }
        if self.custom_elements.definitions.contains_key(&name) {
            return Err(DomError::AlreadyDefined(name));
        }
        self.custom_elements
            .definitions
            .insert(name.clone(), constructor);
        self.custom_elements.newly_defined.push(name.clone());

        let candidates: Vec<NodeKey> = self
            .shadow_including_inclusive_descendants(self.document())
            .into_iter()
            .filter(|k| self.tag_name(*k) == Some(name.as_str()) && self.is_upgradeable(*k))
            .collect();
        self.upgrade(candidates);
        Ok(())
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.custom_elements.definitions.contains_key(name)
    }

    /// Names defined since the last call, in definition order. This is the
    /// `whenDefined` notification channel.
    pub fn take_defined_names(&mut self) -> Vec<String> {
        std::mem::take(&mut self.custom_elements.newly_defined)
    }

    pub fn is_upgraded(&self, key: NodeKey) -> bool {
        self.element(key).is_some_and(|e| e.upgraded)
    }

    pub(crate) fn is_upgradeable(&self, key: NodeKey) -> bool {
        self.element(key)
            .is_some_and(|e| !e.upgraded && self.custom_elements.definitions.contains_key(&e.name))
    }

    pub(crate) fn upgrade(&mut self, elements: Vec<NodeKey>) {
        for key in elements {
            let Some(data) = self.element_mut(key) else {
                continue;
            };
            if data.upgraded {
                continue;
            }
            data.upgraded = true;
            let name = data.name.clone();

            let constructor = self
                .custom_elements
                .definitions
                .get(&name)
                .and_then(|c| c.clone());
            if let Some(constructor) = constructor {
                if let Err(e) = constructor(self, key) {
                    warn!("constructor for <{name}> failed: {e}");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ShadowRootMode;
    use std::cell::Cell;

    #[test]
    fn defining_upgrades_connected_elements_only() {
        let mut doc = Document::with_body_html("<x-card></x-card><x-card></x-card>").unwrap();
        let detached = doc.create_element("x-card");
        let calls = Rc::new(Cell::new(0));
        let seen = calls.clone();
        doc.define_custom_element(
            "x-card",
            Some(Rc::new(move |_doc: &mut Document, _key: NodeKey| -> Result<(), DomError> {
                seen.set(seen.get() + 1);
                Ok(())
            })),
        )
        .unwrap();

        assert_eq!(calls.get(), 2);
        assert!(!doc.is_upgraded(detached));

        let body = doc.body().unwrap();
        doc.append_child(body, detached).unwrap();
        assert_eq!(calls.get(), 3);
        assert!(doc.is_upgraded(detached));
    }

    #[test]
    fn constructor_can_attach_and_fill_a_shadow_root() {
        let mut doc = Document::with_body_html("<x-card></x-card>").unwrap();
        doc.define_custom_element(
            "x-card",
            Some(Rc::new(|doc: &mut Document, key: NodeKey| -> Result<(), DomError> {
                let root = doc.attach_shadow(key, ShadowRootMode::Open)?;
                doc.set_inner_html(root, "<slot></slot>")
            })),
        )
        .unwrap();

        let card = doc.elements_by_tag_name(doc.document(), "x-card")[0];
        let shadow = doc.shadow_root(card).expect("shadow root");
        assert_eq!(doc.children(shadow).len(), 1);
    }

    #[test]
    fn definitions_are_reported_once_and_validated() {
        let mut doc = Document::new();
        doc.define_custom_element("x-a", None).unwrap();
        doc.define_custom_element("X-B", None).unwrap();
        assert!(doc.is_defined("x-b"));
        assert_eq!(doc.take_defined_names(), vec!["x-a", "x-b"]);
        assert!(doc.take_defined_names().is_empty());

        assert_eq!(
            doc.define_custom_element("x-a", None),
            Err(DomError::AlreadyDefined("x-a".to_string()))
        );
        assert_eq!(
            doc.define_custom_element("plain", None),
            Err(DomError::InvalidCustomElementName("plain".to_string()))
        );
    }
}
