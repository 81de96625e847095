mod entities;
mod fragment;
mod serialize;
mod tokenizer;
mod types;

pub use crate::fragment::{build_fragment, parse_fragment};
pub use crate::serialize::{
    escape_attribute, escape_text, serialize_nodes, write_comment, write_end_tag,
    write_start_tag, write_text,
};
pub use crate::tokenizer::{is_raw_text_element, is_void_element, tokenize};
pub use crate::types::{Attributes, Node, Token};

/// Tag names containing a hyphen are custom element names.
pub fn is_custom_tag(name: &str) -> bool {
    memchr::memchr(b'-', name.as_bytes()).is_some()
}
