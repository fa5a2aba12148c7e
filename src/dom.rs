use html5ever::{LocalName, Namespace, QualName};
use kuchiki::traits::TendrilSink;
use kuchiki::{Attribute, ExpandedName, NodeData, NodeRef};

pub const DIV_TAG: &str = "div";
pub const BUTTON_TAG: &str = "button";
pub const ARIA_HIDDEN: &str = "aria-hidden";
pub const DATA_ROLE: &str = "data-role";
pub const DATA_CATEGORY: &str = "data-category";
pub const BTN_GROUP_CLASS: &str = "btn-group";

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";
const PM_PREFIX: &str = "pm__";

const SVG_PATHS: [&str; 3] = [
    "M 19.5 4.5 L 4.5 19.5 M 4.5 4.501 L 19.5 19.5",
    "M 3.572 13.406 L 8.281 18.115 L 20.428 5.885",
    "M 21.999 6.94 L 11.639 17.18 L 2.001 6.82 ",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Icon {
    Cross,
    Tick,
    Arrow,
}

impl Icon {
    fn path(self) -> &'static str {
        match self {
            Icon::Cross => SVG_PATHS[0],
            Icon::Tick => SVG_PATHS[1],
            Icon::Arrow => SVG_PATHS[2],
        }
    }
}

pub fn svg_icon(icon: Icon, stroke_width: f32) -> String {
    format!(
        "<svg viewBox=\"0 0 24 24\" stroke-width=\"{}\"><path d=\"{}\"/></svg>",
        stroke_width,
        icon.path()
    )
}

fn html_name(tag: &str) -> QualName {
    QualName::new(None, Namespace::from(HTML_NAMESPACE), LocalName::from(tag))
}

pub fn create_node(tag: &str) -> NodeRef {
    NodeRef::new_element(html_name(tag), Vec::<(ExpandedName, Attribute)>::new())
}

pub fn set_attribute(node: &NodeRef, name: &str, value: impl Into<String>) {
    if let Some(element) = node.as_element() {
        element
            .attributes
            .borrow_mut()
            .insert(LocalName::from(name), value.into());
    }
}

pub fn remove_attribute(node: &NodeRef, name: &str) {
    if let Some(element) = node.as_element() {
        element.attributes.borrow_mut().remove(LocalName::from(name));
    }
}

pub fn get_attribute(node: &NodeRef, name: &str) -> Option<String> {
    let element = node.as_element()?;
    let attrs = element.attributes.borrow();
    attrs.get(LocalName::from(name)).map(str::to_string)
}

pub fn has_attribute(node: &NodeRef, name: &str) -> bool {
    node.as_element()
        .map(|element| element.attributes.borrow().contains(LocalName::from(name)))
        .unwrap_or(false)
}

/// Toggles a boolean attribute (`checked`, `disabled`): present iff `on`.
pub fn set_flag(node: &NodeRef, name: &str, on: bool) {
    if on {
        set_attribute(node, name, "");
    } else {
        remove_attribute(node, name);
    }
}

fn class_list(node: &NodeRef) -> Vec<String> {
    get_attribute(node, "class")
        .map(|raw| raw.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

pub fn has_class(node: &NodeRef, class_name: &str) -> bool {
    class_list(node).iter().any(|c| c == class_name)
}

pub fn add_class(node: &NodeRef, class_name: &str) {
    let mut classes = class_list(node);
    if classes.iter().any(|c| c == class_name) {
        return;
    }
    classes.push(class_name.to_string());
    set_attribute(node, "class", classes.join(" "));
}

/// Adds `pm__<class_name>`.
pub fn add_class_pm(node: &NodeRef, class_name: &str) {
    add_class(node, &format!("{PM_PREFIX}{class_name}"));
}

pub fn remove_class(node: &NodeRef, class_name: &str) {
    let classes = class_list(node);
    if !classes.iter().any(|c| c == class_name) {
        return;
    }
    let kept: Vec<String> = classes.into_iter().filter(|c| c != class_name).collect();
    set_attribute(node, "class", kept.join(" "));
}

pub fn remove_class_pm(node: &NodeRef, class_name: &str) {
    remove_class(node, &format!("{PM_PREFIX}{class_name}"));
}

pub fn append_text(parent: &NodeRef, text: &str) {
    parent.append(NodeRef::new_text(text));
}

/// Inserts trusted markup at the end of `parent` (`insertAdjacentHTML('beforeend')`).
pub fn append_markup(parent: &NodeRef, markup: &str) {
    if markup.is_empty() {
        return;
    }
    let document = kuchiki::parse_fragment(html_name(DIV_TAG), Vec::new()).one(markup);
    // The fragment parser wraps its output in a synthetic <html> element.
    let root = document
        .children()
        .find(|child| matches!(child.data(), NodeData::Element(_)))
        .unwrap_or(document);
    let parsed: Vec<NodeRef> = root.children().collect();
    for child in parsed {
        parent.append(child);
    }
}

/// Replaces all children of `node` with `markup` (`innerHTML = markup`).
pub fn set_inner_html(node: &NodeRef, markup: &str) {
    let existing: Vec<NodeRef> = node.children().collect();
    for child in existing {
        child.detach();
    }
    append_markup(node, markup);
}

#[cfg(test)]
pub fn tag_name(node: &NodeRef) -> Option<String> {
    node.as_element()
        .map(|element| element.name.local.as_ref().to_ascii_lowercase())
}
