//! Retained-mode scene arena.
//!
//! Elements live in a flat arena addressed by [`ElementId`]. Delegates only
//! ever talk to the arena through [`DrawSurface`], so any retained
//! structure offering the same operations can stand in for it.

use crate::core::{Result, TopographError};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Handle of an element in a [`Scene`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(usize);

impl ElementId {
    /// Arena slot of this element
    pub fn index(&self) -> usize {
        self.0
    }
}

/// One element of the scene
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneElement {
    /// Tag name, e.g. `g`, `path`, `text`
    pub tag: String,
    /// Attributes other than `class`
    pub attributes: BTreeMap<String, String>,
    /// Classes in insertion order
    pub classes: Vec<String>,
    /// Text content
    pub text: Option<String>,
    /// Children in paint order
    pub children: Vec<ElementId>,
    /// Parent, `None` for the root and for detached elements
    pub parent: Option<ElementId>,
}

impl SceneElement {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Self::default()
        }
    }

    /// Whether the element carries `class`
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

/// Operations a draw delegate may perform on a retained scene
pub trait DrawSurface {
    /// Create a detached element
    fn create_element(&mut self, tag: &str) -> ElementId;

    /// Append `child` as the last child of `parent`, detaching it first
    fn append_child(&mut self, parent: ElementId, child: ElementId) -> Result<()>;

    /// Set an attribute; setting `class` replaces the class list
    fn set_attribute(&mut self, id: ElementId, name: &str, value: &str) -> Result<()>;

    /// Remove an attribute
    fn remove_attribute(&mut self, id: ElementId, name: &str) -> Result<()>;

    /// Read an attribute
    fn attribute(&self, id: ElementId, name: &str) -> Option<&str>;

    /// Replace the text content
    fn set_text(&mut self, id: ElementId, text: &str) -> Result<()>;

    /// Read the text content
    fn text(&self, id: ElementId) -> Option<&str>;

    /// Add or remove a class
    fn toggle_class(&mut self, id: ElementId, class: &str, enabled: bool) -> Result<()>;

    /// Remove an element and everything below it
    fn remove_subtree(&mut self, id: ElementId) -> Result<()>;

    /// First element carrying `class` below `within`, in document order
    fn find_by_class(&self, within: ElementId, class: &str) -> Option<ElementId>;

    /// First element below `within` whose `id` attribute equals `id`
    fn find_by_id(&self, within: ElementId, id: &str) -> Option<ElementId>;

    /// Create an element and append it to `parent`
    fn create_child(&mut self, parent: ElementId, tag: &str) -> Result<ElementId> {
        let id = self.create_element(tag);
        self.append_child(parent, id)?;
        Ok(id)
    }

    /// Like [`DrawSurface::find_by_class`] but a missing element is an error
    fn require_by_class(&self, within: ElementId, class: &str) -> Result<ElementId> {
        self.find_by_class(within, class).ok_or_else(|| {
            TopographError::render(format!("element {} has no `.{}` descendant", within.0, class))
        })
    }
}

/// Arena backed scene with an SVG root.
///
/// The root holds a `defs` element followed by an edge layer and a node
/// layer, so nodes always paint above edges. Removed slots are never reused,
/// which keeps stale handles from aliasing new elements.
#[derive(Debug, Clone)]
pub struct Scene {
    slots: Vec<Option<SceneElement>>,
    root: ElementId,
    defs: ElementId,
    edge_layer: ElementId,
    node_layer: ElementId,
}

impl Scene {
    /// Empty scene with a `width` x `height` viewport
    pub fn new(width: f64, height: f64) -> Self {
        let mut slots = Vec::with_capacity(4);
        let mut root = SceneElement::new("svg");
        root.attributes.insert("xmlns".into(), "http://www.w3.org/2000/svg".into());
        root.attributes.insert("width".into(), fmt_number(width));
        root.attributes.insert("height".into(), fmt_number(height));
        root.attributes
            .insert("viewBox".into(), format!("0 0 {} {}", fmt_number(width), fmt_number(height)));
        slots.push(Some(root));

        let mut scene = Self {
            slots,
            root: ElementId(0),
            defs: ElementId(0),
            edge_layer: ElementId(0),
            node_layer: ElementId(0),
        };
        scene.defs = scene.attach_layer("defs", None);
        scene.edge_layer = scene.attach_layer("g", Some("topology-edges"));
        scene.node_layer = scene.attach_layer("g", Some("topology-nodes"));
        scene
    }

    fn attach_layer(&mut self, tag: &str, class: Option<&str>) -> ElementId {
        let id = self.create_element(tag);
        if let Some(element) = self.slots[id.0].as_mut() {
            element.parent = Some(self.root);
            element.classes.extend(class.map(str::to_string));
        }
        if let Some(root) = self.slots[self.root.0].as_mut() {
            root.children.push(id);
        }
        id
    }

    /// The `svg` root
    pub fn root(&self) -> ElementId {
        self.root
    }

    /// Shared definitions (markers)
    pub fn defs(&self) -> ElementId {
        self.defs
    }

    /// Layer edges are drawn into
    pub fn edge_layer(&self) -> ElementId {
        self.edge_layer
    }

    /// Layer nodes are drawn into
    pub fn node_layer(&self) -> ElementId {
        self.node_layer
    }

    /// Element by handle, `None` once removed
    pub fn element(&self, id: ElementId) -> Option<&SceneElement> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    /// Number of live elements, root included
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Whether nothing has been drawn into the edge and node layers
    pub fn is_empty(&self) -> bool {
        [self.edge_layer, self.node_layer]
            .iter()
            .all(|layer| self.element(*layer).is_some_and(|element| element.children.is_empty()))
    }

    /// Whether `id` carries `class`
    pub fn has_class(&self, id: ElementId, class: &str) -> bool {
        self.element(id).is_some_and(|element| element.has_class(class))
    }

    /// Every live element carrying `class`, in document order
    pub fn find_all_by_class(&self, class: &str) -> Vec<ElementId> {
        let mut found = Vec::new();
        self.walk(self.root, &mut |id, element| {
            if element.has_class(class) {
                found.push(id);
            }
        });
        found
    }

    fn walk(&self, id: ElementId, visit: &mut dyn FnMut(ElementId, &SceneElement)) {
        if let Some(element) = self.element(id) {
            visit(id, element);
            for child in &element.children {
                self.walk(*child, visit);
            }
        }
    }

    fn element_mut(&mut self, id: ElementId) -> Result<&mut SceneElement> {
        self.slots
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(TopographError::UnknownElement(id.0))
    }

    fn detach(&mut self, id: ElementId) -> Result<()> {
        let parent = self.element_mut(id)?.parent.take();
        if let Some(parent) = parent {
            self.element_mut(parent)?.children.retain(|child| *child != id);
        }
        Ok(())
    }

    /// Serialize the live scene as an SVG document
    pub fn to_svg(&self) -> String {
        let mut out = String::new();
        self.write_element(self.root, 0, &mut out);
        out
    }

    fn write_element(&self, id: ElementId, depth: usize, out: &mut String) {
        let Some(element) = self.element(id) else {
            return;
        };
        let indent = "  ".repeat(depth);
        let _ = write!(out, "{}<{}", indent, element.tag);
        if !element.classes.is_empty() {
            let _ = write!(out, " class=\"{}\"", escape(&element.classes.join(" ")));
        }
        for (name, value) in &element.attributes {
            let _ = write!(out, " {}=\"{}\"", name, escape(value));
        }

        match (&element.text, element.children.is_empty()) {
            (None, true) => out.push_str("/>\n"),
            (Some(text), true) => {
                let _ = writeln!(out, ">{}</{}>", escape(text), element.tag);
            },
            (text, false) => {
                out.push_str(">\n");
                if let Some(text) = text {
                    let _ = writeln!(out, "{}  {}", indent, escape(text));
                }
                for child in &element.children {
                    self.write_element(*child, depth + 1, out);
                }
                let _ = writeln!(out, "{}</{}>", indent, element.tag);
            },
        }
    }
}

impl DrawSurface for Scene {
    fn create_element(&mut self, tag: &str) -> ElementId {
        self.slots.push(Some(SceneElement::new(tag)));
        ElementId(self.slots.len() - 1)
    }

    fn append_child(&mut self, parent: ElementId, child: ElementId) -> Result<()> {
        if parent == child {
            return Err(TopographError::render("an element cannot contain itself"));
        }
        // Reject before mutating so a bad call leaves the tree untouched
        self.element_mut(parent)?;
        self.detach(child)?;
        self.element_mut(child)?.parent = Some(parent);
        self.element_mut(parent)?.children.push(child);
        Ok(())
    }

    fn set_attribute(&mut self, id: ElementId, name: &str, value: &str) -> Result<()> {
        let element = self.element_mut(id)?;
        if name == "class" {
            element.classes = value.split_whitespace().map(str::to_string).collect();
        } else {
            element.attributes.insert(name.to_string(), value.to_string());
        }
        Ok(())
    }

    fn remove_attribute(&mut self, id: ElementId, name: &str) -> Result<()> {
        let element = self.element_mut(id)?;
        if name == "class" {
            element.classes.clear();
        } else {
            element.attributes.remove(name);
        }
        Ok(())
    }

    fn attribute(&self, id: ElementId, name: &str) -> Option<&str> {
        self.element(id)?.attributes.get(name).map(String::as_str)
    }

    fn set_text(&mut self, id: ElementId, text: &str) -> Result<()> {
        self.element_mut(id)?.text = Some(text.to_string());
        Ok(())
    }

    fn text(&self, id: ElementId) -> Option<&str> {
        self.element(id)?.text.as_deref()
    }

    fn toggle_class(&mut self, id: ElementId, class: &str, enabled: bool) -> Result<()> {
        let element = self.element_mut(id)?;
        let present = element.has_class(class);
        if enabled && !present {
            element.classes.push(class.to_string());
        } else if !enabled && present {
            element.classes.retain(|c| c != class);
        }
        Ok(())
    }

    fn remove_subtree(&mut self, id: ElementId) -> Result<()> {
        if id == self.root {
            return Err(TopographError::render("the scene root cannot be removed"));
        }
        self.detach(id)?;
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            if let Some(element) = self.slots.get_mut(next.0).and_then(Option::take) {
                pending.extend(element.children);
            }
        }
        Ok(())
    }

    fn find_by_class(&self, within: ElementId, class: &str) -> Option<ElementId> {
        let element = self.element(within)?;
        for child in &element.children {
            if self.has_class(*child, class) {
                return Some(*child);
            }
            if let Some(found) = self.find_by_class(*child, class) {
                return Some(found);
            }
        }
        None
    }

    fn find_by_id(&self, within: ElementId, id: &str) -> Option<ElementId> {
        let element = self.element(within)?;
        for child in &element.children {
            if self.attribute(*child, "id") == Some(id) {
                return Some(*child);
            }
            if let Some(found) = self.find_by_id(*child, id) {
                return Some(found);
            }
        }
        None
    }
}

/// Format a coordinate without trailing zeros
pub fn fmt_number(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 {
        // Avoid `-0`
        return "0".to_string();
    }
    let text = format!("{:.2}", rounded);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_scene_has_layers() {
        let scene = Scene::new(100.0, 50.0);
        assert_eq!(scene.len(), 4);
        assert!(scene.is_empty());
        assert!(scene.has_class(scene.edge_layer(), "topology-edges"));
        assert_eq!(scene.attribute(scene.root(), "viewBox"), Some("0 0 100 50"));
    }

    #[test]
    fn test_class_toggling_is_idempotent() {
        let mut scene = Scene::new(10.0, 10.0);
        let g = scene.create_child(scene.node_layer(), "g").unwrap();
        scene.toggle_class(g, "emphasized", true).unwrap();
        scene.toggle_class(g, "emphasized", true).unwrap();
        assert_eq!(scene.element(g).unwrap().classes, vec!["emphasized"]);
        scene.toggle_class(g, "emphasized", false).unwrap();
        assert!(scene.element(g).unwrap().classes.is_empty());
    }

    #[test]
    fn test_remove_subtree_drops_descendants() {
        let mut scene = Scene::new(10.0, 10.0);
        let g = scene.create_child(scene.edge_layer(), "g").unwrap();
        let path = scene.create_child(g, "path").unwrap();
        scene.remove_subtree(g).unwrap();

        assert!(scene.element(g).is_none());
        assert!(scene.element(path).is_none());
        assert!(scene.element(scene.edge_layer()).unwrap().children.is_empty());
        assert!(matches!(
            scene.set_text(path, "x"),
            Err(TopographError::UnknownElement(_))
        ));
        assert!(scene.remove_subtree(scene.root()).is_err());
    }

    #[test]
    fn test_find_by_class_searches_descendants() {
        let mut scene = Scene::new(10.0, 10.0);
        let g = scene.create_child(scene.edge_layer(), "g").unwrap();
        let line = scene.create_child(g, "g").unwrap();
        let path = scene.create_child(line, "path").unwrap();
        scene.set_attribute(path, "class", "edge-path").unwrap();

        assert_eq!(scene.find_by_class(g, "edge-path"), Some(path));
        assert_eq!(scene.find_by_class(g, "missing"), None);
        assert!(scene.require_by_class(g, "missing").is_err());

        scene.set_attribute(line, "id", "line-1").unwrap();
        assert_eq!(scene.find_by_id(scene.root(), "line-1"), Some(line));
    }

    #[test]
    fn test_to_svg_escapes_text() {
        let mut scene = Scene::new(10.0, 10.0);
        let text = scene.create_child(scene.node_layer(), "text").unwrap();
        scene.set_text(text, "a<b & \"c\"").unwrap();
        let svg = scene.to_svg();
        assert!(svg.starts_with("<svg height=\"10\""));
        assert!(svg.contains("<text>a&lt;b &amp; &quot;c&quot;</text>"));
        assert!(svg.contains("<defs/>"));
    }

    #[test]
    fn test_fmt_number() {
        assert_eq!(fmt_number(12.0), "12");
        assert_eq!(fmt_number(12.5), "12.5");
        assert_eq!(fmt_number(1.0 / 3.0), "0.33");
        assert_eq!(fmt_number(-0.001), "0");
    }
}
