//! Projects the typed tree into the JSON shape the query engine consumes
//! (§4.6): every element becomes an object with `type`, `tags`, `style`,
//! `attribs`, plus variant-specific fields.

use ego_tree::{NodeId, NodeRef};
use serde_json::{json, Map, Value};

use crate::tree::{Document, ElementData, ElementKind, StrMap};

fn map_to_json(map: &StrMap) -> Value {
    Value::Object(map.iter().map(|(k, v)| (k.clone(), Value::String(v.clone()))).collect())
}

fn children_array(doc: &Document, node: NodeRef<'_, ElementData>) -> Value {
    Value::Array(node.children().map(|c| project_element(doc, c.id())).collect())
}

fn common_fields(data: &ElementData) -> Map<String, Value> {
    let mut obj = Map::new();
    obj.insert("type".to_string(), json!(data.kind.type_name()));
    obj.insert("tags".to_string(), map_to_json(&data.attrs.tags));
    obj.insert("style".to_string(), map_to_json(&data.attrs.style));
    obj.insert("attribs".to_string(), map_to_json(&data.attrs.attribs));
    obj
}

/// Project the subtree rooted at `id` into its JSON representation.
pub fn project_element(doc: &Document, id: NodeId) -> Value {
    let node = doc.get(id).expect("valid node id");
    let data = node.value();
    let mut obj = common_fields(data);

    match &data.kind {
        ElementKind::TextRun(leaf) | ElementKind::Chips(leaf) => {
            obj.insert("text".to_string(), json!(leaf.text));
            obj.insert("url".to_string(), json!(leaf.url));
        }
        ElementKind::Paragraph => {
            obj.insert("elements".to_string(), children_array(doc, node));
        }
        ElementKind::BulletItem(b) => {
            obj.insert("level".to_string(), json!(b.level));
            obj.insert(
                "list_type".to_string(),
                json!(match b.list_type {
                    crate::tree::ListType::Bullet => "bullet",
                    crate::tree::ListType::Numbered => "numbered",
                }),
            );
            let (elements, nested): (Vec<_>, Vec<_>) =
                node.children().partition(|c| c.value().kind.is_paragraph_element());
            obj.insert(
                "elements".to_string(),
                Value::Array(elements.into_iter().map(|c| project_element(doc, c.id())).collect()),
            );
            obj.insert(
                "nested".to_string(),
                Value::Array(nested.into_iter().map(|c| project_element(doc, c.id())).collect()),
            );
        }
        ElementKind::BulletList => {
            obj.insert("elements".to_string(), children_array(doc, node));
        }
        ElementKind::Table(t) => {
            obj.insert("rows".to_string(), json!(t.rows));
            obj.insert("cols".to_string(), json!(t.cols));
            obj.insert("elements".to_string(), children_array(doc, node));
        }
        ElementKind::DocContent(_) => {
            obj.insert("elements".to_string(), children_array(doc, node));
        }
        ElementKind::Section(s) => {
            obj.insert("level".to_string(), json!(s.level));
            let mut children = node.children();
            let heading = children.next().map(|c| project_element(doc, c.id())).unwrap_or(Value::Null);
            obj.insert("heading".to_string(), heading);
            obj.insert(
                "content".to_string(),
                Value::Array(children.map(|c| project_element(doc, c.id())).collect()),
            );
        }
        ElementKind::Document(d) => {
            obj.insert("attrs".to_string(), map_to_json(&d.attrs));
            obj.insert("content".to_string(), children_array(doc, node));
        }
    }

    Value::Object(obj)
}

pub fn project_document(doc: &Document) -> Value {
    project_element(doc, doc.root_id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{doc_content_cell, ElementData, ElementKind};

    #[test]
    fn text_run_projects_text_and_url() {
        let mut doc = Document::empty();
        let root = doc.root_id();
        let run = doc.append_child(root, ElementData::text_run("hi")).unwrap();
        let v = project_element(&doc, run);
        assert_eq!(v["text"], json!("hi"));
        assert_eq!(v["type"], json!("TextRun"));
    }

    #[test]
    fn table_projects_row_major_elements() {
        let mut doc = Document::empty();
        let root = doc.root_id();
        let cells = vec![
            doc_content_cell(),
            doc_content_cell(),
            doc_content_cell(),
            doc_content_cell(),
        ];
        let table = doc.build_table(root, 2, 2, cells).unwrap();
        let v = project_element(&doc, table);
        assert_eq!(v["rows"], json!(2));
        assert_eq!(v["elements"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn section_splits_heading_from_content() {
        let mut doc = Document::empty();
        let root = doc.root_id();
        let section = doc
            .append_child(root, ElementData::new(ElementKind::Section(Default::default())))
            .unwrap();
        let heading = doc
            .append_child(section, ElementData::new(ElementKind::Paragraph))
            .unwrap();
        doc.append_child(heading, ElementData::text_run("Title")).unwrap();
        let v = project_element(&doc, section);
        assert_eq!(v["heading"]["elements"][0]["text"], json!("Title"));
        assert_eq!(v["content"].as_array().unwrap().len(), 0);
    }
}
