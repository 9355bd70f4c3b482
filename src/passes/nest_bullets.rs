//! `nest_bullets` (§4.5): folds a run of adjacent flat, single-item
//! `BulletList`s (the source parser's one-`<li>`-at-a-time shape, §6.2)
//! into a single `BulletList` whose top-level `BulletItem`s carry their
//! deeper-level siblings in `nested`, per the level-stack algorithm the
//! teacher already uses for heading hierarchies (`HasLevel::build_tree`).

use ego_tree::NodeId;
use serde::Deserialize;

use crate::error::DocScraperError;
use crate::query::QueryEngine;
use crate::traversal::Traversal;
use crate::tree::{Document, ElementData, ElementKind};

use super::Pass;

#[derive(Debug, Clone, Default)]
pub struct NestBullets;

impl NestBullets {
    pub fn new() -> Self {
        Self
    }
}

fn is_bullet_list(doc: &Document, id: NodeId) -> bool {
    matches!(doc.get(id).expect("valid node id").value().kind, ElementKind::BulletList)
}

/// Reparent every top-level item out of the adjacent `BulletList`s in
/// `run` into one freshly built, properly nested `BulletList` inserted in
/// their place.
fn nest_run(doc: &mut Document, run: &[NodeId]) {
    let items: Vec<NodeId> = run
        .iter()
        .flat_map(|&list_id| {
            doc.get(list_id)
                .expect("valid node id")
                .children()
                .map(|c| c.id())
                .collect::<Vec<_>>()
        })
        .collect();

    let new_list_id = doc
        .tree_mut()
        .get_mut(run[0])
        .expect("valid node id")
        .insert_before(ElementData::new(ElementKind::BulletList))
        .id();

    // A stack of (level, node) for the currently open chain of ancestors;
    // the next item attaches under the deepest entry whose level is
    // strictly less than its own (mirrors `HasLevel::build_tree`).
    let mut stack: Vec<(u32, NodeId)> = Vec::new();
    for item_id in items {
        let level = doc
            .get(item_id)
            .expect("valid node id")
            .value()
            .kind
            .as_bullet_item()
            .expect("nest_bullets only processes BulletItem children")
            .level;
        while let Some(&(top_level, _)) = stack.last() {
            if top_level >= level {
                stack.pop();
            } else {
                break;
            }
        }
        let parent = stack.last().map(|&(_, id)| id).unwrap_or(new_list_id);
        doc.tree_mut().get_mut(parent).expect("valid node id").append_id(item_id);
        stack.push((level, item_id));
    }

    for &list_id in run {
        doc.tree_mut().get_mut(list_id).expect("valid node id").detach();
    }
}

impl Pass for NestBullets {
    fn name(&self) -> &'static str {
        "nest_bullets"
    }

    fn apply(&self, doc: &mut Document, _engine: &dyn QueryEngine) -> Result<(), DocScraperError> {
        let mut parents_children = Vec::new();
        for ctx in Traversal::from_root(doc) {
            let children: Vec<NodeId> = doc.get(ctx.id).expect("valid node id").children().map(|c| c.id()).collect();
            parents_children.push(children);
        }

        for children in parents_children {
            let mut i = 0;
            while i < children.len() {
                if is_bullet_list(doc, children[i]) {
                    let mut j = i + 1;
                    while j < children.len() && is_bullet_list(doc, children[j]) {
                        j += 1;
                    }
                    nest_run(doc, &children[i..j]);
                    i = j;
                } else {
                    i += 1;
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NestBulletsConfig {}

impl NestBulletsConfig {
    pub fn compile(&self) -> Result<NestBullets, DocScraperError> {
        Ok(NestBullets::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::HandWrittenQueryEngine;
    use crate::tree::{BulletItemData, ElementKind};

    fn flat_bullet_list(doc: &mut Document, parent: NodeId, level: u32, text: &str) -> NodeId {
        let list = doc.append_child(parent, ElementData::new(ElementKind::BulletList)).unwrap();
        let item = doc
            .append_child(
                list,
                ElementData::new(ElementKind::BulletItem(BulletItemData { level, ..Default::default() })),
            )
            .unwrap();
        doc.append_child(item, ElementData::text_run(text)).unwrap();
        list
    }

    #[test]
    fn nests_a_deeper_item_under_its_shallower_predecessor() {
        let mut doc = Document::empty();
        let root = doc.root_id();
        flat_bullet_list(&mut doc, root, 0, "parent");
        flat_bullet_list(&mut doc, root, 1, "child");

        let pass = NestBullets::new();
        let engine = HandWrittenQueryEngine::new();
        pass.apply(&mut doc, &engine).unwrap();

        let lists: Vec<_> = doc.root().children().filter(|c| matches!(c.value().kind, ElementKind::BulletList)).collect();
        assert_eq!(lists.len(), 1);
        let top_items: Vec<_> = lists[0].children().collect();
        assert_eq!(top_items.len(), 1);
        assert_eq!(doc.aggregated_text(top_items[0].id()), "parent");
        let nested: Vec<_> = top_items[0].children().filter(|c| c.value().kind.as_bullet_item().is_some()).collect();
        assert_eq!(nested.len(), 1);
        assert_eq!(doc.aggregated_text(nested[0].id()), "child");
    }

    #[test]
    fn is_idempotent() {
        let mut doc = Document::empty();
        let root = doc.root_id();
        flat_bullet_list(&mut doc, root, 0, "a");
        flat_bullet_list(&mut doc, root, 1, "b");
        flat_bullet_list(&mut doc, root, 0, "c");

        let pass = NestBullets::new();
        let engine = HandWrittenQueryEngine::new();
        pass.apply(&mut doc, &engine).unwrap();
        let once = crate::query::project_document(&doc);
        pass.apply(&mut doc, &engine).unwrap();
        let twice = crate::query::project_document(&doc);
        assert_eq!(once, twice);
    }
}
