//! DOM ↔ LSS Bindings
//!
//! SECTION and EVENT nodes carry provenance rows; LOCATION_SERIES and
//! LOCATION nodes bind to their LSS rows by deterministic traversal:
//! both sides preserve document order (event ordinal, series ordinal,
//! item ordinal vs. parent + sibling_order), so a positional zip per
//! parent recovers the mapping.

use std::collections::HashMap;

use crate::dom::node::NodeType;
use crate::storage::{DomNodeRecord, ItemRecord, StorageError, Store};

/// DOM error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum DomError {
    /// Persistence failure
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// DOM tree and LSS rows disagree structurally
    #[error("provenance mismatch: {0}")]
    ProvenanceMismatch(String),
}

/// DOM result type
pub type Result<T> = std::result::Result<T, DomError>;

/// Resolved node arena plus LSS row ↔ node maps for one DomPost.
pub struct NodeBindings {
    pub nodes: Vec<DomNodeRecord>,
    pub post_node: i64,
    /// lss_sections.id → SECTION node id
    pub section_nodes: HashMap<i64, i64>,
    /// lss_events.id → EVENT node id
    pub event_nodes: HashMap<i64, i64>,
    /// lss_location_series.id → LOCATION_SERIES node id
    pub series_nodes: HashMap<i64, i64>,
    /// lss_location_items.id → LOCATION node id
    pub item_nodes: HashMap<i64, i64>,
    /// LOCATION node id → backing item row
    pub item_for_node: HashMap<i64, ItemRecord>,
    /// node id → parent node id
    parent: HashMap<i64, Option<i64>>,
}

impl NodeBindings {
    pub fn parent_of(&self, node_id: i64) -> Option<i64> {
        self.parent.get(&node_id).copied().flatten()
    }

    /// Chain from the node up to the POST root, inclusive.
    pub fn chain_to_root(&self, node_id: i64) -> Vec<i64> {
        let mut chain = vec![node_id];
        let mut current = node_id;
        while let Some(parent) = self.parent_of(current) {
            chain.push(parent);
            current = parent;
        }
        chain
    }

    /// LOCATION node ids under one LOCATION_SERIES node, sibling order.
    pub fn locations_in_series(&self, series_node_id: i64) -> Vec<i64> {
        let mut out: Vec<&DomNodeRecord> = self
            .nodes
            .iter()
            .filter(|n| n.node_type == NodeType::Location && n.parent_id == Some(series_node_id))
            .collect();
        out.sort_by_key(|n| n.sibling_order);
        out.into_iter().map(|n| n.id).collect()
    }

    /// All LOCATION_SERIES node ids, creation order.
    pub fn series_node_ids(&self) -> Vec<i64> {
        self.nodes
            .iter()
            .filter(|n| n.node_type == NodeType::LocationSeries)
            .map(|n| n.id)
            .collect()
    }
}

/// Build the bindings for one DomPost.
pub fn build_bindings(store: &Store, dom_post_id: i64) -> Result<NodeBindings> {
    let (_, lss_run_id) = store.dom_post_run(dom_post_id)?;
    let nodes = store.load_nodes(dom_post_id)?;

    let post_node = nodes
        .iter()
        .find(|n| n.node_type == NodeType::Post)
        .map(|n| n.id)
        .ok_or_else(|| DomError::ProvenanceMismatch(format!("dom_post {dom_post_id} has no POST node")))?;

    let mut section_nodes = HashMap::new();
    let mut event_nodes = HashMap::new();
    let mut parent = HashMap::new();

    for node in &nodes {
        parent.insert(node.id, node.parent_id);
        match node.node_type {
            NodeType::Section => {
                for &section_id in &node.lss_section_ids {
                    section_nodes.insert(section_id, node.id);
                }
            }
            NodeType::Event => {
                if let Some(event_id) = node.lss_event_id {
                    event_nodes.insert(event_id, node.id);
                }
            }
            _ => {}
        }
    }

    // Series rows per event, ordinal order, zipped against series nodes
    // per EVENT node, sibling order.
    let series_records = store.list_location_series(lss_run_id)?;
    let mut series_nodes = HashMap::new();
    {
        let mut rows_by_event: HashMap<i64, Vec<i64>> = HashMap::new();
        for rec in &series_records {
            rows_by_event.entry(rec.lss_event_id).or_default().push(rec.id);
        }

        for (event_id, series_ids) in rows_by_event {
            let Some(&event_node) = event_nodes.get(&event_id) else {
                return Err(DomError::ProvenanceMismatch(format!(
                    "no EVENT node for lss event {event_id}"
                )));
            };
            let mut children: Vec<&DomNodeRecord> = nodes
                .iter()
                .filter(|n| {
                    n.node_type == NodeType::LocationSeries && n.parent_id == Some(event_node)
                })
                .collect();
            children.sort_by_key(|n| n.sibling_order);

            if children.len() != series_ids.len() {
                return Err(DomError::ProvenanceMismatch(format!(
                    "event {event_id}: {} series rows vs {} series nodes",
                    series_ids.len(),
                    children.len()
                )));
            }
            for (series_id, node) in series_ids.into_iter().zip(children) {
                series_nodes.insert(series_id, node.id);
            }
        }
    }

    // Item rows per series, ordinal order, zipped likewise.
    let item_records = store.list_location_items(lss_run_id)?;
    let mut item_nodes = HashMap::new();
    let mut item_for_node = HashMap::new();
    {
        let mut rows_by_series: HashMap<i64, Vec<&ItemRecord>> = HashMap::new();
        for rec in &item_records {
            rows_by_series.entry(rec.series_id).or_default().push(rec);
        }

        for (series_id, items) in rows_by_series {
            let Some(&series_node) = series_nodes.get(&series_id) else {
                return Err(DomError::ProvenanceMismatch(format!(
                    "no LOCATION_SERIES node for lss series {series_id}"
                )));
            };
            let mut children: Vec<&DomNodeRecord> = nodes
                .iter()
                .filter(|n| n.node_type == NodeType::Location && n.parent_id == Some(series_node))
                .collect();
            children.sort_by_key(|n| n.sibling_order);

            if children.len() != items.len() {
                return Err(DomError::ProvenanceMismatch(format!(
                    "series {series_id}: {} item rows vs {} location nodes",
                    items.len(),
                    children.len()
                )));
            }
            for (item, node) in items.into_iter().zip(children) {
                item_nodes.insert(item.id, node.id);
                item_for_node.insert(node.id, item.clone());
            }
        }
    }

    Ok(NodeBindings {
        nodes,
        post_node,
        section_nodes,
        event_nodes,
        series_nodes,
        item_nodes,
        item_for_node,
        parent,
    })
}
