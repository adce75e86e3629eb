//! Step partitioning: grouping rendered elements into ordered harmonic
//! steps.
//!
//! Grouping is by document order — the element's position in an in-order
//! traversal of the rendered tree — never by geometric coordinate.
//! Overlapping or tied x-positions therefore cannot merge or split steps,
//! and reprocessing the same score yields identical boundaries regardless
//! of viewport size or zoom.

use std::collections::HashSet;

use lectern_types::{ElementId, Step};

use crate::score::{ElementKind, ScoreNode};

/// Partition a rendered score tree into ordered harmonic steps.
///
/// Chord groupings and single-note groupings outside any chord each become
/// one step, in document order. A grouping contributes its constituent
/// note elements that carry at least one notehead, deduplicated preserving
/// document order; groupings with no such element are dropped.
pub fn partition(root: &ScoreNode) -> Vec<Step> {
    let mut steps = Vec::new();
    walk(root, &mut steps);
    steps
}

fn walk(node: &ScoreNode, steps: &mut Vec<Step>) {
    match node.kind {
        ElementKind::Chord => {
            let mut elements = Vec::new();
            let mut seen = HashSet::new();
            collect_group(node, &mut elements, &mut seen);
            if !elements.is_empty() {
                steps.push(Step::new(elements));
            }
            // Notes inside the chord belong to its group; do not recurse
            // for further steps.
        }
        ElementKind::Note => {
            if node.has_notehead() {
                steps.push(Step::new(vec![node.id.clone()]));
            }
        }
        _ => {
            for child in &node.children {
                walk(child, steps);
            }
        }
    }
}

/// Collect the note members of a chord grouping, in document order.
/// Duplicate references (the toolkit emits shared glyphs more than once)
/// are kept only at their first position; notes without a notehead are
/// decorative and skipped.
fn collect_group(node: &ScoreNode, elements: &mut Vec<ElementId>, seen: &mut HashSet<ElementId>) {
    for child in &node.children {
        if child.kind == ElementKind::Note {
            if child.has_notehead() && seen.insert(child.id.clone()) {
                elements.push(child.id.clone());
            }
        } else {
            collect_group(child, elements, seen);
        }
    }
}
