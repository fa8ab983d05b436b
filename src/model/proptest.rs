//! Property-based tests for the execution model using proptest.
//!
//! Arbitrary event streams over a small identity space (so duplicates,
//! orphans and late parents are common) must keep the tree consistent:
//!
//! - At most one phase is open, and only the newest one
//! - Every node is reachable exactly once from the roots
//! - A node leaves in-progress at most once
//! - Subprocess buffers never exceed their bound

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;

    use crate::event::{EventId, ExecutionEvent, StepStatus};
    use crate::model::{ExecutionTree, NodeKind, NodeRef, Status};

    const OUTPUT_LIMIT: usize = 4;

    fn ident() -> impl Strategy<Value = String> {
        (0u8..6).prop_map(|n| format!("id-{n}"))
    }

    fn parent() -> impl Strategy<Value = Option<String>> {
        prop::option::of(ident())
    }

    fn event() -> impl Strategy<Value = ExecutionEvent> {
        prop_oneof![
            (ident(), parent()).prop_map(|(id, parent)| {
                let event = ExecutionEvent::tool_started(id, "scan");
                match parent {
                    Some(parent) => event.with_parent(parent),
                    None => event,
                }
            }),
            ident().prop_map(|id| ExecutionEvent::tool_completed(id)),
            ident().prop_map(|id| ExecutionEvent::tool_errored(id, "boom")),
            (ident(), 0u32..20).prop_map(|(id, count)| ExecutionEvent::model_request(id, count)),
            ident().prop_map(|id| ExecutionEvent::model_response(id)),
            (ident(), prop_oneof![
                Just(StepStatus::Started),
                Just(StepStatus::Completed),
                Just(StepStatus::Failed),
            ])
            .prop_map(|(id, status)| ExecutionEvent::workflow_step(id, "step", status)),
            (ident(), "[a-z]{0,8}")
                .prop_map(|(id, line)| ExecutionEvent::subprocess_output(id, "make", line)),
            Just(ExecutionEvent::Unknown),
        ]
    }

    fn events() -> impl Strategy<Value = Vec<ExecutionEvent>> {
        prop::collection::vec(event(), 0..60)
    }

    fn replay(events: &[ExecutionEvent]) -> ExecutionTree {
        let mut tree = ExecutionTree::with_output_limit(OUTPUT_LIMIT);
        for event in events {
            // Rejected events leave the tree unchanged
            let _ = tree.apply(event);
        }
        tree
    }

    fn visit(tree: &ExecutionTree, node: NodeRef, seen: &mut Vec<NodeRef>) {
        seen.push(node);
        for child in tree.node(node).children() {
            assert_eq!(tree.node(*child).parent(), Some(node));
            visit(tree, *child, seen);
        }
    }

    // =========================================================================
    // Phase Properties
    // =========================================================================

    proptest! {
        /// Only the newest phase may be open; older ones are closed.
        #[test]
        fn at_most_one_open_phase(events in events()) {
            let tree = replay(&events);
            let phases = tree.phases();

            let open = phases.iter().filter(|phase| phase.is_open()).count();
            prop_assert!(open <= 1);

            if let Some((_, older)) = phases.split_last() {
                prop_assert!(older.iter().all(|phase| phase.status() == Status::Completed));
            }
        }

        /// Phases are numbered consecutively from one.
        #[test]
        fn phases_are_numbered_in_order(events in events()) {
            let tree = replay(&events);
            for (index, phase) in tree.phases().iter().enumerate() {
                prop_assert_eq!(phase.number() as usize, index + 1);
                prop_assert!(phase.model_node().is_some());
            }
        }

        /// Each tool call belongs to at most one phase.
        #[test]
        fn tools_are_grouped_once(events in events()) {
            let tree = replay(&events);
            let mut grouped = HashSet::new();
            for phase in tree.phases() {
                for tool in phase.tool_nodes() {
                    prop_assert_eq!(tree.node(*tool).kind(), NodeKind::ToolCall);
                    prop_assert!(grouped.insert(*tool));
                }
            }
        }
    }

    // =========================================================================
    // Forest Properties
    // =========================================================================

    proptest! {
        /// Every node is reachable from exactly one root path.
        #[test]
        fn forest_covers_every_node_once(events in events()) {
            let tree = replay(&events);
            let mut seen = Vec::new();
            for root in tree.roots() {
                prop_assert_eq!(tree.node(*root).parent(), None);
                visit(&tree, *root, &mut seen);
            }

            prop_assert_eq!(seen.len(), tree.len());
            let unique: HashSet<_> = seen.iter().collect();
            prop_assert_eq!(unique.len(), seen.len());
        }

        /// Once terminal, a node never changes status again.
        #[test]
        fn terminal_status_is_final(events in events()) {
            let mut tree = ExecutionTree::with_output_limit(OUTPUT_LIMIT);
            let mut finished: Vec<(EventId, Status)> = Vec::new();

            for event in &events {
                let _ = tree.apply(event);
                for (id, status) in &finished {
                    let node = tree.get(id).expect("nodes are never removed");
                    prop_assert_eq!(node.status(), *status);
                }
                finished = tree
                    .roots()
                    .iter()
                    .flat_map(|root| {
                        let mut seen = Vec::new();
                        visit(&tree, *root, &mut seen);
                        seen
                    })
                    .map(|node| tree.node(node))
                    .filter(|node| node.status().is_terminal())
                    .map(|node| (node.id().clone(), node.status()))
                    .collect();
            }
        }

        /// Subprocess buffers respect the configured bound.
        #[test]
        fn output_buffers_are_bounded(events in events()) {
            let tree = replay(&events);
            for root in tree.roots() {
                let mut seen = Vec::new();
                visit(&tree, *root, &mut seen);
                for node in seen {
                    prop_assert!(tree.node(node).metadata().output_lines.len() <= OUTPUT_LIMIT);
                }
            }
        }

        /// Clearing always yields an empty tree.
        #[test]
        fn clear_empties_the_tree(events in events()) {
            let mut tree = replay(&events);
            tree.clear();
            prop_assert!(tree.is_empty());
            prop_assert!(tree.phases().is_empty());
            prop_assert!(tree.roots().is_empty());
        }
    }
}
