//! Dependency graph cycle detection
//!
//! The dependency graph is an adjacency mapping from each action's effective
//! target rendering to the renderings it depends on. Strongly connected
//! components are computed with an iterative Tarjan pass; every component
//! holding more than one node is a build-order cycle. All offending groups
//! are surfaced together rather than stopping at the first.

use std::collections::BTreeMap;

const UNVISITED: usize = usize::MAX;

/// All cycle groups in the graph, each sorted, groups sorted between
/// themselves for deterministic reporting. Empty when the graph is acyclic.
///
/// Edges pointing outside the adjacency keys are ignored: declarations carry
/// no dependencies and cannot participate in cycles, so they are never keys.
pub fn cycle_groups(adjacency: &BTreeMap<String, Vec<String>>) -> Vec<Vec<String>> {
    let mut groups: Vec<Vec<String>> = strongly_connected_components(adjacency)
        .into_iter()
        .filter(|component| component.len() > 1)
        .map(|mut component| {
            component.sort();
            component
        })
        .collect();
    groups.sort();
    groups
}

/// Strongly connected components of the adjacency mapping (Tarjan).
///
/// Iterative so that pathological dependency chains cannot overflow the
/// stack.
pub fn strongly_connected_components(
    adjacency: &BTreeMap<String, Vec<String>>,
) -> Vec<Vec<String>> {
    let nodes: Vec<&String> = adjacency.keys().collect();
    let ids: BTreeMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, name)| (name.as_str(), i))
        .collect();
    let edges: Vec<Vec<usize>> = nodes
        .iter()
        .map(|name| {
            adjacency[*name]
                .iter()
                .filter_map(|dep| ids.get(dep.as_str()).copied())
                .collect()
        })
        .collect();

    let n = nodes.len();
    let mut index = vec![UNVISITED; n];
    let mut lowlink = vec![0usize; n];
    let mut on_stack = vec![false; n];
    let mut stack: Vec<usize> = Vec::new();
    let mut next_index = 0usize;
    let mut components: Vec<Vec<String>> = Vec::new();

    for root in 0..n {
        if index[root] != UNVISITED {
            continue;
        }
        // Explicit call stack of (node, next edge offset) frames.
        let mut frames: Vec<(usize, usize)> = vec![(root, 0)];
        while let Some(&(node, edge_offset)) = frames.last() {
            if edge_offset == 0 {
                index[node] = next_index;
                lowlink[node] = next_index;
                next_index += 1;
                stack.push(node);
                on_stack[node] = true;
            }
            if edge_offset < edges[node].len() {
                let next = edges[node][edge_offset];
                if let Some(frame) = frames.last_mut() {
                    frame.1 += 1;
                }
                if index[next] == UNVISITED {
                    frames.push((next, 0));
                } else if on_stack[next] {
                    lowlink[node] = lowlink[node].min(index[next]);
                }
            } else {
                frames.pop();
                if let Some(&(parent, _)) = frames.last() {
                    lowlink[parent] = lowlink[parent].min(lowlink[node]);
                }
                if lowlink[node] == index[node] {
                    let mut component = Vec::new();
                    while let Some(member) = stack.pop() {
                        on_stack[member] = false;
                        component.push(nodes[member].clone());
                        if member == node {
                            break;
                        }
                    }
                    components.push(component);
                }
            }
        }
    }

    components
}
