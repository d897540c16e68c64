//! Topological ordering over small graphs of object IDs.

use std::collections::HashMap;

use pathfinding::directed::topological_sort::topological_sort;

/// Sort the nodes mentioned in `edges` so that every `(from, to)` pair has
/// `from` before `to`.
///
/// Nodes are seeded in first-mention order, which keeps the result stable
/// across runs. On a cycle, the node found on the cycle is returned as the
/// error.
pub fn topsort(edges: &[(String, String)]) -> Result<Vec<String>, String> {
    let mut nodes: Vec<&str> = Vec::new();
    let mut successors: HashMap<&str, Vec<&str>> = HashMap::new();
    for (from, to) in edges {
        for node in [from.as_str(), to.as_str()] {
            if !successors.contains_key(node) {
                successors.insert(node, Vec::new());
                nodes.push(node);
            }
        }
        if let Some(succ) = successors.get_mut(from.as_str()) {
            succ.push(to.as_str());
        }
    }

    topological_sort(&nodes, |node| {
        successors.get(node).cloned().unwrap_or_default()
    })
    .map(|sorted| sorted.into_iter().map(str::to_string).collect())
    .map_err(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(a: &str, b: &str) -> (String, String) {
        (a.to_string(), b.to_string())
    }

    fn position(order: &[String], id: &str) -> usize {
        order.iter().position(|x| x == id).unwrap()
    }

    #[test]
    fn test_chain() {
        let order = topsort(&[edge("b", "c"), edge("a", "b")]).unwrap();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_diamond_respects_all_edges() {
        let edges = [edge("s", "n1"), edge("s", "ne"), edge("n1", "n2"), edge("ne", "n2")];
        let order = topsort(&edges).unwrap();
        assert_eq!(order.len(), 4);
        for (from, to) in &edges {
            assert!(position(&order, from) < position(&order, to));
        }
    }

    #[test]
    fn test_cycle_is_reported() {
        assert!(topsort(&[edge("a", "b"), edge("b", "a")]).is_err());
    }

    #[test]
    fn test_deterministic() {
        let edges = [edge("x", "y"), edge("p", "q"), edge("x", "q")];
        assert_eq!(topsort(&edges).unwrap(), topsort(&edges).unwrap());
    }
}
