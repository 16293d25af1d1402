//! Small helper datastructures.

use std::iter::FromIterator;

/// A set of node ids backed by a dense bit vector that grows on demand.
/// Cheaper than a hash set when membership tests dominate, as in traversals.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NodeSet {
    marks: Vec<bool>,
    len: usize,
}

impl NodeSet {
    pub fn new() -> Self {
        NodeSet::default()
    }

    pub fn contains(&self, node: &usize) -> bool {
        self.marks.get(*node).copied().unwrap_or(false)
    }

    /// Inserts `node`, returns `true` if it was not yet in the set.
    pub fn insert(&mut self, node: usize) -> bool {
        if node >= self.marks.len() {
            self.marks.resize(node + 1, false);
        }
        if self.marks[node] {
            return false
        }
        self.marks[node] = true;
        self.len += 1;
        true
    }

    /// Removes `node`, returns `true` if it was in the set.
    pub fn remove(&mut self, node: &usize) -> bool {
        if self.contains(node) {
            self.marks[*node] = false;
            self.len -= 1;
            return true
        }
        false
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.marks.iter_mut().for_each(|m| *m = false);
        self.len = 0;
    }

    pub fn iter(&self) -> impl Iterator<Item=usize> + '_ {
        self.marks.iter()
            .enumerate()
            .filter_map(|(node, marked)| if *marked { Some(node) } else { None })
    }
}

impl FromIterator<usize> for NodeSet {
    fn from_iter<I: IntoIterator<Item=usize>>(iter: I) -> Self {
        let mut set = NodeSet::new();
        for node in iter {
            set.insert(node);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_set_test() {
        let mut set: NodeSet = vec![3, 7, 3].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains(&7));
        assert!(!set.contains(&100));
        assert!(set.insert(100));
        assert!(!set.insert(3));
        assert!(set.remove(&3));
        assert!(!set.remove(&3));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![7, 100]);
        set.clear();
        assert!(set.is_empty());
    }
}
