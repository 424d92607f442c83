//! Arena-backed red-black tree with subtree aggregates.
//!
//! Each node carries a `length` (UTF-16 code units) and a `height` (points) plus a payload.
//! Every node also caches the totals of its subtree, so lookups by location, by y-offset
//! and by ordinal all descend in `O(log n)`. The tree keeps document order; it is not a
//! search tree keyed on the payload.
//!
//! Nodes live in a [`slab::Slab`]; index `0` is the shared black sentinel (`NIL`).

use slab::Slab;

const NIL: usize = 0;

/// Handle to a node. Valid until the node is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Red,
    Black,
}

#[derive(Debug)]
struct Node<T> {
    parent: usize,
    left: usize,
    right: usize,
    color: Color,
    length: usize,
    height: f64,
    total_length: usize,
    total_height: f64,
    total_count: usize,
    data: T,
}

impl<T: Default> Node<T> {
    fn sentinel() -> Self {
        Self {
            total_count: 0,
            ..Self::leaf(0, 0.0, T::default(), Color::Black)
        }
    }

    fn leaf(length: usize, height: f64, data: T, color: Color) -> Self {
        Self {
            parent: NIL,
            left: NIL,
            right: NIL,
            color,
            length,
            height,
            total_length: length,
            total_height: height,
            total_count: 1,
            data,
        }
    }
}

/// The aggregate red-black tree.
#[derive(Debug)]
pub(crate) struct RedBlackTree<T> {
    nodes: Slab<Node<T>>,
    root: usize,
}

impl<T: Default> RedBlackTree<T> {
    pub(crate) fn new() -> Self {
        let mut nodes = Slab::new();
        let sentinel = nodes.insert(Node::sentinel());
        debug_assert_eq!(sentinel, NIL);
        Self { nodes, root: NIL }
    }

    /// Replace the content with `items` in document order, building a balanced tree in `O(n)`.
    pub(crate) fn rebuild(
        &mut self,
        items: impl IntoIterator<Item = (usize, f64, T)>,
    ) -> Vec<NodeId> {
        self.clear();
        let ids: Vec<usize> = items
            .into_iter()
            .map(|(length, height, data)| {
                self.nodes.insert(Node::leaf(length, height, data, Color::Black))
            })
            .collect();
        let tree_height = Self::balanced_tree_height(ids.len());
        self.root = self.build_subtree(&ids, tree_height);
        if self.root != NIL {
            self.nodes[self.root].parent = NIL;
            self.nodes[self.root].color = Color::Black;
        }
        ids.into_iter().map(NodeId).collect()
    }

    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        let sentinel = self.nodes.insert(Node::sentinel());
        debug_assert_eq!(sentinel, NIL);
        self.root = NIL;
    }

    fn balanced_tree_height(count: usize) -> usize {
        if count == 0 {
            0
        } else {
            Self::balanced_tree_height(count / 2) + 1
        }
    }

    fn build_subtree(&mut self, ids: &[usize], subtree_height: usize) -> usize {
        if ids.is_empty() {
            return NIL;
        }
        let middle = ids.len() / 2;
        let node = ids[middle];
        let left = self.build_subtree(&ids[..middle], subtree_height.saturating_sub(1));
        let right = self.build_subtree(&ids[middle + 1..], subtree_height.saturating_sub(1));
        self.nodes[node].left = left;
        self.nodes[node].right = right;
        if left != NIL {
            self.nodes[left].parent = node;
        }
        if right != NIL {
            self.nodes[right].parent = node;
        }
        if subtree_height == 1 {
            self.nodes[node].color = Color::Red;
        }
        self.update_aggregates(node);
        node
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.root == NIL
    }

    /// Number of nodes.
    pub(crate) fn len(&self) -> usize {
        self.nodes[self.root].total_count
    }

    /// Sum of all node lengths.
    pub(crate) fn total_length(&self) -> usize {
        self.nodes[self.root].total_length
    }

    /// Sum of all node heights.
    pub(crate) fn total_height(&self) -> f64 {
        self.nodes[self.root].total_height
    }

    pub(crate) fn data(&self, node: NodeId) -> &T {
        &self.nodes[node.0].data
    }

    pub(crate) fn data_mut(&mut self, node: NodeId) -> &mut T {
        &mut self.nodes[node.0].data
    }

    pub(crate) fn length(&self, node: NodeId) -> usize {
        self.nodes[node.0].length
    }

    pub(crate) fn height(&self, node: NodeId) -> f64 {
        self.nodes[node.0].height
    }

    /// Change the length of a node and propagate the new totals to the root.
    pub(crate) fn set_length(&mut self, node: NodeId, length: usize) {
        if self.nodes[node.0].length != length {
            self.nodes[node.0].length = length;
            self.update_aggregates_upwards(node.0);
        }
    }

    /// Change the height of a node and propagate the new totals to the root.
    pub(crate) fn set_height(&mut self, node: NodeId, height: f64) {
        self.nodes[node.0].height = height;
        self.update_aggregates_upwards(node.0);
    }

    pub(crate) fn first(&self) -> Option<NodeId> {
        (self.root != NIL).then(|| NodeId(self.leftmost(self.root)))
    }

    pub(crate) fn last(&self) -> Option<NodeId> {
        (self.root != NIL).then(|| NodeId(self.rightmost(self.root)))
    }

    pub(crate) fn next(&self, node: NodeId) -> Option<NodeId> {
        let node = node.0;
        let right = self.nodes[node].right;
        if right != NIL {
            return Some(NodeId(self.leftmost(right)));
        }
        let mut child = node;
        let mut parent = self.nodes[node].parent;
        while parent != NIL && self.nodes[parent].right == child {
            child = parent;
            parent = self.nodes[parent].parent;
        }
        (parent != NIL).then_some(NodeId(parent))
    }

    pub(crate) fn previous(&self, node: NodeId) -> Option<NodeId> {
        let node = node.0;
        let left = self.nodes[node].left;
        if left != NIL {
            return Some(NodeId(self.rightmost(left)));
        }
        let mut child = node;
        let mut parent = self.nodes[node].parent;
        while parent != NIL && self.nodes[parent].left == child {
            child = parent;
            parent = self.nodes[parent].parent;
        }
        (parent != NIL).then_some(NodeId(parent))
    }

    /// Start offset of `node`: the sum of the lengths of all preceding nodes.
    pub(crate) fn location(&self, node: NodeId) -> usize {
        let mut node = node.0;
        let mut location = self.nodes[self.nodes[node].left].total_length;
        while self.nodes[node].parent != NIL {
            let parent = self.nodes[node].parent;
            if self.nodes[parent].right == node {
                let left = self.nodes[parent].left;
                location += self.nodes[left].total_length + self.nodes[parent].length;
            }
            node = parent;
        }
        location
    }

    /// Top of `node`: the sum of the heights of all preceding nodes.
    pub(crate) fn y_position(&self, node: NodeId) -> f64 {
        let mut node = node.0;
        let mut y = self.nodes[self.nodes[node].left].total_height;
        while self.nodes[node].parent != NIL {
            let parent = self.nodes[node].parent;
            if self.nodes[parent].right == node {
                y += self.nodes[self.nodes[parent].left].total_height + self.nodes[parent].height;
            }
            node = parent;
        }
        y
    }

    /// Ordinal position of `node` in document order.
    pub(crate) fn index(&self, node: NodeId) -> usize {
        let mut node = node.0;
        let mut index = self.nodes[self.nodes[node].left].total_count;
        while self.nodes[node].parent != NIL {
            let parent = self.nodes[node].parent;
            if self.nodes[parent].right == node {
                index += self.nodes[self.nodes[parent].left].total_count + 1;
            }
            node = parent;
        }
        index
    }

    /// The node whose half-open span `[location, location + length)` contains `location`.
    ///
    /// `location == total_length()` resolves to the last node. Past that, `None`.
    pub(crate) fn node_containing_location(&self, location: usize) -> Option<NodeId> {
        if self.root == NIL || location > self.total_length() {
            return None;
        }
        let mut node = self.root;
        let mut remaining = location;
        loop {
            let left = self.nodes[node].left;
            if left != NIL && remaining < self.nodes[left].total_length {
                node = left;
                continue;
            }
            remaining -= self.nodes[left].total_length;
            if remaining < self.nodes[node].length {
                return Some(NodeId(node));
            }
            remaining -= self.nodes[node].length;
            let right = self.nodes[node].right;
            if right == NIL {
                return Some(NodeId(node));
            }
            node = right;
        }
    }

    /// The node whose vertical span contains `y`. `y == total_height()` resolves to the last
    /// node; negative or larger offsets return `None`.
    pub(crate) fn node_containing_y(&self, y: f64) -> Option<NodeId> {
        if self.root == NIL || !(0.0..=self.total_height()).contains(&y) {
            return None;
        }
        let mut node = self.root;
        let mut remaining = y;
        loop {
            let left = self.nodes[node].left;
            if left != NIL && remaining < self.nodes[left].total_height {
                node = left;
                continue;
            }
            remaining -= self.nodes[left].total_height;
            if remaining < self.nodes[node].height {
                return Some(NodeId(node));
            }
            remaining -= self.nodes[node].height;
            let right = self.nodes[node].right;
            if right == NIL {
                return Some(NodeId(node));
            }
            node = right;
        }
    }

    /// The node at ordinal `index`.
    pub(crate) fn node_at_index(&self, index: usize) -> Option<NodeId> {
        if index >= self.len() {
            return None;
        }
        let mut node = self.root;
        let mut remaining = index;
        loop {
            let left = self.nodes[node].left;
            let left_count = self.nodes[left].total_count;
            if remaining < left_count {
                node = left;
            } else if remaining == left_count {
                return Some(NodeId(node));
            } else {
                remaining -= left_count + 1;
                node = self.nodes[node].right;
            }
        }
    }

    /// Append a node at the end of the document order.
    pub(crate) fn push_back(&mut self, length: usize, height: f64, data: T) -> NodeId {
        match self.last() {
            Some(last) => self.insert_after(last, length, height, data),
            None => {
                let node = self.nodes.insert(Node::leaf(length, height, data, Color::Black));
                self.root = node;
                NodeId(node)
            }
        }
    }

    /// Insert a node directly after `after` in document order.
    pub(crate) fn insert_after(
        &mut self,
        after: NodeId,
        length: usize,
        height: f64,
        data: T,
    ) -> NodeId {
        let new = self.nodes.insert(Node::leaf(length, height, data, Color::Red));
        let after = after.0;
        if self.nodes[after].right == NIL {
            self.nodes[after].right = new;
            self.nodes[new].parent = after;
        } else {
            let successor = self.leftmost(self.nodes[after].right);
            self.nodes[successor].left = new;
            self.nodes[new].parent = successor;
        }
        self.update_aggregates_upwards(self.nodes[new].parent);
        self.insert_fixup(new);
        NodeId(new)
    }

    /// Remove `node` and return its payload.
    pub(crate) fn remove(&mut self, node: NodeId) -> T {
        let z = node.0;
        let mut original_color = self.nodes[z].color;
        let x;
        let fix_from;
        if self.nodes[z].left == NIL {
            x = self.nodes[z].right;
            fix_from = self.nodes[z].parent;
            self.transplant(z, x);
        } else if self.nodes[z].right == NIL {
            x = self.nodes[z].left;
            fix_from = self.nodes[z].parent;
            self.transplant(z, x);
        } else {
            let y = self.leftmost(self.nodes[z].right);
            original_color = self.nodes[y].color;
            x = self.nodes[y].right;
            if self.nodes[y].parent == z {
                self.nodes[x].parent = y;
                fix_from = y;
            } else {
                fix_from = self.nodes[y].parent;
                self.transplant(y, x);
                let z_right = self.nodes[z].right;
                self.nodes[y].right = z_right;
                self.nodes[z_right].parent = y;
            }
            self.transplant(z, y);
            let z_left = self.nodes[z].left;
            self.nodes[y].left = z_left;
            self.nodes[z_left].parent = y;
            self.nodes[y].color = self.nodes[z].color;
        }
        self.update_aggregates_upwards(fix_from);
        if original_color == Color::Black {
            self.delete_fixup(x);
        }
        // The sentinel may have been used as a temporary parent link.
        self.nodes[NIL].parent = NIL;
        self.nodes[NIL].color = Color::Black;
        if self.root != NIL {
            self.nodes[self.root].parent = NIL;
        }
        self.nodes.remove(z).data
    }

    /// Iterate nodes in document order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.first(), move |node| self.next(*node))
    }

    fn leftmost(&self, mut node: usize) -> usize {
        while self.nodes[node].left != NIL {
            node = self.nodes[node].left;
        }
        node
    }

    fn rightmost(&self, mut node: usize) -> usize {
        while self.nodes[node].right != NIL {
            node = self.nodes[node].right;
        }
        node
    }

    fn update_aggregates(&mut self, node: usize) {
        if node == NIL {
            return;
        }
        let (left, right) = (self.nodes[node].left, self.nodes[node].right);
        let (left, entry, right) = (&self.nodes[left], &self.nodes[node], &self.nodes[right]);
        let total_length = left.total_length + entry.length + right.total_length;
        let total_height = left.total_height + entry.height + right.total_height;
        let total_count = left.total_count + 1 + right.total_count;
        let entry = &mut self.nodes[node];
        entry.total_length = total_length;
        entry.total_height = total_height;
        entry.total_count = total_count;
    }

    fn update_aggregates_upwards(&mut self, mut node: usize) {
        while node != NIL {
            self.update_aggregates(node);
            node = self.nodes[node].parent;
        }
    }

    fn transplant(&mut self, u: usize, v: usize) {
        let parent = self.nodes[u].parent;
        if parent == NIL {
            self.root = v;
        } else if self.nodes[parent].left == u {
            self.nodes[parent].left = v;
        } else {
            self.nodes[parent].right = v;
        }
        self.nodes[v].parent = parent;
    }

    fn rotate_left(&mut self, x: usize) {
        let y = self.nodes[x].right;
        let y_left = self.nodes[y].left;
        self.nodes[x].right = y_left;
        if y_left != NIL {
            self.nodes[y_left].parent = x;
        }
        self.transplant(x, y);
        self.nodes[y].left = x;
        self.nodes[x].parent = y;
        self.update_aggregates(x);
        self.update_aggregates(y);
    }

    fn rotate_right(&mut self, x: usize) {
        let y = self.nodes[x].left;
        let y_right = self.nodes[y].right;
        self.nodes[x].left = y_right;
        if y_right != NIL {
            self.nodes[y_right].parent = x;
        }
        self.transplant(x, y);
        self.nodes[y].right = x;
        self.nodes[x].parent = y;
        self.update_aggregates(x);
        self.update_aggregates(y);
    }

    fn color(&self, node: usize) -> Color {
        self.nodes[node].color
    }

    fn insert_fixup(&mut self, mut z: usize) {
        while self.color(self.nodes[z].parent) == Color::Red {
            let parent = self.nodes[z].parent;
            let grandparent = self.nodes[parent].parent;
            if parent == self.nodes[grandparent].left {
                let uncle = self.nodes[grandparent].right;
                if self.color(uncle) == Color::Red {
                    self.nodes[parent].color = Color::Black;
                    self.nodes[uncle].color = Color::Black;
                    self.nodes[grandparent].color = Color::Red;
                    z = grandparent;
                } else {
                    if z == self.nodes[parent].right {
                        z = parent;
                        self.rotate_left(z);
                    }
                    let parent = self.nodes[z].parent;
                    let grandparent = self.nodes[parent].parent;
                    self.nodes[parent].color = Color::Black;
                    self.nodes[grandparent].color = Color::Red;
                    self.rotate_right(grandparent);
                }
            } else {
                let uncle = self.nodes[grandparent].left;
                if self.color(uncle) == Color::Red {
                    self.nodes[parent].color = Color::Black;
                    self.nodes[uncle].color = Color::Black;
                    self.nodes[grandparent].color = Color::Red;
                    z = grandparent;
                } else {
                    if z == self.nodes[parent].left {
                        z = parent;
                        self.rotate_right(z);
                    }
                    let parent = self.nodes[z].parent;
                    let grandparent = self.nodes[parent].parent;
                    self.nodes[parent].color = Color::Black;
                    self.nodes[grandparent].color = Color::Red;
                    self.rotate_left(grandparent);
                }
            }
        }
        let root = self.root;
        self.nodes[root].color = Color::Black;
    }

    fn delete_fixup(&mut self, mut x: usize) {
        while x != self.root && self.color(x) == Color::Black {
            let parent = self.nodes[x].parent;
            if x == self.nodes[parent].left {
                let mut w = self.nodes[parent].right;
                if self.color(w) == Color::Red {
                    self.nodes[w].color = Color::Black;
                    self.nodes[parent].color = Color::Red;
                    self.rotate_left(parent);
                    w = self.nodes[parent].right;
                }
                if self.color(self.nodes[w].left) == Color::Black
                    && self.color(self.nodes[w].right) == Color::Black
                {
                    self.nodes[w].color = Color::Red;
                    x = parent;
                } else {
                    if self.color(self.nodes[w].right) == Color::Black {
                        let w_left = self.nodes[w].left;
                        self.nodes[w_left].color = Color::Black;
                        self.nodes[w].color = Color::Red;
                        self.rotate_right(w);
                        w = self.nodes[parent].right;
                    }
                    self.nodes[w].color = self.nodes[parent].color;
                    self.nodes[parent].color = Color::Black;
                    let w_right = self.nodes[w].right;
                    self.nodes[w_right].color = Color::Black;
                    self.rotate_left(parent);
                    x = self.root;
                }
            } else {
                let mut w = self.nodes[parent].left;
                if self.color(w) == Color::Red {
                    self.nodes[w].color = Color::Black;
                    self.nodes[parent].color = Color::Red;
                    self.rotate_right(parent);
                    w = self.nodes[parent].left;
                }
                if self.color(self.nodes[w].right) == Color::Black
                    && self.color(self.nodes[w].left) == Color::Black
                {
                    self.nodes[w].color = Color::Red;
                    x = parent;
                } else {
                    if self.color(self.nodes[w].left) == Color::Black {
                        let w_right = self.nodes[w].right;
                        self.nodes[w_right].color = Color::Black;
                        self.nodes[w].color = Color::Red;
                        self.rotate_left(w);
                        w = self.nodes[parent].left;
                    }
                    self.nodes[w].color = self.nodes[parent].color;
                    self.nodes[parent].color = Color::Black;
                    let w_left = self.nodes[w].left;
                    self.nodes[w_left].color = Color::Black;
                    self.rotate_right(parent);
                    x = self.root;
                }
            }
        }
        self.nodes[x].color = Color::Black;
    }

    /// Check red-black and aggregate invariants. Returns the black height.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) -> usize {
        assert_eq!(self.color(self.root), Color::Black, "root must be black");
        assert_eq!(self.nodes.len() - 1, self.len(), "node count out of sync");
        self.check_subtree(self.root)
    }

    #[cfg(test)]
    fn check_subtree(&self, node: usize) -> usize {
        if node == NIL {
            return 1;
        }
        let entry = &self.nodes[node];
        let (left, right) = (entry.left, entry.right);
        if left != NIL {
            assert_eq!(self.nodes[left].parent, node, "broken parent link");
        }
        if right != NIL {
            assert_eq!(self.nodes[right].parent, node, "broken parent link");
        }
        if entry.color == Color::Red {
            assert_eq!(self.color(left), Color::Black, "red node with red child");
            assert_eq!(self.color(right), Color::Black, "red node with red child");
        }
        assert_eq!(
            entry.total_length,
            self.nodes[left].total_length + entry.length + self.nodes[right].total_length
        );
        assert_eq!(
            entry.total_count,
            self.nodes[left].total_count + 1 + self.nodes[right].total_count
        );
        assert!(
            (entry.total_height
                - (self.nodes[left].total_height + entry.height + self.nodes[right].total_height))
                .abs()
                < 1e-6
        );
        let left_black = self.check_subtree(left);
        let right_black = self.check_subtree(right);
        assert_eq!(left_black, right_black, "unequal black heights");
        left_black + usize::from(entry.color == Color::Black)
    }
}

impl<T: Default> Default for RedBlackTree<T> {
    fn default() -> Self {
        Self::new()
    }
}
