use std::ops::{Index, IndexMut};

/// Position of a [`Node`] inside the slab of a [`List`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NodeId(usize);

/// Optional link to another node of the same list.
pub(crate) type Link = Option<NodeId>;

#[derive(Clone, Copy)]
pub(crate) struct Node<T> {
    /// Link to the next node of the list
    pub next: Link,
    /// Link to the previous node of the list
    pub prev: Link,
    /// Element of the node
    pub data: T,
}

/// Doubly linked list whose nodes live in a slab owned by the list.
///
/// The arena handed to the allocator is never written to, so the list
/// metadata cannot be placed inside of it. Instead, every node is stored
/// in `nodes` and nodes refer to each other by [`NodeId`]. Removed slots
/// are remembered in `vacant` and reused by the next insertion, so the
/// slab only grows up to the highest number of nodes alive at once.
///
/// ```text
///   nodes: [ A | (vacant) | C | B ]
///
///   head -> A -> B -> C <- tail
/// ```
pub(crate) struct List<T> {
    nodes: Vec<Node<T>>,
    vacant: Vec<NodeId>,
    head: Link,
    tail: Link,
    len: usize,
}

pub(crate) struct Iter<'a, T> {
    list: &'a List<T>,
    current: Link,
    remaining: usize,
}

impl<T: Copy> List<T> {
    pub const fn new() -> Self {
        Self {
            nodes: Vec::new(),
            vacant: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn first(&self) -> Link {
        self.head
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Stores `node` in a vacant slot if there is one, otherwise at the end of the slab.
    fn store(&mut self, node: Node<T>) -> NodeId {
        match self.vacant.pop() {
            Some(id) => {
                self.nodes[id.0] = node;
                id
            }
            None => {
                self.nodes.push(node);
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    /// Appends a new node holding `data` to the end of the list.
    pub fn append(&mut self, data: T) -> NodeId {
        let id = self.store(Node {
            next: None,
            prev: self.tail,
            data,
        });

        match self.tail {
            Some(tail) => self[tail].next = Some(id),
            None => self.head = Some(id),
        }

        self.tail = Some(id);
        self.len += 1;

        id
    }

    /// Inserts a new node holding `data` right before `at`.
    pub fn insert_before(&mut self, at: NodeId, data: T) -> NodeId {
        let prev = self[at].prev;
        let id = self.store(Node {
            next: Some(at),
            prev,
            data,
        });

        match prev {
            Some(prev) => self[prev].next = Some(id),
            None => self.head = Some(id),
        }

        self[at].prev = Some(id);
        self.len += 1;

        id
    }

    /// Unlinks `id` from the list and returns its element.
    ///
    /// The slot is recycled, so `id` must not be used again afterwards.
    pub fn remove(&mut self, id: NodeId) -> T {
        let Node { next, prev, data } = self[id];

        match prev {
            Some(prev) => self[prev].next = next,
            None => self.head = next,
        }

        match next {
            Some(next) => self[next].prev = prev,
            None => self.tail = prev,
        }

        self.vacant.push(id);
        self.len -= 1;

        data
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            current: self.head,
            remaining: self.len,
        }
    }
}

impl<T> Index<NodeId> for List<T> {
    type Output = Node<T>;

    fn index(&self, id: NodeId) -> &Self::Output {
        &self.nodes[id.0]
    }
}

impl<T> IndexMut<NodeId> for List<T> {
    fn index_mut(&mut self, id: NodeId) -> &mut Self::Output {
        &mut self.nodes[id.0]
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (NodeId, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        let node = &self.list[id];

        self.current = node.next;
        self.remaining -= 1;

        Some((id, &node.data))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T: Copy> IntoIterator for &'a List<T> {
    type Item = (NodeId, &'a T);
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(list: &List<u8>) -> Vec<u8> {
        list.iter().map(|(_, value)| *value).collect()
    }

    #[test]
    fn new_list_is_empty() {
        let list: List<u8> = List::new();

        assert_eq!(list.len(), 0);
        assert!(list.is_empty());
        assert!(list.first().is_none());
        assert!(list.iter().next().is_none());
    }

    #[test]
    fn append_keeps_order() {
        let mut list = List::new();
        let first = list.append(1);
        list.append(2);
        let last = list.append(3);

        assert_eq!(values(&list), [1, 2, 3]);
        assert_eq!(list.first(), Some(first));
        assert_eq!(list[last].next, None);
        assert_eq!(list.tail, Some(last));
        assert_eq!(list.iter().size_hint(), (3, Some(3)));
    }

    #[test]
    fn insert_before_head_and_middle() {
        let mut list = List::new();
        let two = list.append(2);
        let four = list.append(4);

        let one = list.insert_before(two, 1);
        list.insert_before(four, 3);

        assert_eq!(values(&list), [1, 2, 3, 4]);
        assert_eq!(list.first(), Some(one));
        assert_eq!(list[one].prev, None);
        assert_eq!(list.len(), 4);
    }

    #[test]
    fn remove_head_middle_and_tail() {
        let mut list = List::new();
        let a = list.append(1);
        let b = list.append(2);
        let c = list.append(3);
        let d = list.append(4);

        assert_eq!(list.remove(b), 2);
        assert_eq!(values(&list), [1, 3, 4]);

        assert_eq!(list.remove(a), 1);
        assert_eq!(list.first(), Some(c));
        assert_eq!(list[c].prev, None);

        assert_eq!(list.remove(d), 4);
        assert_eq!(list.tail, Some(c));
        assert_eq!(list[c].next, None);

        assert_eq!(list.remove(c), 3);
        assert!(list.is_empty());
        assert!(list.first().is_none());
        assert!(list.tail.is_none());
    }

    #[test]
    fn removed_slots_are_reused() {
        let mut list = List::new();
        list.append(1);
        let b = list.append(2);
        list.remove(b);

        let c = list.append(3);

        assert_eq!(b, c);
        assert_eq!(values(&list), [1, 3]);
    }
}
