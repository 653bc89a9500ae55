//! Least-recently-used replacement.
//!
//! A hash map from page id to its neighbours forms a doubly linked list over
//! the cached keys. The head is the most recently used page and the tail is
//! the eviction candidate. Touch, remove and victim selection are O(1).

use super::replacer::Replacer;
use crate::storage::page::PageId;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default)]
struct Links {
    prev: Option<PageId>,
    next: Option<PageId>,
}

#[derive(Debug, Default)]
pub struct LruReplacer {
    nodes: HashMap<PageId, Links>,
    head: Option<PageId>,
    tail: Option<PageId>,
}

impl LruReplacer {
    pub fn new(capacity: usize) -> Self {
        Self {
            nodes: HashMap::with_capacity(capacity),
            head: None,
            tail: None,
        }
    }

    fn unlink(&mut self, page_id: PageId) -> bool {
        let Some(links) = self.nodes.remove(&page_id) else {
            return false;
        };

        match links.prev {
            Some(prev) => {
                if let Some(node) = self.nodes.get_mut(&prev) {
                    node.next = links.next;
                }
            }
            None => self.head = links.next,
        }
        match links.next {
            Some(next) => {
                if let Some(node) = self.nodes.get_mut(&next) {
                    node.prev = links.prev;
                }
            }
            None => self.tail = links.prev,
        }
        true
    }

    fn push_front(&mut self, page_id: PageId) {
        let links = Links {
            prev: None,
            next: self.head,
        };
        if let Some(old_head) = self.head {
            if let Some(node) = self.nodes.get_mut(&old_head) {
                node.prev = Some(page_id);
            }
        }
        self.nodes.insert(page_id, links);
        self.head = Some(page_id);
        if self.tail.is_none() {
            self.tail = Some(page_id);
        }
    }
}

impl Replacer for LruReplacer {
    fn record_access(&mut self, page_id: PageId) {
        if self.head == Some(page_id) {
            return;
        }
        self.unlink(page_id);
        self.push_front(page_id);
    }

    fn remove(&mut self, page_id: PageId) -> bool {
        self.unlink(page_id)
    }

    fn victim(&self) -> Option<PageId> {
        self.tail
    }

    fn recency_order(&self) -> Vec<PageId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut cursor = self.head;
        while let Some(page_id) = cursor {
            order.push(page_id);
            cursor = self.nodes.get(&page_id).and_then(|links| links.next);
        }
        order
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }
}
