//! Turret attach/detach graph.
//!
//! Each player's children are a singly-linked list of [`AttachInfo`] nodes
//! drawn from a single free-list arena, mirroring the intrusive
//! allocate-or-reuse pattern the original player manager uses instead of a
//! per-player `Vec`. Grounded on `PlayerManager::AttachPlayer`/
//! `DetachPlayer`/`DetachAllChildren`/`GetTurretCount`.

use crate::player::state::PlayerId;

/// Index into the arena's backing storage. `u32::MAX` marks "no node".
pub type ArenaIndex = u32;

const NIL: ArenaIndex = u32::MAX;

#[derive(Clone, Copy, Debug)]
struct AttachInfo {
    player_id: PlayerId,
    next: ArenaIndex,
}

/// Free-list-backed arena of attach-graph nodes, shared by every player's
/// `children` list.
#[derive(Clone, Debug, Default)]
pub struct AttachArena {
    nodes: Vec<AttachInfo>,
    free_head: Option<ArenaIndex>,
}

impl AttachArena {
    pub fn new() -> Self {
        AttachArena::default()
    }

    fn alloc(&mut self, player_id: PlayerId) -> ArenaIndex {
        if let Some(index) = self.free_head {
            let node = &mut self.nodes[index as usize];
            self.free_head = if node.next == NIL { None } else { Some(node.next) };
            node.player_id = player_id;
            node.next = NIL;
            index
        } else {
            let index = self.nodes.len() as ArenaIndex;
            self.nodes.push(AttachInfo { player_id, next: NIL });
            index
        }
    }

    fn free(&mut self, index: ArenaIndex) {
        self.nodes[index as usize].next = self.free_head.unwrap_or(NIL);
        self.free_head = Some(index);
    }

    /// Prepend a new node for `requester` onto `head`, returning the new
    /// head.
    pub fn push_front(&mut self, head: Option<ArenaIndex>, requester: PlayerId) -> Option<ArenaIndex> {
        let index = self.alloc(requester);
        self.nodes[index as usize].next = head.unwrap_or(NIL);
        Some(index)
    }

    /// Remove the first node holding `player_id` from `head`'s list,
    /// returning the (possibly unchanged) new head.
    pub fn remove(&mut self, head: Option<ArenaIndex>, player_id: PlayerId) -> Option<ArenaIndex> {
        let mut prev: Option<ArenaIndex> = None;
        let mut current = head;

        while let Some(index) = current {
            let node = self.nodes[index as usize];
            if node.player_id == player_id {
                let next = if node.next == NIL { None } else { Some(node.next) };
                match prev {
                    Some(p) => {
                        let next_raw = next.unwrap_or(NIL);
                        self.nodes[p as usize].next = next_raw;
                    }
                    None => {
                        self.free(index);
                        return next;
                    }
                }
                self.free(index);
                return head;
            }
            prev = Some(index);
            current = if node.next == NIL { None } else { Some(node.next) };
        }

        head
    }

    /// Iterate the player ids attached under `head`, in list order.
    pub fn children(&self, head: Option<ArenaIndex>) -> impl Iterator<Item = PlayerId> + '_ {
        let mut current = head;
        std::iter::from_fn(move || {
            let index = current?;
            let node = self.nodes[index as usize];
            current = if node.next == NIL { None } else { Some(node.next) };
            Some(node.player_id)
        })
    }

    /// Free every node under `head`, returning an empty list.
    pub fn clear(&mut self, head: Option<ArenaIndex>) -> Option<ArenaIndex> {
        let mut current = head;
        while let Some(index) = current {
            let next = self.nodes[index as usize].next;
            self.free(index);
            current = if next == NIL { None } else { Some(next) };
        }
        None
    }

    pub fn count(&self, head: Option<ArenaIndex>) -> usize {
        self.children(head).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(id: u16) -> PlayerId {
        PlayerId(id)
    }

    #[test]
    fn attach_then_detach_returns_node_to_free_list() {
        let mut arena = AttachArena::new();
        let head = arena.push_front(None, pid(1));
        assert_eq!(arena.count(head), 1);

        let head = arena.remove(head, pid(1));
        assert_eq!(head, None);
        assert_eq!(arena.nodes.len(), 1);

        // Reusing the freed slot shouldn't grow the backing storage.
        let head = arena.push_front(None, pid(2));
        assert_eq!(arena.nodes.len(), 1);
        assert_eq!(arena.children(head).collect::<Vec<_>>(), vec![pid(2)]);
    }

    #[test]
    fn multiple_children_preserve_insertion_as_lifo_order() {
        let mut arena = AttachArena::new();
        let mut head = None;
        head = arena.push_front(head, pid(1));
        head = arena.push_front(head, pid(2));
        assert_eq!(arena.children(head).collect::<Vec<_>>(), vec![pid(2), pid(1)]);
    }

    #[test]
    fn removing_middle_child_preserves_others() {
        let mut arena = AttachArena::new();
        let mut head = None;
        head = arena.push_front(head, pid(1));
        head = arena.push_front(head, pid(2));
        head = arena.push_front(head, pid(3));

        head = arena.remove(head, pid(2));
        assert_eq!(arena.children(head).collect::<Vec<_>>(), vec![pid(3), pid(1)]);
    }

    #[test]
    fn clear_frees_every_node() {
        let mut arena = AttachArena::new();
        let mut head = None;
        head = arena.push_front(head, pid(1));
        head = arena.push_front(head, pid(2));
        let head = arena.clear(head);
        assert_eq!(head, None);
        assert_eq!(arena.count(None), 0);
    }
}
