//! Scope arena. Scope ids are dense indices; id 0 is the file-global scope
//! and function scopes follow in definition order.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeId(pub u32);

impl ScopeId {
    pub const GLOBAL: ScopeId = ScopeId(0);

    pub fn is_global(self) -> bool {
        self == ScopeId::GLOBAL
    }
}

/// `[scope_id, start, end)` over token indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeIdRange(pub ScopeId, pub usize, pub usize);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub id: ScopeId,
    pub parent: Option<ScopeId>,
    pub start: usize,
    pub end: usize,
    pub depth: u32,
    /// Normalized name of the function that owns the scope.
    pub owner: Option<String>,
}

impl Scope {
    pub fn contains(&self, token: usize) -> bool {
        (self.start..self.end).contains(&token)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl ScopeTree {
    /// A tree holding only the global scope over `token_count` tokens.
    pub fn new(token_count: usize) -> Self {
        ScopeTree {
            scopes: vec![Scope {
                id: ScopeId::GLOBAL,
                parent: None,
                start: 0,
                end: token_count,
                depth: 0,
                owner: None,
            }],
        }
    }

    /// Add a scope under the innermost scope that contains `start`.
    pub fn push(&mut self, start: usize, end: usize, owner: Option<String>) -> ScopeId {
        let parent = self.innermost_at(start);
        let depth = self.scopes[parent.0 as usize].depth + 1;
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            id,
            parent: Some(parent),
            start,
            end,
            depth,
            owner,
        });
        id
    }

    pub fn get(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scope> {
        self.scopes.iter()
    }

    /// Deepest scope containing `token`; the global scope otherwise.
    pub fn innermost_at(&self, token: usize) -> ScopeId {
        self.scopes
            .iter()
            .filter(|s| s.contains(token))
            .max_by_key(|s| s.depth)
            .map_or(ScopeId::GLOBAL, |s| s.id)
    }

    /// `id` and its ancestors, innermost first, ending with the global scope.
    pub fn chain(&self, id: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(self.get(id), move |s| s.parent.and_then(|p| self.get(p))).map(|s| s.id)
    }

    pub fn ranges(&self) -> Vec<ScopeIdRange> {
        self.scopes
            .iter()
            .map(|s| ScopeIdRange(s.id, s.start, s.end))
            .collect()
    }

    /// Every child range lies inside its parent, and siblings are disjoint.
    pub fn is_forest(&self) -> bool {
        for s in &self.scopes {
            let Some(parent) = s.parent.and_then(|p| self.get(p)) else {
                continue;
            };
            if s.start < parent.start || s.end > parent.end {
                return false;
            }
        }
        for (i, a) in self.scopes.iter().enumerate() {
            for b in &self.scopes[i + 1..] {
                let overlap = a.start < b.end && b.start < a.end;
                if a.parent == b.parent && overlap {
                    return false;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn innermost_and_chain() {
        let mut tree = ScopeTree::new(100);
        let f = tree.push(10, 40, Some("f".into()));
        let g = tree.push(20, 30, Some("g".into()));
        let h = tree.push(50, 60, None);
        assert_eq!(tree.innermost_at(5), ScopeId::GLOBAL);
        assert_eq!(tree.innermost_at(15), f);
        assert_eq!(tree.innermost_at(25), g);
        assert_eq!(tree.innermost_at(55), h);
        let chain: Vec<ScopeId> = tree.chain(g).collect();
        assert_eq!(chain, vec![g, f, ScopeId::GLOBAL]);
        assert!(tree.is_forest());
        assert_eq!(tree.ranges()[1], ScopeIdRange(f, 10, 40));
    }

    #[test]
    fn overlapping_siblings_are_not_a_forest() {
        let mut tree = ScopeTree::new(100);
        tree.push(10, 40, None);
        tree.push(45, 60, None);
        assert!(tree.is_forest());
        let mut bad = ScopeTree::new(100);
        bad.push(10, 40, None);
        bad.push(30, 120, None);
        assert!(!bad.is_forest());
    }
}
