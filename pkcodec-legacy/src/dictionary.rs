//! Shrink code table.
//!
//! Every code above 256 stands for the string of its parent code followed
//! by one byte. The table stores that byte and the parent link per code;
//! literals 0-255 hang off the escape code, which acts as the root.
//!
//! Partial clearing frees only leaf codes. A freed slot keeps its old value
//! and parent link until it is reused, so a code that still points at it
//! (an orphan) keeps expanding to the same string.

use pkcodec_core::error::Result;

/// Number of codes (13-bit code space).
pub const HSIZE: usize = 8192;

/// Escape code, also the root of every string.
pub const ESCAPE: u16 = 256;

/// First code that can be allocated.
pub const FIRST_FREE: u16 = ESCAPE + 1;

/// Unshrink code table.
#[derive(Debug)]
pub struct ShrinkDictionary {
    /// Parent code per code; `ESCAPE` for literals.
    parent: Vec<u16>,
    /// Last byte of the string per code.
    value: Vec<u8>,
    /// Slot is available for a new leaf.
    free: Vec<bool>,
    /// Scratch for partial clearing.
    has_child: Vec<bool>,
    /// Last slot allocated; the next search starts after it.
    last_free: usize,
    /// Expansion buffer.
    stack: Vec<u8>,
}

impl ShrinkDictionary {
    /// Create a table holding only the 256 literals.
    pub fn new() -> Result<Self> {
        let mut parent = Vec::new();
        parent.try_reserve_exact(HSIZE)?;
        parent.resize(HSIZE, 0);
        let mut value = Vec::new();
        value.try_reserve_exact(HSIZE)?;
        value.resize(HSIZE, 0);
        let mut free = Vec::new();
        free.try_reserve_exact(HSIZE)?;
        free.resize(HSIZE, true);
        let mut has_child = Vec::new();
        has_child.try_reserve_exact(HSIZE)?;
        has_child.resize(HSIZE, false);
        let mut stack = Vec::new();
        stack.try_reserve_exact(HSIZE)?;

        for code in 0..ESCAPE as usize {
            parent[code] = ESCAPE;
            value[code] = code as u8;
            free[code] = false;
        }
        free[ESCAPE as usize] = false;

        Ok(Self {
            parent,
            value,
            free,
            has_child,
            last_free: ESCAPE as usize,
            stack,
        })
    }

    /// Whether `code` is currently unassigned.
    pub fn is_free(&self, code: u16) -> bool {
        self.free[code as usize]
    }

    /// Expand `code` to its string.
    ///
    /// A code that is not assigned yet is the one about to be added after
    /// `prev`: it expands to `prev`'s string plus that string's first byte.
    /// Returns `None` when the parent chain never reaches a literal.
    pub fn expand(&mut self, code: u16, prev: u16) -> Option<&[u8]> {
        self.stack.clear();
        let kwkwk = self.is_free(code);
        let mut cur = usize::from(if kwkwk { prev } else { code });

        loop {
            if self.stack.len() >= HSIZE {
                log::warn!("unshrink: parent chain of code {} does not end", code);
                return None;
            }
            self.stack.push(self.value[cur]);
            cur = self.parent[cur] as usize;
            if cur == ESCAPE as usize {
                break;
            }
        }
        self.stack.reverse();

        if kwkwk {
            let first = self.stack[0];
            self.stack.push(first);
        }
        Some(&self.stack)
    }

    /// Add `parent`'s string plus `byte` in the next free slot after the
    /// last one allocated. Returns the new code.
    ///
    /// A full table is left unchanged and yields `None`; the encoder keeps
    /// sending existing codes until its next partial clear.
    pub fn add_leaf(&mut self, parent: u16, byte: u8) -> Option<u16> {
        let mut code = self.last_free + 1;
        while code < HSIZE && !self.free[code] {
            code += 1;
        }
        if code >= HSIZE {
            self.last_free = HSIZE - 1;
            return None;
        }

        self.last_free = code;
        self.parent[code] = parent;
        self.value[code] = byte;
        self.free[code] = false;
        Some(code as u16)
    }

    /// Free every assigned code that is no other assigned code's parent,
    /// and restart slot allocation at [`FIRST_FREE`].
    pub fn partial_clear(&mut self) {
        self.has_child.fill(false);
        for code in FIRST_FREE as usize..HSIZE {
            if !self.free[code] {
                let parent = self.parent[code];
                if parent > ESCAPE {
                    self.has_child[parent as usize] = true;
                }
            }
        }

        let mut freed = 0;
        for code in FIRST_FREE as usize..HSIZE {
            if !self.has_child[code] && !self.free[code] {
                self.free[code] = true;
                freed += 1;
            }
        }
        self.last_free = ESCAPE as usize;
        log::debug!("unshrink: partial clear freed {} codes", freed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literals() {
        let mut dict = ShrinkDictionary::new().unwrap();
        assert_eq!(dict.expand(b'x' as u16, 0).unwrap(), b"x");
        assert!(!dict.is_free(255));
        assert!(dict.is_free(FIRST_FREE));
    }

    #[test]
    fn test_add_and_expand_chain() {
        let mut dict = ShrinkDictionary::new().unwrap();
        let ab = dict.add_leaf(b'a' as u16, b'b').unwrap();
        let abc = dict.add_leaf(ab, b'c').unwrap();
        assert_eq!((ab, abc), (257, 258));
        assert_eq!(dict.expand(abc, 0).unwrap(), b"abc");
    }

    #[test]
    fn test_kwkwk() {
        let mut dict = ShrinkDictionary::new().unwrap();
        let ab = dict.add_leaf(b'a' as u16, b'b').unwrap();
        assert_eq!(dict.expand(ab + 1, ab).unwrap(), b"aba");
    }

    #[test]
    fn test_partial_clear_keeps_parents() {
        let mut dict = ShrinkDictionary::new().unwrap();
        let ab = dict.add_leaf(b'a' as u16, b'b').unwrap();
        let ba = dict.add_leaf(b'b' as u16, b'a').unwrap();
        let abc = dict.add_leaf(ab, b'c').unwrap();

        dict.partial_clear();
        assert!(!dict.is_free(ab));
        assert!(dict.is_free(ba));
        assert!(dict.is_free(abc));

        // Allocation restarts at the lowest free slot.
        assert_eq!(dict.add_leaf(b'z' as u16, b'z').unwrap(), ba);
        assert_eq!(dict.add_leaf(b'y' as u16, b'y').unwrap(), abc);
        assert_eq!(dict.add_leaf(b'x' as u16, b'x').unwrap(), abc + 1);
    }

    #[test]
    fn test_full_table_skips_add() {
        let mut dict = ShrinkDictionary::new().unwrap();
        for _ in FIRST_FREE as usize..HSIZE {
            dict.add_leaf(b'a' as u16, b'a').unwrap();
        }
        assert_eq!(dict.add_leaf(b'b' as u16, b'b'), None);
        assert_eq!(dict.add_leaf(b'c' as u16, b'c'), None);
        assert_eq!(dict.expand((HSIZE - 1) as u16, 0).unwrap(), b"aa");

        // A partial clear frees the leaves again.
        dict.partial_clear();
        assert_eq!(dict.add_leaf(b'b' as u16, b'b'), Some(FIRST_FREE));
    }

    #[test]
    fn test_cycle_does_not_expand() {
        let mut dict = ShrinkDictionary::new().unwrap();
        let a = dict.add_leaf(b'a' as u16, b'a').unwrap();
        let b = dict.add_leaf(a, b'b').unwrap();
        dict.parent[a as usize] = b;
        assert!(dict.expand(b, 0).is_none());
    }
}
