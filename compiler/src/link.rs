//! Link context
//!
//! The one resource shared across function compilations: the symbol table
//! handed to the linker. Pointer-map symbols are content-addressed
//! (`gclocals·<md5>`), so identical tables produced by different functions
//! collapse to a single read-only symbol. Inserts are keyed on the
//! content-addressed name behind a mutex: racing inserters carry identical
//! bytes, the first one wins, and every caller sees the winner.

use indexmap::IndexMap;
use std::sync::{Arc, Mutex};

/// PCDATA table index for stack map transitions.
pub const PCDATA_STACK_MAP_INDEX: u32 = 0;

/// PCDATA table index for the inline tree (reserved for the inliner).
pub const PCDATA_INL_TREE_INDEX: u32 = 1;

/// FUNCDATA slot holding the args-region pointer maps.
pub const FUNCDATA_ARGS_POINTER_MAPS: u32 = 0;

/// FUNCDATA slot holding the locals-region pointer maps.
pub const FUNCDATA_LOCALS_POINTER_MAPS: u32 = 1;

/// FUNCDATA slot holding the inline tree (reserved for the inliner).
pub const FUNCDATA_INL_TREE: u32 = 2;

/// A linker symbol with its payload and attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSymbol {
    pub name: String,
    pub data: Vec<u8>,

    /// Multiple object files may carry this symbol; the linker keeps one.
    pub dup_ok: bool,

    /// Lives in read-only data.
    pub rodata: bool,
}

/// The shared symbol table.
#[derive(Debug, Default)]
pub struct LinkContext {
    symbols: Mutex<IndexMap<String, Arc<LinkSymbol>>>,
}

impl LinkContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finish a pointer-map symbol: name it after its content and insert it,
    /// or reuse an existing symbol with the same content-addressed name.
    pub fn finish_gclocals(&self, data: Vec<u8>) -> Arc<LinkSymbol> {
        let mut ctx = md5::Context::new();
        ctx.consume(&data);
        let name = format!("gclocals·{:x}", ctx.compute());

        let mut symbols = self.symbols.lock().unwrap();
        symbols
            .entry(name.clone())
            .or_insert_with(|| {
                Arc::new(LinkSymbol {
                    name,
                    data,
                    dup_ok: true,
                    rodata: true,
                })
            })
            .clone()
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<LinkSymbol>> {
        self.symbols.lock().unwrap().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.symbols.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.lock().unwrap().is_empty()
    }

    /// Symbols in insertion order, for deterministic object emission.
    pub fn symbols(&self) -> Vec<Arc<LinkSymbol>> {
        self.symbols.lock().unwrap().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_addressed_name() {
        let ctx = LinkContext::new();
        let sym = ctx.finish_gclocals(vec![1, 0, 0, 0, 8, 0, 0, 0, 0xff]);
        assert!(sym.name.starts_with("gclocals·"));
        // md5 is 16 bytes -> 32 hex digits.
        assert_eq!(sym.name.len(), "gclocals·".len() + 32);
        assert!(sym.dup_ok);
        assert!(sym.rodata);
    }

    #[test]
    fn test_identical_content_deduplicates() {
        let ctx = LinkContext::new();
        let a = ctx.finish_gclocals(vec![1, 2, 3]);
        let b = ctx.finish_gclocals(vec![1, 2, 3]);
        let c = ctx.finish_gclocals(vec![4, 5, 6]);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(ctx.len(), 2);
    }

    #[test]
    fn test_concurrent_inserts_single_winner() {
        let ctx = Arc::new(LinkContext::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let ctx = Arc::clone(&ctx);
            handles.push(std::thread::spawn(move || {
                ctx.finish_gclocals(vec![9, 9, 9])
            }));
        }
        let syms: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(ctx.len(), 1);
        for s in &syms[1..] {
            assert!(Arc::ptr_eq(&syms[0], s));
        }
    }
}
