//! # Type Model
//!
//! Turns opaque (module base, type id) pairs from the symbol provider into a
//! small closed set of [`TypeNode`] variants that can name themselves and
//! format raw target bytes.
//!
//! ## Storage
//!
//! Nodes live in a [`TypeArena`]. A node refers to its children (pointee,
//! element, members, ...) by [`TypeHandle`], and the arena keeps a cache from
//! (module base, type id) to handle, so resolving the same type twice returns
//! the same handle. The arena is owned by the session and dropped or evicted
//! together with the module it describes.
//!
//! Evicted slots are reused by later resolutions. Each slot carries a
//! generation that is bumped on eviction, so a handle taken before the
//! eviction never observes the node that replaced it.
//!
//! ## Recursive types
//!
//! A node's slot is reserved and cached *before* its children are resolved.
//! A struct that points to itself therefore resolves its own id to the
//! reserved handle instead of recursing forever.
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut arena = TypeArena::new(WordSize::Bits32);
//! let handle = arena.resolve(&provider, module_base, symbol.type_id);
//! println!("{}: {}", arena.type_name(handle), arena.format_value(handle, &bytes));
//! ```

mod format;
mod primitive;

use std::collections::HashMap;

pub use format::ARRAY_DISPLAY_LIMIT;
pub use primitive::Primitive;
use smallvec::SmallVec;
use tracing::trace;

use crate::symbols::{SymTag, TypeInfoSource};
use crate::types::{Address, WordSize};

/// Generation-checked index of a node inside a [`TypeArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeHandle
{
    index: u32,
    generation: u32,
}

impl TypeHandle
{
    /// Raw arena index
    pub const fn index(self) -> usize
    {
        self.index as usize
    }

    /// Times the slot had been evicted when this handle was issued
    pub const fn generation(self) -> u32
    {
        self.generation
    }
}

/// Named member of a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member
{
    pub name: String,
    /// Byte offset from the start of the record
    pub offset: u32,
    /// `None` when the member's type id could not be read
    pub ty: Option<TypeHandle>,
}

/// Named enumerator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumConstant
{
    pub name: String,
    pub value: i128,
}

/// One resolved type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeNode
{
    Primitive(Primitive),
    Pointer
    {
        inner: Option<TypeHandle>,
        reference: bool,
    },
    Array
    {
        inner: Option<TypeHandle>,
        /// Byte length of one element
        element_len: u64,
        count: u32,
    },
    Enum
    {
        name: String,
        underlying: Primitive,
        constants: Vec<EnumConstant>,
    },
    Function
    {
        ret: Option<TypeHandle>,
        params: SmallVec<[Option<TypeHandle>; 4]>,
    },
    Typedef
    {
        name: String,
        target: Option<TypeHandle>,
    },
    /// struct, class or union
    Record
    {
        name: String,
        members: Vec<Member>,
    },
    Unknown,
}

struct Slot
{
    module: Address,
    node: TypeNode,
}

struct Entry
{
    generation: u32,
    slot: Option<Slot>,
}

/// Arena of resolved type nodes with the (module base, type id) cache
pub struct TypeArena
{
    word: WordSize,
    entries: Vec<Entry>,
    /// Indices of evicted entries, reused before the arena grows
    free: Vec<u32>,
    cache: HashMap<(Address, u32), TypeHandle>,
}

impl TypeArena
{
    /// Empty arena for a target with the given pointer width.
    pub fn new(word: WordSize) -> Self
    {
        Self {
            word,
            entries: Vec::new(),
            free: Vec::new(),
            cache: HashMap::new(),
        }
    }

    /// Pointer width used to format pointers
    pub fn word_size(&self) -> WordSize
    {
        self.word
    }

    /// Drop every node and set the pointer width for a new target.
    pub fn reset(&mut self, word: WordSize)
    {
        self.word = word;
        self.entries.clear();
        self.free.clear();
        self.cache.clear();
    }

    /// Number of cached type ids
    pub fn len(&self) -> usize
    {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.cache.is_empty()
    }

    /// Slots allocated so far, live or waiting for reuse
    pub fn capacity(&self) -> usize
    {
        self.entries.len()
    }

    /// Node behind a handle, `None` once its module was evicted
    pub fn node(&self, handle: TypeHandle) -> Option<&TypeNode>
    {
        let entry = self.entries.get(handle.index())?;
        if entry.generation != handle.generation {
            return None;
        }
        entry.slot.as_ref().map(|slot| &slot.node)
    }

    /// Cached handle for a type id, without resolving it
    pub fn cached(&self, module: Address, type_id: u32) -> Option<TypeHandle>
    {
        self.cache.get(&(module, type_id)).copied()
    }

    /// Resolve a type id, building and caching its node on first use.
    ///
    /// Never fails: tags the model does not know, and ids the provider cannot
    /// describe, become [`TypeNode::Unknown`].
    pub fn resolve<S: TypeInfoSource + ?Sized>(&mut self, source: &S, module: Address, type_id: u32) -> TypeHandle
    {
        if let Some(handle) = self.cached(module, type_id) {
            return handle;
        }

        let handle = self.reserve(module, type_id);
        let tag = source.tag(module, type_id);
        trace!(module = %module, type_id, ?tag, "resolving type");

        let node = match tag {
            Some(SymTag::BaseType) => TypeNode::Primitive(primitive_of(source, module, type_id)),
            Some(SymTag::PointerType) => TypeNode::Pointer {
                reference: source.is_reference(module, type_id),
                inner: self.resolve_inner(source, module, type_id),
            },
            Some(SymTag::ArrayType) => {
                let count = source.count(module, type_id).unwrap_or(0);
                let inner_id = source.inner_type(module, type_id);
                let element_len = inner_id.and_then(|id| source.length(module, id)).unwrap_or(0);
                TypeNode::Array {
                    inner: inner_id.map(|id| self.resolve(source, module, id)),
                    element_len,
                    count,
                }
            }
            Some(SymTag::Enum) => TypeNode::Enum {
                name: source.name(module, type_id).unwrap_or_default(),
                underlying: primitive_of(source, module, type_id),
                constants: source
                    .children(module, type_id)
                    .into_iter()
                    .filter_map(|child| {
                        Some(EnumConstant {
                            name: source.name(module, child)?,
                            value: source.constant_value(module, child)?,
                        })
                    })
                    .collect(),
            },
            Some(SymTag::FunctionType) => {
                let ret = self.resolve_inner(source, module, type_id);
                let params = source
                    .children(module, type_id)
                    .into_iter()
                    .map(|param| self.resolve_inner(source, module, param))
                    .collect();
                TypeNode::Function { ret, params }
            }
            Some(SymTag::Typedef) => TypeNode::Typedef {
                name: source.name(module, type_id).unwrap_or_default(),
                target: self.resolve_inner(source, module, type_id),
            },
            Some(SymTag::Udt) => {
                let name = source.name(module, type_id).unwrap_or_default();
                let members = source
                    .children(module, type_id)
                    .into_iter()
                    .filter(|child| source.tag(module, *child).is_some_and(SymTag::is_record_member))
                    .map(|child| Member {
                        name: source.name(module, child).unwrap_or_default(),
                        offset: source.offset(module, child).unwrap_or(0),
                        ty: self.resolve_inner(source, module, child),
                    })
                    .collect();
                TypeNode::Record { name, members }
            }
            _ => TypeNode::Unknown,
        };

        if let Some(slot) = self.entries.get_mut(handle.index()).and_then(|entry| entry.slot.as_mut()) {
            slot.node = node;
        }
        handle
    }

    /// Drop every node that belongs to `module`.
    ///
    /// Returns the number of cache entries removed. Handles into the evicted
    /// module render as `??` afterwards, even once their slots are reused.
    pub fn evict_module(&mut self, module: Address) -> usize
    {
        let before = self.cache.len();
        self.cache.retain(|(base, _), _| *base != module);
        for (index, entry) in self.entries.iter_mut().enumerate() {
            if entry.slot.as_ref().is_some_and(|slot| slot.module == module) {
                entry.slot = None;
                entry.generation = entry.generation.wrapping_add(1);
                self.free.push(u32::try_from(index).unwrap_or(u32::MAX));
            }
        }
        before - self.cache.len()
    }

    fn reserve(&mut self, module: Address, type_id: u32) -> TypeHandle
    {
        let slot = Slot {
            module,
            node: TypeNode::Unknown,
        };
        let handle = match self.free.pop() {
            Some(index) => {
                let entry = &mut self.entries[index as usize];
                entry.slot = Some(slot);
                TypeHandle {
                    index,
                    generation: entry.generation,
                }
            }
            None => {
                let index = u32::try_from(self.entries.len()).unwrap_or(u32::MAX);
                self.entries.push(Entry {
                    generation: 0,
                    slot: Some(slot),
                });
                TypeHandle { index, generation: 0 }
            }
        };
        self.cache.insert((module, type_id), handle);
        handle
    }

    fn resolve_inner<S: TypeInfoSource + ?Sized>(&mut self, source: &S, module: Address, type_id: u32) -> Option<TypeHandle>
    {
        let inner = source.inner_type(module, type_id)?;
        Some(self.resolve(source, module, inner))
    }
}

fn primitive_of<S: TypeInfoSource + ?Sized>(source: &S, module: Address, type_id: u32) -> Primitive
{
    match (source.base_kind(module, type_id), source.length(module, type_id)) {
        (Some(kind), length) => Primitive::from_base(kind, length.unwrap_or(0)),
        (None, _) => Primitive::None,
    }
}
