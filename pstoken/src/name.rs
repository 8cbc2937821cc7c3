//! Interned names.
//!
//! Names are interned in a [`NameCache`], so that two names with the same
//! content are always the same entry and can be compared by identity.
//! Entries remember the save level they were created at, so that restoring
//! a save can forget names created after it.

mod system;

use core::cell::{Cell, RefCell};
use core::fmt;
use core::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

use log::debug;
use smallvec::SmallVec;

use crate::dict::Slot;
use crate::error::{ErrorKind, Result};

pub(crate) use system::SYSTEM_TABLE_SIZE;

/// The longest name the text scanner accepts.
pub const MAX_NAME_LENGTH: usize = 127;

/// The longest name a binary object sequence may carry.
pub const MAX_LONG_NAME_LENGTH: usize = 0x7fff;

const BUCKET_COUNT: usize = 1 << 11;

struct Entry {
    bytes: Box<[u8]>,
    hash: u32,
    save_level: Cell<u32>,
    system_index: Option<u16>,
    /// The dictionary slot this name was last resolved to. Never keeps the
    /// slot alive.
    hint: RefCell<Weak<Slot>>,
}

/// A handle to an interned name.
///
/// Handles are cheap to clone. Two handles from the same [`NameCache`] are
/// equal if and only if their contents are equal.
#[derive(Clone)]
pub struct Name(Rc<Entry>);

impl Name {
    fn new(bytes: &[u8], save_level: u32, system_index: Option<u16>) -> Self {
        Self(Rc::new(Entry {
            bytes: bytes.into(),
            hash: hash(bytes),
            save_level: Cell::new(save_level),
            system_index,
            hint: RefCell::new(Weak::new()),
        }))
    }

    /// The content of the name.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0.bytes
    }

    /// Returns the name as a string if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        core::str::from_utf8(&self.0.bytes).ok()
    }

    /// The index of the name in the system name table, if it has one.
    pub fn system_index(&self) -> Option<u16> {
        self.0.system_index
    }

    /// The save level the name was created at.
    pub fn save_level(&self) -> u32 {
        self.0.save_level.get()
    }

    /// The dictionary slot the name was last resolved to, if that slot is
    /// still alive.
    pub fn lookup_hint(&self) -> Option<Rc<Slot>> {
        self.0.hint.borrow().upgrade()
    }

    /// Remember `slot` as the place this name resolves to.
    pub fn set_lookup_hint(&self, slot: &Rc<Slot>) {
        *self.0.hint.borrow_mut() = Rc::downgrade(slot);
    }

    /// Forget the remembered dictionary slot.
    pub fn clear_lookup_hint(&self) {
        *self.0.hint.borrow_mut() = Weak::new();
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        core::ptr::hash(Rc::as_ptr(&self.0), state);
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", String::from_utf8_lossy(&self.0.bytes))
    }
}

/// The hash used to distribute names over the cache buckets.
///
/// Four bytes are mixed in per step, so the result depends on the order of
/// the bytes.
pub(crate) fn hash(bytes: &[u8]) -> u32 {
    #[inline(always)]
    fn mix(h: u32, word: u32) -> u32 {
        let h = h.rotate_left(7) ^ word;
        h.wrapping_add(h >> 11)
    }

    let mut h = bytes.len() as u32;
    let mut chunks = bytes.chunks_exact(4);

    for chunk in &mut chunks {
        h = mix(h, u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }

    let rest = chunks.remainder();
    if !rest.is_empty() {
        let word = rest.iter().fold(0_u32, |w, &b| (w << 8) | u32::from(b));
        h = mix(h, word);
    }

    h
}

/// The interning table for names.
pub struct NameCache {
    buckets: Vec<SmallVec<[Name; 2]>>,
    system: Vec<Option<Name>>,
    save_level: u32,
    len: usize,
}

impl NameCache {
    /// Create a new cache, pre-populated with the system name table.
    pub fn new() -> Self {
        let mut cache = Self {
            buckets: vec![SmallVec::new(); BUCKET_COUNT],
            system: vec![None; SYSTEM_TABLE_SIZE],
            save_level: 0,
            len: 0,
        };

        for (index, bytes) in system::SYSTEM_NAMES.iter().enumerate() {
            let name = Name::new(bytes, 0, Some(index as u16));
            cache.link(name.clone());
            cache.system[index] = Some(name);
        }

        cache
    }

    /// The number of names in the cache.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The save level new names are stamped with.
    pub fn save_level(&self) -> u32 {
        self.save_level
    }

    /// Set the save level new names are stamped with.
    pub fn set_save_level(&mut self, level: u32) {
        self.save_level = level;
    }

    /// Intern a name of at most [`MAX_NAME_LENGTH`] bytes.
    pub fn intern(&mut self, bytes: &[u8]) -> Result<Name> {
        self.intern_limited(bytes, MAX_NAME_LENGTH)
    }

    /// Intern a name of at most [`MAX_LONG_NAME_LENGTH`] bytes.
    pub fn intern_long(&mut self, bytes: &[u8]) -> Result<Name> {
        self.intern_limited(bytes, MAX_LONG_NAME_LENGTH)
    }

    fn intern_limited(&mut self, bytes: &[u8], limit: usize) -> Result<Name> {
        if bytes.len() > limit {
            return Err(ErrorKind::LimitCheck.into());
        }

        if let Some(name) = self.lookup(bytes) {
            return Ok(name);
        }

        let name = Name::new(bytes, self.save_level, None);
        self.link(name.clone());

        Ok(name)
    }

    /// Find the name with the given content without creating it.
    pub fn lookup(&self, bytes: &[u8]) -> Option<Name> {
        let h = hash(bytes);

        self.buckets[bucket(h)]
            .iter()
            .rev()
            .find(|n| n.0.hash == h && n.0.bytes.len() == bytes.len() && *n.0.bytes == *bytes)
            .cloned()
    }

    /// The name at `index` in the system name table. Returns `None` for
    /// indices that are out of range or were never assigned.
    pub fn system_name(&self, index: usize) -> Option<Name> {
        self.system.get(index)?.clone()
    }

    /// Forget names created above save level `to_level`.
    ///
    /// Names that are still referenced outside the cache, or whose
    /// dictionary lookup hint is still alive, keep their entry so that
    /// interning them again yields the same handle. Their hint is cleared
    /// and they are re-stamped with `to_level`. All other such names are
    /// unlinked from the cache. Returns the number of unlinked names.
    pub fn purge(&mut self, to_level: u32) -> usize {
        let mut removed = 0;

        for bucket in &mut self.buckets {
            bucket.retain(|name| {
                if name.save_level() <= to_level {
                    return true;
                }

                if Rc::strong_count(&name.0) > 1 || name.lookup_hint().is_some() {
                    name.clear_lookup_hint();
                    name.0.save_level.set(to_level);
                    true
                } else {
                    removed += 1;
                    false
                }
            });
        }

        self.len -= removed;
        self.save_level = to_level;

        debug!("purged {removed} names above save level {to_level}");

        removed
    }

    /// Unlink every name that is referenced by nothing but the cache.
    ///
    /// System names are never collected. Returns the number of unlinked
    /// names.
    pub fn collect(&mut self) -> usize {
        let mut removed = 0;

        for bucket in &mut self.buckets {
            bucket.retain(|name| {
                let unused = Rc::strong_count(&name.0) == 1 && name.0.system_index.is_none();
                removed += usize::from(unused);
                !unused
            });
        }

        self.len -= removed;

        debug!("collected {removed} unreferenced names");

        removed
    }

    /// Present every live name to `f`.
    pub fn scan(&self, f: impl FnMut(&Name)) {
        self.buckets.iter().flatten().for_each(f);
    }

    fn link(&mut self, name: Name) {
        self.buckets[bucket(name.0.hash)].push(name);
        self.len += 1;
    }
}

impl Default for NameCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NameCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NameCache")
            .field("len", &self.len)
            .field("save_level", &self.save_level)
            .finish_non_exhaustive()
    }
}

#[inline]
fn bucket(hash: u32) -> usize {
    hash as usize & (BUCKET_COUNT - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Object;

    fn names(cache: &NameCache) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        cache.scan(|n| out.push(n.as_bytes().to_vec()));
        out.sort();
        out
    }

    #[test]
    fn identity() {
        let mut cache = NameCache::new();
        let a = cache.intern(b"moveto2").unwrap();
        let b = cache.intern(b"moveto2").unwrap();
        let c = cache.intern(b"moveto3").unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_str(), Some("moveto2"));
    }

    #[test]
    fn system_names_are_preinterned() {
        let mut cache = NameCache::new();
        let def = cache.intern(b"def").unwrap();

        assert_eq!(def.system_index(), Some(53));
        assert_eq!(cache.system_name(53), Some(def));
        assert_eq!(cache.system_name(227).unwrap().as_bytes(), b"setpattern");
    }

    #[test]
    fn system_table_is_sparse() {
        let cache = NameCache::new();
        assert_eq!(cache.system_name(228), None);
        assert_eq!(cache.system_name(SYSTEM_TABLE_SIZE - 1), None);
        assert_eq!(cache.system_name(100_000), None);
    }

    #[test]
    fn length_limits() {
        let mut cache = NameCache::new();
        let long = [b'x'; MAX_NAME_LENGTH + 1];

        assert_eq!(cache.intern(&long).unwrap_err().kind(), ErrorKind::LimitCheck);
        assert!(cache.intern_long(&long).is_ok());
        assert!(cache.intern(&long[..MAX_NAME_LENGTH]).is_ok());

        let too_long = vec![b'y'; MAX_LONG_NAME_LENGTH + 1];
        assert_eq!(
            cache.intern_long(&too_long).unwrap_err().kind(),
            ErrorKind::LimitCheck
        );
    }

    #[test]
    fn lookup_does_not_create() {
        let mut cache = NameCache::new();
        let before = cache.len();

        assert!(cache.lookup(b"nothere").is_none());
        assert_eq!(cache.len(), before);

        let n = cache.intern(b"nothere").unwrap();
        assert_eq!(cache.lookup(b"nothere"), Some(n));
        assert_eq!(cache.len(), before + 1);
    }

    #[test]
    fn empty_name() {
        let mut cache = NameCache::new();
        let a = cache.intern(b"").unwrap();
        assert_eq!(cache.intern(b"").unwrap(), a);
        assert_eq!(a.as_bytes(), b"");
    }

    #[test]
    fn hash_is_order_sensitive() {
        assert_ne!(hash(b"abcdefgh"), hash(b"efghabcd"));
        assert_ne!(hash(b"ab"), hash(b"ba"));
        assert_eq!(hash(b"abcdefgh"), hash(b"abcdefgh"));
    }

    #[test]
    fn purge_removes_newer_names() {
        let mut cache = NameCache::new();
        let old = cache.intern(b"old").unwrap();

        cache.set_save_level(1);
        let new = cache.intern(b"new").unwrap();
        assert_eq!(new.save_level(), 1);
        drop(new);

        assert_eq!(cache.purge(0), 1);
        assert!(cache.lookup(b"new").is_none());
        assert_eq!(cache.lookup(b"old"), Some(old));
        assert_eq!(cache.save_level(), 0);
    }

    #[test]
    fn purge_is_idempotent() {
        let mut cache = NameCache::new();
        cache.set_save_level(2);
        cache.intern(b"a").unwrap();
        cache.set_save_level(1);
        cache.intern(b"b").unwrap();

        cache.purge(1);
        let once = names(&cache);
        assert_eq!(cache.purge(1), 0);
        assert_eq!(names(&cache), once);
        assert!(cache.lookup(b"b").is_some());
        assert!(cache.lookup(b"a").is_none());
    }

    #[test]
    fn purge_with_nothing_to_do() {
        let mut cache = NameCache::new();
        let before = cache.len();
        assert_eq!(cache.purge(0), 0);
        assert_eq!(cache.len(), before);
    }

    #[test]
    fn purge_keeps_hinted_names() {
        let mut cache = NameCache::new();
        cache.set_save_level(1);
        let hinted = cache.intern(b"hinted").unwrap();

        let slot: Rc<Slot> = Rc::new(RefCell::new(Object::integer(1)));
        hinted.set_lookup_hint(&slot);

        assert_eq!(cache.purge(0), 0);
        assert_eq!(cache.lookup(b"hinted"), Some(hinted.clone()));
        assert!(hinted.lookup_hint().is_none());
        assert_eq!(hinted.save_level(), 0);
    }

    #[test]
    fn purge_keeps_referenced_names() {
        let mut cache = NameCache::new();
        cache.set_save_level(1);
        let held = cache.intern(b"held").unwrap();
        let len = cache.len();

        assert_eq!(cache.purge(0), 0);
        assert_eq!(held.save_level(), 0);

        let again = cache.intern(b"held").unwrap();
        assert_eq!(again, held);
        assert_eq!(cache.len(), len);
    }

    #[test]
    fn hint_is_weak() {
        let mut cache = NameCache::new();
        cache.set_save_level(1);
        let name = cache.intern(b"weak").unwrap();

        let slot: Rc<Slot> = Rc::new(RefCell::new(Object::null()));
        name.set_lookup_hint(&slot);
        drop(slot);

        assert!(name.lookup_hint().is_none());
        drop(name);
        assert_eq!(cache.purge(0), 1);
    }

    #[test]
    fn collect_unreferenced() {
        let mut cache = NameCache::new();
        let before = cache.len();
        let kept = cache.intern(b"kept").unwrap();
        cache.intern(b"dropped").unwrap();

        assert_eq!(cache.collect(), 1);
        assert_eq!(cache.len(), before + 1);
        assert_eq!(cache.lookup(b"kept"), Some(kept));
        assert!(cache.lookup(b"dropped").is_none());
        assert!(cache.lookup(b"def").is_some());
    }

    #[test]
    fn scan_visits_every_name() {
        let mut cache = NameCache::new();
        cache.intern(b"visited").unwrap();

        let mut count = 0;
        let mut seen = false;
        cache.scan(|n| {
            count += 1;
            seen |= n.as_bytes() == b"visited";
        });

        assert_eq!(count, cache.len());
        assert!(seen);
    }
}
