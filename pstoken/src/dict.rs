//! A minimal dictionary stack.
//!
//! The scanner only needs dictionaries to resolve immediately evaluated
//! names. [`DictStack`] provides that, together with save level tracking
//! that keeps a [`NameCache`] in sync.

use core::cell::RefCell;
use core::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::env::Environment;
use crate::name::{Name, NameCache};
use crate::object::{Object, VmClass};

/// The binding of a key in a dictionary.
pub type Slot = RefCell<Object>;

/// A dictionary mapping names to objects.
#[derive(Debug, Default, Clone)]
pub struct Dictionary {
    entries: FxHashMap<Name, Rc<Slot>>,
}

impl Dictionary {
    /// Create an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the dictionary is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The slot bound to `key`.
    pub fn get(&self, key: &Name) -> Option<&Rc<Slot>> {
        self.entries.get(key)
    }

    /// Bind `key` to `value`. An existing slot is updated in place.
    pub fn insert(&mut self, key: Name, value: Object) {
        match self.entries.get(&key) {
            Some(slot) => {
                slot.replace(value);
            }
            None => {
                self.entries.insert(key, Rc::new(RefCell::new(value)));
            }
        }
    }

    /// Iterate over the keys.
    pub fn keys(&self) -> impl Iterator<Item = &Name> {
        self.entries.keys()
    }
}

type CommentHandler = Box<dyn FnMut(&[u8])>;

/// A stack of dictionaries with a permanent bottom (system) dictionary.
///
/// Names found in the bottom dictionary remember the slot they resolved
/// to, which short-cuts later lookups. Defining a name anywhere above the
/// bottom drops that shortcut.
pub struct DictStack {
    frames: Vec<Dictionary>,
    vm: VmClass,
    save_level: u32,
    comments: Option<CommentHandler>,
}

impl DictStack {
    /// Create a stack holding `system` as its bottom dictionary and an empty
    /// user dictionary on top of it.
    pub fn new(system: Dictionary) -> Self {
        Self {
            frames: vec![system, Dictionary::new()],
            vm: VmClass::Local,
            save_level: 0,
            comments: None,
        }
    }

    /// The number of dictionaries on the stack.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Push `dict` onto the stack.
    pub fn begin(&mut self, dict: Dictionary) {
        for key in dict.keys() {
            key.clear_lookup_hint();
        }

        self.frames.push(dict);
    }

    /// Pop the topmost dictionary. The system and user dictionaries stay.
    pub fn end(&mut self) -> Option<Dictionary> {
        if self.frames.len() > 2 {
            self.frames.pop()
        } else {
            None
        }
    }

    /// Bind `key` in the topmost dictionary.
    pub fn define(&mut self, key: Name, value: Object) {
        if self.frames.len() > 1 {
            key.clear_lookup_hint();
        }

        if let Some(top) = self.frames.last_mut() {
            top.insert(key, value);
        }
    }

    /// Bind `key` in the system dictionary.
    pub fn define_system(&mut self, key: Name, value: Object) {
        self.frames[0].insert(key, value);
    }

    /// Select the VM new composites are allocated in.
    pub fn set_allocation(&mut self, vm: VmClass) {
        self.vm = vm;
    }

    /// Install a handler that receives the text of every scanned comment.
    pub fn set_comment_handler(&mut self, handler: impl FnMut(&[u8]) + 'static) {
        self.comments = Some(Box::new(handler));
    }

    /// Enter a new save level. Returns the new level.
    pub fn save(&mut self, names: &mut NameCache) -> u32 {
        self.save_level += 1;
        names.set_save_level(self.save_level);
        self.save_level
    }

    /// Leave the current save level, forgetting names created in it.
    /// Returns the number of names that were unlinked from `names`.
    pub fn restore(&mut self, names: &mut NameCache) -> usize {
        self.save_level = self.save_level.saturating_sub(1);
        names.purge(self.save_level)
    }
}

impl Default for DictStack {
    fn default() -> Self {
        Self::new(Dictionary::new())
    }
}

impl fmt::Debug for DictStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DictStack")
            .field("frames", &self.frames)
            .field("vm", &self.vm)
            .field("save_level", &self.save_level)
            .finish_non_exhaustive()
    }
}

impl Environment for DictStack {
    fn load(&self, name: &Name) -> Option<Object> {
        if let Some(slot) = name.lookup_hint() {
            return Some(slot.borrow().clone());
        }

        for (depth, frame) in self.frames.iter().enumerate().rev() {
            if let Some(slot) = frame.get(name) {
                if depth == 0 {
                    name.set_lookup_hint(slot);
                }

                return Some(slot.borrow().clone());
            }
        }

        None
    }

    fn allocation(&self) -> VmClass {
        self.vm
    }

    fn save_level(&self) -> u32 {
        self.save_level
    }

    fn comment(&mut self, text: &[u8]) {
        if let Some(handler) = &mut self.comments {
            handler(text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (NameCache, DictStack) {
        let mut names = NameCache::new();
        let mut system = Dictionary::new();
        system.insert(names.intern(b"pi").unwrap(), Object::integer(3));
        (names, DictStack::new(system))
    }

    #[test]
    fn lookup_innermost_first() {
        let (mut names, mut stack) = setup();
        let pi = names.intern(b"pi").unwrap();

        assert_eq!(stack.load(&pi), Some(Object::integer(3)));

        let mut inner = Dictionary::new();
        inner.insert(pi.clone(), Object::integer(4));
        stack.begin(inner);
        assert_eq!(stack.load(&pi), Some(Object::integer(4)));

        stack.end();
        assert_eq!(stack.load(&pi), Some(Object::integer(3)));
    }

    #[test]
    fn system_lookups_set_hint() {
        let (mut names, stack) = setup();
        let pi = names.intern(b"pi").unwrap();

        assert!(pi.lookup_hint().is_none());
        stack.load(&pi);
        assert!(pi.lookup_hint().is_some());
    }

    #[test]
    fn shadowing_clears_hint() {
        let (mut names, mut stack) = setup();
        let pi = names.intern(b"pi").unwrap();

        stack.load(&pi);
        stack.define(pi.clone(), Object::integer(5));
        assert!(pi.lookup_hint().is_none());
        assert_eq!(stack.load(&pi), Some(Object::integer(5)));
    }

    #[test]
    fn system_redefinition_keeps_hint_valid() {
        let (mut names, mut stack) = setup();
        let pi = names.intern(b"pi").unwrap();

        stack.load(&pi);
        stack.define_system(pi.clone(), Object::integer(6));
        assert_eq!(stack.load(&pi), Some(Object::integer(6)));
    }

    #[test]
    fn save_and_restore() {
        let (mut names, mut stack) = setup();

        assert_eq!(stack.save(&mut names), 1);
        assert_eq!(names.save_level(), 1);
        names.intern(b"temporary").unwrap();

        assert_eq!(stack.restore(&mut names), 1);
        assert_eq!(names.save_level(), 0);
        assert!(names.lookup(b"temporary").is_none());
    }

    #[test]
    fn restore_keeps_names_bound_in_system_dict() {
        let (mut names, mut stack) = setup();

        stack.save(&mut names);
        let late = names.intern(b"late").unwrap();
        stack.define_system(late.clone(), Object::boolean(true));
        stack.load(&late);
        drop(late);

        assert_eq!(stack.restore(&mut names), 0);
        let late = names.lookup(b"late").unwrap();
        assert_eq!(stack.load(&late), Some(Object::boolean(true)));
    }

    #[test]
    fn comment_handler() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let mut stack = DictStack::default();
        stack.set_comment_handler(move |t| sink.borrow_mut().push(t.to_vec()));

        stack.comment(b"%BoundingBox: 0 0 10 10");
        assert_eq!(seen.borrow().len(), 1);
    }
}
