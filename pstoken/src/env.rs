//! The interpreter services the scanner and the codec rely on.

use crate::name::Name;
use crate::object::{Object, VmClass};

/// Services provided by the interpreter context a scan runs in.
pub trait Environment {
    /// Look `name` up through the dictionary stack, innermost dictionary
    /// first. Used for immediately evaluated names.
    fn load(&self, name: &Name) -> Option<Object>;

    /// The VM new composite objects are allocated in.
    fn allocation(&self) -> VmClass {
        VmClass::Local
    }

    /// The save level new composite objects are stamped with.
    fn save_level(&self) -> u32 {
        0
    }

    /// Called with the text of every comment, without the leading `%` and
    /// the line terminator.
    fn comment(&mut self, _text: &[u8]) {}
}

/// An environment without any dictionaries.
impl Environment for () {
    fn load(&self, _: &Name) -> Option<Object> {
        None
    }
}
