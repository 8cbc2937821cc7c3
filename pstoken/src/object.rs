use std::rc::Rc;

use bitflags::bitflags;

use crate::name::Name;
use crate::number::{Number, Real};

bitflags! {
    /// Attribute bits carried by every object.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Flags: u8 {
        /// The object is executable rather than literal.
        const EXECUTABLE = 1 << 0;
        /// The object lives in global VM.
        const GLOBAL = 1 << 1;
    }
}

/// The access level of an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Access {
    /// Read, write and execute.
    #[default]
    Unlimited,
    /// Read and execute.
    ReadOnly,
    /// Execute only.
    ExecuteOnly,
    /// No access at all.
    NoAccess,
}

impl Access {
    /// Whether the contents of an object with this access may be read.
    pub fn can_read(self) -> bool {
        matches!(self, Self::Unlimited | Self::ReadOnly)
    }
}

/// The VM an object is allocated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VmClass {
    /// Local VM, subject to save and restore.
    #[default]
    Local,
    /// Global VM.
    Global,
}

/// The attributes orthogonal to an object's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Attributes {
    flags: Flags,
    access: Access,
    save_level: u32,
}

impl Attributes {
    /// Attributes for a new composite allocated in `vm` at `save_level`.
    pub fn allocated(vm: VmClass, save_level: u32) -> Self {
        let flags = match vm {
            VmClass::Local => Flags::empty(),
            VmClass::Global => Flags::GLOBAL,
        };

        Self {
            flags,
            access: Access::Unlimited,
            save_level,
        }
    }

    /// The raw attribute bits.
    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// The access level.
    pub fn access(&self) -> Access {
        self.access
    }

    /// The VM the object is allocated in.
    pub fn vm(&self) -> VmClass {
        if self.flags.contains(Flags::GLOBAL) {
            VmClass::Global
        } else {
            VmClass::Local
        }
    }

    /// The save level at which the object was created.
    pub fn save_level(&self) -> u32 {
        self.save_level
    }
}

/// The value of a PostScript object.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The null object.
    Null,
    /// An integer.
    Integer(i32),
    /// A real number.
    Real(Real),
    /// An infinite real.
    Infinity,
    /// A boolean.
    Boolean(bool),
    /// A name.
    Name(Name),
    /// A string.
    String(Rc<[u8]>),
    /// An array (or a procedure, if executable).
    Array(Rc<[Object]>),
    /// A mark.
    Mark,
}

/// A PostScript object: a value plus its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    value: Value,
    attrs: Attributes,
}

impl Object {
    /// Create an object from a value and its attributes.
    pub fn new(value: Value, attrs: Attributes) -> Self {
        Self { value, attrs }
    }

    /// The null object.
    pub fn null() -> Self {
        Self::new(Value::Null, Attributes::default())
    }

    /// The mark object.
    pub fn mark() -> Self {
        Self::new(Value::Mark, Attributes::default())
    }

    /// A literal integer.
    pub fn integer(v: i32) -> Self {
        Self::new(Value::Integer(v), Attributes::default())
    }

    /// A literal real. An infinite value gives the infinity object.
    pub fn real(v: Real) -> Self {
        if v.value().is_infinite() {
            return Self::new(Value::Infinity, Attributes::default());
        }

        Self::new(Value::Real(v), Attributes::default())
    }

    /// A literal boolean.
    pub fn boolean(v: bool) -> Self {
        Self::new(Value::Boolean(v), Attributes::default())
    }

    /// A name, executable or literal.
    pub fn name(name: Name, executable: bool) -> Self {
        Self::new(Value::Name(name), Attributes::default()).with_executable(executable)
    }

    /// A literal string with the given allocation attributes.
    pub fn string(data: impl Into<Rc<[u8]>>, attrs: Attributes) -> Self {
        Self::new(Value::String(data.into()), attrs)
    }

    /// A literal array with the given allocation attributes.
    pub fn array(elements: impl Into<Rc<[Object]>>, attrs: Attributes) -> Self {
        Self::new(Value::Array(elements.into()), attrs)
    }

    /// The value of the object.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// The attributes of the object.
    pub fn attributes(&self) -> Attributes {
        self.attrs
    }

    /// Whether the object is executable.
    pub fn is_executable(&self) -> bool {
        self.attrs.flags.contains(Flags::EXECUTABLE)
    }

    /// The access level.
    pub fn access(&self) -> Access {
        self.attrs.access
    }

    /// The VM the object lives in.
    pub fn vm(&self) -> VmClass {
        self.attrs.vm()
    }

    /// Return the object with its executable attribute set to `executable`.
    #[must_use]
    pub fn with_executable(mut self, executable: bool) -> Self {
        self.attrs.flags.set(Flags::EXECUTABLE, executable);
        self
    }

    /// Return the object with the given access level.
    #[must_use]
    pub fn with_access(mut self, access: Access) -> Self {
        self.attrs.access = access;
        self
    }

    /// Whether the object is a string or an array.
    pub fn is_composite(&self) -> bool {
        matches!(self.value, Value::String(_) | Value::Array(_))
    }

    /// Whether storing this object into a composite allocated in `target`
    /// would create a reference from global to local VM.
    pub fn is_illegal_local_into_global(&self, target: VmClass) -> bool {
        target == VmClass::Global && self.is_composite() && self.vm() == VmClass::Local
    }

    /// Return the name, if the object is one.
    pub fn as_name(&self) -> Option<&Name> {
        match &self.value {
            Value::Name(n) => Some(n),
            _ => None,
        }
    }

    /// Return the string bytes, if the object is a string.
    pub fn as_string(&self) -> Option<&[u8]> {
        match &self.value {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Return the array elements, if the object is an array.
    pub fn as_array(&self) -> Option<&[Object]> {
        match &self.value {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Return the numeric value, if the object is a number.
    pub fn as_number(&self) -> Option<Number> {
        match self.value {
            Value::Integer(i) => Some(Number::Integer(i)),
            Value::Real(r) => Some(Number::Real(r)),
            _ => None,
        }
    }
}

impl From<Number> for Object {
    fn from(n: Number) -> Self {
        match n {
            Number::Integer(i) => Self::integer(i),
            Number::Real(r) => Self::real(r),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_are_orthogonal() {
        let s = Object::string(&b"abc"[..], Attributes::allocated(VmClass::Global, 3))
            .with_executable(true)
            .with_access(Access::ReadOnly);

        assert!(s.is_executable());
        assert_eq!(s.access(), Access::ReadOnly);
        assert_eq!(s.vm(), VmClass::Global);
        assert_eq!(s.attributes().save_level(), 3);
        assert_eq!(s.as_string(), Some(&b"abc"[..]));
    }

    #[test]
    fn local_into_global() {
        let local = Object::string(&b"x"[..], Attributes::allocated(VmClass::Local, 0));
        let global = Object::string(&b"x"[..], Attributes::allocated(VmClass::Global, 0));

        assert!(local.is_illegal_local_into_global(VmClass::Global));
        assert!(!local.is_illegal_local_into_global(VmClass::Local));
        assert!(!global.is_illegal_local_into_global(VmClass::Global));
        assert!(!Object::integer(1).is_illegal_local_into_global(VmClass::Global));
    }

    #[test]
    fn access_reads() {
        assert!(Access::ReadOnly.can_read());
        assert!(!Access::ExecuteOnly.can_read());
        assert!(!Access::NoAccess.can_read());
    }
}
