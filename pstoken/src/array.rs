//! Construction of array and procedure objects.

use crate::env::Environment;
use crate::error::{Error, ErrorKind, Result};
use crate::object::{Attributes, Object};

/// The largest number of elements an array object can hold.
pub const MAX_ARRAY_LENGTH: usize = 0xffff;

/// Build an array from already scanned or decoded elements.
///
/// The array is allocated in the environment's current VM. A local
/// composite can't become part of an array in global VM.
pub(crate) fn build(
    elements: impl IntoIterator<Item = Object>,
    env: &dyn Environment,
    executable: bool,
) -> Result<Object> {
    let vm = env.allocation();
    let elements: Vec<Object> = elements.into_iter().collect();

    if elements.len() > MAX_ARRAY_LENGTH {
        return Err(Error::with_message(
            ErrorKind::RangeCheck,
            "array has too many elements",
        ));
    }

    if elements.iter().any(|e| e.is_illegal_local_into_global(vm)) {
        return Err(Error::with_message(
            ErrorKind::InvalidAccess,
            "local object stored into global array",
        ));
    }

    let attrs = Attributes::allocated(vm, env.save_level());
    Ok(Object::array(elements, attrs).with_executable(executable))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::Name;
    use crate::object::VmClass;

    struct Global;

    impl Environment for Global {
        fn load(&self, _: &Name) -> Option<Object> {
            None
        }

        fn allocation(&self) -> VmClass {
            VmClass::Global
        }

        fn save_level(&self) -> u32 {
            2
        }
    }

    #[test]
    fn literal_array() {
        let array = build([Object::integer(1), Object::null()], &(), false).unwrap();

        assert!(!array.is_executable());
        assert_eq!(array.vm(), VmClass::Local);
        assert_eq!(array.as_array().unwrap().len(), 2);
    }

    #[test]
    fn procedure() {
        let proc = build([Object::integer(1)], &(), true).unwrap();
        assert!(proc.is_executable());
    }

    #[test]
    fn global_array_stamp() {
        let array = build([], &Global, false).unwrap();
        assert_eq!(array.vm(), VmClass::Global);
        assert_eq!(array.attributes().save_level(), 2);
    }

    #[test]
    fn local_composite_into_global() {
        let local = build([], &(), false).unwrap();
        let err = build([local], &Global, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidAccess);
    }

    #[test]
    fn simple_objects_into_global() {
        assert!(build([Object::integer(1), Object::mark()], &Global, false).is_ok());
    }

    #[test]
    fn too_many_elements() {
        let elements = (0..=MAX_ARRAY_LENGTH).map(|_| Object::null());
        let err = build(elements, &(), false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RangeCheck);
    }
}
