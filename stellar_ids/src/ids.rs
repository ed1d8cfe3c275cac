//! Typed arena handles.
//! Every handle is a plain u32 index into the arena that issued it. Arenas are
//! append-only for the whole compile run, so handles are never reused and carry
//! no generation.

use std::fmt;

/// Common surface of every handle type, for containers generic over the arena.
pub trait ArenaHandle: Copy + Eq + fmt::Debug + fmt::Display {
    const LABEL: &'static str;

    fn from_index(index: u32) -> Self;

    fn as_usize(self) -> usize;

    /// Handle for the next slot of an arena currently holding `len` entries.
    fn next_for_len(len: usize) -> Option<Self>;
}

/// Defines an index handle type (ModelHandle, TemplateHandle, etc.).
/// Distinct types keep a model index from being used against the template arena.
macro_rules! define_handle {
    ($type_name:ident, $label:literal, $doc:literal) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $type_name(u32);

        impl $type_name {
            #[inline]
            pub const fn from_index(index: u32) -> Self {
                Self(index)
            }

            #[inline]
            pub const fn index(self) -> u32 {
                self.0
            }

            #[inline]
            pub const fn as_usize(self) -> usize {
                self.0 as usize
            }
        }

        impl ArenaHandle for $type_name {
            const LABEL: &'static str = $label;

            #[inline]
            fn from_index(index: u32) -> Self {
                Self(index)
            }

            #[inline]
            fn as_usize(self) -> usize {
                self.0 as usize
            }

            #[inline]
            fn next_for_len(len: usize) -> Option<Self> {
                u32::try_from(len).ok().map(Self)
            }
        }

        impl fmt::Debug for $type_name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($type_name), "({})"), self.0)
            }
        }

        impl fmt::Display for $type_name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "#{}"), self.0)
            }
        }
    };
}

define_handle!(
    ModelHandle,
    "model",
    "Model handle, allocated by the model arena of a compilation session."
);
define_handle!(
    TemplateHandle,
    "template",
    "Entity/part template handle, allocated by the library arena. Extensions and spawned records get fresh handles."
);
define_handle!(
    SurfaceHandle,
    "surface",
    "Surface handle, allocated by the surface arena. Doubles as the emitted surface index."
);
define_handle!(
    SpawnId,
    "spawn",
    "Position of a resolved entity in its world's spawn list. Reset for every world."
);
