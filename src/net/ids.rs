use std::fmt;

use crate::net::index_vec::Idx;

macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[repr(transparent)]
        pub struct $name(pub u32);

        impl $name {
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            pub const fn raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, stringify!($name))?;
                f.debug_tuple("").field(&self.0).finish()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }

        impl Idx for $name {
            fn index(self) -> usize {
                self.0 as usize
            }

            fn from_usize(idx: usize) -> Self {
                Self(idx as u32)
            }
        }
    };
}

define_id!(PlaceId, "p");
define_id!(TransitionId, "t");
define_id!(NodeId, "n");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_through_idx() {
        let place = PlaceId::from_usize(3);
        assert_eq!(place.index(), 3);
        assert_eq!(place.raw(), 3);
        assert_eq!(format!("{}", NodeId::new(7)), "n7");
        assert_eq!(format!("{:?}", TransitionId::new(2)), "TransitionId(2)");
    }
}
