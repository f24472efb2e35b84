//! Identifier newtypes
//!
//! Storage assigns these as surrogate keys; the engine only copies and compares them.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident($inner:ty)) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(
    /// Competitor identifier
    TeamId(u32)
);

id_newtype!(
    /// Player or coach identifier
    PersonId(u32)
);

id_newtype!(
    /// Stadium identifier
    VenueId(u32)
);

id_newtype!(
    /// Fixture identifier
    MatchId(u64)
);
