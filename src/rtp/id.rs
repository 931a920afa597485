use std::fmt;
use std::ops::Deref;

macro_rules! num_id {
    ($id:ident, $t:ty, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $id($t);

        impl Deref for $id {
            type Target = $t;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl From<$t> for $id {
            fn from(v: $t) -> Self {
                $id(v)
            }
        }

        impl fmt::Display for $id {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

num_id!(Ssrc, u32, "Synchronization source identifier of an RTP stream.");
num_id!(Pt, u8, "RTP payload type (7 bits).");

impl Ssrc {
    /// A new random SSRC.
    pub fn new() -> Ssrc {
        Ssrc(fastrand::u32(..))
    }
}

impl Default for Ssrc {
    fn default() -> Self {
        Ssrc::new()
    }
}
