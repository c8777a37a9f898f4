use derive_more::Display;
use fnv::FnvHasher;
use serde::{de::Visitor, Deserialize, Deserializer, Serialize, Serializer};
use std::{
    convert::TryInto,
    fmt,
    hash::{Hash, Hasher},
};

/// RNG seed for a planet. Every randomized step of a build, and every
/// per-tile roll in the tile cache, is derived from this one value.
///
/// When deserializing, this type supports a few options:
/// - If the value is an integer that fits into `u64`, use that value
/// - If it's a string that can be parsed into a `u64`, use the parsed value
/// - If it's any other string, keep the string (it's hashed when used)
/// - Anything else (negative or out of range number, float, bool, etc.) is
///   an error. A malformed seed fails at config load, never mid-build.
///
/// Seeds are always serialized as a **string**. JSON and TOML don't handle
/// 64-bit unsigned integers reliably, and a string round-trips back into the
/// same value through the rules above.
#[derive(Clone, Debug, Display, PartialEq, Eq, Hash)]
pub enum Seed {
    /// An integer seed, which can be used directly
    Int(u64),
    /// A textual string, which will be hashed into a u64 before use
    Text(String),
}

impl Seed {
    /// Convert the seed to a `u64`, so it can actually be used to seed an RNG
    pub fn to_u64(&self) -> u64 {
        match self {
            Self::Int(seed) => *seed,
            Self::Text(text) => {
                let mut hasher = FnvHasher::default();
                text.hash(&mut hasher);
                hasher.finish()
            }
        }
    }

    /// Derive a sub-seed for some independent piece of the world, e.g. a
    /// single tile. The output depends only on this seed and the salt, so
    /// the same salt always gets the same sub-seed regardless of the order
    /// in which sub-seeds are requested. Use fixed-width salts (not
    /// `usize`), so sub-seeds match across platforms.
    pub fn derive(&self, salt: impl Hash) -> u64 {
        let mut hasher = FnvHasher::default();
        self.to_u64().hash(&mut hasher);
        salt.hash(&mut hasher);
        hasher.finish()
    }
}

impl Default for Seed {
    fn default() -> Self {
        Self::Int(0)
    }
}

impl From<u64> for Seed {
    fn from(seed: u64) -> Self {
        Self::Int(seed)
    }
}

// If possible parse the string as an int, otherwise keep the raw text to be
// hashed later
impl From<&str> for Seed {
    fn from(seed_str: &str) -> Self {
        seed_str
            .parse::<u64>()
            .map(Self::Int)
            .unwrap_or_else(|_| Self::Text(seed_str.into()))
    }
}

impl Serialize for Seed {
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Seed {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Self, D::Error> {
        // Both ints and strings are accepted, so no type hint
        deserializer.deserialize_any(SeedVisitor)
    }
}

/// Generate a visit function for an integer type, which accepts the value
/// only if it fits into a `u64`
macro_rules! impl_visit_int {
    ($($fname:ident: $type:ty),* $(,)?) => {
        $(
            fn $fname<E>(self, value: $type) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                value.try_into().map(Seed::Int).map_err(|_| {
                    E::custom(format!("seed out of range: {}", value))
                })
            }
        )*
    };
}

struct SeedVisitor;

impl<'de> Visitor<'de> for SeedVisitor {
    type Value = Seed;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a non-negative integer or a string")
    }

    impl_visit_int!(
        visit_u8: u8,
        visit_u16: u16,
        visit_u32: u32,
        visit_u64: u64,
        visit_u128: u128,
        visit_i8: i8,
        visit_i16: i16,
        visit_i32: i32,
        visit_i64: i64,
        visit_i128: i128,
    );

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(value.into())
    }
}
