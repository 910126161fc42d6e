//! Helper macros for fixed-width byte newtypes.

/// Declare a `[u8; N]` newtype with hex `Display`/serde, slice conversion
/// and raw-byte blob encoding.
///
/// The `redacted` form prints `<redacted>` from `Debug` so secret material
/// does not end up in logs by accident.
macro_rules! fixed_bytes {
    (@define $(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            pub const LEN: usize = $len;

            pub const fn from_bytes(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
                let mut out = [0u8; $len];
                hex::decode_to_slice(s, &mut out)?;
                Ok(Self(out))
            }

            /// `None` unless `slice` is exactly the right length.
            pub fn try_from_slice(slice: &[u8]) -> Option<Self> {
                <[u8; $len]>::try_from(slice).ok().map(Self)
            }

            pub fn is_zero(&self) -> bool {
                self.0.iter().all(|b| *b == 0)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self([0u8; $len])
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = hex::FromHexError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_hex(s)
            }
        }

        impl ::serde::Serialize for $name {
            fn serialize<S: ::serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D: ::serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = <String as ::serde::Deserialize>::deserialize(deserializer)?;
                Self::from_hex(&s).map_err(::serde::de::Error::custom)
            }
        }

        impl $crate::codec::BlobEncode for $name {
            fn encode(&self, w: &mut $crate::codec::BlobWriter) {
                w.put_bytes(&self.0);
            }
        }

        impl $crate::codec::BlobDecode for $name {
            const MIN_ENCODED_LEN: usize = $len;

            fn decode(r: &mut $crate::codec::BlobReader<'_>) -> Result<Self, $crate::codec::CodecError> {
                r.get_array::<$len>().map(Self)
            }
        }
    };
    (redacted $(#[$meta:meta])* $name:ident, $len:expr) => {
        fixed_bytes!(@define $(#[$meta])* $name, $len);

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "{}(<redacted>)", stringify!($name))
            }
        }
    };
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        fixed_bytes!(@define $(#[$meta])* $name, $len);

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }
    };
}
