//! Arbitrary-precision integers for big-integer-encoded wire fields
//!
//! The program stores timestamps and lamport amounts as fixed-width integers. On the
//! client those fields travel as [`BigNum<T>`]: a 256-bit value that remembers the
//! native type `T` it was widened from, and that is written to the wire at `T`'s width.
//! Narrowing back to `T` is checked, so a value that does not fit surfaces as an error
//! instead of silently wrapping.

use std::fmt;
use std::marker::PhantomData;

use borsh::{BorshDeserialize, BorshSerialize};
use ethnum::I256;

use crate::error::{SafeError, SafeResult};

mod sealed {
    pub trait Sealed {}
    impl Sealed for i64 {}
    impl Sealed for u64 {}
}

/// Native integer types that have a big-integer wire form
pub trait WireNative: sealed::Sealed + Copy + BorshSerialize + BorshDeserialize {
    /// Widen into the arbitrary-precision representation
    fn widen(self) -> I256;

    /// Narrow back, `None` when the value does not fit
    fn narrow(value: I256) -> Option<Self>;
}

fn low_bytes(value: I256) -> [u8; 8] {
    let bytes = value.to_le_bytes();
    let mut low = [0u8; 8];
    low.copy_from_slice(&bytes[..8]);
    low
}

impl WireNative for i64 {
    fn widen(self) -> I256 {
        I256::from(self)
    }

    fn narrow(value: I256) -> Option<Self> {
        if value < I256::from(i64::MIN) || value > I256::from(i64::MAX) {
            return None;
        }
        Some(i64::from_le_bytes(low_bytes(value)))
    }
}

impl WireNative for u64 {
    fn widen(self) -> I256 {
        I256::from(self)
    }

    fn narrow(value: I256) -> Option<Self> {
        if value < I256::from(0u64) || value > I256::from(u64::MAX) {
            return None;
        }
        Some(u64::from_le_bytes(low_bytes(value)))
    }
}

/// Big-integer-encoded wire value backed by native type `T`
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct BigNum<T> {
    value: I256,
    _native: PhantomData<T>,
}

impl<T: WireNative> BigNum<T> {
    pub fn new(native: T) -> Self {
        Self {
            value: native.widen(),
            _native: PhantomData,
        }
    }

    /// Wrap an already-wide value; it is range checked on narrowing
    pub fn from_wide(value: I256) -> Self {
        Self {
            value,
            _native: PhantomData,
        }
    }

    /// The arbitrary-precision value
    pub fn value(&self) -> I256 {
        self.value
    }

    /// Narrow back to the native field type
    pub fn narrow(&self, field: &'static str) -> SafeResult<T> {
        T::narrow(self.value).ok_or_else(|| SafeError::NumericOverflow {
            field,
            value: self.value.to_string(),
        })
    }
}

impl<T: WireNative> From<T> for BigNum<T> {
    fn from(native: T) -> Self {
        Self::new(native)
    }
}

impl<T: WireNative> Default for BigNum<T> {
    fn default() -> Self {
        Self::from_wide(I256::from(0u64))
    }
}

impl<T> fmt::Debug for BigNum<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BigNum({})", self.value)
    }
}

impl<T> fmt::Display for BigNum<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.value, f)
    }
}

impl<T: WireNative> BorshSerialize for BigNum<T> {
    fn serialize<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        let native = T::narrow(self.value).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("{} does not fit the account layout", self.value),
            )
        })?;
        native.serialize(writer)
    }
}

impl<T: WireNative> BorshDeserialize for BigNum<T> {
    fn deserialize_reader<R: std::io::Read>(reader: &mut R) -> std::io::Result<Self> {
        Ok(Self::new(T::deserialize_reader(reader)?))
    }
}
