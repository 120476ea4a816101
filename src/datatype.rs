//! Element datatype trait and type tag mapping.
//!
//! This module provides the [`Datatype`] trait, a sealed trait implemented for
//! the fixed-width integers that can travel through a [`Communicator`] and be
//! scanned or binned by the engines.
//!
//! # Supported Types
//!
//! | Rust Type | Tag Value |
//! |-----------|-----------|
//! | `i32`     | 0         |
//! | `i64`     | 1         |
//! | `u32`     | 2         |
//! | `u64`     | 3         |
//!
//! [`Communicator`]: crate::Communicator

use std::fmt::Debug;

/// Internal module to seal the trait — prevents external implementations.
mod sealed {
    pub trait Sealed {}
}

/// Runtime tag carried by every message so a receiver can reject payloads of
/// the wrong element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum DatatypeTag {
    /// 32-bit signed integer
    I32 = 0,
    /// 64-bit signed integer
    I64 = 1,
    /// 32-bit unsigned integer
    U32 = 2,
    /// 64-bit unsigned integer
    U64 = 3,
}

/// Trait for element types usable in communication and in the engines.
///
/// This is a **sealed trait** — it cannot be implemented outside this crate.
/// Supported types: [`i32`], [`i64`], [`u32`], [`u64`].
///
/// Additive and multiplicative combination wrap on overflow, so a result never
/// depends on the order in which partial results were combined.
pub trait Datatype: sealed::Sealed + Copy + Ord + Debug + Send + Sync + 'static {
    /// The datatype tag attached to outgoing messages.
    const TAG: DatatypeTag;

    /// Additive identity.
    const ZERO: Self;

    /// Two's-complement addition.
    fn wrapping_add(self, rhs: Self) -> Self;

    /// Two's-complement multiplication.
    fn wrapping_mul(self, rhs: Self) -> Self;

    /// Lossless widening used for bin classification.
    fn to_i128(self) -> i128;
}

macro_rules! impl_datatype {
    ($ty:ty, $tag:expr) => {
        impl sealed::Sealed for $ty {}
        impl Datatype for $ty {
            const TAG: DatatypeTag = $tag;
            const ZERO: Self = 0;

            #[inline]
            fn wrapping_add(self, rhs: Self) -> Self {
                <$ty>::wrapping_add(self, rhs)
            }

            #[inline]
            fn wrapping_mul(self, rhs: Self) -> Self {
                <$ty>::wrapping_mul(self, rhs)
            }

            #[inline]
            fn to_i128(self) -> i128 {
                i128::from(self)
            }
        }
    };
}

impl_datatype!(i32, DatatypeTag::I32);
impl_datatype!(i64, DatatypeTag::I64);
impl_datatype!(u32, DatatypeTag::U32);
impl_datatype!(u64, DatatypeTag::U64);
