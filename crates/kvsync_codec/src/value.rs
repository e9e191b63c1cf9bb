//! Conversion of caller values into store strings.

use std::borrow::Cow;

/// A value that can be written to a string store.
///
/// Every implementation is total and deterministic:
///
/// | Type | Store text |
/// |------|------------|
/// | `str`, `String`, `Cow<str>` | unchanged |
/// | `char` | the character |
/// | `bool` | `"true"` / `"false"` |
/// | integers | decimal, `-` for negatives |
/// | `f32`, `f64` | shortest round-trip decimal (`1.0` → `"1"`), `"NaN"`, `"Infinity"`, `"-Infinity"` |
pub trait StoreValue {
    /// Renders this value as the string the store will hold.
    fn to_store_string(&self) -> String;
}

impl StoreValue for str {
    fn to_store_string(&self) -> String {
        self.to_string()
    }
}

impl StoreValue for String {
    fn to_store_string(&self) -> String {
        self.clone()
    }
}

impl StoreValue for Cow<'_, str> {
    fn to_store_string(&self) -> String {
        self.to_string()
    }
}

impl StoreValue for char {
    fn to_store_string(&self) -> String {
        self.to_string()
    }
}

impl StoreValue for bool {
    fn to_store_string(&self) -> String {
        let text = if *self { "true" } else { "false" };
        text.to_string()
    }
}

impl<T: StoreValue + ?Sized> StoreValue for &T {
    fn to_store_string(&self) -> String {
        (**self).to_store_string()
    }
}

macro_rules! impl_integer {
    ($($ty:ty),*) => {
        $(
            impl StoreValue for $ty {
                fn to_store_string(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

impl_integer!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

macro_rules! impl_float {
    ($($ty:ty),*) => {
        $(
            impl StoreValue for $ty {
                fn to_store_string(&self) -> String {
                    if self.is_nan() {
                        "NaN".to_string()
                    } else if self.is_infinite() {
                        let text = if self.is_sign_positive() { "Infinity" } else { "-Infinity" };
                        text.to_string()
                    } else {
                        self.to_string()
                    }
                }
            }
        )*
    };
}

impl_float!(f32, f64);
