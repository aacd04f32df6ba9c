//! Operator boilerplate for single-field newtypes.
//!
//! The settlement amount types wrap a single integer. This macro derives the standard arithmetic
//! operator impls so the newtype modules stay focused on domain behaviour.

#[macro_export]
macro_rules! op {
    (binary $name:ident, $trait:ident, $method:ident) => {
        impl $trait for $name {
            type Output = Self;

            fn $method(self, rhs: Self) -> Self::Output {
                Self(self.0.$method(rhs.0))
            }
        }
    };
    (inplace $name:ident, $trait:ident, $method:ident) => {
        impl $trait for $name {
            fn $method(&mut self, rhs: Self) {
                self.0.$method(rhs.0);
            }
        }
    };
    (unary $name:ident, $trait:ident, $method:ident) => {
        impl $trait for $name {
            type Output = Self;

            fn $method(self) -> Self::Output {
                Self(self.0.$method())
            }
        }
    };
}
