// SPDX-License-Identifier: MIT

//! Declarative macros for reducing boilerplate.
//!
//! - [`simple_display!`] — `Display` impl mapping enum variants to string literals
//! - [`builder_fn!`] — test builder struct with Default, `impl Into` setters, and `build()`

/// Generate a `Display` impl that maps enum variants to string literals.
///
/// Unit variants match directly; data-carrying variants use `(..)` to ignore fields.
///
/// ```ignore
/// crate::simple_display! {
///     MyEnum {
///         Foo => "foo",
///         Bar(..) => "bar",
///     }
/// }
/// ```
#[macro_export]
macro_rules! simple_display {
    ($enum:ty { $( $variant:ident $(( $($ignore:tt)* ))? => $str:expr ),+ $(,)? }) => {
        impl std::fmt::Display for $enum {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(match self {
                    $( Self::$variant $(( $($ignore)* ))? => $str, )+
                })
            }
        }
    };
}

/// Generate a test builder (struct + Default + `impl Into` setters + `build()`)
/// for a plain data struct whose fields all implement `Clone`.
///
/// Gated behind `#[cfg(any(test, feature = "test-support"))]` at the call site.
///
/// ```ignore
/// crate::builder_fn! {
///     pub struct FooBuilder => Foo {
///         name: String = "test",
///         count: u32 = 0,
///     }
/// }
/// ```
#[macro_export]
macro_rules! builder_fn {
    (
        pub struct $builder:ident => $target:ident {
            $( $field:ident : $ty:ty = $default:expr ),+ $(,)?
        }
    ) => {
        pub struct $builder {
            $( $field: $ty, )+
        }

        impl Default for $builder {
            fn default() -> Self {
                Self {
                    $( $field: ($default).into(), )+
                }
            }
        }

        impl $builder {
            $(
                pub fn $field(mut self, v: impl Into<$ty>) -> Self {
                    self.$field = v.into();
                    self
                }
            )+

            pub fn build(self) -> $target {
                $target {
                    $( $field: self.$field, )+
                }
            }
        }

        impl $target {
            /// Construct a [`$builder`] preset with representative test defaults.
            pub fn builder() -> $builder {
                $builder::default()
            }
        }
    };
}
