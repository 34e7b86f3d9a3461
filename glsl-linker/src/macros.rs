// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

/// declare a struct with public fields and a `Default` impl built from per-field defaults
///
/// ```ignore
/// impl_struct_with_default! {
///     /// doc
///     #[derive(Clone, Debug)]
///     pub struct Limits {
///         /// doc
///         max_things: u32 = 16,
///     }
/// }
/// ```
macro_rules! impl_struct_with_default {
    (
        $(#[doc = $struct_doc:expr])*
        #[derive($($derive:ident),*)]
        pub struct $name:ident {
            $(
                $(#[doc = $field_doc:expr])*
                $field_name:ident: $field_type:ty = $field_default:expr,
            )*
        }
    ) => {
        $(#[doc = $struct_doc])*
        #[derive($($derive),*)]
        pub struct $name {
            $(
                $(#[doc = $field_doc])*
                pub $field_name: $field_type,
            )*
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $($field_name: $field_default,)*
                }
            }
        }
    };
}
