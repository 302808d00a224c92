//! Macros for declaring statuses and inputs with minimal boilerplate.

/// Generate a fieldless status enum and its `Status` implementation.
///
/// The enum derives `Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize,
/// Deserialize`; `name` is the variant name.
///
/// # Example
///
/// ```
/// use statefold::core::Status;
/// use statefold::status_enum;
///
/// status_enum! {
///     pub enum Job {
///         Queued,
///         Running,
///         Done,
///     }
///     final: [Done]
/// }
///
/// assert_eq!(Job::Running.name(), "Running");
/// assert!(Job::Done.is_final());
/// ```
#[macro_export]
macro_rules! status_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident
            ),* $(,)?
        }

        $(final: [$($final:ident),* $(,)?])?
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $crate::core::Status for $name {
            fn name(&self) -> &str {
                match self {
                    $(Self::$variant => stringify!($variant)),*
                }
            }

            fn is_final(&self) -> bool {
                match self {
                    $($(Self::$final => true,)*)?
                    #[allow(unreachable_patterns)]
                    _ => false,
                }
            }
        }
    };
}

/// Generate an input enum and its `Input` implementation.
///
/// Unit, tuple and struct variants are supported; `kind` is the variant
/// name. The enum derives `Debug`; add further derives as attributes.
///
/// # Example
///
/// ```
/// use statefold::core::Input;
/// use statefold::input_enum;
///
/// input_enum! {
///     #[derive(Clone, PartialEq)]
///     pub enum Command {
///         Toggle,
///         Dim(u8),
///         Rename { label: String },
///     }
/// }
///
/// assert_eq!(Command::Dim(3).kind(), "Dim");
/// assert_eq!(Command::Rename { label: "hall".into() }.kind(), "Rename");
/// ```
#[macro_export]
macro_rules! input_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident
                $( ( $($tuple:ty),* $(,)? ) )?
                $( { $($field:ident : $field_ty:ty),* $(,)? } )?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
                $( ( $($tuple),* ) )?
                $( { $($field : $field_ty),* } )?
            ),*
        }

        impl $crate::core::Input for $name {
            fn kind(&self) -> &'static str {
                match self {
                    $(Self::$variant { .. } => stringify!($variant)),*
                }
            }
        }
    };
}
