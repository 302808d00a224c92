//! Input events consumed by the actor.

use std::fmt::Debug;

/// Trait for actor input events.
///
/// Inputs are usually a closed enum. `kind` names the variant and is what
/// error messages list as the acceptable inputs for a status.
///
/// # Example
///
/// ```rust
/// use statefold::core::Input;
///
/// #[derive(Debug)]
/// enum Command {
///     Toggle,
///     Set(u32),
/// }
///
/// impl Input for Command {
///     fn kind(&self) -> &'static str {
///         match self {
///             Self::Toggle => "Toggle",
///             Self::Set(_) => "Set",
///         }
///     }
/// }
///
/// assert_eq!(Command::Set(3).kind(), "Set");
/// ```
pub trait Input: Debug + Send + 'static {
    /// Descriptor of this input's variant.
    fn kind(&self) -> &'static str;
}
