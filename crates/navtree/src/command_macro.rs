//! Macros for reducing command boilerplate.

/// Auto-implement `payload()` for commands that derive `Serialize`.
///
/// Use this inside your `Command` impl block instead of writing the
/// `serde_json` conversion by hand.
///
/// # Example
///
/// ```ignore
/// use navtree_core::{auto_payload, Command};
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct RenameNav {
///     name: String,
/// }
///
/// impl Command for RenameNav {
///     fn name(&self) -> &'static str {
///         "Rename"
///     }
///
///     auto_payload!();
/// }
/// ```
#[macro_export]
macro_rules! auto_payload {
    () => {
        fn payload(&self) -> Option<serde_json::Value> {
            serde_json::to_value(self).ok()
        }
    };
}
