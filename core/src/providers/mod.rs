/// Builtin completion model providers
pub mod completions;
