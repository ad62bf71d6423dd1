use std::{
    fmt,
    ops::{BitOr, BitOrAssign},
};

/// How a spec is compiled.
///
/// Flags combine with `|`:
///
/// ```
/// use sift_lang::CompileMode;
///
/// let mode = CompileMode::MATERIALIZE | CompileMode::SAFE;
/// assert_eq!(mode, CompileMode::MATERIALIZE_SAFE);
/// assert!(mode.is_safe() && mode.is_materialized());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CompileMode(u8);

impl CompileMode {
    /// Lazy sequence, failures propagate
    pub const DEFAULT: CompileMode = CompileMode(0);
    /// Eagerly collect the output
    pub const MATERIALIZE: CompileMode = CompileMode(0b01);
    /// Replace failing value computations with the output kind's default
    pub const SAFE: CompileMode = CompileMode(0b10);
    pub const MATERIALIZE_SAFE: CompileMode = CompileMode(0b11);

    pub fn contains(self, other: CompileMode) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_safe(self) -> bool {
        self.contains(CompileMode::SAFE)
    }

    pub fn is_materialized(self) -> bool {
        self.contains(CompileMode::MATERIALIZE)
    }
}

impl BitOr for CompileMode {
    type Output = CompileMode;

    fn bitor(self, rhs: CompileMode) -> CompileMode {
        CompileMode(self.0 | rhs.0)
    }
}

impl BitOrAssign for CompileMode {
    fn bitor_assign(&mut self, rhs: CompileMode) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for CompileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match (self.is_materialized(), self.is_safe()) {
            (false, false) => "Default",
            (true, false) => "Materialize",
            (false, true) => "Safe",
            (true, true) => "MaterializeSafe",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags() {
        let mut mode = CompileMode::DEFAULT;
        assert!(!mode.is_safe());
        mode |= CompileMode::SAFE;
        assert!(mode.is_safe() && !mode.is_materialized());
        assert_eq!(mode.to_string(), "Safe");
        assert_eq!(CompileMode::MATERIALIZE_SAFE.to_string(), "MaterializeSafe");
    }
}
