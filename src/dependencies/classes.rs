// src/dependencies/classes.rs

//! Dependency class definitions
//!
//! Every trove-level dependency belongs to a class that determines how its
//! name is interpreted and how providers are matched. The string form is
//! `class: name(flag flag ...)`, e.g. `soname: ELF64/libc.so.6(GLIBC_2.2)`.

use std::fmt;

/// Dependency classes recorded in trove requires/provides sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DependencyClass {
    /// ABI compatibility tag
    /// Example: abi: ELF64(SysV x86_64)
    Abi,

    /// Instruction set the trove was built for
    /// Example: is: x86_64(sse2)
    InstructionSet,

    /// Another trove by name
    /// Example: trove: openssl:lib
    Trove,

    /// Use flag the trove was built with
    /// Example: use: ssl
    Use,

    /// Shared library dependency
    /// Example: soname: ELF64/libssl.so.3(OPENSSL_3.0.0)
    Soname,

    /// A specific file must exist
    /// Example: file: /usr/bin/python3
    File,

    /// Python module
    Python,

    /// Perl module
    Perl,

    /// Ruby gem
    Ruby,

    /// Java package
    Java,

    /// .NET/Mono assembly
    Cil,

    /// pkg-config module
    PkgConfig,

    /// CMake package
    CMake,
}

impl DependencyClass {
    /// Get the string prefix for this dependency class
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Abi => "abi",
            Self::InstructionSet => "is",
            Self::Trove => "trove",
            Self::Use => "use",
            Self::Soname => "soname",
            Self::File => "file",
            Self::Python => "python",
            Self::Perl => "perl",
            Self::Ruby => "ruby",
            Self::Java => "java",
            Self::Cil => "cil",
            Self::PkgConfig => "pkgconfig",
            Self::CMake => "cmake",
        }
    }

    /// Parse a dependency class from its prefix
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix.to_lowercase().as_str() {
            "abi" => Some(Self::Abi),
            "is" => Some(Self::InstructionSet),
            "trove" => Some(Self::Trove),
            "use" => Some(Self::Use),
            "soname" => Some(Self::Soname),
            "file" => Some(Self::File),
            "python" | "python3" => Some(Self::Python),
            "perl" => Some(Self::Perl),
            "ruby" => Some(Self::Ruby),
            "java" => Some(Self::Java),
            "cil" => Some(Self::Cil),
            "pkgconfig" | "pkg-config" => Some(Self::PkgConfig),
            "cmake" => Some(Self::CMake),
            _ => None,
        }
    }

    /// Return all dependency classes
    pub fn all() -> &'static [DependencyClass] {
        &[
            Self::Abi,
            Self::InstructionSet,
            Self::Trove,
            Self::Use,
            Self::Soname,
            Self::File,
            Self::Python,
            Self::Perl,
            Self::Ruby,
            Self::Java,
            Self::Cil,
            Self::PkgConfig,
            Self::CMake,
        ]
    }

    /// Is this a language-specific dependency class?
    pub fn is_language(&self) -> bool {
        matches!(
            self,
            Self::Python | Self::Perl | Self::Ruby | Self::Java | Self::Cil
        )
    }

    /// Classes satisfied implicitly by the build environment
    ///
    /// Nothing in the repository provides these, so they never name a trove.
    pub fn is_implicit(&self) -> bool {
        matches!(self, Self::Abi | Self::InstructionSet | Self::Use)
    }

    /// Get a human-readable description of this dependency class
    pub fn description(&self) -> &'static str {
        match self {
            Self::Abi => "ABI compatibility",
            Self::InstructionSet => "Instruction set",
            Self::Trove => "Trove",
            Self::Use => "Use flag",
            Self::Soname => "Shared library (soname)",
            Self::File => "File path",
            Self::Python => "Python module",
            Self::Perl => "Perl module",
            Self::Ruby => "Ruby gem",
            Self::Java => "Java package",
            Self::Cil => ".NET/Mono assembly",
            Self::PkgConfig => "pkg-config module",
            Self::CMake => "CMake package",
        }
    }
}

impl fmt::Display for DependencyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.prefix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_roundtrip() {
        for class in DependencyClass::all() {
            assert_eq!(DependencyClass::from_prefix(class.prefix()), Some(*class));
        }
    }

    #[test]
    fn test_prefix_aliases() {
        assert_eq!(
            DependencyClass::from_prefix("pkg-config"),
            Some(DependencyClass::PkgConfig)
        );
        assert_eq!(
            DependencyClass::from_prefix("SONAME"),
            Some(DependencyClass::Soname)
        );
        assert_eq!(DependencyClass::from_prefix("bogus"), None);
    }

    #[test]
    fn test_class_categories() {
        assert!(DependencyClass::Abi.is_implicit());
        assert!(!DependencyClass::Trove.is_implicit());
        assert!(DependencyClass::Perl.is_language());
        assert!(!DependencyClass::Soname.is_language());
    }

    #[test]
    fn test_display() {
        assert_eq!(DependencyClass::Trove.to_string(), "trove");
        assert_eq!(DependencyClass::Soname.description(), "Shared library (soname)");
    }
}
