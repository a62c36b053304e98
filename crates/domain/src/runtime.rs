//! Language runtimes and their version pins.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A language runtime that an environment pins to a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageRuntime {
    /// `CPython`.
    Python,
    /// Node.js.
    Node,
    /// Ruby (MRI).
    Ruby,
    /// Rust toolchain.
    Rust,
    /// Go toolchain.
    Go,
    /// Bun.
    Bun,
    /// PHP.
    Php,
    /// Java (JDK).
    Java,
    /// Swift toolchain.
    Swift,
}

impl LanguageRuntime {
    /// Every runtime, in column order.
    pub const ALL: [Self; 9] = [
        Self::Python,
        Self::Node,
        Self::Ruby,
        Self::Rust,
        Self::Go,
        Self::Bun,
        Self::Php,
        Self::Java,
        Self::Swift,
    ];

    /// Returns the canonical lowercase identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::Node => "node",
            Self::Ruby => "ruby",
            Self::Rust => "rust",
            Self::Go => "go",
            Self::Bun => "bun",
            Self::Php => "php",
            Self::Java => "java",
            Self::Swift => "swift",
        }
    }

    /// Column holding this runtime's pin in the `environments` table.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Python => "python_version",
            Self::Node => "node_version",
            Self::Ruby => "ruby_version",
            Self::Rust => "rust_version",
            Self::Go => "go_version",
            Self::Bun => "bun_version",
            Self::Php => "php_version",
            Self::Java => "java_version",
            Self::Swift => "swift_version",
        }
    }

    /// Look a runtime up by its version column.
    #[must_use]
    pub fn from_column(column: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|runtime| runtime.column() == column)
    }

    /// Human label used in messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Python => "Python",
            Self::Node => "Node.js",
            Self::Ruby => "Ruby",
            Self::Rust => "Rust",
            Self::Go => "Go",
            Self::Bun => "Bun",
            Self::Php => "PHP",
            Self::Java => "Java",
            Self::Swift => "Swift",
        }
    }

    /// Shape a version string must have for this runtime.
    #[must_use]
    pub const fn version_format(self) -> VersionFormat {
        match self {
            Self::Python | Self::Php | Self::Swift => VersionFormat::MajorMinor,
            Self::Node | Self::Java => VersionFormat::Major,
            Self::Ruby | Self::Rust | Self::Go | Self::Bun => VersionFormat::MajorMinorPatch,
        }
    }

    /// Version substituted when the user leaves the pin untouched.
    #[must_use]
    pub const fn default_version(self) -> &'static str {
        match self {
            Self::Python => "3.12",
            Self::Node => "20",
            Self::Ruby => "3.4.4",
            Self::Rust => "1.89.0",
            Self::Go => "1.24.3",
            Self::Bun => "1.2.14",
            Self::Php => "8.4",
            Self::Java => "21",
            Self::Swift => "6.1",
        }
    }

    /// Versions offered in the picker, newest first.
    #[must_use]
    pub const fn offered_versions(self) -> &'static [&'static str] {
        match self {
            Self::Python => &["3.13", "3.12", "3.11", "3.10"],
            Self::Node => &["22", "20", "18"],
            Self::Ruby => &["3.4.4", "3.3.6", "3.2.4", "3.1.4"],
            Self::Rust => &["1.89.0", "1.88.0", "1.87.0", "1.86.0"],
            Self::Go => &["1.24.3", "1.23.4", "1.22.4", "1.21.9"],
            Self::Bun => &["1.2.14", "1.1.38", "1.0.33"],
            Self::Php => &["8.4", "8.3", "8.2"],
            Self::Java => &["21", "17", "11"],
            Self::Swift => &["6.1", "6.0", "5.10"],
        }
    }
}

impl fmt::Display for LanguageRuntime {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Dotted-numeric version shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionFormat {
    /// `\d+`
    Major,
    /// `\d+\.\d+`
    MajorMinor,
    /// `\d+\.\d+\.\d+`
    MajorMinorPatch,
}

impl VersionFormat {
    const fn components(self) -> usize {
        match self {
            Self::Major => 1,
            Self::MajorMinor => 2,
            Self::MajorMinorPatch => 3,
        }
    }

    /// Returns true when `value` has exactly this shape.
    #[must_use]
    pub fn matches(self, value: &str) -> bool {
        let mut count = 0;
        for part in value.split('.') {
            if part.is_empty() || !part.bytes().all(|byte| byte.is_ascii_digit()) {
                return false;
            }
            count += 1;
        }
        count == self.components()
    }

    /// Placeholder shown in messages, e.g. `MAJOR.MINOR`.
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Major => "MAJOR",
            Self::MajorMinor => "MAJOR.MINOR",
            Self::MajorMinorPatch => "MAJOR.MINOR.PATCH",
        }
    }
}

/// One version pin per runtime. Missing entries read as the default.
///
/// Equality compares effective versions, so an explicit default equals a
/// missing entry.
#[derive(Debug, Clone, Default)]
pub struct VersionPins {
    pinned: BTreeMap<LanguageRuntime, Box<str>>,
}

impl PartialEq for VersionPins {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

impl Eq for VersionPins {}

impl VersionPins {
    /// Pin a runtime to a version string (trimmed, unvalidated).
    pub fn set(&mut self, runtime: LanguageRuntime, version: impl Into<Box<str>>) {
        let version: Box<str> = version.into();
        self.pinned.insert(runtime, version.trim().into());
    }

    /// Builder form of [`Self::set`].
    #[must_use]
    pub fn with(mut self, runtime: LanguageRuntime, version: impl Into<Box<str>>) -> Self {
        self.set(runtime, version);
        self
    }

    /// Current version of a runtime, falling back to its default.
    #[must_use]
    pub fn get(&self, runtime: LanguageRuntime) -> &str {
        match self.pinned.get(&runtime) {
            Some(version) => &**version,
            None => runtime.default_version(),
        }
    }

    /// Returns true when the runtime still carries its default version.
    #[must_use]
    pub fn is_default(&self, runtime: LanguageRuntime) -> bool {
        self.get(runtime) == runtime.default_version()
    }

    /// Iterate every runtime with its effective version, in column order.
    pub fn iter(&self) -> impl Iterator<Item = (LanguageRuntime, &str)> + '_ {
        LanguageRuntime::ALL
            .into_iter()
            .map(move |runtime| (runtime, self.get(runtime)))
    }
}
