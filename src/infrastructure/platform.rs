use std::fmt;

/// Host platform description used to pick artifact names and archive formats.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    /// Detects the platform the resolver itself is running on.
    pub fn current() -> Self {
        let os = if cfg!(target_os = "windows") {
            "windows"
        } else if cfg!(target_os = "macos") {
            "macos"
        } else if cfg!(target_os = "linux") {
            "linux"
        } else {
            "unknown"
        };

        let arch = if cfg!(target_arch = "x86_64") {
            "x64"
        } else if cfg!(target_arch = "aarch64") {
            "aarch64"
        } else if cfg!(target_arch = "x86") {
            "x86"
        } else {
            "unknown"
        };

        Platform {
            os: os.to_string(),
            arch: arch.to_string(),
        }
    }

    pub fn is_windows(&self) -> bool {
        self.os == "windows"
    }

    pub fn is_macos(&self) -> bool {
        self.os == "macos"
    }

    /// Platform token used in runtime artifact names.
    pub fn jbr_platform(&self) -> &'static str {
        match self.os.as_str() {
            "windows" => "windows",
            "macos" => "osx",
            _ => "linux",
        }
    }

    /// Architecture token used in runtime artifact names. 64-bit hosts map to
    /// `aarch64`/`x64`; the 32-bit fallback token differs between the legacy
    /// (`x86`) and modern (`i586`) naming schemes.
    pub fn jbr_arch(&self, modern_format: bool) -> String {
        match self.arch.as_str() {
            "aarch64" | "arm64" => "aarch64".to_string(),
            "x64" | "x86_64" | "amd64" => "x64".to_string(),
            _ => {
                if modern_format {
                    "i586".to_string()
                } else {
                    "x86".to_string()
                }
            }
        }
    }

    /// Default archive format distributed for this platform.
    pub fn archive_ext(&self) -> &'static str {
        match self.os.as_str() {
            "windows" => "zip",
            _ => "tar.gz",
        }
    }

    /// Name of the java launcher binary.
    pub fn java_executable_name(&self) -> &'static str {
        if self.is_windows() {
            "java.exe"
        } else {
            "java"
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}
