//! Global constants.
//!
//! Repository locations, release suffixes and platform product codes used
//! across the resolvers, grouped to avoid magic strings in call sites.

/// Remote repository locations.
pub mod locations {
    /// Caching proxy fronting every JetBrains download host.
    pub const CACHE_REDIRECTOR: &str = "https://cache-redirector.jetbrains.com";
    /// Main IntelliJ artifact repository (releases/snapshots/nightly).
    pub const DEFAULT_INTELLIJ_REPOSITORY: &str =
        "https://cache-redirector.jetbrains.com/www.jetbrains.com/intellij-repository";
    /// Shared dependencies repository (compiler tasks, test frameworks).
    pub const INTELLIJ_DEPENDENCIES: &str =
        "https://cache-redirector.jetbrains.com/intellij-dependencies";
    /// JetBrains Runtime archives, keyed by artifact name.
    pub const DEFAULT_JBR_REPOSITORY: &str =
        "https://cache-redirector.jetbrains.com/intellij-jbr";
    /// Marketplace host serving plugin downloads and metadata.
    pub const MARKETPLACE_HOST: &str = "https://plugins.jetbrains.com";
    /// Maven facade over the marketplace.
    pub const DEFAULT_INTELLIJ_PLUGINS_REPOSITORY: &str =
        "https://cache-redirector.jetbrains.com/plugins.jetbrains.com/maven";
    /// IDE download service resolving (code, build type, version) to an archive.
    pub const IDEA_DOWNLOAD_URL: &str = "https://data.services.jetbrains.com/products/download";
    /// Direct Android Studio archive location (no download service).
    pub const ANDROID_STUDIO_DOWNLOAD_URL: &str =
        "https://redirector.gvt1.com/edgedl/android/studio/ide-zips";
    /// Release feed for the IntelliJ product family.
    pub const IDEA_PRODUCTS_RELEASES_URL: &str = "https://www.jetbrains.com/updates/updates.xml";
    /// Release feed for Android Studio.
    pub const ANDROID_STUDIO_PRODUCTS_RELEASES_URL: &str =
        "https://jb.gg/android-studio-releases-list.xml";
    /// Version index for the java-compiler companion artifact.
    pub const JAVA_COMPILER_ANT_TASKS_MAVEN_METADATA: &str =
        "https://cache-redirector.jetbrains.com/intellij-dependencies/com/jetbrains/intellij/java/java-compiler-ant-tasks/maven-metadata.xml";
}

/// Version-string suffixes recognised on IntelliJ artifact versions.
pub mod suffixes {
    pub const RELEASE_SUFFIX_EAP: &str = "-EAP-SNAPSHOT";
    pub const RELEASE_SUFFIX_EAP_CANDIDATE: &str = "-EAP-CANDIDATE-SNAPSHOT";
    pub const RELEASE_SUFFIX_CUSTOM_SNAPSHOT: &str = "-CUSTOM-SNAPSHOT";
    pub const RELEASE_SUFFIX_SNAPSHOT: &str = "-SNAPSHOT";
}

/// Two-letter platform product codes.
pub mod platform_types {
    pub const INTELLIJ_COMMUNITY: &str = "IC";
    pub const INTELLIJ_ULTIMATE: &str = "IU";
    pub const CLION: &str = "CL";
    pub const PYCHARM: &str = "PY";
    pub const PYCHARM_COMMUNITY: &str = "PC";
    pub const PHPSTORM: &str = "PS";
    pub const RIDER: &str = "RD";
    pub const GOLAND: &str = "GO";
    pub const ANDROID_STUDIO: &str = "AI";
}

/// Default values applied when configuration leaves a field unset.
pub mod defaults {
    /// Product code assumed for bare build numbers like "213.1234.56".
    pub const DEFAULT_PRODUCT_CODE: &str = "IC";
    /// Config directory under the user home.
    pub const DEFAULT_CONFIG_DIR: &str = ".idefetch";
    /// Cache directory under the user home.
    pub const DEFAULT_CACHE_DIR: &str = ".idefetch/cache";
    /// Toolchain vendor whose installations are accepted by the runtime chain.
    pub const RUNTIME_TOOLCHAIN_VENDOR: &str = "JetBrains";
}

/// Coordinates of well-known artifacts.
pub mod artifacts {
    pub const JBR_GROUP: &str = "com.jetbrains";
    pub const JBR_NAME: &str = "jbre";
    pub const JAVA_COMPILER_GROUP: &str = "com.jetbrains.intellij.java";
    pub const JAVA_COMPILER_NAME: &str = "java-compiler-ant-tasks";
    pub const PLUGIN_GROUP: &str = "com.jetbrains.plugins";
}

/// Network behaviour.
pub mod network {
    /// Whole-request timeout for metadata fetches (seconds).
    pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
    /// User agent sent with every request.
    pub const USER_AGENT: &str = concat!("idefetch/", env!("CARGO_PKG_VERSION"));
}
