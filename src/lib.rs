pub mod cli;
pub mod core;
pub mod error;
pub mod infrastructure;
pub mod resolver;
pub mod version;

pub use error::{ResolverError, ResolverResult};
pub use infrastructure::{Config, HttpClient, Platform};
pub use resolver::{
    ArtifactCoordinate, CompilerResolver, IdeResolver, MirroredDownloader, PluginDependency,
    PluginDependencyNotation, PluginDependencyResolver, ProductInfo, ReleaseCatalog,
    ReleaseChannel, ReleaseFilter, ReleaseRecord, RepositoryCandidate, RuntimeOptions,
    RuntimeResolver,
};
pub use version::{BuildNumber, IdeVersionSpec};
