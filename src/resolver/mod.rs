pub mod artifact;
pub mod compiler;
pub mod ide;
pub mod maven;
pub mod plugin;
pub mod release;
pub mod runtime;

pub use artifact::{ArtifactCoordinate, MirroredDownloader, RepositoryCandidate, RepositoryLayout};
pub use compiler::CompilerResolver;
pub use ide::{IdeResolver, ProductInfo};
pub use plugin::{PluginDependency, PluginDependencyNotation, PluginDependencyResolver};
pub use release::{ReleaseCatalog, ReleaseChannel, ReleaseFilter, ReleaseRecord};
pub use runtime::{JbrArtifact, RuntimeOptions, RuntimeResolver};
