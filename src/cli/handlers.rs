use std::collections::HashSet;
use std::path::PathBuf;

use crate::cli::commands::Commands;
use crate::cli::output::{create_progress_bar, OutputFormat, OutputFormatter};
use crate::error::{ResolverError, ResolverResult};
use crate::infrastructure::{Config, HttpClient, Platform};
use crate::resolver::compiler::compiler_version_for;
use crate::resolver::ide;
use crate::resolver::{
    CompilerResolver, IdeResolver, MirroredDownloader, PluginDependencyNotation,
    PluginDependencyResolver, ReleaseCatalog, ReleaseFilter, RuntimeOptions, RuntimeResolver,
};
use crate::version::BuildNumber;

/// Dispatches CLI subcommands onto the resolvers.
pub struct CommandHandler {
    config: Config,
    http: HttpClient,
    formatter: OutputFormatter,
}

impl CommandHandler {
    pub fn new() -> ResolverResult<Self> {
        Ok(Self {
            config: Config::load()?,
            http: HttpClient::new()?,
            formatter: OutputFormatter,
        })
    }

    pub async fn handle_command(&self, command: Commands, json: bool) -> ResolverResult<()> {
        let format = OutputFormat::from_json_flag(json);
        match command {
            Commands::Ide {
                version,
                local_path,
            } => self.handle_ide(&version, local_path, format).await,
            Commands::Runtime {
                version,
                variant,
                arch,
                runtime_dir,
                ide_dir,
                dir,
            } => {
                let options = RuntimeOptions {
                    runtime_dir,
                    version,
                    variant,
                    arch,
                    ide_dir,
                };
                self.handle_runtime(options, dir, format).await
            }
            Commands::Plugin {
                notation,
                build,
                ide_dir,
            } => self.handle_plugin(&notation, &build, ide_dir, format).await,
            Commands::Releases {
                since,
                until,
                channels,
                products,
            } => self.handle_releases(since, until, channels, products, format).await,
            Commands::Compiler { version, ide_dir } => {
                self.handle_compiler(version, ide_dir, format).await
            }
        }
    }

    async fn handle_ide(
        &self,
        version: &str,
        local_path: Option<PathBuf>,
        format: OutputFormat,
    ) -> ResolverResult<()> {
        let resolver = IdeResolver::new(
            self.http.clone(),
            self.config.cache_root(),
            Platform::current(),
        );
        let pb = create_progress_bar();
        let resolved = resolver
            .resolve(version, local_path.as_deref(), |done, total| {
                pb.set_length(total);
                pb.set_position(done);
            })
            .await?;
        pb.finish_and_clear();
        println!("{}", self.formatter.format_path("ide", &resolved, format));
        Ok(())
    }

    async fn handle_runtime(
        &self,
        options: RuntimeOptions,
        resolve_dir: bool,
        format: OutputFormat,
    ) -> ResolverResult<()> {
        let downloader =
            MirroredDownloader::new(self.http.inner().clone(), self.config.cache_root());
        let resolver = RuntimeResolver::new(&downloader, Platform::current(), &self.config);
        let resolved = if resolve_dir {
            resolver.resolve_runtime_dir(&options, |_| true).await
        } else {
            resolver.resolve_runtime(&options, |_| true).await
        };
        match resolved {
            Some(path) => {
                let label = if resolve_dir { "runtime-dir" } else { "runtime" };
                println!("{}", self.formatter.format_path(label, &path, format));
                Ok(())
            }
            None => Err(ResolverError::not_found(
                "Java runtime",
                vec!["every fallback strategy".to_string()],
            )),
        }
    }

    async fn handle_plugin(
        &self,
        notation: &str,
        build: &str,
        ide_dir: Option<PathBuf>,
        format: OutputFormat,
    ) -> ResolverResult<()> {
        let notation = PluginDependencyNotation::parse(notation)?;
        let target_build =
            BuildNumber::parse(build)?.or_product_code(&self.config.default_product);
        let resolver = PluginDependencyResolver::new(self.http.inner().clone(), &self.config);
        let dependency = resolver
            .resolve(&notation, ide_dir.as_deref(), &target_build)
            .await?;
        println!("{}", self.formatter.format_plugin(&dependency, format));
        Ok(())
    }

    async fn handle_releases(
        &self,
        since: Option<String>,
        until: Option<String>,
        channels: Vec<String>,
        products: Vec<String>,
        format: OutputFormat,
    ) -> ResolverResult<()> {
        let filter = ReleaseFilter {
            since_build: since.as_deref().map(BuildNumber::parse).transpose()?,
            until_build: until.as_deref().map(BuildNumber::parse).transpose()?,
            channels: channels
                .iter()
                .map(|raw| raw.parse())
                .collect::<ResolverResult<HashSet<_>>>()?,
            products: products.into_iter().collect(),
        };
        let catalog = ReleaseCatalog::fetch(self.http.inner(), &self.config.release_feeds).await;
        let matched: Vec<_> = catalog.releases(&filter).collect();
        println!("{}", self.formatter.format_releases(&matched, format));
        Ok(())
    }

    async fn handle_compiler(
        &self,
        version: Option<String>,
        ide_dir: Option<PathBuf>,
        format: OutputFormat,
    ) -> ResolverResult<()> {
        let requested = match (version, ide_dir) {
            (Some(version), _) => version,
            (None, Some(dir)) => {
                let build_number = ide::ide_build_number(&dir).ok_or_else(|| {
                    ResolverError::config(format!(
                        "cannot determine the build number of {}",
                        dir.display()
                    ))
                })?;
                let build = BuildNumber::parse(&build_number)?;
                let suffix = ide::product_info(&dir).and_then(|info| info.version_suffix);
                compiler_version_for(&build, suffix.as_deref())
            }
            (None, None) => {
                return Err(ResolverError::config(
                    "either a compiler version or --ide-dir is required",
                ))
            }
        };

        let downloader =
            MirroredDownloader::new(self.http.inner().clone(), self.config.cache_root());
        let resolver = CompilerResolver::new(&downloader, self.http.inner(), &self.config);
        let pb = create_progress_bar();
        let resolved = resolver
            .resolve(&requested, |done, total| {
                pb.set_length(total);
                pb.set_position(done);
            })
            .await?;
        pb.finish_and_clear();
        println!("{}", self.formatter.format_path("compiler", &resolved, format));
        Ok(())
    }
}
