use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "idefetch",
    version,
    about = "Resolves IDE distributions, runtimes, plugins and release catalogs"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Emit machine-readable JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve an IDE distribution into the local cache.
    Ide {
        /// IDE version spec: "IC-2021.3.2", "2021.3" or "213.1234.56".
        version: String,
        /// Use an existing local installation instead of downloading.
        #[arg(long)]
        local_path: Option<PathBuf>,
    },
    /// Resolve a Java runtime through the fallback chain.
    Runtime {
        /// Runtime version, e.g. "17.0.2b469.1".
        #[arg(long)]
        version: Option<String>,
        /// Runtime variant: sdk, jcef, fd, dcevm, nomod.
        #[arg(long)]
        variant: Option<String>,
        /// Architecture override for the artifact name.
        #[arg(long)]
        arch: Option<String>,
        /// Explicit runtime installation directory; wins over everything.
        #[arg(long)]
        runtime_dir: Option<PathBuf>,
        /// IDE installation to take a bundled or declared runtime from.
        #[arg(long)]
        ide_dir: Option<PathBuf>,
        /// Print the runtime home directory instead of the executable.
        #[arg(long)]
        dir: bool,
    },
    /// Resolve a plugin dependency: "id[:version][@channel]".
    Plugin {
        notation: String,
        /// Target IDE build number the plugin must be compatible with.
        #[arg(long)]
        build: String,
        /// IDE installation used for builtin plugin lookups.
        #[arg(long)]
        ide_dir: Option<PathBuf>,
    },
    /// List product releases from the configured feeds.
    Releases {
        /// Lower build bound (inclusive).
        #[arg(long)]
        since: Option<String>,
        /// Upper build bound (inclusive).
        #[arg(long)]
        until: Option<String>,
        /// Release channels to include (release, eap, rc, beta).
        #[arg(long, value_delimiter = ',')]
        channels: Vec<String>,
        /// Product codes to include (IC, IU, PS, AI, ...).
        #[arg(long, value_delimiter = ',')]
        products: Vec<String>,
    },
    /// Resolve the java compiler companion artifact for a build.
    Compiler {
        /// Compiler version, e.g. "213.6777.52" or "213.1234-EAP-SNAPSHOT".
        version: Option<String>,
        /// Derive the compiler version from an IDE installation instead.
        #[arg(long, conflicts_with = "version")]
        ide_dir: Option<PathBuf>,
    },
}
