use clap::{Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "keel", version, about = "keel CLI")]
pub struct Cli {
    /// Emit JSON output on stdout.
    #[arg(long, global = true)]
    pub json: bool,

    /// Local cache store root (default: .keel)
    #[arg(long, global = true, default_value = ".keel")]
    pub cache_root: String,

    /// Registry configuration file (YAML or JSON).
    #[arg(long, global = true, default_value = "registries.yaml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Walk a workspace directory into a content graph and report its root.
    Assemble {
        /// Workspace directory.
        path: String,

        /// Maximum number of files to admit.
        #[arg(long)]
        max_files: Option<usize>,
    },

    /// Fetch a blob through the local cache from the mirror serving a reference.
    Fetch {
        /// Artifact reference, e.g. reg.example.com/ns/app
        reference: String,

        /// Resolve this tag at the endpoint instead of passing a digest.
        #[arg(long)]
        tag: Option<String>,

        /// Content digest (sha256:<hex>). Requires --size.
        #[arg(long)]
        digest: Option<String>,

        /// Content size in bytes, required with --digest.
        #[arg(long)]
        size: Option<u64>,

        /// Media type recorded on the descriptor.
        #[arg(long, default_value = "application/octet-stream")]
        media_type: String,

        /// Write content to this path instead of stdout.
        #[arg(long)]
        to: Option<String>,
    },

    /// Push a local file to the endpoint serving a reference.
    Push {
        /// Artifact reference selecting the endpoint.
        reference: String,

        /// File to upload.
        file: String,

        /// Media type recorded on the descriptor.
        #[arg(long, default_value = "application/octet-stream")]
        media_type: String,
    },

    /// Show which configured mirror serves a reference.
    Resolve {
        reference: String,
    },

    /// Run environment checks.
    Doctor,
}
