use anyhow::{bail, Context};
use bpaf::Bpaf;
use camino::Utf8PathBuf;
use sharedlibs::{HostContext, Toolkit};
use tracing::{debug, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Bpaf)]
#[bpaf(options)]
struct Options {
    #[bpaf(short, long)]
    /// Verbose output
    verbose: bool,

    #[bpaf(long)]
    /// Report every RPATH setting that gets removed
    show_inclusion: bool,

    #[bpaf(external(action))]
    action: Action,
}

#[derive(Debug, Clone, Bpaf)]
enum Action {
    #[bpaf(command("locate"))]
    /// Resolve a library name to its path
    Locate {
        #[bpaf(positional("NAME"))]
        name: String,
    },

    #[bpaf(command("host"))]
    /// Show the host platform and the binary format it loads
    Host,

    #[bpaf(command("format"))]
    /// Show the container format of a binary
    Format {
        #[bpaf(positional("FILE"))]
        file: Utf8PathBuf,
    },

    #[bpaf(command("version"))]
    /// Show the file version of a PE binary
    Version {
        #[bpaf(positional("FILE"))]
        file: Utf8PathBuf,
    },

    #[bpaf(command("imports"))]
    /// List the DLLs a PE binary imports and its bitness
    Imports {
        #[bpaf(positional("FILE"))]
        file: Utf8PathBuf,
    },

    #[bpaf(command("rpath"))]
    /// Show the RPATH of an ELF or Mach-O binary
    Rpath {
        #[bpaf(positional("FILE"))]
        file: Utf8PathBuf,
    },

    #[bpaf(command("remove-rpath"))]
    /// Remove the RPATH of an ELF or Mach-O binary
    RemoveRpath {
        #[bpaf(positional("FILE"))]
        file: Utf8PathBuf,
    },

    #[bpaf(command("rewrite"))]
    /// Rewrite Mach-O load paths and add an rpath
    Rewrite {
        #[bpaf(long("change"), argument("OLD=NEW"))]
        /// Replace load path OLD with NEW
        changes: Vec<String>,

        #[bpaf(long("add-rpath"), argument("DIR"))]
        /// Add DIR as an rpath
        add_rpath: Option<Utf8PathBuf>,

        #[bpaf(positional("FILE"))]
        file: Utf8PathBuf,
    },

    #[bpaf(command("strip-signature"))]
    /// Remove the code signature of a Mach-O binary
    StripSignature {
        #[bpaf(positional("FILE"))]
        file: Utf8PathBuf,
    },

    #[bpaf(command("manifests"))]
    /// List the manifest resources of a PE binary
    Manifests {
        #[bpaf(long("with-data"))]
        /// Print the manifest contents too
        with_data: bool,

        #[bpaf(positional("FILE"))]
        file: Utf8PathBuf,
    },

    #[bpaf(command("strip-manifests"))]
    /// Remove the manifests of a known SxS extension module
    StripManifests {
        #[bpaf(positional("FILE"))]
        file: Utf8PathBuf,
    },
}

/// Initialize the tracing subscriber with appropriate configuration
///
/// # Arguments
///
/// * `verbose` - If true, sets log level to DEBUG, otherwise INFO
pub fn init_logging(verbose: bool) {
    let filter_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Set up environment filter - allow overriding via RUST_LOG env var
    let env_filter = EnvFilter::builder()
        .with_default_directive(filter_level.into())
        .from_env_lossy();

    let fmt_layer = fmt::layer()
        .with_level(verbose)
        .with_target(verbose)
        .with_line_number(verbose)
        .without_time()
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    debug!("Logging initialized with level: {}", filter_level);
}

fn parse_change(change: &str) -> anyhow::Result<(String, String)> {
    match change.split_once('=') {
        Some((old, new)) if !old.is_empty() && !new.is_empty() => {
            Ok((old.to_string(), new.to_string()))
        }
        _ => bail!("Invalid --change '{}', expected OLD=NEW", change),
    }
}

fn main() -> anyhow::Result<()> {
    let options = options().run();

    init_logging(options.verbose);

    let context = HostContext::detect().with_show_inclusion(options.show_inclusion);
    debug!("Host: {} ({})", context.platform, context.arch);

    let toolkit = Toolkit::builder().context(context).build();

    match options.action {
        Action::Locate { name } => match toolkit.locate(&name)? {
            Some(path) => println!("{}", path),
            None => bail!("Library '{}' not found", name),
        },
        Action::Host => {
            let context = toolkit.context();
            println!(
                "{} {} {}-bit, loads {} binaries",
                context.platform,
                context.arch,
                if context.is_64bit { 64 } else { 32 },
                context.platform.binary_format()
            );
        }
        Action::Format { file } => match toolkit.inspect_format(&file)? {
            Some(format) if toolkit.is_native_binary(&file)? => {
                println!("{} (native)", format)
            }
            Some(format) => println!("{}", format),
            None => println!("unknown"),
        },
        Action::Version { file } => println!("{}", toolkit.read_version(&file)?),
        Action::Imports { file } => {
            let info = toolkit
                .read_imports_and_arch(&file)
                .with_context(|| format!("Reading imports of {}", file))?;
            println!("{}-bit", if info.is_64bit { 64 } else { 32 });
            for dll in info.imports {
                println!("{}", dll);
            }
        }
        Action::Rpath { file } => {
            if let Some(rpath) = toolkit.get_rpath(&file)? {
                println!("{}", rpath);
            }
        }
        Action::RemoveRpath { file } => toolkit.remove_rpath(&file)?,
        Action::Rewrite {
            changes,
            add_rpath,
            file,
        } => {
            let mapping = changes
                .iter()
                .map(|change| parse_change(change))
                .collect::<anyhow::Result<Vec<_>>>()?;
            toolkit.rewrite_install_names(&file, &mapping, add_rpath.as_deref())?;
            info!("Rewrote {} load paths in {}", mapping.len(), file);
        }
        Action::StripSignature { file } => toolkit.strip_code_signature(&file)?,
        Action::Manifests { with_data, file } => {
            for manifest in toolkit.list_manifests(&file, with_data)? {
                println!("{}", manifest.id);
                if with_data {
                    println!("{}", String::from_utf8_lossy(&manifest.data));
                }
            }
        }
        Action::StripManifests { file } => toolkit.strip_manifests(&file)?,
    }

    Ok(())
}
