use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use pspug_codegen::Artifact;
use pspug_parser::Options;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

#[derive(Parser)]
#[command(name = "pspug")]
#[command(about = "pspug — Pug template to PowerShell script compiler")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Transpile a template to a PowerShell script artifact
    Build {
        /// Input template, or `-` to read it from stdin
        path: String,

        /// Write the artifact to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        flags: CompileFlags,
    },

    /// Compile a template without emitting, reporting diagnostics
    Check {
        /// Input template
        path: String,

        #[command(flatten)]
        flags: CompileFlags,
    },

    /// Print the dependency record (file and mtime) of a template
    Deps {
        /// Input template
        path: String,

        #[command(flatten)]
        flags: CompileFlags,
    },
}

#[derive(Args)]
struct CompileFlags {
    /// Default suffix for include/extends resolution
    #[arg(long, default_value = "pug")]
    extension: String,

    /// Root directory for absolute (/-prefixed) include paths
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Render boolean attributes as attr="attr" instead of bare attr
    #[arg(long)]
    no_properties: bool,

    /// Render void tags as <img /> instead of <img>
    #[arg(long)]
    void_self_close: bool,

    /// Render empty containers as <div /> instead of <div></div>
    #[arg(long)]
    container_self_close: bool,

    /// Keep CamelCase tag names as written
    #[arg(long)]
    no_kebab_case: bool,

    /// Lines of source context around a diagnostic
    #[arg(long, default_value_t = 2)]
    error_context: u32,
}

impl CompileFlags {
    fn to_options(&self) -> Options {
        Options {
            extension: self.extension.clone(),
            base_dir: self.base_dir.clone(),
            properties: !self.no_properties,
            void_self_close: self.void_self_close,
            container_self_close: self.container_self_close,
            kebab_case: !self.no_kebab_case,
            error_context: self.error_context,
        }
    }
}

fn compile(path: &str, options: &Options) -> anyhow::Result<Artifact> {
    if path == "-" {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .context("reading template from stdin")?;
        let cwd = std::env::current_dir().ok();
        Ok(pspug_codegen::compile_source(
            &source,
            cwd.as_deref(),
            options,
        )?)
    } else {
        Ok(pspug_codegen::compile_file(Path::new(path), options)?)
    }
}

fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Build {
            path,
            output,
            flags,
        } => {
            let artifact = compile(&path, &flags.to_options())?;
            match output {
                Some(out) => std::fs::write(&out, artifact.script)
                    .with_context(|| format!("writing {}", out.display()))?,
                None => print!("{}", artifact.script),
            }
        }
        Command::Check { path, flags } => {
            compile(&path, &flags.to_options())?;
        }
        Command::Deps { path, flags } => {
            let artifact = compile(&path, &flags.to_options())?;
            for (dep, mtime) in &artifact.dependencies {
                let stamp = mtime
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or(0);
                println!("{stamp}\t{}", dep.display());
            }
        }
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(err) = run(cli.command) {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}
