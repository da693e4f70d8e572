use std::{path::PathBuf, process::ExitCode};

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use image_intake::{
    CandidateImage, EntityKind, PolicySource, UploadIntent, UploadResolver, ValidationConfig,
    generate_fallback_url, quick_validate,
    storage::{self, local::LocalStorage},
    validate,
};
use tracing::error;

#[derive(Parser)]
struct Opts {
    #[command(flatten)]
    policy: PolicyOpts,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct PolicyOpts {
    /// Validation policy file (YAML)
    #[clap(long, env = "IMAGE_INTAKE_POLICY", global = true)]
    policy: Option<PathBuf>,
    /// Remote validation policy (JSON); the builtin policy is used if it is unreachable
    #[clap(long, env = "IMAGE_INTAKE_POLICY_URL", global = true, conflicts_with = "policy")]
    policy_url: Option<url::Url>,
}

impl PolicyOpts {
    fn source(&self) -> PolicySource {
        match (&self.policy, &self.policy_url) {
            (Some(path), _) => PolicySource::File(path.clone()),
            (None, Some(url)) => PolicySource::Remote(url.clone()),
            (None, None) => PolicySource::Builtin,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Character,
    Setting,
    Location,
}

impl From<Kind> for EntityKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Character => EntityKind::Character,
            Kind::Setting => EntityKind::Setting,
            Kind::Location => EntityKind::Location,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Validate image files and print one verdict per file
    Validate {
        /// Only run the size, extension and type checks
        #[clap(long)]
        quick: bool,
        #[clap(required = true)]
        files: Vec<PathBuf>,
    },
    /// Validate and store an image, printing the URL the entity should use
    Upload {
        #[clap(long, value_enum)]
        kind: Kind,
        #[clap(long)]
        existing: Option<String>,
        /// Drop the existing image when no file is given
        #[clap(long)]
        no_preserve: bool,
        /// Base URL of the upload service
        #[clap(long, env = "IMAGE_INTAKE_ENDPOINT", conflicts_with = "local")]
        endpoint: Option<String>,
        #[clap(long, env = "IMAGE_INTAKE_TOKEN", hide_env_values = true)]
        token: Option<String>,
        /// SQLite database used as a local image store
        #[clap(long, default_value = "sqlite://images.db")]
        local: String,
        file: Option<PathBuf>,
    },
    /// Print the placeholder URL for an entity without an image
    Fallback {
        #[clap(long, value_enum)]
        kind: Kind,
        #[clap(long)]
        name: String,
        #[clap(long)]
        slot: Option<usize>,
    },
}

async fn upload<S: storage::Client>(
    config: &ValidationConfig,
    storage: &S,
    intent: UploadIntent,
) -> anyhow::Result<bool> {
    let resolved = UploadResolver::new(config, storage).resolve(intent).await;
    println!("{}", serde_json::to_string_pretty(&resolved)?);
    Ok(resolved.is_success())
}

async fn run(opts: Opts) -> anyhow::Result<bool> {
    let config = opts
        .policy
        .source()
        .load()
        .await
        .with_context(|| "load validation policy")?;

    match opts.command {
        Command::Validate { quick, files } => {
            let mut all_valid = true;
            for path in files {
                let candidate = CandidateImage::load(&path)
                    .await
                    .with_context(|| format!("read {}", path.display()))?;
                let verdict = if quick {
                    quick_validate(Some(&candidate), &config)
                } else {
                    validate(Some(&candidate), &config).await
                };
                all_valid &= verdict.is_valid();
                println!(
                    "{}",
                    serde_json::to_string(&serde_json::json!({
                        "file": path.display().to_string(),
                        "verdict": verdict,
                    }))?
                );
            }
            Ok(all_valid)
        }
        Command::Upload {
            kind,
            existing,
            no_preserve,
            endpoint,
            token,
            local,
            file,
        } => {
            let candidate = match file {
                Some(path) => Some(
                    CandidateImage::load(&path)
                        .await
                        .with_context(|| format!("read {}", path.display()))?,
                ),
                None => None,
            };
            let intent = UploadIntent {
                candidate,
                kind: kind.into(),
                existing_url: existing,
                preserve_existing: !no_preserve,
            };
            match endpoint {
                Some(endpoint) => {
                    let client = storage::http::Client::new(endpoint, token);
                    upload(&config, &client, intent).await
                }
                None => {
                    let store = LocalStorage::open(&local)
                        .await
                        .with_context(|| format!("open local image store {local}"))?;
                    upload(&config, &store, intent).await
                }
            }
        }
        Command::Fallback { kind, name, slot } => {
            println!(
                "{}",
                generate_fallback_url(&config.fallback_base_url, &name, kind.into(), slot)
            );
            Ok(true)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let opts = Opts::parse();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    match run(opts).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!(?e, "critical error");
            ExitCode::FAILURE
        }
    }
}
