//! Vigil CLI: upload, delete and inspect evidence media from the command line.
//!
//! Reads CLOUDINARY_CLOUD_NAME, CLOUDINARY_UPLOAD_PRESET and, for deletion and
//! signing, CLOUDINARY_API_KEY and CLOUDINARY_API_SECRET.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::collections::BTreeMap;
use vigil_cli::{init_tracing, to_file_uri};
use vigil_core::constants::REPORT_EVIDENCE_FOLDER;
use vigil_core::{FileRef, StorageConfig};
use vigil_storage::signer::string_to_sign;
use vigil_storage::{classify, create_pipeline, sign_params, PlatformProfile};

#[derive(Parser)]
#[command(name = "vigil", about = "Evidence media upload pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload one or more files
    Upload {
        /// Paths or URIs of the files to upload
        #[arg(required = true)]
        files: Vec<String>,
        /// Destination folder
        #[arg(long, default_value = REPORT_EVIDENCE_FOLDER)]
        folder: String,
        /// Use the video retry path (single file only)
        #[arg(long)]
        video: bool,
        /// Platform profile: browser, native, native-constrained
        #[arg(long, default_value = "native")]
        platform: PlatformProfile,
    },
    /// Delete an uploaded file by its delivery URL
    Delete {
        url: String,
    },
    /// Show how a file would be classified
    Classify {
        uri: String,
    },
    /// Sign a destroy request
    Sign {
        public_id: String,
        timestamp: i64,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = StorageConfig::from_env();

    match cli.command {
        Commands::Upload {
            files,
            folder,
            video,
            platform,
        } => {
            let pipeline = create_pipeline(config, platform).context("Failed to create pipeline")?;
            let refs: Vec<FileRef> = files.iter().map(|f| FileRef::new(to_file_uri(f))).collect();

            match refs.as_slice() {
                [file] if video => print_json(&pipeline.upload_video(file, &folder).await)?,
                [file] => print_json(&pipeline.upload(file, &folder).await)?,
                _ => {
                    if video {
                        anyhow::bail!("--video takes a single file");
                    }
                    let batch = pipeline.upload_many(&refs, &folder).await;
                    tracing::info!("{}", batch.summary_message());
                    print_json(&batch)?;
                }
            }
        }
        Commands::Delete { url } => {
            let pipeline = create_pipeline(config, PlatformProfile::Native)
                .context("Failed to create pipeline")?;
            print_json(&pipeline.delete_by_url(&url).await)?;
        }
        Commands::Classify { uri } => {
            let file = FileRef::new(to_file_uri(&uri));
            let c = classify(&file, None);
            print_json(&serde_json::json!({
                "media_kind": c.media_kind.to_string(),
                "resource_category": c.category.as_str(),
                "mime_type": c.mime_type,
                "extension": c.extension,
                "auto_detect": c.auto_detect,
                "source": format!("{:?}", c.source),
            }))?;
        }
        Commands::Sign {
            public_id,
            timestamp,
        } => {
            let (_, _, secret) = config.deletion_credentials()?;
            let mut params = BTreeMap::new();
            params.insert("public_id".to_string(), public_id);
            params.insert("timestamp".to_string(), timestamp.to_string());
            let signature = sign_params(&params, secret)?;
            print_json(&serde_json::json!({
                "string_to_sign": string_to_sign(&params),
                "signature": signature,
            }))?;
        }
    }

    Ok(())
}
