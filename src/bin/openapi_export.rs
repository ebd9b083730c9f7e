use std::{fs, path::PathBuf};

use clap::Parser;
use sams_api::openapi::ApiDoc;
use utoipa::OpenApi;

#[derive(Parser)]
#[command(name = "openapi-export", about = "Write the SAMS OpenAPI document to disk")]
struct Args {
    #[arg(long, default_value = "openapi")]
    output_dir: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let openapi = ApiDoc::openapi();
    let json = serde_json::to_string_pretty(&openapi)?;

    fs::create_dir_all(&args.output_dir)?;

    let output_path = args.output_dir.join("sams-api.v1.json");
    fs::write(&output_path, json)?;

    println!("OpenAPI spec written to {}", output_path.display());
    Ok(())
}
