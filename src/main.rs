use clap::{Parser, Subcommand};
use rtryon::{
    bytes_to_data_uri,
    codec::{decode_payload, DataUri},
    logger::{self, LoggerConfig},
    Config, ImageItem, TryOnClient,
};
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "rtryon", version, about = "Virtual try-on with Volcengine or Gemini")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate a garment image from a text description.
    Garment(GarmentArgs),
    /// Dress a person in a garment.
    TryOn(TryOnArgs),
    /// Run the try-on proxy server.
    Serve(ServeArgs),
}

#[derive(Debug, Parser)]
struct GarmentArgs {
    /// What the garment looks like.
    #[arg(required = true, num_args = 1..)]
    description: Vec<String>,
}

#[derive(Debug, Parser)]
struct TryOnArgs {
    /// Person image: a local file, URL or data URI.
    person: String,
    /// Garment image: a local file, URL or data URI.
    garment: String,
}

#[derive(Debug, Parser)]
#[cfg_attr(not(feature = "server"), allow(dead_code))]
struct ServeArgs {
    /// Overrides PORT.
    #[arg(long)]
    port: Option<u16>,
    /// Base URL clients reach the server on; overrides TRYON_PUBLIC_URL.
    #[arg(long)]
    public_url: Option<String>,
    /// Directory for offloaded results; overrides TRYON_STORAGE_DIR.
    #[arg(long)]
    storage_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let dotenv_loaded = dotenv::dotenv().is_ok();

    logger::init_with_config(LoggerConfig::from_env())?;
    logger::log_startup_info("rtryon", env!("CARGO_PKG_VERSION"));
    if dotenv_loaded {
        log::info!("✅ .env file loaded successfully");
    } else {
        log::warn!("⚠️  No .env file found, using system environment variables");
    }

    let config = Config::from_env();
    logger::log_config_info(&config);

    match cli.command {
        Command::Garment(args) => generate_garment(config, &args.description.join(" ")).await,
        Command::TryOn(args) => try_on(config, &args.person, &args.garment).await,
        Command::Serve(args) => serve(config, args).await,
    }
}

async fn generate_garment(config: Config, prompt: &str) -> Result<(), Box<dyn std::error::Error>> {
    let client = TryOnClient::new(config)?;
    let provider = client.provider()?;
    let mut session = client.session(Vec::new(), Vec::new());

    log::info!("🎨 Generating garment via {}: {}", provider.name(), prompt);
    let outcome = session
        .generate_garment(provider.as_ref(), prompt)
        .await
        .map(|item| item.clone());
    match outcome {
        Ok(item) => {
            let path = save_data_uri(&item.url, "garment")?;
            log::info!("✅ Garment {} saved to {}", item.id, path);
        }
        Err(e) => {
            log::error!("❌ {}", session.error().unwrap_or_default());
            return Err(e.into());
        }
    }
    Ok(())
}

async fn try_on(
    config: Config,
    person: &str,
    garment: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = TryOnClient::new(config)?;
    let provider = client.provider()?;

    let person = ImageItem::preset("person", load_reference(person).await?);
    let garment = ImageItem::preset("garment", load_reference(garment).await?);
    let mut session = client.session(vec![person], vec![garment]);
    session.select_person("person")?;
    session.select_garment("garment")?;

    log::info!("👗 Running try-on via {}...", provider.name());
    let outcome = session
        .generate_try_on(provider.as_ref(), client.codec())
        .await
        .map(str::to_string);
    match outcome {
        Ok(result) => {
            let path = save_data_uri(&result, "tryon")?;
            log::info!("✅ Try-on result saved to {}", path);
        }
        Err(e) => {
            log::error!("❌ {}", session.error().unwrap_or_default());
            return Err(e.into());
        }
    }
    Ok(())
}

#[cfg(feature = "server")]
async fn serve(mut config: Config, args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let port = args.port.or(config.port).unwrap_or(8080);
    if let Some(dir) = args.storage_dir {
        config.storage.root_dir = Some(dir);
    }
    if let Some(url) = args.public_url {
        config.storage.public_base_url = Some(url);
    }
    if config.storage.public_base_url.is_none() {
        let url = format!("http://localhost:{}", port);
        log::warn!("⚠️  TRYON_PUBLIC_URL not set, linking stored results under {}", url);
        config.storage.public_base_url = Some(url);
    }

    let client = TryOnClient::with_storage(config).await?;
    let proxy = client.proxy().await?;
    rtryon::server::run(proxy, port).await?;
    Ok(())
}

#[cfg(not(feature = "server"))]
async fn serve(_config: Config, _args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    Err("rtryon was built without the `server` feature".into())
}

/// URLs and data URIs pass through; anything else is read as a local file.
async fn load_reference(reference: &str) -> Result<String, Box<dyn std::error::Error>> {
    if reference.starts_with("http://")
        || reference.starts_with("https://")
        || reference.starts_with("data:")
    {
        return Ok(reference.to_string());
    }

    let bytes = tokio::fs::read(reference).await?;
    let mime = mime_guess::from_path(reference).first_or_octet_stream();
    log::debug!("Loaded {} ({} bytes, {})", reference, bytes.len(), mime);
    Ok(bytes_to_data_uri(&bytes, mime.essence_str()))
}

fn save_data_uri(uri: &str, stem: &str) -> Result<String, Box<dyn std::error::Error>> {
    let Some(data_uri) = DataUri::parse(uri) else {
        log::info!("🔗 Result is hosted at {}", uri);
        return Ok(uri.to_string());
    };

    let extension = match data_uri.mime {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        _ => "png",
    };
    let filename = format!("{}_{}.{}", stem, chrono::Utc::now().timestamp(), extension);
    std::fs::write(Path::new(&filename), decode_payload(data_uri.payload)?)?;
    Ok(filename)
}
