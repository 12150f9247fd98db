use crate::services::validation::{DEFAULT_ALLOWED_EXTENSIONS, DEFAULT_MAX_FILE_SIZE, UploadPolicy};
use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use std::{env, fmt, path::PathBuf, str::FromStr};

pub const DEFAULT_EMBEDDING_MODEL: &str = "nvidia/nv-embedqa-e5-v5";
pub const DEFAULT_NVIDIA_API_URL: &str = "https://integrate.api.nvidia.com/v1";
pub const DEFAULT_NIM_ENDPOINT: &str = "http://localhost:8000/v1";
pub const DEFAULT_EMBEDDING_TIMEOUT_SECS: u64 = 60;
const DEFAULT_LOCAL_BUCKET: &str = "memory-hub";

/// Deployment environment; selects the embedding backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Environment {
    #[value(aliases = ["dev", "local"])]
    Development,
    #[value(alias = "prod")]
    Production,
}

impl Environment {
    /// Case-insensitive, accepts the `dev`/`local`/`prod` aliases.
    pub fn parse(s: &str) -> Result<Self> {
        <Environment as ValueEnum>::from_str(s.trim(), true)
            .map_err(|_| anyhow::anyhow!("unknown environment `{}`", s))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackend {
    S3,
    Local,
}

/// Object storage settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub bucket: String,
    pub region: String,
    /// Root directory for the `local` backend.
    pub local_dir: PathBuf,
}

/// Embedding provider settings.
#[derive(Clone, PartialEq, Eq)]
pub struct EmbeddingConfig {
    pub model: String,
    pub api_url: String,
    pub api_key: Option<String>,
    pub nim_endpoint: String,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_EMBEDDING_MODEL.into(),
            api_url: DEFAULT_NVIDIA_API_URL.into(),
            api_key: None,
            nim_endpoint: DEFAULT_NIM_ENDPOINT.into(),
            timeout_secs: DEFAULT_EMBEDDING_TIMEOUT_SECS,
        }
    }
}

impl fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("model", &self.model)
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("nim_endpoint", &self.nim_endpoint)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Centralized application configuration.
/// Combines environment variables and CLI arguments; immutable after startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub upload: UploadPolicy,
    /// `*` allows any origin; an empty list disables CORS.
    pub allowed_origins: Vec<String>,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Upload & embedding gateway")]
pub struct Args {
    /// Host to bind to (overrides MEMORY_HUB_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides MEMORY_HUB_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Deployment environment (overrides ENVIRONMENT)
    #[arg(long, value_enum)]
    pub environment: Option<Environment>,

    /// Object storage backend (overrides STORAGE_BACKEND)
    #[arg(long, value_enum)]
    pub storage_backend: Option<StorageBackend>,

    /// Bucket name (overrides S3_BUCKET_NAME)
    #[arg(long)]
    pub bucket: Option<String>,

    /// AWS region (overrides AWS_REGION)
    #[arg(long)]
    pub region: Option<String>,

    /// Root directory for the local backend (overrides LOCAL_STORAGE_DIR)
    #[arg(long)]
    pub local_storage_dir: Option<PathBuf>,

    /// Embedding model identifier (overrides EMBEDDING_MODEL)
    #[arg(long)]
    pub embedding_model: Option<String>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        Self::from_lookup(Args::parse(), |name| env::var(name).ok())
    }

    /// Merge `args` over values returned by `lookup` (normally the process
    /// environment). Flags win; missing values fall back to defaults.
    pub fn from_lookup<F>(args: Args, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        // --- Environment fallback ---
        let env_host = var("MEMORY_HUB_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let env_port = parse_var::<u16, _>(&var, "MEMORY_HUB_PORT")?.unwrap_or(8000);
        let env_environment = var("ENVIRONMENT")
            .map(|value| {
                Environment::parse(&value)
                    .with_context(|| format!("parsing ENVIRONMENT value `{}`", value))
            })
            .transpose()?
            .unwrap_or(Environment::Development);
        let env_backend = var("STORAGE_BACKEND")
            .map(|value| {
                <StorageBackend as ValueEnum>::from_str(value.trim(), true)
                    .map_err(|_| anyhow::anyhow!("unknown storage backend `{}`", value))
                    .context("parsing STORAGE_BACKEND")
            })
            .transpose()?
            .unwrap_or(StorageBackend::S3);

        // --- Merge ---
        let backend = args.storage_backend.unwrap_or(env_backend);
        let bucket = match (args.bucket.or_else(|| var("S3_BUCKET_NAME")), backend) {
            (Some(bucket), _) => bucket,
            (None, StorageBackend::Local) => DEFAULT_LOCAL_BUCKET.into(),
            (None, StorageBackend::S3) => {
                bail!("S3_BUCKET_NAME (or --bucket) is required for the s3 storage backend")
            }
        };

        let storage = StorageConfig {
            backend,
            bucket,
            region: args
                .region
                .or_else(|| var("AWS_REGION"))
                .unwrap_or_else(|| "us-east-1".into()),
            local_dir: args
                .local_storage_dir
                .or_else(|| var("LOCAL_STORAGE_DIR").map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from("./data/objects")),
        };

        let embedding = EmbeddingConfig {
            model: args
                .embedding_model
                .or_else(|| var("EMBEDDING_MODEL"))
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.into()),
            api_url: var("NVIDIA_API_URL").unwrap_or_else(|| DEFAULT_NVIDIA_API_URL.into()),
            api_key: var("NVIDIA_API_KEY"),
            nim_endpoint: var("NIM_ENDPOINT").unwrap_or_else(|| DEFAULT_NIM_ENDPOINT.into()),
            timeout_secs: parse_var::<u64, _>(&var, "EMBEDDING_TIMEOUT_SECS")?
                .unwrap_or(DEFAULT_EMBEDDING_TIMEOUT_SECS),
        };

        let upload = UploadPolicy::new(
            var("ALLOWED_EXTENSIONS")
                .map(|list| split_list(&list))
                .unwrap_or_else(|| {
                    DEFAULT_ALLOWED_EXTENSIONS
                        .iter()
                        .map(|ext| ext.to_string())
                        .collect()
                }),
            parse_var::<u64, _>(&var, "MAX_FILE_SIZE")?.unwrap_or(DEFAULT_MAX_FILE_SIZE),
        );
        if upload.allowed_extensions.is_empty() {
            bail!("ALLOWED_EXTENSIONS must name at least one extension");
        }

        // Unset keeps the permissive default; set-but-empty disables CORS.
        let allowed_origins = match lookup("ALLOWED_ORIGINS") {
            Some(list) => split_list(&list),
            None => vec!["*".to_string()],
        };

        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            environment: args.environment.unwrap_or(env_environment),
            storage,
            embedding,
            upload,
            allowed_origins,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T, F>(var: &F, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    var(name)
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .with_context(|| format!("parsing {} value `{}`", name, value))
        })
        .transpose()
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
