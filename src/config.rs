use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub assets: AssetsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}
fn default_overlap() -> usize {
    150
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Hits requested per interactive turn. Clamped to [1, 50] at query time.
    #[serde(default = "default_top_k")]
    pub top_k: i64,
    /// Character budget for the assembled context block.
    #[serde(default = "default_context_chars")]
    pub context_chars: usize,
    /// Source tags the chat/consultation turns are allowed to ground on.
    #[serde(default = "default_trusted_sources")]
    pub trusted_sources: Vec<String>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            context_chars: default_context_chars(),
            trusted_sources: default_trusted_sources(),
        }
    }
}

fn default_top_k() -> i64 {
    6
}
fn default_context_chars() -> usize {
    3500
}
fn default_trusted_sources() -> Vec<String> {
    vec!["guideline:vn-2024".to_string(), "faq".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct OpenAiConfig {
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            embedding_model: default_embedding_model(),
            dims: default_dims(),
            chat_model: default_chat_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_dims() -> usize {
    1536
}
fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct AssetsConfig {
    #[serde(default = "default_assets_root")]
    pub root: PathBuf,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            root: default_assets_root(),
        }
    }
}

fn default_assets_root() -> PathBuf {
    PathBuf::from("./data/assets")
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }

    if config.chunking.overlap >= config.chunking.chunk_size {
        anyhow::bail!("chunking.overlap must be < chunking.chunk_size");
    }

    if !(1..=50).contains(&config.retrieval.top_k) {
        anyhow::bail!("retrieval.top_k must be in [1, 50]");
    }

    if config.retrieval.context_chars == 0 {
        anyhow::bail!("retrieval.context_chars must be > 0");
    }

    if config.openai.dims == 0 {
        anyhow::bail!("openai.dims must be > 0");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_applied() {
        let file = write_config("[db]\npath = \"./data/derm.sqlite\"\n");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.overlap, 150);
        assert_eq!(config.retrieval.top_k, 6);
        assert_eq!(config.retrieval.context_chars, 3500);
        assert_eq!(config.openai.embedding_model, "text-embedding-3-small");
        assert_eq!(config.openai.dims, 1536);
    }

    #[test]
    fn test_overlap_must_be_less_than_chunk_size() {
        let file = write_config(
            "[db]\npath = \"x.sqlite\"\n\n[chunking]\nchunk_size = 100\noverlap = 100\n",
        );
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_top_k_bounds() {
        let file = write_config("[db]\npath = \"x.sqlite\"\n\n[retrieval]\ntop_k = 51\n");
        assert!(load_config(file.path()).is_err());
    }
}
