use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub slack: SlackConfig,
    #[serde(default)]
    pub groups: GroupsConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub draft: DraftConfig,
}

#[derive(Debug, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
        }
    }
}

fn default_base_dir() -> PathBuf {
    PathBuf::from(".")
}

impl StoreConfig {
    pub fn reports_dir(&self) -> PathBuf {
        self.base_dir.join("reports")
    }

    /// Legacy single-file location, used only when reports/ has no candidates.
    pub fn legacy_reports_path(&self) -> PathBuf {
        self.base_dir.join("reports.json")
    }

    pub fn macro_path(&self) -> PathBuf {
        self.base_dir.join("macro").join("macro.json")
    }

    pub fn messages_root(&self) -> PathBuf {
        self.base_dir.join("messages")
    }

    pub fn messages_dir(&self) -> PathBuf {
        self.base_dir.join("messages").join("diskusjon")
    }

    pub fn inbox_dir(&self) -> PathBuf {
        self.base_dir.join("inbox")
    }

    pub fn stocks_csv(&self) -> PathBuf {
        self.base_dir.join("stocks.csv")
    }

    pub fn ideas_path(&self) -> PathBuf {
        self.base_dir.join("message-ideas.md")
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SlackConfig {
    /// Bot token; SLACK_BOT_TOKEN overrides.
    #[serde(default)]
    pub bot_token: Option<String>,
    /// Channel for day-files without a folder override; SLACK_CHANNEL_ID overrides.
    #[serde(default)]
    pub default_channel: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GroupsConfig {
    /// Group label used when a ticker has no stocks.csv entry; ANALYSE_GRUPPE overrides.
    #[serde(default = "default_group_label")]
    pub default_label: String,
}

impl Default for GroupsConfig {
    fn default() -> Self {
        Self {
            default_label: default_group_label(),
        }
    }
}

fn default_group_label() -> String {
    "Analysegruppen".to_string()
}

#[derive(Debug, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Base URL for the API. Optional — each provider has a sensible default.
    pub base_url: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    /// OPENAI_API_KEY overrides.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: None,
            model: default_model(),
            api_key: String::new(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_temperature() -> f32 {
    0.8
}

#[derive(Debug, Deserialize)]
pub struct DraftConfig {
    #[serde(default = "default_num_proposals")]
    pub num_proposals: u32,
    /// One of "short", "medium", "long" — soft word-count targets for the model.
    #[serde(default = "default_target_length")]
    pub target_length: String,
    #[serde(default = "default_true")]
    pub include_previous_messages: bool,
    #[serde(default = "default_num_previous_files")]
    pub num_previous_files: usize,
    #[serde(default = "default_true")]
    pub include_message_ideas: bool,
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_style_notes")]
    pub style_notes: String,
    #[serde(default)]
    pub category_hint: Option<String>,
}

impl Default for DraftConfig {
    fn default() -> Self {
        Self {
            num_proposals: default_num_proposals(),
            target_length: default_target_length(),
            include_previous_messages: true,
            num_previous_files: default_num_previous_files(),
            include_message_ideas: true,
            max_context_chars: default_max_context_chars(),
            language: default_language(),
            style_notes: default_style_notes(),
            category_hint: None,
        }
    }
}

fn default_num_proposals() -> u32 {
    3
}

fn default_target_length() -> String {
    "medium".to_string()
}

fn default_true() -> bool {
    true
}

fn default_num_previous_files() -> usize {
    5
}

fn default_max_context_chars() -> usize {
    16000
}

fn default_language() -> String {
    "Norwegian".to_string()
}

fn default_style_notes() -> String {
    "Skriv i et vennlig, klart og akademisk nøkternt toneleie for studentklubb. \
     Bruk enkel Slack-vennlig Markdown. Maks 1–2 lenker. Ingen kodeblokker, \
     ingen overskrifter med #, og ingen metadata. Begynn direkte på innholdet."
        .to_string()
}

/// Load config from `path`, falling back to defaults when the file is absent,
/// then apply environment overrides for secrets and deployment-specific values.
pub fn load(path: &str) -> Result<Config> {
    let path = expand_tilde(path);
    let mut config: Config = if path.exists() {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&content).with_context(|| "Failed to parse config.toml")?
    } else {
        Config::default()
    };

    if let Ok(token) = std::env::var("SLACK_BOT_TOKEN")
        && !token.is_empty()
    {
        config.slack.bot_token = Some(token);
    }
    if let Ok(channel) = std::env::var("SLACK_CHANNEL_ID")
        && !channel.is_empty()
    {
        config.slack.default_channel = Some(channel);
    }
    if let Ok(key) = std::env::var("OPENAI_API_KEY")
        && !key.is_empty()
    {
        config.llm.api_key = key;
    }
    if let Ok(label) = std::env::var("ANALYSE_GRUPPE")
        && !label.is_empty()
    {
        config.groups.default_label = label;
    }

    Ok(config)
}

pub async fn init_config_dir(base: &std::path::Path) -> Result<()> {
    let dirs = ["reports", "macro", "messages/diskusjon", "inbox"];
    for d in &dirs {
        tokio::fs::create_dir_all(base.join(d)).await?;
    }

    let config_path = base.join("config.toml");
    if !config_path.exists() {
        tokio::fs::write(
            &config_path,
            r#"[store]
base_dir = "."

[slack]
# bot_token = "xoxb-YOUR_BOT_TOKEN"   # or SLACK_BOT_TOKEN env
# default_channel = "C0123456789"     # or SLACK_CHANNEL_ID env

[groups]
default_label = "Analysegruppen"      # or ANALYSE_GRUPPE env

[llm]
provider = "openai"
model = "gpt-4o-mini"
# api_key = "sk-..."                  # or OPENAI_API_KEY env
max_tokens = 2048
temperature = 0.8

[draft]
num_proposals = 3
target_length = "medium"              # short | medium | long
num_previous_files = 5
max_context_chars = 16000
# category_hint = "multippel"
"#,
        )
        .await?;
    }

    Ok(())
}

fn expand_tilde(path: &str) -> PathBuf {
    if path.starts_with("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(&path[2..]);
    }
    PathBuf::from(path)
}
