//! LLM-assisted drafting of ad-hoc messages into `inbox/`.
//!
//! The drafts are proposals only; a human promotes them into the message
//! store by hand. Context for the model is composed from the ideas file and
//! the most recently touched day-files.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use tokio::sync::watch;
use walkdir::WalkDir;

use crate::config::{Config, DraftConfig};
use crate::llm::{self, Message};

/// Soft word-count targets per configured length.
fn word_range(target_length: &str) -> (u32, u32) {
    match target_length {
        "short" => (60, 120),
        "long" => (220, 400),
        _ => (120, 220),
    }
}

pub fn slugify(text: &str) -> String {
    let mut slug = String::new();
    let mut last_dash = true;
    for c in text.trim().to_lowercase().chars() {
        if c.is_ascii_alphanumeric() || c == '-' {
            slug.push(c);
            last_dash = false;
        } else if (c.is_whitespace() || c == '_') && !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    let slug = slug.trim_matches('-').to_string();
    if slug.is_empty() { "message".to_string() } else { slug }
}

/// The N most recently modified markdown files under `root`, newest first.
fn recent_messages(root: &Path, limit: usize) -> Vec<PathBuf> {
    let mut files: Vec<(std::time::SystemTime, PathBuf)> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "md"))
        .filter_map(|e| {
            let mtime = e.metadata().ok()?.modified().ok()?;
            Some((mtime, e.into_path()))
        })
        .collect();
    files.sort_by(|a, b| b.0.cmp(&a.0));
    files.into_iter().take(limit).map(|(_, p)| p).collect()
}

/// Compose the prompt context: message ideas plus recent day-files, capped
/// at `max_context_chars` with an explicit truncation marker.
pub fn compose_context(cfg: &DraftConfig, ideas_path: &Path, messages_root: &Path) -> String {
    let mut sections = Vec::new();

    if cfg.include_message_ideas
        && let Ok(ideas) = std::fs::read_to_string(ideas_path)
        && !ideas.trim().is_empty()
    {
        sections.push(format!("[Message Ideas]\n\n{}\n", ideas.trim()));
    }

    if cfg.include_previous_messages {
        let mut previous = Vec::new();
        for path in recent_messages(messages_root, cfg.num_previous_files) {
            if let Ok(text) = std::fs::read_to_string(&path)
                && !text.trim().is_empty()
            {
                previous.push(format!(
                    "[Previous: {}]\n\n{}\n",
                    path.display(),
                    text.trim()
                ));
            }
        }
        if !previous.is_empty() {
            sections.push(format!("[Recent Messages]\n\n{}", previous.join("\n\n---\n\n")));
        }
    }

    let mut context = sections.join("\n\n").trim().to_string();
    if context.chars().count() > cfg.max_context_chars {
        context = context.chars().take(cfg.max_context_chars).collect();
        context.push_str("\n\n[Context truncated due to size limit]");
    }
    context
}

fn build_system_prompt(cfg: &DraftConfig) -> String {
    let (min_w, max_w) = word_range(&cfg.target_length);
    format!(
        "Du er en ekspert fagformidler som skriver for en studentdrevet finansklubb. \
         Skriv på {}. {} Mål mot cirka {min_w}–{max_w} ord. \
         Returner KUN selve teksten for Slack, uten innpakning, overskrifter, \
         metadata eller forklaringer.",
        cfg.language, cfg.style_notes
    )
}

fn build_user_prompt(title: &str, body: &str, context: &str) -> String {
    let mut parts = Vec::new();
    if !context.is_empty() {
        parts.push(format!("Kontekst (tidligere ideer og meldinger):\n{context}"));
    }
    if !title.trim().is_empty() {
        parts.push(format!("Tema/Tittel: {}", title.trim()));
    }
    parts.push(
        "Oppgave: Skriv en pedagogisk, konsis og nyttig Slack-vennlig tekst om temaet."
            .to_string(),
    );
    parts.push(
        "Krav: Unngå repetisjon av tidligere meldinger, ingen innledende høflighetsfraser, \
         ingen hilsener, ingen overskrift med #."
            .to_string(),
    );
    parts.push(
        "Leveranse: Kun selve innholdet, klart til innliming i Slack. Ikke bruk ``` eller \
         annen innpakning."
            .to_string(),
    );
    if !body.trim().is_empty() {
        parts.push(format!("Detaljer/Ønsker:\n{}", body.trim()));
    }
    parts.join("\n\n")
}

/// Terminal spinner around a single slow remote call. Purely cosmetic: a
/// spawned repaint task stopped through a watch channel and awaited before
/// the caller touches the call's result.
struct Spinner {
    stop: watch::Sender<bool>,
    handle: tokio::task::JoinHandle<()>,
}

impl Spinner {
    fn start(text: String) -> Self {
        let (stop, mut stopped) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let frames = ['|', '/', '-', '\\'];
            let mut idx = 0usize;
            let mut tick = tokio::time::interval(Duration::from_millis(100));
            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        eprint!("\r{text} {}", frames[idx % frames.len()]);
                        idx += 1;
                    }
                    _ = stopped.changed() => {
                        eprintln!("\r{text} ferdig.       ");
                        break;
                    }
                }
            }
        });
        Self { stop, handle }
    }

    async fn finish(self) {
        let _ = self.stop.send(true);
        let _ = self.handle.await;
    }
}

fn proposal_path(inbox: &Path, hint: Option<&str>, title: &str, index: u32) -> PathBuf {
    let ts = Local::now().format("%Y%m%d-%H%M%S");
    let hint = hint
        .map(slugify)
        .filter(|h| h.as_str() != "message")
        .unwrap_or_else(|| slugify(title));
    inbox.join(format!("{hint}-proposal-{}-{ts}.md", index + 1))
}

/// Generate `num_proposals` drafts for the given topic and write each to
/// the inbox. Returns the written paths.
pub async fn generate(cfg: &Config, title: &str, body: &str) -> Result<Vec<PathBuf>> {
    let client = llm::create_client(&cfg.llm)?;

    tracing::info!(
        "Starting draft generation (model {}, {} proposal(s), length {})",
        cfg.llm.model,
        cfg.draft.num_proposals,
        cfg.draft.target_length
    );

    let context = compose_context(
        &cfg.draft,
        &cfg.store.ideas_path(),
        &cfg.store.messages_root(),
    );
    tracing::info!("Context ready ({} chars)", context.chars().count());

    let system_prompt = build_system_prompt(&cfg.draft);
    let user_prompt = build_user_prompt(title, body, &context);

    let inbox = cfg.store.inbox_dir();
    std::fs::create_dir_all(&inbox)
        .with_context(|| format!("Failed to create {}", inbox.display()))?;

    let total = cfg.draft.num_proposals.max(1);
    let mut written = Vec::new();
    for i in 0..total {
        let spinner = Spinner::start(format!("Genererer forslag {}/{total}", i + 1));
        let result = client
            .chat(vec![
                Message::system(&system_prompt),
                Message::user(&user_prompt),
            ])
            .await;
        spinner.finish().await;

        let draft = match result {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                tracing::warn!("Proposal {} came back empty, skipping", i + 1);
                continue;
            }
            Err(e) => {
                tracing::error!("Proposal {} failed: {e}", i + 1);
                continue;
            }
        };

        let path = proposal_path(&inbox, cfg.draft.category_hint.as_deref(), title, i);
        std::fs::write(&path, format!("{}\n", draft.trim()))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("Saved draft: {}", path.display());
        written.push(path);
    }

    if written.is_empty() {
        tracing::warn!("No drafts generated");
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DraftConfig;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Mandagens Multippel: EV/EBITDA"), "mandagens-multippel-evebitda");
        assert_eq!(slugify("  flere   ord her "), "flere-ord-her");
        assert_eq!(slugify("___"), "message");
        assert_eq!(slugify(""), "message");
    }

    #[test]
    fn test_word_range() {
        assert_eq!(word_range("short"), (60, 120));
        assert_eq!(word_range("medium"), (120, 220));
        assert_eq!(word_range("long"), (220, 400));
        assert_eq!(word_range("whatever"), (120, 220));
    }

    #[test]
    fn test_compose_context_includes_ideas_and_recent() {
        let dir = tempfile::tempdir().unwrap();
        let ideas = dir.path().join("message-ideas.md");
        std::fs::write(&ideas, "idé: multipler\n").unwrap();
        let messages = dir.path().join("messages");
        std::fs::create_dir_all(messages.join("diskusjon")).unwrap();
        std::fs::write(messages.join("diskusjon/01.01.25.md"), "gammel melding\n").unwrap();

        let ctx = compose_context(&DraftConfig::default(), &ideas, &messages);
        assert!(ctx.contains("[Message Ideas]"));
        assert!(ctx.contains("idé: multipler"));
        assert!(ctx.contains("[Recent Messages]"));
        assert!(ctx.contains("gammel melding"));
    }

    #[test]
    fn test_compose_context_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let ideas = dir.path().join("message-ideas.md");
        std::fs::write(&ideas, "x".repeat(500)).unwrap();
        let messages = dir.path().join("messages");
        std::fs::create_dir_all(&messages).unwrap();

        let cfg = DraftConfig {
            max_context_chars: 100,
            ..Default::default()
        };
        let ctx = compose_context(&cfg, &ideas, &messages);
        assert!(ctx.ends_with("[Context truncated due to size limit]"));
        assert!(ctx.chars().count() < 200);
    }

    #[test]
    fn test_compose_context_limits_previous_files() {
        let dir = tempfile::tempdir().unwrap();
        let messages = dir.path().join("messages");
        std::fs::create_dir_all(&messages).unwrap();
        for i in 0..4 {
            std::fs::write(messages.join(format!("0{i}.01.25.md")), format!("melding {i}\n"))
                .unwrap();
        }
        let cfg = DraftConfig {
            include_message_ideas: false,
            num_previous_files: 2,
            ..Default::default()
        };
        let ctx = compose_context(&cfg, &dir.path().join("nope.md"), &messages);
        let count = ctx.matches("[Previous:").count();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_user_prompt_sections() {
        let p = build_user_prompt("Tittel", "Mer detaljer", "noe kontekst");
        assert!(p.starts_with("Kontekst"));
        assert!(p.contains("Tema/Tittel: Tittel"));
        assert!(p.contains("Detaljer/Ønsker:\nMer detaljer"));

        let bare = build_user_prompt("", "", "");
        assert!(bare.starts_with("Oppgave:"));
    }

    #[tokio::test]
    async fn test_spinner_joins_cleanly() {
        let spinner = Spinner::start("test".to_string());
        tokio::time::sleep(Duration::from_millis(30)).await;
        spinner.finish().await;
    }
}
