//! Interactive setup (`fpl-assistant setup`) and first-run profile prompts

use std::path::{Path, PathBuf};

use dialoguer::{Confirm, Input, Password, Select};

use crate::config::file::{config_file_path, load_config_file, save_config_file};
use crate::config::{UserProfile, mask_key};
use crate::llm::ProviderKind;

/// Run the interactive setup wizard
///
/// # Errors
///
/// Returns error if user input fails or config cannot be written
pub fn run_setup() -> anyhow::Result<()> {
    println!("FPL Assistant Setup\n");

    let mut config = load_config_file();
    let config_path = config_file_path()
        .unwrap_or_else(|| PathBuf::from("~/.config/fpl-assistant/config.toml"));

    if config_path.exists() {
        println!("Existing config found at {}\n", config_path.display());
    }

    // 1. Preferred provider
    let providers = [ProviderKind::OpenAi, ProviderKind::Gemini];
    let labels: Vec<&str> = providers.iter().map(|p| p.label()).collect();
    let default_provider = config
        .llm
        .provider
        .as_deref()
        .and_then(ProviderKind::parse)
        .and_then(|p| providers.iter().position(|&k| k == p))
        .unwrap_or(0);

    let provider_idx = Select::new()
        .with_prompt("Preferred AI provider")
        .items(&labels)
        .default(default_provider)
        .interact()?;
    let provider = providers[provider_idx];
    config.llm.provider = Some(provider.as_str().to_string());

    // 2. API keys, the other provider's key enables fallback
    config.api_keys.openai = prompt_key(ProviderKind::OpenAi, config.api_keys.openai.take())?;
    config.api_keys.gemini = prompt_key(ProviderKind::Gemini, config.api_keys.gemini.take())?;

    // 3. Data source
    let sources = ["mirror", "official"];
    let default_source = config
        .fpl
        .source
        .as_deref()
        .and_then(|s| sources.iter().position(|&l| l.eq_ignore_ascii_case(s)))
        .unwrap_or(0);
    let source_idx = Select::new()
        .with_prompt("FPL data source")
        .items(&["GitHub mirror (recommended)", "Official FPL API"])
        .default(default_source)
        .interact()?;
    config.fpl.source = Some(sources[source_idx].to_string());

    // 4. Optional entry id
    let user_id: String = Input::new()
        .with_prompt("FPL user ID for squad lookups (blank to skip)")
        .with_initial_text(config.fpl.user_id.clone().unwrap_or_default())
        .allow_empty(true)
        .interact_text()?;
    config.fpl.user_id = Some(user_id.trim().to_string()).filter(|s| !s.is_empty());

    // 5. Router
    let use_router = Confirm::new()
        .with_prompt("Let the model decide when FPL data is needed?")
        .default(config.fpl.fetch_policy.as_deref() == Some("router"))
        .interact()?;
    config.fpl.fetch_policy = Some(if use_router { "router" } else { "always" }.to_string());

    save_config_file(&config_path, &config)?;
    println!("\nConfig written to {}", config_path.display());
    println!("\nSetup complete! Run `fpl-assistant serve -v` or `fpl-assistant chat`.");

    Ok(())
}

/// Ask for a provider key, keeping the current one on blank input
fn prompt_key(kind: ProviderKind, existing: Option<String>) -> anyhow::Result<Option<String>> {
    let prompt = match existing.as_deref() {
        Some(key) => format!("{} API key (current: {}, leave blank to keep)", kind.label(), mask_key(key)),
        None => format!("{} API key ({}, leave blank to skip)", kind.label(), kind.env_var()),
    };

    let input = Password::new()
        .with_prompt(prompt)
        .allow_empty_password(true)
        .interact()?;

    Ok(merge_input(&input, existing))
}

/// Trimmed input, or the previous value when input is blank
fn merge_input(input: &str, existing: Option<String>) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        existing
    } else {
        Some(trimmed.to_string())
    }
}

/// Load the terminal-chat profile, prompting for anything missing
///
/// The profile is saved again only if a prompt changed it.
///
/// # Errors
///
/// Returns error if user input fails or the profile cannot be written
pub fn ensure_profile(path: &Path, need_api_key: bool) -> anyhow::Result<UserProfile> {
    let mut profile = UserProfile::load(path);
    if profile.is_complete() {
        return Ok(profile);
    }
    let mut changed = false;

    if profile.user_id.is_none() {
        println!("Your FPL user ID is the number in the URL of your team's \"Points\" page.");
        let id: String = Input::new()
            .with_prompt("FPL user ID (blank to skip)")
            .allow_empty(true)
            .interact_text()?;
        if let Some(id) = merge_input(&id, None) {
            profile.user_id = Some(id);
            changed = true;
        }
    }

    if need_api_key && profile.api_key.is_none() {
        println!("Get a free Gemini key from Google AI Studio: https://aistudio.google.com/app/apikey");
        let key = Password::new()
            .with_prompt("Gemini API key")
            .allow_empty_password(true)
            .interact()?;
        if let Some(key) = merge_input(&key, None) {
            profile.api_key = Some(key);
            changed = true;
        }
    }

    if changed {
        profile.save(path)?;
        println!("Saved profile to {}\n", path.display());
    }

    Ok(profile)
}
