//! Doctor command - verify system requirements and configuration.

use crate::cli::Output;
use crate::config::{Settings, SpeechProvider};
use crate::transcription::KNOWN_MODEL_SIZES;
use console::style;
use std::process::Command;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

fn print_section(title: &str, checks: &[CheckResult]) {
    println!("{}", style(title).bold());
    for check in checks {
        check.print();
    }
    println!();
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("vidlore doctor");
    println!();
    println!("Checking system requirements and configuration...\n");

    let mut tools = vec![
        check_tool("ffmpeg", &["-version"], install_hint_ffmpeg()),
        check_tool("ffprobe", &["-version"], install_hint_ffmpeg()),
    ];
    if settings.transcription.provider == SpeechProvider::Local {
        tools.push(check_tool(
            &settings.transcription.whisper_command,
            &["--help"],
            "Install with: pip install openai-whisper",
        ));
    }

    let speech = vec![
        check_model_size(settings),
        check_openai_api_key(settings.transcription.provider),
    ];
    let captioning = vec![check_caption_key(settings)];
    let directories = check_directories(settings);
    let config = vec![check_config_file()];

    print_section("External Tools", &tools);
    print_section("Speech Model", &speech);
    print_section("Frame Captioning", &captioning);
    print_section("Directories", &directories);
    print_section("Configuration", &config);

    let all: Vec<&CheckResult> = tools
        .iter()
        .chain(&speech)
        .chain(&captioning)
        .chain(&directories)
        .chain(&config)
        .collect();
    let errors = all.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = all.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using vidlore.",
            errors
        ));
        anyhow::bail!("{} doctor check(s) failed", errors);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! vidlore is ready to use.");
    }

    Ok(())
}

/// Check if an external tool is available.
fn check_tool(name: &str, args: &[&str], hint: &str) -> CheckResult {
    match Command::new(name).args(args).output() {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .unwrap_or("installed")
                .trim()
                .to_string();
            CheckResult::ok(name, &truncate(&version, 50))
        }
        Ok(_) => CheckResult::error(name, "installed but not working", hint),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            CheckResult::error(name, "not found", hint)
        }
        Err(e) => CheckResult::error(name, &format!("error: {}", e), hint),
    }
}

fn check_model_size(settings: &Settings) -> CheckResult {
    let size = &settings.transcription.speech_model_size;
    match settings.transcription.provider {
        SpeechProvider::OpenAI => CheckResult::ok(
            "Model",
            &format!("hosted {}", settings.transcription.hosted_model),
        ),
        SpeechProvider::Local if KNOWN_MODEL_SIZES.contains(&size.as_str()) => {
            CheckResult::ok("Model", &format!("local whisper {}", size))
        }
        SpeechProvider::Local => CheckResult::error(
            "Model",
            &format!("unknown model size '{}'", size),
            &format!("Use one of: {}", KNOWN_MODEL_SIZES.join(", ")),
        ),
    }
}

fn check_openai_api_key(provider: SpeechProvider) -> CheckResult {
    let key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
    match (provider, key.trim().is_empty()) {
        (_, false) => CheckResult::ok("OPENAI_API_KEY", &format!("configured ({})", mask(&key))),
        (SpeechProvider::OpenAI, true) => CheckResult::error(
            "OPENAI_API_KEY",
            "not set",
            "Set with: export OPENAI_API_KEY='sk-...'",
        ),
        (SpeechProvider::Local, true) => {
            CheckResult::ok("OPENAI_API_KEY", "not needed for the local provider")
        }
    }
}

fn check_caption_key(settings: &Settings) -> CheckResult {
    let captioning = &settings.captioning;
    if !captioning.enabled {
        return CheckResult::ok("Captioning", "disabled in config");
    }
    match captioning.api_key() {
        Some(key) => CheckResult::ok(
            &captioning.api_key_env,
            &format!("configured ({}) for {}", mask(&key), captioning.model),
        ),
        None => CheckResult::warning(
            &captioning.api_key_env,
            "not set; frames will be ingested without captions",
            &format!("Set with: export {}='...'", captioning.api_key_env),
        ),
    }
}

fn check_directories(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let temp_dir = settings.temp_dir();
    if temp_dir.exists() {
        results.push(CheckResult::ok("Temp directory", &temp_dir.display().to_string()));
    } else {
        results.push(CheckResult::warning(
            "Temp directory",
            &format!("{} (will be created)", temp_dir.display()),
            "Directory will be created on first use",
        ));
    }

    if let Some(model_dir) = settings.model_dir() {
        let weights = model_dir.join(format!("{}.pt", settings.transcription.speech_model_size));
        if weights.exists() {
            results.push(CheckResult::ok("Model weights", &weights.display().to_string()));
        } else if settings.transcription.offline {
            results.push(CheckResult::error(
                "Model weights",
                &format!("{} missing", weights.display()),
                "Download the weights once with network access, or disable offline mode",
            ));
        } else {
            results.push(CheckResult::warning(
                "Model weights",
                &format!("{} (will be downloaded)", weights.display()),
                "Weights are fetched on first load",
            ));
        }
    }

    results
}

fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &config_path.display().to_string())
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: vidlore config edit",
        )
    }
}

fn mask(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Platform-specific install hint for ffmpeg.
fn install_hint_ffmpeg() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install ffmpeg"
    } else if cfg!(target_os = "linux") {
        "Install with: sudo apt install ffmpeg (or your package manager)"
    } else {
        "Install from: https://ffmpeg.org/download.html"
    }
}
