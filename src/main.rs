use std::{
    error::Error,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::anyhow;
use clap::Parser;
use llm::{
    im_channel,
    narrator::Narrator,
    ollama::{OllamaClient, DEFAULT_OLLAMA_BASE_URL, DEFAULT_OLLAMA_MODEL, DEFAULT_TIMEOUT_SECS},
};
use prompt::{PromptComposer, DEFAULT_OPENING_PROMPT};
use session::GameMaster;
use sys::{llm::Generator, CharacterProfile};

mod component;
mod debug_tool;
mod llm;
mod prompt;
mod session;
mod sys;

#[derive(Debug, clap::Parser)]
struct Args {
    #[arg(long, short, required = true)]
    project_path: String,

    #[arg(long)]
    model: Option<String>,

    #[arg(long)]
    base_url: Option<String>,

    /// line console instead of the full screen chat
    #[arg(long)]
    plain: bool,

    /// offline backend that answers with a hash of the prompt
    #[arg(long)]
    echo_backend: bool,

    #[arg(long)]
    debug_llm: bool,
}

#[derive(Debug, Clone, serde::Deserialize)]
struct Project {
    character: PathBuf,
    #[serde(default)]
    model: String,
    #[serde(default)]
    base_url: String,
    prompt_template: Option<PathBuf>,
    #[serde(default)]
    run: RunOptions,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct RunOptions {
    #[serde(default)]
    timeout_secs: u64,
    #[serde(default)]
    opening_prompt: String,
}

impl RunOptions {
    fn fill_default_value(&mut self) {
        if self.timeout_secs == 0 {
            self.timeout_secs = DEFAULT_TIMEOUT_SECS;
        }
        if self.opening_prompt.is_empty() {
            self.opening_prompt = DEFAULT_OPENING_PROMPT.to_string();
        }
    }
}

impl Project {
    fn parse(data: &str, base_dir: &Path) -> anyhow::Result<Self> {
        let mut project: Project = toml::from_str(data)?;
        project.fill_default_value();

        project.character = base_dir.join(&project.character);
        project.prompt_template = project.prompt_template.map(|p| base_dir.join(p));
        Ok(project)
    }

    fn load(project_path: &str) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(project_path)
            .map_err(|_| anyhow!("project file `{}` not found", project_path))?;
        let base_dir = Path::new(project_path)
            .parent()
            .unwrap_or_else(|| Path::new("."));
        Self::parse(&data, base_dir)
    }

    fn fill_default_value(&mut self) {
        if self.model.is_empty() {
            self.model = DEFAULT_OLLAMA_MODEL.to_string();
        }
        if self.base_url.is_empty() {
            self.base_url = DEFAULT_OLLAMA_BASE_URL.to_string();
        }
        self.run.fill_default_value();
    }

    fn composer(&self) -> anyhow::Result<PromptComposer> {
        let composer = match &self.prompt_template {
            Some(path) => {
                let source = std::fs::read_to_string(path)
                    .map_err(|_| anyhow!("prompt template `{}` not found", path.display()))?;
                PromptComposer::with_template(&source)
            }
            None => PromptComposer::builtin(),
        }
        .map_err(|e| anyhow!("prompt template err:{e}"))?;

        Ok(composer.with_opening_prompt(self.run.opening_prompt.clone()))
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Args::parse();
    let mut project = Project::load(&cli.project_path)?;
    if let Some(model) = cli.model {
        project.model = model;
    }
    if let Some(base_url) = cli.base_url {
        project.base_url = base_url;
    }

    let profile = CharacterProfile::load(&project.character)
        .map_err(|e| anyhow!("configuration error: {e}"))?;
    let profile = Arc::new(profile);

    let generator: Box<dyn Generator + Send> = if cli.echo_backend {
        log::warn!("using the offline echo backend");
        Box::new(debug_tool::EchoGenerator)
    } else {
        Box::new(OllamaClient::new(
            &project.base_url,
            &project.model,
            Duration::from_secs(project.run.timeout_secs),
        ))
    };

    let master = GameMaster::new(project.composer()?, generator).with_debug_llm(cli.debug_llm);

    log::info!(
        "writing the opening for {} with {} at {}",
        profile.name,
        project.model,
        project.base_url
    );
    let session = master.create_session(profile.clone())?;

    let (ui, worker) = im_channel::channel();
    let _narrator = Narrator::new(master, session, worker).spawn();

    let res = if cli.plain {
        debug_tool::TerminalApp {
            character: profile.name.clone(),
            tx: ui.tx,
            rx: ui.rx,
        }
        .run_loop()
    } else {
        component::App::new(&profile.name, ui).run_loop()
    };

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}
