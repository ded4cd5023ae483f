use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{anyhow, bail, Context, Result};
use fxconfig::AppConfig;
use fxrender::{apply_effect, Effect, EffectCatalog, FxError, PipelineManager, ShaderProgram};
use tracing_subscriber::EnvFilter;

use crate::cli::ApplyArgs;
use crate::menu::Prompt;
use crate::{imageio, paths, settings};

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

enum Round {
    Continue,
    Quit,
}

/// The menu-driven loop: pick an image, pick an effect, save, repeat.
pub fn run_interactive(config: &AppConfig) -> Result<()> {
    let mut manager = PipelineManager::new(settings::manager_config(config));
    let mut catalog = settings::catalog(config);
    warn_missing_sources(&manager, &catalog);

    let stdin = io::stdin();
    let mut prompt = Prompt::new(stdin.lock(), io::stdout());
    interactive_loop(&mut prompt, &mut manager, &mut catalog, config)
}

/// Runs rounds until the user quits or input ends.
///
/// A failed round is reported, followed by `failure_pause`, and then the user
/// is asked whether to go on like after a successful one.
fn interactive_loop<R: BufRead, W: Write>(
    prompt: &mut Prompt<R, W>,
    manager: &mut PipelineManager,
    catalog: &mut EffectCatalog<ShaderProgram>,
    config: &AppConfig,
) -> Result<()> {
    writeln!(prompt.output(), "Welcome to shaderfx!")?;
    writeln!(
        prompt.output(),
        "Images are read from {} and written to {}.",
        config.input_dir.display(),
        config.output_dir.display()
    )?;

    loop {
        match interactive_round(prompt, manager, catalog, config) {
            Ok(Round::Quit) => break,
            Ok(Round::Continue) => {}
            Err(err) => {
                eprintln!("error: {err:#}");
                recover(manager, catalog, &err);
                writeln!(
                    prompt.output(),
                    "Returning to the menu in {}...",
                    humantime::format_duration(config.failure_pause)
                )?;
                thread::sleep(config.failure_pause);
            }
        }

        if !prompt.confirm("Process another image?")? {
            break;
        }
    }

    writeln!(prompt.output(), "Goodbye.")?;
    Ok(())
}

fn interactive_round<R: BufRead, W: Write>(
    prompt: &mut Prompt<R, W>,
    manager: &mut PipelineManager,
    catalog: &mut EffectCatalog<ShaderProgram>,
    config: &AppConfig,
) -> Result<Round> {
    let images = paths::list_images(&config.input_dir, config)?;
    if images.is_empty() {
        bail!(
            "no images with extensions [{}] found in {}",
            config.extensions.join(", "),
            config.input_dir.display()
        );
    }

    let image_names: Vec<String> = images.iter().map(|path| paths::display_name(path)).collect();
    let Some(image_index) = prompt.choose("Select an image", &image_names)? else {
        return Ok(Round::Quit);
    };

    let effect_names: Vec<String> = catalog
        .iter()
        .map(|effect| effect.display_name().to_string())
        .collect();
    let Some(effect_index) = prompt.choose("Select an effect", &effect_names)? else {
        return Ok(Round::Quit);
    };

    let effect = catalog
        .get_mut(effect_index)
        .ok_or_else(|| anyhow!("effect #{} does not exist", effect_index + 1))?;
    let saved = apply_to_file(manager, effect, &images[image_index], &config.output_dir)?;
    writeln!(prompt.output(), "Saved {}", saved.display())?;
    Ok(Round::Continue)
}

/// Drops GPU state that cannot be trusted after `err`.
fn recover(manager: &mut PipelineManager, catalog: &mut EffectCatalog<ShaderProgram>, err: &anyhow::Error) {
    match err.downcast_ref::<FxError>() {
        Some(fx) if fx.is_fatal() => {
            tracing::warn!("resetting GPU device after fatal error");
            manager.shutdown();
            catalog.discard_programs();
        }
        Some(FxError::InvalidProgram(_)) => catalog.discard_programs(),
        _ => {}
    }
}

/// Loads `input`, runs `effect` over it, and saves `<stem>_<suffix><ext>`.
pub fn apply_to_file(
    manager: &mut PipelineManager,
    effect: &mut Effect<ShaderProgram>,
    input: &Path,
    output_dir: &Path,
) -> Result<PathBuf> {
    let mut image = imageio::load(input)?;
    let name = effect.display_name().to_string();
    tracing::info!(effect = %name, image = %input.display(), "applying effect");

    apply_effect(effect, manager, &mut image.pixels, image.dimensions)
        .with_context(|| format!("failed to apply {name} to {}", input.display()))?;

    fs::create_dir_all(output_dir).with_context(|| {
        format!("failed to create output directory {}", output_dir.display())
    })?;
    let output = paths::output_path(output_dir, input, effect.suffix());
    imageio::save(&output, image)?;
    tracing::info!(output = %output.display(), "saved processed image");
    Ok(output)
}

pub fn run_apply(config: &AppConfig, args: ApplyArgs) -> Result<()> {
    let mut catalog = settings::catalog(config);
    let index = catalog.find(&args.effect).ok_or_else(|| {
        let known: Vec<&str> = catalog.iter().map(|effect| effect.suffix()).collect();
        anyhow!(
            "unknown effect '{}'; available: {}",
            args.effect,
            known.join(", ")
        )
    })?;
    let effect = catalog
        .get_mut(index)
        .ok_or_else(|| anyhow!("effect '{}' disappeared from the catalog", args.effect))?;

    let mut manager = PipelineManager::new(settings::manager_config(config));
    let output = apply_to_file(&mut manager, effect, &args.image, &config.output_dir)?;
    println!("{}", output.display());
    Ok(())
}

pub fn run_effects(config: &AppConfig) -> Result<()> {
    let catalog = settings::catalog(config);
    let manager = PipelineManager::new(settings::manager_config(config));
    println!(
        "Effects (shaders from {}):",
        manager.store().root().display()
    );
    for (index, effect) in catalog.iter().enumerate() {
        let identity = effect.identity();
        let missing = manager.store().missing_sources([&identity]);
        println!(
            "  {:>2}) {:<18} suffix={:<10} vertex={} pixel={}{}",
            index + 1,
            effect.display_name(),
            effect.suffix(),
            identity.vertex.display(),
            identity.pixel.display(),
            if missing.is_empty() { "" } else { "  [missing shader]" }
        );
    }
    Ok(())
}

pub fn run_probe(config: &AppConfig) -> Result<()> {
    let mut manager = PipelineManager::new(settings::manager_config(config));
    manager.initialize().context("GPU initialization failed")?;
    let profile = manager
        .adapter_profile()
        .ok_or_else(|| anyhow!("GPU reported ready without an adapter"))?;
    println!("Adapter:      {}", profile.name);
    println!("Backend:      {:?}", profile.backend);
    println!("Device type:  {:?}", profile.device_type);
    println!("Driver:       {}", profile.driver);
    println!("Max texture:  {} px", profile.max_texture_dimension);
    Ok(())
}

fn warn_missing_sources(manager: &PipelineManager, catalog: &EffectCatalog<ShaderProgram>) {
    let identities = catalog.identities();
    for path in manager.store().missing_sources(&identities) {
        tracing::warn!(path = %path.display(), "shader file referenced by the catalog is missing");
    }
}
