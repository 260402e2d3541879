use anyhow::{Context, Result};
use dotmatrix::RevealEffect;
use effectconfig::EffectConfig;
use renderer::{RenderPolicy, Renderer};
use tracing_subscriber::EnvFilter;

use crate::cli::{EffectArgs, RunArgs};
use crate::paths::resolve_config_file;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Configuration plus the effect it describes, with command-line overrides
/// applied on top.
pub struct ResolvedEffect {
    pub config: EffectConfig,
    pub effect: RevealEffect,
}

pub fn resolve_effect(args: &EffectArgs) -> Result<ResolvedEffect> {
    let config = match resolve_config_file(args.config.as_deref())? {
        Some(path) => {
            let config = EffectConfig::load_from_path(&path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!(path = %path.display(), "using effect configuration");
            config
        }
        None => EffectConfig::default(),
    };

    let mut effect = config
        .to_effect()
        .context("failed to build effect from configuration")?;
    if let Some(speed) = args.speed {
        effect = effect.with_animation_speed(speed);
    }
    if let Some(dot_size) = args.dot_size {
        effect = effect.with_dot_size(dot_size);
    }
    if args.no_gradient {
        effect = effect.with_gradient(false);
    }

    tracing::debug!(
        animation_speed = effect.animation_speed,
        dot_size = effect.dot_size,
        show_gradient = effect.show_gradient,
        "resolved reveal effect"
    );
    Ok(ResolvedEffect { config, effect })
}

pub fn run(args: RunArgs) -> Result<()> {
    let ResolvedEffect { config, effect } = resolve_effect(&args.effect)?;
    let surface_size = args.size.unwrap_or_else(|| config.surface_size());
    let policy = match (args.still_time, args.fps) {
        (Some(time), _) => RenderPolicy::Still { time },
        (None, Some(fps)) => RenderPolicy::Animate { max_fps: Some(fps) },
        (None, None) => config.policy(),
    };

    let scene = effect
        .compose()
        .context("failed to generate reveal effect shaders")?;
    tracing::info!(
        width = surface_size.0,
        height = surface_size.1,
        layers = scene.layers.len(),
        "launching dotreveal window"
    );
    let mut renderer = Renderer::new(scene.into_renderer_config(surface_size, policy));
    renderer.run()
}
