use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use dotmatrix::EffectSampler;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage};
use renderer::Viewport;

use crate::cli::ExportArgs;
use crate::run::{resolve_effect, ResolvedEffect};

pub fn export(args: ExportArgs) -> Result<()> {
    let ResolvedEffect { config, effect } = resolve_effect(&args.effect)?;
    let (width, height) = args.size.unwrap_or_else(|| config.surface_size());
    let viewport = Viewport::new(width as f32, height as f32);

    let sampler = EffectSampler::new(&effect, viewport)
        .context("effect cannot be rendered on the CPU")?;
    let (width, height, pixels) = sampler.render_rgb(args.time);
    let image = RgbImage::from_raw(width, height, pixels)
        .ok_or_else(|| anyhow!("sampled buffer does not match {width}x{height}"))?;

    write_png(&args.output, &image)?;
    tracing::info!(
        path = %args.output.display(),
        width,
        height,
        time = args.time,
        "exported still frame"
    );
    Ok(())
}

fn write_png(path: &Path, image: &RgbImage) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    PngEncoder::new(&mut writer)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgb8,
        )
        .with_context(|| format!("failed to encode {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
