use std::fmt;
use std::path::Path;
use std::time::Duration;

use dotmatrix::effect::{
    ContainerStyle, RevealEffect, DEFAULT_ANIMATION_SPEED, DEFAULT_COLORS,
    DEFAULT_EFFECT_DOT_SIZE,
};
use dotmatrix::{RevealExpression, Rgb, DEFAULT_OPACITIES};
use renderer::RenderPolicy;
use serde::de::{self, Deserializer};
use serde::Deserialize;

/// File name looked up inside a config directory.
pub const CONFIG_FILE_NAME: &str = "effect.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EffectConfig {
    #[serde(default)]
    pub effect: EffectSection,
    #[serde(default)]
    pub container: ContainerSection,
    #[serde(default)]
    pub surface: SurfaceSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EffectSection {
    #[serde(default = "default_animation_speed")]
    pub animation_speed: f32,
    #[serde(default)]
    pub opacities: Option<Vec<f32>>,
    #[serde(default, deserialize_with = "deserialize_colors_opt")]
    pub colors: Option<Vec<Rgb>>,
    #[serde(default = "default_dot_size")]
    pub dot_size: f32,
    #[serde(default = "default_true")]
    pub show_gradient: bool,
    /// GLSL statements replacing the intro reveal.
    #[serde(default)]
    pub reveal: Option<String>,
}

impl Default for EffectSection {
    fn default() -> Self {
        Self {
            animation_speed: default_animation_speed(),
            opacities: None,
            colors: None,
            dot_size: default_dot_size(),
            show_gradient: true,
            reveal: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContainerSection {
    #[serde(default = "default_background", deserialize_with = "deserialize_color")]
    pub background: Rgb,
    #[serde(default = "default_title")]
    pub title: String,
}

impl Default for ContainerSection {
    fn default() -> Self {
        Self {
            background: default_background(),
            title: default_title(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SurfaceSection {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default)]
    pub max_fps: Option<f32>,
    /// Freezes `u_time` at this offset instead of animating.
    #[serde(default, deserialize_with = "deserialize_duration_opt")]
    pub still_time: Option<Duration>,
}

impl Default for SurfaceSection {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            max_fps: None,
            still_time: None,
        }
    }
}

fn default_animation_speed() -> f32 {
    DEFAULT_ANIMATION_SPEED
}

fn default_dot_size() -> f32 {
    DEFAULT_EFFECT_DOT_SIZE
}

fn default_true() -> bool {
    true
}

fn default_background() -> Rgb {
    ContainerStyle::default().background
}

fn default_title() -> String {
    ContainerStyle::default().title
}

fn default_width() -> u32 {
    1280
}

fn default_height() -> u32 {
    720
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColorHelper {
    Hex(String),
    Channels([i64; 3]),
}

fn parse_color(helper: ColorHelper) -> Result<Rgb, String> {
    match helper {
        ColorHelper::Channels(channels) => {
            let mut rgb = [0u8; 3];
            for (slot, value) in rgb.iter_mut().zip(channels) {
                *slot = u8::try_from(value)
                    .map_err(|_| format!("colour channel {value} is outside 0-255"))?;
            }
            Ok(Rgb(rgb))
        }
        ColorHelper::Hex(raw) => parse_hex(&raw),
    }
}

fn parse_hex(raw: &str) -> Result<Rgb, String> {
    let digits = raw.trim().trim_start_matches('#');
    if digits.len() != 6 || !digits.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return Err(format!(
            "invalid colour '{raw}'; expected '#rrggbb' or [r, g, b]"
        ));
    }
    let channel = |index: usize| {
        u8::from_str_radix(&digits[index..index + 2], 16)
            .map_err(|err| format!("invalid colour '{raw}': {err}"))
    };
    Ok(Rgb([channel(0)?, channel(2)?, channel(4)?]))
}

fn deserialize_color<'de, D>(deserializer: D) -> Result<Rgb, D::Error>
where
    D: Deserializer<'de>,
{
    let helper = ColorHelper::deserialize(deserializer)?;
    parse_color(helper).map_err(de::Error::custom)
}

fn deserialize_colors_opt<'de, D>(deserializer: D) -> Result<Option<Vec<Rgb>>, D::Error>
where
    D: Deserializer<'de>,
{
    let helpers: Option<Vec<ColorHelper>> = Option::deserialize(deserializer)?;
    helpers
        .map(|list| {
            list.into_iter()
                .map(|helper| parse_color(helper).map_err(de::Error::custom))
                .collect()
        })
        .transpose()
}

fn deserialize_duration_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Option<Duration>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map(Some)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs(v as u64)))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Duration::from_secs(v)))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if !v.is_finite() || v.is_sign_negative() {
                return Err(E::custom("duration must be a finite non-negative number"));
            }
            Ok(Some(Duration::from_secs_f64(v)))
        }
    }

    deserializer.deserialize_any(Visitor)
}

impl EffectConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: EffectConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&input)?;
        tracing::debug!(path = %path.display(), "loaded effect configuration");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let effect = &self.effect;
        if !effect.animation_speed.is_finite() {
            return Err(ConfigError::Invalid(
                "effect.animation_speed must be a finite number".into(),
            ));
        }

        if !effect.dot_size.is_finite() || effect.dot_size <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "effect.dot_size must be > 0, got {}",
                effect.dot_size
            )));
        }

        if let Some(opacities) = &effect.opacities {
            if let Some(bad) = opacities.iter().find(|value| !value.is_finite()) {
                return Err(ConfigError::Invalid(format!(
                    "effect.opacities contains non-finite value {bad}"
                )));
            }
        }

        if let Some(reveal) = &effect.reveal {
            RevealExpression::custom(reveal)
                .map_err(|err| ConfigError::Invalid(format!("effect.reveal: {err}")))?;
        }

        let surface = &self.surface;
        if surface.width == 0 || surface.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "surface size must be non-zero, got {}x{}",
                surface.width, surface.height
            )));
        }

        if let Some(fps) = surface.max_fps {
            if !fps.is_finite() || fps <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "surface.max_fps must be > 0, got {fps}"
                )));
            }
        }

        Ok(())
    }

    /// Builds the effect described by the `[effect]` and `[container]`
    /// tables.
    pub fn to_effect(&self) -> Result<RevealEffect, ConfigError> {
        let section = &self.effect;
        let opacities = section.opacities.as_deref().unwrap_or(&DEFAULT_OPACITIES);
        let colors = section.colors.as_deref().unwrap_or(&DEFAULT_COLORS);

        let mut effect = RevealEffect::new()
            .with_animation_speed(section.animation_speed)
            .with_opacities(opacities)
            .with_colors(colors)
            .with_dot_size(section.dot_size)
            .with_gradient(section.show_gradient)
            .with_container(ContainerStyle {
                background: self.container.background,
                title: self.container.title.clone(),
            });

        if let Some(reveal) = &section.reveal {
            let expression = RevealExpression::custom(reveal)
                .map_err(|err| ConfigError::Invalid(format!("effect.reveal: {err}")))?;
            effect = effect.with_reveal(expression);
        }

        Ok(effect)
    }

    pub fn surface_size(&self) -> (u32, u32) {
        (self.surface.width, self.surface.height)
    }

    pub fn policy(&self) -> RenderPolicy {
        match self.surface.still_time {
            Some(time) => RenderPolicy::Still {
                time: time.as_secs_f32(),
            },
            None => RenderPolicy::Animate {
                max_fps: self.surface.max_fps,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dotmatrix::Palette;

    const SAMPLE: &str = r##"
[effect]
animation_speed = 0.5
opacities = [0.2, 0.4]
colors = [[255, 0, 0], "#00ff00", "0000FF"]
dot_size = 3
show_gradient = false

[container]
background = "#030712"
title = "reveal"

[surface]
width = 800
height = 600
max_fps = 30
"##;

    #[test]
    fn parses_sample_config() {
        let config = EffectConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.surface_size(), (800, 600));
        assert_eq!(
            config.policy(),
            RenderPolicy::Animate {
                max_fps: Some(30.0)
            }
        );

        let effect = config.to_effect().unwrap();
        assert_eq!(effect.animation_speed, 0.5);
        assert_eq!(effect.dot_size, 3.0);
        assert!(!effect.show_gradient);
        assert_eq!(
            effect.palette,
            Palette::Three(
                Rgb::new(255, 0, 0),
                Rgb::new(0, 255, 0),
                Rgb::new(0, 0, 255)
            )
        );
        assert_eq!(effect.opacities.values()[9], 0.4);
        assert_eq!(effect.container.background, Rgb::new(3, 7, 18));
        assert_eq!(effect.container.title, "reveal");
    }

    #[test]
    fn empty_config_uses_effect_defaults() {
        let config = EffectConfig::from_toml_str("").unwrap();
        assert_eq!(config.to_effect().unwrap(), RevealEffect::new());
        assert_eq!(config.surface_size(), (1280, 720));
        assert_eq!(config.policy(), RenderPolicy::Animate { max_fps: None });
    }

    #[test]
    fn still_time_accepts_human_durations() {
        let config = EffectConfig::from_toml_str("[surface]\nstill_time = \"2500ms\"\n").unwrap();
        assert_eq!(config.policy(), RenderPolicy::Still { time: 2.5 });

        let config = EffectConfig::from_toml_str("[surface]\nstill_time = 3\n").unwrap();
        assert_eq!(config.policy(), RenderPolicy::Still { time: 3.0 });
    }

    #[test]
    fn rejects_non_positive_fps() {
        let err = EffectConfig::from_toml_str("[surface]\nmax_fps = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_zero_surface() {
        let err = EffectConfig::from_toml_str("[surface]\nwidth = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_bad_colours() {
        let err = EffectConfig::from_toml_str("[effect]\ncolors = [[256, 0, 0]]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        let err = EffectConfig::from_toml_str("[container]\nbackground = \"#12345\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn validates_custom_reveal() {
        let config = EffectConfig::from_toml_str(
            "[effect]\nreveal = \"opacity *= step(1.0, u_time);\"\n",
        )
        .unwrap();
        assert!(matches!(
            config.to_effect().unwrap().reveal_expression(),
            RevealExpression::Custom(_)
        ));

        let err = EffectConfig::from_toml_str("[effect]\nreveal = \"discard;\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(message) if message.contains("discard")));
    }

    #[test]
    fn rejects_unknown_tables() {
        let err = EffectConfig::from_toml_str("[effects]\ndot_size = 2\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, SAMPLE).unwrap();
        let config = EffectConfig::load_from_path(&path).unwrap();
        assert_eq!(config.container.title, "reveal");

        let err = EffectConfig::load_from_path(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
