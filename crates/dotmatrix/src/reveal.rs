//! Time-dependent expressions controlling when each cell becomes visible.

use std::collections::BTreeSet;

use crate::template::{is_identifier, TemplateError};

/// Offset added to a cell's intro time before the overshoot settles.
pub const INTRO_SETTLE: f32 = 0.1;
/// Weight of the distance from the viewport centre in a cell's intro time.
pub const INTRO_DISTANCE_WEIGHT: f32 = 0.01;
/// Weight of the per-cell random jitter in a cell's intro time.
pub const INTRO_JITTER_WEIGHT: f32 = 0.15;

/// GLSL statements injected after the pattern computes `opacity` and
/// `color` for a pixel.
#[derive(Debug, Clone, PartialEq)]
pub enum RevealExpression {
    /// Every cell is visible from the first frame.
    None,
    /// Cells switch on in order of distance from the centre, jittered per
    /// cell, and stay on.
    Intro { animation_speed: f32 },
    /// Caller-supplied statements that passed [`RevealExpression::custom`].
    Custom(String),
}

impl RevealExpression {
    pub fn intro(animation_speed: f32) -> Self {
        RevealExpression::Intro { animation_speed }
    }

    /// Accepts caller-supplied statements after checking them against the
    /// identifier and character whitelist.
    pub fn custom(source: &str) -> Result<Self, TemplateError> {
        validate(source)?;
        Ok(RevealExpression::Custom(source.trim().to_string()))
    }

    /// GLSL statements for the `reveal` slot.
    pub fn glsl(&self) -> String {
        match self {
            RevealExpression::None => String::new(),
            RevealExpression::Intro { animation_speed } => format!(
                "    float animation_speed_factor = {speed};\n\
                 \x20   float intro_offset = distance(u_resolution / 2.0 / u_total_size, st2) * {distance} + (random(st2) * {jitter});\n\
                 \x20   opacity *= step(intro_offset, u_time * animation_speed_factor);\n\
                 \x20   opacity *= clamp((1.0 - step(intro_offset + {settle}, u_time * animation_speed_factor)) * 1.25, 1.0, 1.25);\n",
                speed = glsl_float(*animation_speed),
                distance = glsl_float(INTRO_DISTANCE_WEIGHT),
                jitter = glsl_float(INTRO_JITTER_WEIGHT),
                settle = glsl_float(INTRO_SETTLE),
            ),
            RevealExpression::Custom(source) => {
                let mut indented = String::with_capacity(source.len() + 16);
                for line in source.lines() {
                    indented.push_str("    ");
                    indented.push_str(line.trim());
                    indented.push('\n');
                }
                indented
            }
        }
    }
}

impl Default for RevealExpression {
    fn default() -> Self {
        RevealExpression::None
    }
}

/// Formats a float as a GLSL literal; non-finite values become `0.0`.
pub fn glsl_float(value: f32) -> String {
    if !value.is_finite() {
        return "0.0".to_string();
    }
    let text = format!("{value:?}");
    if text.contains(['.', 'e', 'E']) {
        text
    } else {
        format!("{text}.0")
    }
}

const ALLOWED_PUNCTUATION: &str = "+-*/=<>!&|?:;,.()[]";

const ALLOWED_IDENTIFIERS: &[&str] = &[
    // types and keywords
    "float", "int", "bool", "vec2", "vec3", "vec4", "const", "true", "false", "if", "else",
    // builtins
    "abs", "sign", "floor", "ceil", "fract", "mod", "min", "max", "clamp", "mix", "step",
    "smoothstep", "length", "distance", "dot", "sin", "cos", "tan", "pow", "exp", "log", "sqrt",
    // values the pattern exposes
    "opacity", "color", "st", "st2", "show_offset", "rand", "frequency", "fragCoord", "random",
    "u_time", "u_resolution", "u_total_size", "u_dot_size", "u_opacities", "u_colors",
];

const DECLARING_TYPES: &[&str] = &["float", "int", "bool", "vec2", "vec3", "vec4"];

fn is_swizzle(name: &str) -> bool {
    (1..=4).contains(&name.len())
        && (name.chars().all(|ch| "xyzw".contains(ch)) || name.chars().all(|ch| "rgba".contains(ch)))
}

/// Walks the source token by token. Identifiers must be whitelisted, a
/// swizzle after `.`, or a local declared earlier with a scalar/vector type.
fn validate(source: &str) -> Result<(), TemplateError> {
    let mut declared: BTreeSet<String> = BTreeSet::new();
    let mut previous_ident: Option<String> = None;
    let mut after_dot = false;
    let mut chars = source.char_indices().peekable();

    while let Some((start, ch)) = chars.next() {
        if ch.is_whitespace() {
            continue;
        }

        if ch.is_ascii_alphabetic() || ch == '_' {
            let mut end = start + ch.len_utf8();
            while let Some(&(index, next)) = chars.peek() {
                if next.is_ascii_alphanumeric() || next == '_' {
                    end = index + next.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            let ident = &source[start..end];
            debug_assert!(is_identifier(ident));
            let declares = previous_ident
                .as_deref()
                .is_some_and(|prev| DECLARING_TYPES.contains(&prev));
            let known = ALLOWED_IDENTIFIERS.contains(&ident)
                || declared.contains(ident)
                || (after_dot && is_swizzle(ident));
            if declares {
                declared.insert(ident.to_string());
            } else if !known {
                return Err(TemplateError::UnknownIdentifier(ident.to_string()));
            }
            previous_ident = Some(ident.to_string());
            after_dot = false;
            continue;
        }

        if ch.is_ascii_digit() || (ch == '.' && chars.peek().is_some_and(|(_, n)| n.is_ascii_digit()))
        {
            let mut end = start + 1;
            let mut last = ch;
            while let Some(&(index, next)) = chars.peek() {
                let exponent_sign = (next == '+' || next == '-') && (last == 'e' || last == 'E');
                if next.is_ascii_alphanumeric() || next == '.' || exponent_sign {
                    end = index + 1;
                    last = next;
                    chars.next();
                } else {
                    break;
                }
            }
            let literal = &source[start..end];
            let digits = literal.trim_end_matches(['f', 'F']);
            if digits.parse::<f64>().is_err() {
                return Err(TemplateError::MalformedNumber(literal.to_string()));
            }
            previous_ident = None;
            after_dot = false;
            continue;
        }

        if ALLOWED_PUNCTUATION.contains(ch) {
            after_dot = ch == '.';
            previous_ident = None;
            if ch == '/' && chars.peek().is_some_and(|(_, next)| *next == '/' || *next == '*') {
                return Err(TemplateError::DisallowedCharacter(ch));
            }
            continue;
        }

        return Err(TemplateError::DisallowedCharacter(ch));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intro_embeds_the_animation_speed() {
        let glsl = RevealExpression::intro(0.3).glsl();
        assert!(glsl.contains("float animation_speed_factor = 0.3;"));
        assert!(glsl.contains("step(intro_offset, u_time * animation_speed_factor)"));
        assert!(glsl.contains("1.25, 1.0, 1.25)"));
    }

    #[test]
    fn intro_statements_pass_the_whitelist() {
        let glsl = RevealExpression::intro(1.5).glsl();
        assert!(RevealExpression::custom(&glsl).is_ok());
    }

    #[test]
    fn glsl_float_always_has_a_decimal_point() {
        assert_eq!(glsl_float(1.0), "1.0");
        assert_eq!(glsl_float(0.25), "0.25");
        assert_eq!(glsl_float(f32::NAN), "0.0");
        assert_eq!(glsl_float(-3.0), "-3.0");
    }

    #[test]
    fn custom_expression_may_declare_locals_and_swizzle() {
        let source = "float fade = smoothstep(0.0, 2.0, u_time);\nopacity *= fade * color.r;";
        let expression = RevealExpression::custom(source).unwrap();
        assert_eq!(
            expression.glsl(),
            "    float fade = smoothstep(0.0, 2.0, u_time);\n    opacity *= fade * color.r;\n"
        );
    }

    #[test]
    fn custom_expression_rejects_block_escapes() {
        assert_eq!(
            RevealExpression::custom("opacity = 1.0; } void main() {"),
            Err(TemplateError::DisallowedCharacter('}'))
        );
        assert_eq!(
            RevealExpression::custom("#define X 1"),
            Err(TemplateError::DisallowedCharacter('#'))
        );
        assert_eq!(
            RevealExpression::custom("opacity = 1.0; // hide"),
            Err(TemplateError::DisallowedCharacter('/'))
        );
    }

    #[test]
    fn custom_expression_rejects_unknown_identifiers() {
        assert_eq!(
            RevealExpression::custom("opacity = texture(tex, st).r;"),
            Err(TemplateError::UnknownIdentifier("texture".into()))
        );
        assert_eq!(
            RevealExpression::custom("color.q = 1.0;"),
            Err(TemplateError::UnknownIdentifier("q".into()))
        );
    }

    #[test]
    fn custom_expression_checks_numbers() {
        assert!(RevealExpression::custom("opacity *= 1e-3 + .5;").is_ok());
        assert_eq!(
            RevealExpression::custom("opacity *= 1.2.3;"),
            Err(TemplateError::MalformedNumber("1.2.3".into()))
        );
    }
}
