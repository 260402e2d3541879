//! Program skeletons with named `{{slot}}` injection points.

use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("slot '{{{{{0}}}}}' was not given a value")]
    MissingSlot(String),
    #[error("template has no slot named '{0}'")]
    UnknownSlot(String),
    #[error("unterminated slot starting at byte {0}")]
    Unterminated(usize),
    #[error("slot name '{0}' is not a valid identifier")]
    InvalidSlotName(String),
    #[error("reveal expression contains disallowed character {0:?}")]
    DisallowedCharacter(char),
    #[error("reveal expression uses unknown identifier '{0}'")]
    UnknownIdentifier(String),
    #[error("reveal expression contains malformed number '{0}'")]
    MalformedNumber(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Slot(String),
}

/// A parsed skeleton.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderTemplate {
    segments: Vec<Segment>,
}

impl ShaderTemplate {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut rest = source;
        let mut consumed = 0usize;

        while let Some(start) = rest.find("{{") {
            if start > 0 {
                segments.push(Segment::Text(rest[..start].to_string()));
            }
            let after_open = &rest[start + 2..];
            let end = after_open
                .find("}}")
                .ok_or(TemplateError::Unterminated(consumed + start))?;
            let name = after_open[..end].trim();
            if !is_identifier(name) {
                return Err(TemplateError::InvalidSlotName(name.to_string()));
            }
            segments.push(Segment::Slot(name.to_string()));
            let advance = start + 2 + end + 2;
            consumed += advance;
            rest = &rest[advance..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        Ok(Self { segments })
    }

    /// Slot names in order of first appearance.
    pub fn slots(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Slot(name) if seen.insert(name.as_str()) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Fills every slot. Each slot needs a value and every value needs a slot.
    pub fn render(&self, values: &[(&str, &str)]) -> Result<String, TemplateError> {
        let slots = self.slots();
        if let Some((unknown, _)) = values.iter().find(|(name, _)| !slots.contains(name)) {
            return Err(TemplateError::UnknownSlot(unknown.to_string()));
        }

        let mut output = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => output.push_str(text),
                Segment::Slot(name) => {
                    let value = values
                        .iter()
                        .find(|(key, _)| *key == name.as_str())
                        .map(|(_, value)| *value)
                        .ok_or_else(|| TemplateError::MissingSlot(name.clone()))?;
                    output.push_str(value);
                }
            }
        }
        Ok(output)
    }
}

pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(first) if first.is_ascii_alphabetic() || first == '_')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_are_filled_in_place() {
        let template = ShaderTemplate::parse("a {{ first }} b {{second}} c {{first}}").unwrap();
        assert_eq!(template.slots(), ["first", "second"]);
        let rendered = template
            .render(&[("first", "1"), ("second", "2")])
            .unwrap();
        assert_eq!(rendered, "a 1 b 2 c 1");
    }

    #[test]
    fn glsl_braces_are_plain_text() {
        let template = ShaderTemplate::parse("void main() {\n  if (x) { y(); }\n}\n").unwrap();
        assert!(template.slots().is_empty());
        assert_eq!(
            template.render(&[]).unwrap(),
            "void main() {\n  if (x) { y(); }\n}\n"
        );
    }

    #[test]
    fn missing_and_unknown_slots_are_errors() {
        let template = ShaderTemplate::parse("{{a}}").unwrap();
        assert_eq!(
            template.render(&[]),
            Err(TemplateError::MissingSlot("a".into()))
        );
        assert_eq!(
            template.render(&[("a", ""), ("b", "")]),
            Err(TemplateError::UnknownSlot("b".into()))
        );
    }

    #[test]
    fn malformed_slots_are_rejected() {
        assert_eq!(
            ShaderTemplate::parse("x {{open"),
            Err(TemplateError::Unterminated(2))
        );
        assert_eq!(
            ShaderTemplate::parse("{{not a name}}"),
            Err(TemplateError::InvalidSlotName("not a name".into()))
        );
    }

    #[test]
    fn missing_slot_message_shows_braces() {
        let err = TemplateError::MissingSlot("reveal".into());
        assert_eq!(err.to_string(), "slot '{{reveal}}' was not given a value");
    }
}
