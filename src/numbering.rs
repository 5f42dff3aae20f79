//! Numbering definition generator for lists.

use ecow::{eco_format, EcoString};

use crate::model::{ListNumbering, NumberingLevel};
use crate::options::NumberingOverride;

/// Number of depth levels a definition carries. Deeper nesting clamps
/// to the last level.
pub const MAX_LEVELS: usize = 9;

/// Indent step per depth level, twips.
const INDENT_STEP: i32 = 720;

/// Which of the two list families a definition renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListStyle {
    Ordered,
    Bullet,
}

const ORDERED_FORMATS: [&str; 3] = ["decimal", "lowerLetter", "lowerRoman"];
const BULLET_GLYPHS: [&str; 3] = ["\u{2022}", "\u{25CB}", "\u{25AA}"];

const KNOWN_FORMATS: [&str; 4] = ["decimal", "lowerLetter", "lowerRoman", "upperRoman"];

/// Builds the full nine-level definition for one root list.
///
/// Without an override the format cycles with depth; an override pins
/// one format or glyph across every level. Unrecognized override values
/// fall back to the family default.
pub fn create_numbering(
    reference: impl Into<EcoString>,
    style: ListStyle,
    overrides: Option<&NumberingOverride>,
) -> ListNumbering {
    let color = overrides.and_then(|o| o.color.clone());
    let pinned: Option<EcoString> = match style {
        ListStyle::Ordered => overrides
            .and_then(|o| o.format.as_ref())
            .map(|f| {
                if KNOWN_FORMATS.contains(&f.as_str()) {
                    f.clone()
                } else {
                    "decimal".into()
                }
            }),
        ListStyle::Bullet => overrides
            .and_then(|o| o.glyph.as_ref())
            .map(|g| match g.as_str() {
                "disc" => BULLET_GLYPHS[0].into(),
                "circle" => BULLET_GLYPHS[1].into(),
                "square" => BULLET_GLYPHS[2].into(),
                g if g.chars().count() == 1 => g.into(),
                _ => BULLET_GLYPHS[0].into(),
            }),
    };

    let levels = (0..MAX_LEVELS)
        .map(|level| {
            let (format, text): (EcoString, EcoString) = match style {
                ListStyle::Ordered => {
                    let format = pinned
                        .clone()
                        .unwrap_or_else(|| ORDERED_FORMATS[level % 3].into());
                    (format, eco_format!("%{}.", level + 1))
                }
                ListStyle::Bullet => {
                    let glyph = pinned
                        .clone()
                        .unwrap_or_else(|| BULLET_GLYPHS[level % 3].into());
                    ("bullet".into(), glyph)
                }
            };
            NumberingLevel {
                level,
                format,
                text,
                indent: INDENT_STEP * (level as i32 + 1),
                hanging: match style {
                    ListStyle::Ordered => 420,
                    ListStyle::Bullet => 360,
                },
                color: color.clone(),
            }
        })
        .collect();

    ListNumbering {
        reference: reference.into(),
        levels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordered_formats_cycle_with_depth() {
        let num = create_numbering("list-1", ListStyle::Ordered, None);
        assert_eq!(num.levels.len(), MAX_LEVELS);
        assert_eq!(num.levels[0].format, "decimal");
        assert_eq!(num.levels[1].format, "lowerLetter");
        assert_eq!(num.levels[2].format, "lowerRoman");
        assert_eq!(num.levels[3].format, "decimal");
        assert_eq!(num.levels[0].text, "%1.");
        assert_eq!(num.levels[4].text, "%5.");
    }

    #[test]
    fn bullet_glyphs_cycle_with_depth() {
        let num = create_numbering("list-1", ListStyle::Bullet, None);
        assert_eq!(num.levels[0].text, "\u{2022}");
        assert_eq!(num.levels[1].text, "\u{25CB}");
        assert_eq!(num.levels[2].text, "\u{25AA}");
        assert_eq!(num.levels[3].text, "\u{2022}");
        assert!(num.levels.iter().all(|l| l.format == "bullet"));
    }

    #[test]
    fn override_pins_every_level() {
        let over = NumberingOverride {
            format: Some("upperRoman".into()),
            color: Some("4472C4".into()),
            ..Default::default()
        };
        let num = create_numbering("list-2", ListStyle::Ordered, Some(&over));
        assert!(num.levels.iter().all(|l| l.format == "upperRoman"));
        assert!(num.levels.iter().all(|l| l.color.as_deref() == Some("4472C4")));
    }

    #[test]
    fn unknown_override_falls_back() {
        let over = NumberingOverride {
            format: Some("fancy-squiggle".into()),
            ..Default::default()
        };
        let num = create_numbering("list-3", ListStyle::Ordered, Some(&over));
        assert!(num.levels.iter().all(|l| l.format == "decimal"));

        let over = NumberingOverride {
            glyph: Some("not-a-glyph".into()),
            ..Default::default()
        };
        let num = create_numbering("list-4", ListStyle::Bullet, Some(&over));
        assert!(num.levels.iter().all(|l| l.text == "\u{2022}"));
    }

    #[test]
    fn indent_grows_linearly() {
        let num = create_numbering("list-5", ListStyle::Bullet, None);
        for (i, level) in num.levels.iter().enumerate() {
            assert_eq!(level.indent, 720 * (i as i32 + 1));
            assert_eq!(level.hanging, 360);
        }
    }
}
