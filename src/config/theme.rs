/// Colors used by the conversation document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationPalette {
    pub background: HexColor,
    pub foreground: HexColor,
    pub user_row: HexColor,
    pub assistant_row: HexColor,
    pub code_background: HexColor,
    pub code_foreground: HexColor,
    pub link: HexColor,
}

impl ConversationPalette {
    pub fn light() -> Self {
        Self {
            background: HexColor::new("#ffffff"),
            foreground: HexColor::new("#111111"),
            user_row: HexColor::new("#edf4ff"),
            assistant_row: HexColor::new("#f7f7f7"),
            code_background: HexColor::new("#111111"),
            code_foreground: HexColor::new("#f5f5f5"),
            link: HexColor::new("#0b57d0"),
        }
    }

    pub fn dark() -> Self {
        Self {
            background: HexColor::new("#121212"),
            foreground: HexColor::new("#e7e7e7"),
            user_row: HexColor::new("#15324a"),
            assistant_row: HexColor::new("#262626"),
            code_background: HexColor::new("#0f0f0f"),
            code_foreground: HexColor::new("#f5f5f5"),
            link: HexColor::new("#7ab8ff"),
        }
    }

    pub fn for_theme(is_dark: bool) -> Self {
        if is_dark {
            Self::dark()
        } else {
            Self::light()
        }
    }
}

/// CSS hex color. Anything that is not `#rgb` or `#rrggbb` falls back to
/// `inherit` when emitted, so a bad value can never break out of the
/// stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexColor(String);

impl HexColor {
    pub fn new(hex: &str) -> Self {
        Self(hex.to_string())
    }

    pub fn is_valid(&self) -> bool {
        let Some(digits) = self.0.strip_prefix('#') else {
            return false;
        };
        matches!(digits.len(), 3 | 6) && digits.chars().all(|c| c.is_ascii_hexdigit())
    }

    pub fn css(&self) -> &str {
        if self.is_valid() {
            &self.0
        } else {
            "inherit"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palettes_differ_by_theme() {
        assert_ne!(ConversationPalette::for_theme(true), ConversationPalette::for_theme(false));
        assert_eq!(ConversationPalette::for_theme(true).background.css(), "#121212");
        assert_eq!(ConversationPalette::for_theme(false).background.css(), "#ffffff");
    }

    #[test]
    fn test_hex_color_validation() {
        assert!(HexColor::new("#abc").is_valid());
        assert!(HexColor::new("#A0B1C2").is_valid());
        assert!(!HexColor::new("red").is_valid());
        assert!(!HexColor::new("#12345").is_valid());
        assert_eq!(HexColor::new("#fff;}</style>").css(), "inherit");
    }
}
