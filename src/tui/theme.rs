use ratatui::style::{Color, Style};

/// Colors for the light and dark palettes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub bg: Color,
    pub fg: Color,
    pub muted: Color,
    pub accent: Color,
    pub key: Color,
    pub success: Color,
    pub error: Color,
    pub selected_bg: Color,
}

impl Palette {
    pub fn for_mode(dark: bool) -> Self {
        if dark {
            Self {
                bg: Color::Rgb(17, 24, 39),
                fg: Color::Rgb(229, 231, 235),
                muted: Color::Gray,
                accent: Color::LightBlue,
                key: Color::LightMagenta,
                success: Color::LightGreen,
                error: Color::LightRed,
                selected_bg: Color::Rgb(55, 65, 81),
            }
        } else {
            Self {
                bg: Color::Reset,
                fg: Color::Reset,
                muted: Color::DarkGray,
                accent: Color::Blue,
                key: Color::Magenta,
                success: Color::Green,
                error: Color::Red,
                selected_bg: Color::Rgb(219, 234, 254),
            }
        }
    }

    pub fn base(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palettes_differ() {
        assert_ne!(Palette::for_mode(true), Palette::for_mode(false));
    }
}
