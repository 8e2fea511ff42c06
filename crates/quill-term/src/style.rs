// SPDX-License-Identifier: MIT
//
// Style: colors and attributes for a run of text.
//
// The frame is line-oriented, so styling attaches to spans rather than
// individual cells. A `Style` is small and `Copy`; the renderer compares
// consecutive spans and only emits SGR when the style actually changes.
//
// Colors are either the terminal default, one of the 256 indexed palette
// entries, or 24-bit RGB. That covers every terminal quill targets
// without dragging in a color-space library.

// ─── Text Attributes ─────────────────────────────────────────────────────────

bitflags::bitflags! {
    /// Text attributes stored as a compact bitfield.
    ///
    /// These map directly to SGR parameters:
    ///
    /// ```
    /// use quill_term::style::Attr;
    ///
    /// let a = Attr::BOLD | Attr::DIM;
    /// assert!(a.contains(Attr::BOLD));
    /// assert!(!a.contains(Attr::INVERSE));
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Attr: u8 {
        /// SGR 1: increased intensity.
        const BOLD      = 1 << 0;
        /// SGR 2: faint.
        const DIM       = 1 << 1;
        /// SGR 3: italic.
        const ITALIC    = 1 << 2;
        /// SGR 4: single underline.
        const UNDERLINE = 1 << 3;
        /// SGR 7: swap foreground and background.
        const INVERSE   = 1 << 4;
    }
}

impl Attr {
    /// SGR parameter numbers for every set flag, in ascending order.
    #[must_use]
    pub fn sgr_codes(self) -> Vec<u8> {
        const TABLE: [(Attr, u8); 5] = [
            (Attr::BOLD, 1),
            (Attr::DIM, 2),
            (Attr::ITALIC, 3),
            (Attr::UNDERLINE, 4),
            (Attr::INVERSE, 7),
        ];
        TABLE
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|&(_, code)| code)
            .collect()
    }
}

// ─── Color ───────────────────────────────────────────────────────────────────

/// A terminal color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum Color {
    /// Whatever the terminal's default is (SGR 39 / 49).
    #[default]
    Default,
    /// One of the 256 palette entries (SGR 38;5;n / 48;5;n).
    Indexed(u8),
    /// True color (SGR 38;2;r;g;b / 48;2;r;g;b).
    Rgb(u8, u8, u8),
}

impl Color {
    /// Write the SGR parameters selecting this color as foreground
    /// (`background == false`) or background.
    pub(crate) fn push_sgr(self, out: &mut String, background: bool) {
        use std::fmt::Write as _;

        let base = if background { 48 } else { 38 };
        // Writing into a String cannot fail.
        let _ = match self {
            Self::Default => write!(out, "{}", base + 1),
            Self::Indexed(n) => write!(out, "{base};5;{n}"),
            Self::Rgb(r, g, b) => write!(out, "{base};2;{r};{g};{b}"),
        };
    }
}

// ─── Style ───────────────────────────────────────────────────────────────────

/// Foreground, background and attributes for a span of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Style {
    pub fg: Color,
    pub bg: Color,
    pub attr: Attr,
}

impl Style {
    /// The terminal's default rendition.
    pub const PLAIN: Self = Self {
        fg: Color::Default,
        bg: Color::Default,
        attr: Attr::empty(),
    };

    /// A style with only a foreground color.
    #[must_use]
    pub const fn fg(color: Color) -> Self {
        Self {
            fg: color,
            bg: Color::Default,
            attr: Attr::empty(),
        }
    }

    /// Add attributes to this style.
    #[must_use]
    pub const fn with(self, attr: Attr) -> Self {
        Self {
            attr: self.attr.union(attr),
            ..self
        }
    }

    /// Replace the background color.
    #[must_use]
    pub const fn on(self, bg: Color) -> Self {
        Self { bg, ..self }
    }

    /// The full SGR sequence for this style, starting from a reset so the
    /// result never depends on what was emitted before.
    #[must_use]
    pub fn sgr(self) -> String {
        use std::fmt::Write as _;

        let mut out = String::from("\x1b[0");
        for code in self.attr.sgr_codes() {
            let _ = write!(out, ";{code}");
        }
        if self.fg != Color::Default {
            out.push(';');
            self.fg.push_sgr(&mut out, false);
        }
        if self.bg != Color::Default {
            out.push(';');
            self.bg.push_sgr(&mut out, true);
        }
        out.push('m');
        out
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn attr_codes_are_ordered() {
        let a = Attr::INVERSE | Attr::BOLD;
        assert_eq!(a.sgr_codes(), vec![1, 7]);
    }

    #[test]
    fn attr_empty_has_no_codes() {
        assert!(Attr::empty().sgr_codes().is_empty());
    }

    #[test]
    fn plain_style_is_bare_reset() {
        assert_eq!(Style::PLAIN.sgr(), "\x1b[0m");
    }

    #[test]
    fn indexed_foreground() {
        assert_eq!(Style::fg(Color::Indexed(196)).sgr(), "\x1b[0;38;5;196m");
    }

    #[test]
    fn rgb_background_with_bold() {
        let s = Style::PLAIN.on(Color::Rgb(10, 20, 30)).with(Attr::BOLD);
        assert_eq!(s.sgr(), "\x1b[0;1;48;2;10;20;30m");
    }

    #[test]
    fn with_accumulates_attributes() {
        let s = Style::PLAIN.with(Attr::DIM).with(Attr::ITALIC);
        assert!(s.attr.contains(Attr::DIM | Attr::ITALIC));
    }

    #[test]
    fn default_color_params() {
        let mut out = String::new();
        Color::Default.push_sgr(&mut out, true);
        assert_eq!(out, "49");
    }
}
