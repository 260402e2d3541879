//! Colour inputs and their resolution into the fixed 6-slot fill palette.

/// Number of palette slots the fragment program indexes.
pub const PALETTE_SLOTS: usize = 6;

/// An sRGB colour with 0–255 channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }

    /// Channels scaled into `0.0..=1.0`.
    pub fn normalized(self) -> [f32; 3] {
        self.0.map(|channel| f32::from(channel) / 255.0)
    }
}

impl From<[u8; 3]> for Rgb {
    fn from(value: [u8; 3]) -> Self {
        Self(value)
    }
}

/// Fallback fill when no colour is supplied.
pub const GOLD: Rgb = Rgb::new(255, 215, 0);

/// Colour input resolved once at the configuration boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Palette {
    /// Three colours, each occupying two adjacent slots.
    Three(Rgb, Rgb, Rgb),
    /// One colour repeated across every slot.
    Single(Rgb),
}

impl Palette {
    /// Resolves a free-form colour list.
    ///
    /// Exactly three colours keep their diversity. Any other length
    /// collapses to the first colour, or to [`GOLD`] when the list is empty.
    pub fn from_colors(colors: &[Rgb]) -> Self {
        match colors {
            [a, b, c] => Palette::Three(*a, *b, *c),
            [] => Palette::Single(GOLD),
            [first, ..] => {
                if colors.len() != 1 {
                    tracing::debug!(
                        supplied = colors.len(),
                        "palette needs exactly 3 colours; using the first one everywhere"
                    );
                }
                Palette::Single(*first)
            }
        }
    }

    /// The six fill slots in shader order.
    pub fn fill(&self) -> [Rgb; PALETTE_SLOTS] {
        match *self {
            Palette::Three(a, b, c) => [a, a, b, b, c, c],
            Palette::Single(color) => [color; PALETTE_SLOTS],
        }
    }

    pub fn normalized(&self) -> [[f32; 3]; PALETTE_SLOTS] {
        self.fill().map(Rgb::normalized)
    }
}

impl Default for Palette {
    fn default() -> Self {
        Palette::Single(GOLD)
    }
}
