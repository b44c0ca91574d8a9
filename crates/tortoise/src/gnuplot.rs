//! The text protocol for driving gnuplot over its standard input.
//!
//! Every segment becomes its own parametric plot, drawn on top of the previous ones in
//! multiplot mode.

use std::fmt::{self, Display, Formatter};

use crate::DrawCmd;

/// Half the width (and half the height) of the default plotting area.
pub const DEFAULT_EXTENT: f64 = 10.0;

pub const QUIT: &str = "quit";

/// The setup commands, sent once before anything is drawn.
///
/// The plot shows `[-extent, extent]` on both axes, with a 1:1 aspect ratio and no tick marks.
pub fn preamble(extent: f64) -> Vec<String> {
    vec![
        "set multiplot".to_owned(),
        "set parametric".to_owned(),
        format!("set xrange[-{extent}:{extent}]"),
        format!("set yrange[-{extent}:{extent}]"),
        "set size ratio -1".to_owned(),
        "unset xtics".to_owned(),
        "unset ytics".to_owned(),
    ]
}

/// Formats a [`DrawCmd`] as a single line (without the newline) of gnuplot input.
#[derive(Copy, Clone, Debug)]
pub struct Gnuplot<'a>(pub &'a DrawCmd);

impl Display for Gnuplot<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.0 {
            DrawCmd::Clear => f.write_str("clear"),
            DrawCmd::Line { from, to } => {
                let d = *to - *from;
                // Six fractional digits, same as printf's "%f".
                write!(
                    f,
                    "plot [0:1] {:.6} + {:.6} * t, {:.6} + {:.6} * t notitle",
                    from.x, d.x, from.y, d.y
                )
            }
        }
    }
}
