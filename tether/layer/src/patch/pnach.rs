//! PCSX2 cheat file (`.pnach`) rendering of a patch table.

use std::fmt::Write;

use super::{PatchWidth, PatchWrite};

/// Title line used when none is given.
pub const DEFAULT_TITLE: &str = "GUNDAMDX(J)";

fn width_name(width: PatchWidth) -> &'static str {
    match width {
        PatchWidth::Byte => "byte",
        PatchWidth::Half => "short",
        PatchWidth::Word => "word",
    }
}

/// `patch=0,EE,<address>,<width>,<value>`, applied continuously on the EE core.
pub fn render_line(write: &PatchWrite) -> String {
    format!(
        "patch=0,EE,{:08x},{},{:08x}",
        write.address,
        width_name(write.width),
        write.value
    )
}

/// Full cheat file: `gametitle=` and `comment=` headers, then one line per write.
pub fn render<I>(title: &str, comment: &str, writes: I) -> String
where
    I: IntoIterator<Item = PatchWrite>,
{
    let mut pnach = String::new();
    let _ = writeln!(pnach, "gametitle={title}");
    let _ = writeln!(pnach, "comment={comment}");

    for write in writes {
        let _ = writeln!(pnach, "{}", render_line(&write));
    }

    pnach
}
