//! Startup banner.

const LOGO: [&str; 6] = [
    "          _          ",
    "   ____  (_)___  ___ ",
    "  / __ \\/ / __ \\/ _ \\",
    " / / / / / / / /  __/",
    "/_/ /_/_/_/ /_/\\___/ ",
    "                     ",
];

/// Renders the boxed logo with the local address of `port` under it.
pub(crate) fn banner(port: u16) -> String {
    let address = format!("http://127.0.0.1:{port}");
    let logo_width = LOGO.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let width = logo_width.max(address.chars().count()) + 4;

    let mut out = String::from("\n");
    out.push_str(&format!(" {} \n|{}|\n", "_".repeat(width), " ".repeat(width)));
    for line in LOGO {
        out.push_str(&centered(line, width));
    }
    out.push_str(&format!("|{}|\n", " ".repeat(width)));
    out.push_str(&centered(&address, width));
    out.push_str(&format!("|{}|", "_".repeat(width)));
    out
}

fn centered(line: &str, width: usize) -> String {
    let spaces = width.saturating_sub(line.chars().count());
    let left = spaces / 2;
    format!("|{}{}{}|\n", " ".repeat(left), line, " ".repeat(spaces - left))
}
