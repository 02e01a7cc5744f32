use std::io::{self, IsTerminal};

use arbor::domain::{NodeBranch, Tree};
use arbor::render::{outline, OutlineRenderer};

pub fn print_tree_list(trees: &[Tree], scope: &str) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Trees"));
    println!("{}", palette.dim(&format!("scope: {scope}")));

    if trees.is_empty() {
        println!("{}", palette.dim("no trees matched"));
        return;
    }

    for tree in trees {
        println!("{}", format_tree_row(tree, &palette));
    }
    println!("{}", palette.dim(&format!("{} tree(s)", trees.len())));
}

pub fn print_tree_detail(tree: &Tree, roots: &[NodeBranch]) {
    let palette = Palette::auto();
    println!("{}", format_tree_row(tree, &palette));
    if let Some(description) = tree.description() {
        println!("{}", palette.dim(description));
    }
    if roots.is_empty() {
        println!("{}", palette.dim("no nodes"));
        return;
    }
    for (depth, label) in outline(roots, &mut OutlineRenderer) {
        println!("{}{}", indentation_prefix(depth, &palette), label);
    }
}

fn format_tree_row(tree: &Tree, palette: &Palette) -> String {
    let id = tree
        .id()
        .map(|id| format!("#{id}"))
        .unwrap_or_else(|| "#?".to_string());
    format!(
        "{} {} {}",
        palette.id(&id),
        palette.status(tree.is_active()),
        tree.name()
    )
}

fn indentation_prefix(depth: usize, palette: &Palette) -> String {
    if depth == 0 {
        return String::new();
    }
    let spaces = "  ".repeat(depth.saturating_sub(1));
    palette.dim(&format!("{spaces}↳ "))
}

struct Palette {
    enabled: bool,
}

impl Palette {
    fn auto() -> Self {
        let enabled = std::env::var_os("NO_COLOR").is_none() && io::stdout().is_terminal();
        Self { enabled }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.enabled {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    fn heading(&self, text: &str) -> String {
        self.paint("1;36", text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint("2", text)
    }

    fn id(&self, text: &str) -> String {
        self.paint("1;94", text)
    }

    fn status(&self, active: bool) -> String {
        if active {
            self.paint("32", "[ACTIVE]")
        } else {
            self.paint("31", "[DELETED]")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{format_tree_row, indentation_prefix, Palette};
    use arbor::clock::FixedClock;
    use arbor::domain::Tree;
    use time::macros::datetime;

    #[test]
    fn plain_palette_formats_rows_without_escapes() {
        let palette = Palette { enabled: false };
        let clock = FixedClock::new(datetime!(2024-06-01 12:00:00));
        let mut tree = Tree::new("Docs", None, &clock);
        assert_eq!(format_tree_row(&tree, &palette), "#? [ACTIVE] Docs");
        tree.soft_delete(&clock);
        assert_eq!(format_tree_row(&tree, &palette), "#? [DELETED] Docs");
    }

    #[test]
    fn nested_rows_get_an_arrow_prefix() {
        let palette = Palette { enabled: false };
        assert_eq!(indentation_prefix(0, &palette), "");
        assert_eq!(indentation_prefix(1, &palette), "↳ ");
        assert_eq!(indentation_prefix(3, &palette), "    ↳ ");
    }

    #[test]
    fn enabled_palette_wraps_in_ansi_codes() {
        let palette = Palette { enabled: true };
        assert_eq!(palette.dim("x"), "\x1b[2mx\x1b[0m");
    }
}
