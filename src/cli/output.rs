//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so the tool
//! styles every action the same way.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::properties::Properties;
use crate::vault::SecretHandle;

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print a table of stored handles (Alias, Block, Attribute, Reference).
pub fn print_handles_table(handles: &[SecretHandle]) {
    if handles.is_empty() {
        info("No secrets in this vault yet.");
        tip("Run `propvault -k <keystore> -v <alias> -b <block> -a <attr> -x <value>` to add one.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Alias", "Block", "Attribute", "Reference"]);

    for h in handles {
        table.add_row(vec![
            h.alias().to_string(),
            h.block().to_string(),
            h.attribute().to_string(),
            h.to_string(),
        ]);
    }

    println!("{table}");
}

/// Render properties as `key=value` lines, in key order.
///
/// Keys and values are escaped so `parse_properties` reads back exactly
/// what was written.
pub fn properties_text(props: &Properties) -> String {
    props
        .iter()
        .map(|(k, v)| format!("{}={}\n", escape(k, true), escape(v, false)))
        .collect()
}

fn escape(raw: &str, is_key: bool) -> String {
    let mut out = String::with_capacity(raw.len());
    for (i, c) in raw.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{0C}' => out.push_str("\\f"),
            ' ' if is_key || i == 0 => out.push_str("\\ "),
            '=' | ':' if is_key => {
                out.push('\\');
                out.push(c);
            }
            '#' | '!' if is_key && i == 0 => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}
