use crate::ui::{theme, Icons};
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    println!("{} {}", Icons::ROCKET, text.style(theme().header));
}

pub fn status(icon: &str, label: &str, value: &str) {
    println!("{} {}: {}", icon, label.style(theme().dim), value);
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(theme().error));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().warn));
}

pub fn section(title: &str) {
    println!();
    println!("━{}━", title.style(theme().header));
}

pub fn dim(text: &str) -> String {
    text.style(theme().dim).to_string()
}

/// A file that was (or would be) rewritten, with the names it declares
pub fn file_modified(path: &str, declared: &[String]) {
    if declared.is_empty() {
        println!("{} {}", Icons::MOD.style(theme().warn), path);
    } else {
        println!(
            "{} {} {}",
            Icons::MOD.style(theme().warn),
            path,
            format!("({})", declared.join(", ")).style(theme().name)
        );
    }
}

pub fn file_unchanged(path: &str) {
    println!("  {}", path.style(theme().muted));
}

pub fn file_failed(path: &str, message: &str) {
    eprintln!(
        "{} {}: {}",
        Icons::CROSS.style(theme().error),
        path,
        message.style(theme().error)
    );
}

pub fn map_written(path: &str) {
    println!("  {} {}", Icons::MAP.style(theme().info), dim(path));
}

