//! Line-oriented terminal commands. Plain text is the query; lines starting
//! with `:` edit the rest of the configuration or drive the session.

use crate::coordinator::{BatchOrigin, ResultBatch};
use crate::entry::{FieldMode, SortMode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Query(String),
    Mode(FieldMode),
    Sort(SortMode),
    Idioms(bool),
    Shuffle,
    Count,
    Retry,
    Stats,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Command, String> {
        let Some(rest) = line.trim_start().strip_prefix(':') else {
            return Ok(Command::Query(line.to_string()));
        };

        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let arg = parts.next();

        match (name, arg) {
            ("mode", Some(arg)) => arg.parse().map(Command::Mode),
            ("sort", Some(arg)) => arg.parse().map(Command::Sort),
            ("idioms", Some(arg)) => parse_toggle(arg).map(Command::Idioms),
            ("shuffle", None) => Ok(Command::Shuffle),
            ("count", None) => Ok(Command::Count),
            ("retry", None) => Ok(Command::Retry),
            ("stats", None) => Ok(Command::Stats),
            ("quit" | "q", None) => Ok(Command::Quit),
            ("mode" | "sort" | "idioms", None) => Err(format!(":{name} needs an argument")),
            _ => Err(format!("unknown command: :{rest}")),
        }
    }
}

fn parse_toggle(arg: &str) -> Result<bool, String> {
    match arg.to_lowercase().as_str() {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        other => Err(format!("expected on/off, got {other}")),
    }
}

/// Render a batch as plain text, one entry per line.
pub fn render_batch(batch: &ResultBatch) -> String {
    let origin = match batch.origin {
        BatchOrigin::Search => "search",
        BatchOrigin::Discovery => "discovery",
    };
    let mut out = format!(
        "-- {} entries ({origin}, {}, {}{})\n",
        batch.entries.len(),
        batch.config.field_mode,
        batch.config.sort_mode,
        if batch.config.idiom_only { ", idioms only" } else { "" },
    );
    for entry in &batch.entries {
        out.push_str(&entry.display_headword());
        out.push_str(" = ");
        out.push_str(&entry.translation);
        if entry.is_idiom {
            out.push_str(" [idiom]");
        }
        let tags = entry.tags();
        if !tags.is_empty() {
            out.push_str(&format!(" ({})", tags.join(", ")));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{Entry, Gender, SearchConfiguration};
    use uuid::Uuid;

    #[test]
    fn plain_lines_are_queries() {
        assert_eq!(Command::parse(" haus "), Ok(Command::Query(" haus ".into())));
        assert_eq!(Command::parse(""), Ok(Command::Query(String::new())));
    }

    #[test]
    fn colon_commands_parse() {
        assert_eq!(Command::parse(":mode german"), Ok(Command::Mode(FieldMode::Source)));
        assert_eq!(Command::parse(":sort desc"), Ok(Command::Sort(SortMode::Descending)));
        assert_eq!(Command::parse(":idioms on"), Ok(Command::Idioms(true)));
        assert_eq!(Command::parse(":q"), Ok(Command::Quit));
        assert!(Command::parse(":mode").is_err());
        assert!(Command::parse(":idioms maybe").is_err());
        assert!(Command::parse(":dance").is_err());
    }

    #[test]
    fn batches_render_one_entry_per_line() {
        let batch = ResultBatch {
            request_id: Uuid::nil(),
            generation: 1,
            origin: BatchOrigin::Search,
            config: SearchConfiguration::with_query("haus"),
            entries: vec![Entry {
                id: 1,
                headword: "Haus".into(),
                translation: "house".into(),
                gender: Some(Gender::Neuter),
                headword_annotations: Vec::new(),
                headword_variants: Vec::new(),
                translation_annotations: Vec::new(),
                translation_variants: Vec::new(),
                part_of_speech: Some("noun".into()),
                subject_domain: Some("archit.".into()),
                usage_level: None,
                is_idiom: false,
            }],
        };
        let text = render_batch(&batch);
        assert!(text.starts_with("-- 1 entries (search, Both, Relevance)"));
        assert!(text.contains("das Haus = house (archit.)"));
    }
}
