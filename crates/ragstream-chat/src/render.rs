use ragstream_client::{HealthStatus, Source};

use crate::history::Exchange;

/// Longest source preview, in characters
const PREVIEW_CHARS: usize = 150;

/// Numbered source list with a short preview of each source's content
pub fn format_sources(sources: &[Source]) -> String {
    let mut out = String::from("Sources:");
    for (i, source) in sources.iter().enumerate() {
        match source.title.as_deref() {
            Some(title) => out.push_str(&format!("\n  {}. {}", i + 1, title)),
            None => out.push_str(&format!("\n  {}. Source {}", i + 1, i + 1)),
        }
        if let Some(link) = source.link.as_deref() {
            out.push_str(&format!(" <{}>", link));
        }
        if let Some(content) = source.content.as_deref().filter(|c| !c.is_empty()) {
            out.push_str(&format!("\n     {}", preview(content)));
        }
    }
    out
}

fn preview(content: &str) -> String {
    match content.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}…", &content[..cut]),
        None => content.to_string(),
    }
}

/// Conversation listing for `/history`
pub fn format_transcript(exchanges: &[Exchange]) -> String {
    let mut lines = Vec::with_capacity(exchanges.len() * 2);
    for exchange in exchanges {
        lines.push(format!("[{}] USER: {}", exchange.time_label(), exchange.question));
        match exchange.sources.len() {
            0 => lines.push(format!("ASSISTANT: {}", exchange.answer)),
            1 => lines.push(format!("ASSISTANT: {} (1 source)", exchange.answer)),
            n => lines.push(format!("ASSISTANT: {} ({} sources)", exchange.answer, n)),
        }
    }
    lines.join("\n")
}

pub fn format_images(paths: &[String]) -> String {
    let mut out = String::from("Images:");
    for path in paths {
        out.push_str(&format!("\n  {}", path));
    }
    out
}

pub fn format_health(health: &HealthStatus) -> String {
    format!(
        "backend: {} | rag system: {} | api key: {}",
        health.status,
        health.rag_system.as_deref().unwrap_or("unknown"),
        health.openai_api_key.as_deref().unwrap_or("unknown"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_sources() {
        let sources = vec![
            Source::titled("doc1").with_link("http://x/1"),
            Source::default(),
        ];
        assert_eq!(
            format_sources(&sources),
            "Sources:\n  1. doc1 <http://x/1>\n  2. Source 2"
        );
    }

    #[test]
    fn test_format_sources_previews_content() {
        let sources = vec![
            Source::default().with_content("x".repeat(200)),
            Source::titled("short").with_content("é".repeat(150)),
        ];
        let expected = format!(
            "Sources:\n  1. Source 1\n     {}…\n  2. short\n     {}",
            "x".repeat(150),
            "é".repeat(150)
        );
        assert_eq!(format_sources(&sources), expected);
    }

    #[test]
    fn test_format_transcript() {
        assert_eq!(format_transcript(&[]), "");

        let plain = Exchange::new("hi", "hello");
        let mut cited = Exchange::new("why", "because");
        cited.sources = vec![Source::titled("a"), Source::titled("b")];

        let expected = format!(
            "[{}] USER: hi\nASSISTANT: hello\n[{}] USER: why\nASSISTANT: because (2 sources)",
            plain.time_label(),
            cited.time_label()
        );
        assert_eq!(format_transcript(&[plain.clone(), cited]), expected);
        assert_eq!(plain.time_label().len(), 5);
    }

    #[test]
    fn test_format_images() {
        let paths = vec!["a.png".to_string()];
        assert_eq!(format_images(&paths), "Images:\n  a.png");
    }
}
