//! Markdown blocks injected as additional context.

use hook_memory::client::{Briefing, RecallHit};

const MAX_HIT_CHARS: usize = 200;

fn clip(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= MAX_HIT_CHARS {
        flat
    } else {
        let cut: String = flat.chars().take(MAX_HIT_CHARS).collect();
        format!("{cut}...")
    }
}

pub fn briefing(briefing: &Briefing) -> Option<String> {
    if briefing.is_empty() {
        return None;
    }
    let mut lines = vec!["# Workspace briefing".to_string(), String::new()];
    if !briefing.summary.trim().is_empty() {
        lines.push(briefing.summary.trim().to_string());
    }
    lines.extend(briefing.highlights.iter().map(|h| format!("- {}", clip(h))));
    Some(lines.join("\n"))
}

pub fn recall(title: &str, hits: &[RecallHit]) -> Option<String> {
    let bullets: Vec<String> = hits
        .iter()
        .filter(|hit| !hit.content.trim().is_empty())
        .map(|hit| format!("- {}", clip(&hit.content)))
        .collect();
    if bullets.is_empty() {
        return None;
    }
    Some(format!("# {title}\n\n{}", bullets.join("\n")))
}

/// Join the present sections with a blank line.
pub fn join(sections: impl IntoIterator<Item = Option<String>>) -> String {
    sections.into_iter().flatten().collect::<Vec<_>>().join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(content: &str) -> RecallHit {
        RecallHit {
            content: content.to_string(),
            score: None,
            kind: None,
        }
    }

    #[test]
    fn test_recall_block() {
        let block = recall("Related memories", &[hit("login uses JWT"), hit("  ")]).unwrap();
        assert_eq!(block, "# Related memories\n\n- login uses JWT");
    }

    #[test]
    fn test_recall_empty() {
        assert_eq!(recall("Related memories", &[]), None);
    }

    #[test]
    fn test_hits_are_clipped() {
        let block = recall("R", &[hit(&"a".repeat(300))]).unwrap();
        assert!(block.ends_with(&format!("{}...", "a".repeat(200))));
    }

    #[test]
    fn test_briefing_block() {
        let b = Briefing {
            summary: "Auth rewrite in progress".to_string(),
            highlights: vec!["tokens moved to redis".to_string()],
        };
        assert_eq!(
            briefing(&b).unwrap(),
            "# Workspace briefing\n\nAuth rewrite in progress\n- tokens moved to redis"
        );
        assert_eq!(briefing(&Briefing::default()), None);
    }

    #[test]
    fn test_join_skips_missing() {
        assert_eq!(join([Some("a".to_string()), None, Some("b".to_string())]), "a\n\nb");
        assert_eq!(join([None, None]), "");
    }
}
