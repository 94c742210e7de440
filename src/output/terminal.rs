// Colored terminal output for verdicts.

use colored::Colorize;

use crate::scoring::salience::Span;
use crate::vault::Vault;
use crate::verdict::{Direction, VerdictResult};

/// Print one verdict: status line, the text with reasons highlighted, and the
/// reason list.
pub fn display_verdict(text: &str, direction: Direction, verdict: &VerdictResult) {
    let status = if verdict.reject_flag {
        "REJECT".red().bold()
    } else {
        "ACCEPT".green().bold()
    };

    println!(
        "{} {} toxicity {:.3}  ({} reason{})",
        status,
        format!("[{direction}]").dimmed(),
        verdict.metric,
        verdict.reasons.len(),
        if verdict.reasons.len() == 1 { "" } else { "s" },
    );

    let spans: Vec<Span> = verdict.reasons.iter().map(|r| r.span).collect();
    println!("  {}", highlight(text, &spans));

    for reason in &verdict.reasons {
        println!(
            "    {} {:>4}..{:<4} {}",
            "-".dimmed(),
            reason.span.start,
            reason.span.end,
            reason.span.slice(text).yellow(),
        );
    }
}

/// Print the vault thresholds a check runs with.
pub fn display_vault(vault: &Vault) {
    println!("{}", "Vault".bold());
    println!("  toxicity_threshold_input:       {}", vault.toxicity_threshold_input);
    println!("  toxicity_threshold_output:      {}", vault.toxicity_threshold_output);
    println!("  attention_threshold_percentile: {}", vault.attention_threshold_percentile);
    println!("  top_k_tokens:                   {}", vault.top_k_tokens);
    println!();
}

/// Render `text` with every span underlined in red. Spans must not overlap.
fn highlight(text: &str, spans: &[Span]) -> String {
    let mut sorted = spans.to_vec();
    sorted.sort_by_key(|s| s.start);

    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    for span in sorted {
        let start = span.start.min(chars.len()).max(pos);
        let end = span.end.min(chars.len());
        if start >= end {
            continue;
        }
        out.extend(&chars[pos..start]);
        let flagged: String = chars[start..end].iter().collect();
        out.push_str(&flagged.red().underline().to_string());
        pos = end;
    }
    out.extend(&chars[pos..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_keeps_text_without_color() {
        colored::control::set_override(false);
        let text = "You are stupid and worthless";
        let out = highlight(text, &[Span::new(19, 28), Span::new(8, 14)]);
        assert_eq!(out, text);
    }
}
