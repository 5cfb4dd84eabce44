//! Response formatting.
//!
//! Maps raw model text plus a [`ResponseStyle`] onto the fixed output
//! templates. Bold `**markers**` are rewritten to the decorative `🔹` pair
//! before any section handling. Legal answers that read as legal text get the
//! seven-caption section layout; other legal styles fall back to a
//! three-block template (main content, key points, conclusion).
//!
//! Whether the section layout applies is decided by the caller through
//! `use_legal_sections`. The flag is derived from the *answer* text rather
//! than the question, which is surprising enough that the choice of input is
//! kept in the caller instead of buried in this module.

use std::sync::OnceLock;

use regex::Regex;

use crate::classify::ResponseStyle;

const SEPARATOR_WIDTH: usize = 50;

/// Caption for each of the seven positional answer sections, in order.
const SECTION_CAPTIONS: [&str; 7] = [
    "📌 Title",
    "📜 Legal Section",
    "🔍 Analysis",
    "📝 Description",
    "⚖️ Legal Implications",
    "📚 References",
    "🎯 Conclusion",
];

/// One positional section of a legal answer. `content: None` means the model
/// produced fewer paragraphs than captions; the caption is still rendered so
/// a missing section is visible instead of silently mislabeled.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledSection {
    pub caption: &'static str,
    pub content: Option<String>,
}

/// Rewrites `**bold**` markers to the decorative `🔹` pair.
pub fn format_bold_text(text: &str) -> String {
    static BOLD: OnceLock<Regex> = OnceLock::new();
    let bold = BOLD.get_or_init(|| {
        Regex::new(r"\*\*(.*?)\*\*").expect("bold marker pattern is a valid literal")
    });
    bold.replace_all(text, "🔹$1🔹").into_owned()
}

/// Splits answer text on blank-line boundaries into the seven positional
/// sections. Paragraphs beyond the seventh are dropped.
pub fn split_legal_sections(text: &str) -> Vec<LabeledSection> {
    let paragraphs: Vec<&str> = text.split("\n\n").collect();

    SECTION_CAPTIONS
        .iter()
        .enumerate()
        .map(|(position, caption)| LabeledSection {
            caption,
            content: paragraphs.get(position).map(|content| content.to_string()),
        })
        .collect()
}

/// Formats raw model output for the given style.
///
/// `use_legal_sections` selects the seven-caption layout for legal styles;
/// callers decide which text (question or answer) drives that flag.
pub fn format_response(raw_text: &str, style: ResponseStyle, use_legal_sections: bool) -> String {
    let text = format_bold_text(raw_text);

    if style == ResponseStyle::General {
        return format!("\n👋 Response 👋\n{text}\n");
    }

    if use_legal_sections {
        return render_sections(&split_legal_sections(&text));
    }

    render_template(&text, style)
}

fn separator() -> String {
    format!("{}\n", "═".repeat(SEPARATOR_WIDTH))
}

fn render_sections(sections: &[LabeledSection]) -> String {
    let separator = separator();
    let mut out = format!("\n{separator}");

    for section in sections {
        match &section.content {
            Some(content) => {
                out.push_str(&format!("{}\n{}\n{separator}", section.caption, content));
            }
            // An unfilled title is dropped outright; other unfilled sections
            // keep their caption so the gap is visible.
            None if section.caption == "📌 Title" => {}
            None => out.push_str(&format!("{}\n{separator}", section.caption)),
        }
    }

    out
}

/// Main and points captions for the three-block template. `LegalGeneral` has
/// no template of its own and borrows the summary captions.
fn style_captions(style: ResponseStyle) -> (&'static str, &'static str) {
    match style {
        ResponseStyle::List => ("📋 Legal Overview 📋", "📝 Legal Breakdown 📝"),
        ResponseStyle::Comparison => ("🔄 Legal Comparison 🔄", "📊 Legal Analysis 📊"),
        ResponseStyle::Explanation => ("💡 Legal Explanation 💡", "🔑 Legal Implications 🔑"),
        ResponseStyle::Definition => ("📚 Legal Definition 📚", "📖 Legal Context 📖"),
        ResponseStyle::CaseRuling => ("⚖️ Case Analysis ⚖️", "📋 Legal Implications 📋"),
        ResponseStyle::LegalReference => ("📜 Legal Reference 📜", "📝 Legal Interpretation 📝"),
        ResponseStyle::CourtComposition => ("🏛️ Court Information 🏛️", "👥 Legal Details 👥"),
        _ => ("✨ Legal Summary ✨", "🌟 Key Legal Points 🌟"),
    }
}

fn bulleted(items: &[&str]) -> String {
    format!("• {}", items.join("\n• "))
}

fn render_template(text: &str, style: ResponseStyle) -> String {
    let (main_caption, points_caption) = style_captions(style);

    let sentences: Vec<&str> = text.split(". ").collect();

    let points = if style == ResponseStyle::List {
        let items: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .skip(1)
            .collect();
        bulleted(&items)
    } else {
        let leading = &sentences[..sentences.len().min(3)];
        bulleted(leading)
    };

    let trailing = &sentences[sentences.len().saturating_sub(3)..];
    let conclusion = bulleted(trailing);

    let separator = separator();
    format!(
        "\n{separator}{main_caption}\n{text}\n{separator}{points_caption}\n{points}\n{separator}🎯 Conclusion\n{conclusion}\n{separator}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bold_markers_become_decorative_pairs() {
        assert_eq!(
            format_bold_text("the **habeas corpus** writ"),
            "the 🔹habeas corpus🔹 writ"
        );
        assert_eq!(
            format_bold_text("**a** and **b**"),
            "🔹a🔹 and 🔹b🔹"
        );
        // Unpaired markers stay untouched.
        assert_eq!(format_bold_text("just ** one"), "just ** one");
    }

    #[test]
    fn general_style_uses_the_fixed_wrapper_verbatim() {
        let out = format_response("The sky is blue.", ResponseStyle::General, false);
        assert_eq!(out, "\n👋 Response 👋\nThe sky is blue.\n");
    }

    #[test]
    fn section_layout_labels_paragraphs_in_order() {
        let answer = "Right to Equality\n\nArticle 14\n\nEquality before law analysis";
        let out = format_response(answer, ResponseStyle::LegalGeneral, true);

        assert!(out.contains("📌 Title\nRight to Equality"));
        assert!(out.contains("📜 Legal Section\nArticle 14"));
        assert!(out.contains("🔍 Analysis\nEquality before law analysis"));
        // Unfilled sections keep a caption-only placeholder.
        assert!(out.contains("📝 Description\n═"));
        assert!(out.contains("🎯 Conclusion\n═"));
    }

    #[test]
    fn unfilled_sections_are_tagged_not_mislabeled() {
        let sections = split_legal_sections("Only a title");
        assert_eq!(sections.len(), 7);
        assert_eq!(sections[0].content.as_deref(), Some("Only a title"));
        for section in &sections[1..] {
            assert_eq!(section.content, None);
        }
    }

    #[test]
    fn extra_paragraphs_beyond_seven_are_dropped() {
        let answer = (0..9).map(|i| format!("para {i}")).collect::<Vec<_>>().join("\n\n");
        let sections = split_legal_sections(&answer);
        assert_eq!(sections[6].content.as_deref(), Some("para 6"));
        let rendered = render_sections(&sections);
        assert!(!rendered.contains("para 7"));
    }

    #[test]
    fn summary_template_has_three_blocks() {
        let answer = "One. Two. Three. Four. Five.";
        let out = format_response(answer, ResponseStyle::Summary, false);

        assert!(out.contains("✨ Legal Summary ✨\nOne. Two. Three. Four. Five.\n"));
        assert!(out.contains("🌟 Key Legal Points 🌟\n• One\n• Two\n• Three\n"));
        assert!(out.contains("🎯 Conclusion\n• Three\n• Four\n• Five.\n"));
        assert_eq!(out.matches(&"═".repeat(50)).count(), 4);
    }

    #[test]
    fn list_style_bullets_lines_after_the_first() {
        let answer = "Kinds of writs\nHabeas corpus\nMandamus\nCertiorari";
        let out = format_response(answer, ResponseStyle::List, false);

        assert!(out.contains("📋 Legal Overview 📋"));
        assert!(out.contains("📝 Legal Breakdown 📝\n• Habeas corpus\n• Mandamus\n• Certiorari\n"));
    }

    #[test]
    fn legal_general_borrows_the_summary_captions() {
        let out = format_response("Some holding.", ResponseStyle::LegalGeneral, false);
        assert!(out.contains("✨ Legal Summary ✨"));
    }

    #[test]
    fn short_answers_still_render_points_and_conclusion() {
        let out = format_response("single sentence", ResponseStyle::Explanation, false);
        assert!(out.contains("💡 Legal Explanation 💡"));
        assert!(out.contains("🔑 Legal Implications 🔑\n• single sentence\n"));
        assert!(out.contains("🎯 Conclusion\n• single sentence\n"));
    }

    #[test]
    fn bold_rewrite_happens_before_sectioning() {
        let answer = "**Title** here\n\nBody paragraph";
        let out = format_response(answer, ResponseStyle::CaseRuling, true);
        assert!(out.contains("📌 Title\n🔹Title🔹 here"));
    }
}
