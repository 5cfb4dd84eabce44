//! Question classification.
//!
//! Two keyword heuristics drive the whole response pipeline: a legal/general
//! gate and an ordered style table. The table order is contractual: a
//! question containing both "summarize" and "compare" resolves to `Summary`
//! because that rule is checked first. Do not reorder.

use serde::{Deserialize, Serialize};

/// Response style tag, derived deterministically from the question text and
/// used to pick an output template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStyle {
    General,
    Summary,
    List,
    Comparison,
    Explanation,
    Definition,
    CaseRuling,
    LegalReference,
    CourtComposition,
    LegalGeneral,
}

impl ResponseStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseStyle::General => "general",
            ResponseStyle::Summary => "summary",
            ResponseStyle::List => "list",
            ResponseStyle::Comparison => "comparison",
            ResponseStyle::Explanation => "explanation",
            ResponseStyle::Definition => "definition",
            ResponseStyle::CaseRuling => "case_ruling",
            ResponseStyle::LegalReference => "legal_reference",
            ResponseStyle::CourtComposition => "court_composition",
            ResponseStyle::LegalGeneral => "legal_general",
        }
    }

    /// Every style except `General` triggers retrieval and the legal prompt.
    pub fn is_legal(&self) -> bool {
        !matches!(self, ResponseStyle::General)
    }
}

const LEGAL_KEYWORDS: &[&str] = &[
    "law", "legal", "court", "judge", "case", "ruling", "judgment",
    "section", "article", "clause", "provision", "statute", "act",
    "constitution", "rights", "duty", "obligation", "contract",
    "agreement", "property", "criminal", "civil", "jurisdiction",
    "appeal", "petition", "writ", "order", "decree", "verdict",
];

/// Priority-ordered style rules: the first group with a hit wins.
const STYLE_RULES: &[(&[&str], ResponseStyle)] = &[
    (&["summarize", "summary", "overview", "brief"], ResponseStyle::Summary),
    (&["list", "enumerate", "what are", "what is"], ResponseStyle::List),
    (&["compare", "difference", "versus", "vs"], ResponseStyle::Comparison),
    (&["explain", "how does", "why does"], ResponseStyle::Explanation),
    (&["define", "what is the meaning", "what does"], ResponseStyle::Definition),
    (&["case", "ruling", "judgment", "verdict"], ResponseStyle::CaseRuling),
    (&["section", "article", "clause", "provision"], ResponseStyle::LegalReference),
    (&["court", "judge", "bench", "judicial"], ResponseStyle::CourtComposition),
];

/// True when the text contains any legal keyword. Case-insensitive substring
/// match, so "lawful" and "acting" count as hits too.
pub fn is_legal_question(text: &str) -> bool {
    let lowered = text.to_lowercase();
    LEGAL_KEYWORDS.iter().any(|keyword| lowered.contains(keyword))
}

/// Classifies a question into a [`ResponseStyle`].
pub fn response_style(question: &str) -> ResponseStyle {
    if !is_legal_question(question) {
        return ResponseStyle::General;
    }

    let lowered = question.to_lowercase();
    for (keywords, style) in STYLE_RULES {
        if keywords.iter().any(|keyword| lowered.contains(keyword)) {
            return *style;
        }
    }

    ResponseStyle::LegalGeneral
}
