//! Localization strategy for language-specific labels and style names.

use crate::html::VisualKind;
use serde::{Deserialize, Serialize};

/// Strategy for handling language-specific conventions.
pub trait LocalizationStrategy: Send + Sync {
    /// Value of the `lang` attribute on composed documents.
    fn lang(&self) -> &'static str;

    /// Caption shown in place of a visual element the HTML cannot reproduce.
    fn visual_caption(&self, kind: VisualKind) -> &'static str;

    /// Parses a style name to determine the heading level.
    fn parse_heading_style(&self, style: &str) -> Option<usize>;
}

fn english_heading_level(style_lower: &str) -> Option<usize> {
    if let Some(rest) = style_lower.strip_prefix("heading") {
        return rest.trim().parse().ok();
    }
    match style_lower {
        "title" => Some(1),
        "subtitle" => Some(2),
        _ => None,
    }
}

/// Default localization strategy (English).
pub struct DefaultLocalization;

impl LocalizationStrategy for DefaultLocalization {
    fn lang(&self) -> &'static str {
        "en"
    }

    fn visual_caption(&self, kind: VisualKind) -> &'static str {
        match kind {
            VisualKind::Drawing => "Drawing / visual element",
            VisualKind::Shape => "Shape",
            VisualKind::Background => "Custom background",
            VisualKind::Textbox => "Text box",
            VisualKind::Group => "Grouped elements",
            VisualKind::Canvas => "Canvas",
            VisualKind::Svg => "Vector graphic (SVG)",
            VisualKind::Watermark => "Watermark",
            VisualKind::Header => "Header",
            VisualKind::Footer => "Footer",
            VisualKind::Comment => "Comment",
        }
    }

    fn parse_heading_style(&self, style: &str) -> Option<usize> {
        english_heading_level(&style.to_lowercase())
    }
}

/// Brazilian Portuguese localization ("Título 1", "Subtítulo").
pub struct PortugueseLocalization;

impl LocalizationStrategy for PortugueseLocalization {
    fn lang(&self) -> &'static str {
        "pt-BR"
    }

    fn visual_caption(&self, kind: VisualKind) -> &'static str {
        match kind {
            VisualKind::Drawing => "Desenho/Elemento Visual",
            VisualKind::Shape => "Forma/Shape",
            VisualKind::Background => "Fundo Personalizado",
            VisualKind::Textbox => "Caixa de Texto",
            VisualKind::Group => "Grupo de Elementos",
            VisualKind::Canvas => "Canvas/Tela",
            VisualKind::Svg => "Gráfico Vetorial (SVG)",
            VisualKind::Watermark => "Marca d'Água",
            VisualKind::Header => "Cabeçalho",
            VisualKind::Footer => "Rodapé",
            VisualKind::Comment => "Comentário",
        }
    }

    fn parse_heading_style(&self, style: &str) -> Option<usize> {
        let style_lower = style.to_lowercase();

        // Standard headings first
        if let Some(level) = english_heading_level(&style_lower) {
            return Some(level);
        }

        // "Título 1" -> 1, "Subtítulo" -> 2; Word stores the ids as "Ttulo1"/"Subttulo"
        if style_lower.starts_with("subt") {
            return Some(2);
        }
        if ["título", "titulo", "ttulo"]
            .iter()
            .any(|prefix| style_lower.starts_with(prefix))
        {
            let digits: String = style_lower.chars().filter(|c| c.is_ascii_digit()).collect();
            return if digits.is_empty() {
                Some(1)
            } else {
                digits.parse().ok()
            };
        }
        None
    }
}

/// Locale selectable from configuration or the command line.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum Locale {
    #[default]
    #[serde(rename = "en")]
    En,
    #[serde(rename = "pt-br", alias = "pt-BR")]
    #[value(name = "pt-br")]
    PtBr,
}

impl Locale {
    pub fn strategy(self) -> &'static dyn LocalizationStrategy {
        match self {
            Locale::En => &DefaultLocalization,
            Locale::PtBr => &PortugueseLocalization,
        }
    }
}
