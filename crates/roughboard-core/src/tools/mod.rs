//! Editing tools.

use crate::element::ElementType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    #[default]
    Selection,
    #[serde(alias = "pan")]
    Hand,
    Rectangle,
    Diamond,
    Ellipse,
    Arrow,
    Line,
    Freedraw,
    Text,
    Image,
    Frame,
    Eraser,
}

impl ToolKind {
    pub const ALL: [ToolKind; 12] = [
        ToolKind::Selection,
        ToolKind::Hand,
        ToolKind::Rectangle,
        ToolKind::Diamond,
        ToolKind::Ellipse,
        ToolKind::Arrow,
        ToolKind::Line,
        ToolKind::Freedraw,
        ToolKind::Text,
        ToolKind::Image,
        ToolKind::Frame,
        ToolKind::Eraser,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::Selection => "selection",
            ToolKind::Hand => "hand",
            ToolKind::Rectangle => "rectangle",
            ToolKind::Diamond => "diamond",
            ToolKind::Ellipse => "ellipse",
            ToolKind::Arrow => "arrow",
            ToolKind::Line => "line",
            ToolKind::Freedraw => "freedraw",
            ToolKind::Text => "text",
            ToolKind::Image => "image",
            ToolKind::Frame => "frame",
            ToolKind::Eraser => "eraser",
        }
    }

    /// Keyboard shortcut for this tool.
    pub fn shortcut(self) -> char {
        match self {
            ToolKind::Selection => 'v',
            ToolKind::Hand => 'h',
            ToolKind::Rectangle => 'r',
            ToolKind::Diamond => 'd',
            ToolKind::Ellipse => 'e',
            ToolKind::Arrow => 'a',
            ToolKind::Line => 'l',
            ToolKind::Freedraw => 'p',
            ToolKind::Text => 't',
            ToolKind::Image => 'i',
            ToolKind::Frame => 'f',
            ToolKind::Eraser => 'x',
        }
    }

    /// Tool bound to a shortcut key (case-insensitive).
    pub fn from_shortcut(key: char) -> Option<Self> {
        let key = key.to_ascii_lowercase();
        Self::ALL.into_iter().find(|tool| tool.shortcut() == key)
    }

    /// Element type this tool creates, if it is a drawing tool.
    pub fn element_type(self) -> Option<ElementType> {
        match self {
            ToolKind::Rectangle => Some(ElementType::Rectangle),
            ToolKind::Diamond => Some(ElementType::Diamond),
            ToolKind::Ellipse => Some(ElementType::Ellipse),
            ToolKind::Arrow => Some(ElementType::Arrow),
            ToolKind::Line => Some(ElementType::Line),
            ToolKind::Freedraw => Some(ElementType::Freedraw),
            ToolKind::Text => Some(ElementType::Text),
            ToolKind::Image => Some(ElementType::Image),
            ToolKind::Frame => Some(ElementType::Frame),
            ToolKind::Selection | ToolKind::Hand | ToolKind::Eraser => None,
        }
    }

    /// Whether switching to this tool keeps the current selection.
    pub fn keeps_selection(self) -> bool {
        matches!(self, ToolKind::Selection | ToolKind::Hand)
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
#[error("Unknown tool: {0}")]
pub struct UnknownTool(pub String);

impl FromStr for ToolKind {
    type Err = UnknownTool;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "pan" {
            return Ok(ToolKind::Hand);
        }
        Self::ALL
            .into_iter()
            .find(|tool| tool.name() == s)
            .ok_or_else(|| UnknownTool(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shortcuts_are_unique() {
        for tool in ToolKind::ALL {
            assert_eq!(ToolKind::from_shortcut(tool.shortcut()), Some(tool));
        }
        assert_eq!(ToolKind::from_shortcut('R'), Some(ToolKind::Rectangle));
        assert_eq!(ToolKind::from_shortcut('z'), None);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("pan".parse::<ToolKind>().unwrap(), ToolKind::Hand);
        assert_eq!("hand".parse::<ToolKind>().unwrap(), ToolKind::Hand);
        assert_eq!("freedraw".parse::<ToolKind>().unwrap(), ToolKind::Freedraw);
        assert!("laser".parse::<ToolKind>().is_err());
        let tool: ToolKind = serde_json::from_str("\"pan\"").unwrap();
        assert_eq!(tool, ToolKind::Hand);
    }

    #[test]
    fn test_element_types() {
        assert_eq!(ToolKind::Diamond.element_type(), Some(ElementType::Diamond));
        assert_eq!(ToolKind::Eraser.element_type(), None);
        assert!(ToolKind::Hand.keeps_selection());
        assert!(!ToolKind::Text.keeps_selection());
    }
}
