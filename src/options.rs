//! Options controlling how a workbook is assembled.

use crate::parts::DEFAULT_WORKBOOK_PART;
use serde::{Deserialize, Serialize};

/// How worksheet parts are paired with their display names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetBinding {
    /// Follow the workbook's relationship IDs, falling back to file names
    #[default]
    Relationships,
    /// Match the digits in the part's file name against `sheetId` only
    FileName,
}

/// Options for opening a workbook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenOptions {
    /// Sheet name binding strategy
    pub sheet_binding: SheetBinding,

    /// Archive entry holding the workbook part
    pub workbook_part: String,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            sheet_binding: SheetBinding::Relationships,
            workbook_part: DEFAULT_WORKBOOK_PART.to_string(),
        }
    }
}

impl OpenOptions {
    /// Create new open options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sheet binding strategy.
    pub fn with_sheet_binding(mut self, binding: SheetBinding) -> Self {
        self.sheet_binding = binding;
        self
    }

    /// Set the workbook part location.
    pub fn with_workbook_part(mut self, part: impl Into<String>) -> Self {
        self.workbook_part = part.into();
        self
    }
}
