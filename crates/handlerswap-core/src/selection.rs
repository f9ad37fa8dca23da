use anyhow::Result;

use crate::{Handler, SwitchError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// Only handlers bound to at least one domain; used for migration sources.
    FilterToUsedOnly,
    /// Only handlers enabled on the host; used for migration targets.
    AllAvailable,
}

impl SelectionMode {
    fn admits(self, handler: &Handler) -> bool {
        match self {
            Self::FilterToUsedOnly => handler.is_used(),
            Self::AllAvailable => handler.available,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Self::FilterToUsedOnly => "handlers in use",
            Self::AllAvailable => "enabled handlers",
        }
    }
}

/// A numbered menu built from an inventory snapshot. Entries that the mode
/// does not admit never make it into the menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionMenu {
    mode: SelectionMode,
    entries: Vec<Handler>,
}

impl SelectionMenu {
    pub fn build(candidates: &[Handler], mode: SelectionMode) -> Self {
        Self {
            mode,
            entries: candidates
                .iter()
                .filter(|handler| mode.admits(handler))
                .cloned()
                .collect(),
        }
    }

    pub fn entries(&self) -> &[Handler] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lines(&self) -> Vec<String> {
        let width = self.entries.len().to_string().len();
        self.entries
            .iter()
            .enumerate()
            .map(|(index, handler)| {
                let mut line = format!("{:>width$}) {}", index + 1, handler.id);
                if let Some(display_name) = &handler.display_name {
                    line.push_str(&format!(" [{display_name}]"));
                }
                line.push_str(&format!(" ({} domains)", handler.usage));
                if !handler.available {
                    line.push_str(" (disabled)");
                }
                line
            })
            .collect()
    }

    /// Resolves one operator response. Accepts a 1-based number only.
    pub fn resolve_input(&self, raw: &str) -> Result<Handler, SwitchError> {
        if self.entries.is_empty() {
            return Err(self.empty_menu_error(raw));
        }

        let count = self.entries.len();
        let choice = raw.trim().parse::<usize>().map_err(|_| {
            SwitchError::invalid_selection(raw, format!("expected a number between 1 and {count}"))
        })?;
        if choice == 0 || choice > count {
            return Err(SwitchError::invalid_selection(
                raw,
                format!("expected a number between 1 and {count}"),
            ));
        }
        Ok(self.entries[choice - 1].clone())
    }

    fn empty_menu_error(&self, raw: &str) -> SwitchError {
        SwitchError::invalid_selection(raw, format!("no {} to choose from", self.mode.describe()))
    }

    /// Resolves a handler named on the command line against the same menu.
    pub fn resolve_named(&self, id: &str) -> Result<Handler, SwitchError> {
        self.entries
            .iter()
            .find(|handler| handler.id == id.trim())
            .cloned()
            .ok_or_else(|| {
                SwitchError::invalid_selection(id, format!("not among the {}", self.mode.describe()))
            })
    }
}

/// Presents the menu once and resolves the single response. There is no
/// re-prompt: an invalid answer aborts the surrounding operation.
pub fn select_handler<Ask>(candidates: &[Handler], mode: SelectionMode, ask: Ask) -> Result<Handler>
where
    Ask: FnOnce(&SelectionMenu) -> Result<String>,
{
    let menu = SelectionMenu::build(candidates, mode);
    if menu.is_empty() {
        return Err(menu.empty_menu_error("").into());
    }
    let response = ask(&menu)?;
    Ok(menu.resolve_input(&response)?)
}

pub fn ensure_distinct(source: &Handler, target: &Handler) -> Result<(), SwitchError> {
    if source.id == target.id {
        return Err(SwitchError::NoOpSelection {
            handler: source.id.clone(),
        });
    }
    Ok(())
}
