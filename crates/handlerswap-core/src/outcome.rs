#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    Succeeded {
        entity: String,
        source: String,
        target: String,
    },
    Failed {
        entity: String,
        source: String,
        target: String,
        detail: String,
    },
}

impl SwitchOutcome {
    pub fn entity(&self) -> &str {
        match self {
            Self::Succeeded { entity, .. } | Self::Failed { entity, .. } => entity,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwitchSummary {
    pub succeeded: usize,
    pub failed: usize,
    /// Domains never attempted because the batch was interrupted.
    pub skipped: usize,
}

impl SwitchSummary {
    pub fn observe(&mut self, outcome: &SwitchOutcome) {
        if outcome.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }

    /// Domains actually attempted.
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn is_interrupted(&self) -> bool {
        self.skipped > 0
    }
}
