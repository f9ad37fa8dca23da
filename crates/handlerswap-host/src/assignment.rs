use handlerswap_core::{Handler, HostPanel, SwitchError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assignment {
    entries: Vec<(String, Vec<String>)>,
}

impl Assignment {
    pub fn entities_for(&self, handler: &str) -> &[String] {
        self.entries
            .iter()
            .find(|(id, _)| id == handler)
            .map(|(_, entities)| entities.as_slice())
            .unwrap_or(&[])
    }
}

/// Handler to domain bindings, read fresh from the host on every call.
pub struct AssignmentIndex<'a, P: HostPanel + ?Sized> {
    panel: &'a P,
}

impl<'a, P: HostPanel + ?Sized> AssignmentIndex<'a, P> {
    pub fn new(panel: &'a P) -> Self {
        Self { panel }
    }

    /// Domains bound to `handler`, in host order. An empty list is a valid answer.
    pub fn entities_using(&self, handler: &str) -> Result<Vec<String>, SwitchError> {
        let entities = self.panel.entities_for(handler)?;
        tracing::debug!(handler, count = entities.len(), "loaded handler assignment");
        Ok(entities)
    }

    pub fn assignment(&self, handlers: &[Handler]) -> Result<Assignment, SwitchError> {
        let mut entries = Vec::with_capacity(handlers.len());
        for handler in handlers {
            entries.push((handler.id.clone(), self.entities_using(&handler.id)?));
        }
        Ok(Assignment { entries })
    }
}
