use std::collections::BTreeMap;

use handlerswap_core::{
    is_family_handler, Handler, HandlerRecord, HostConfig, HostPanel, SwitchError,
};

/// Live view of the managed handler family. Nothing is cached: every call
/// goes back to the host.
pub struct HandlerInventory<'a, P: HostPanel + ?Sized> {
    panel: &'a P,
    prefix: &'a str,
}

impl<'a, P: HostPanel + ?Sized> HandlerInventory<'a, P> {
    pub fn new(panel: &'a P, config: &'a HostConfig) -> Self {
        Self {
            panel,
            prefix: &config.handler_prefix,
        }
    }

    /// Enabled family handlers in host order, with current usage counts.
    pub fn list_available_handlers(&self) -> Result<Vec<Handler>, SwitchError> {
        let records = self.family_records()?;
        let usage = self.usage_map()?;
        Ok(records
            .iter()
            .filter(|record| record.enabled)
            .map(|record| handler_from_record(record, &usage))
            .collect())
    }

    /// Family handlers bound to at least one domain, ordered by id.
    pub fn list_used_handlers(&self) -> Result<Vec<Handler>, SwitchError> {
        let records = self.family_records()?;
        let usage = self.usage_map()?;
        Ok(usage
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(id, count)| match records.iter().find(|record| &record.id == id) {
                Some(record) => handler_from_record(record, &usage),
                None => Handler::new(id.clone(), false, *count),
            })
            .collect())
    }

    pub fn count_entities_for(&self, handler: &str) -> Result<u64, SwitchError> {
        Ok(self.usage_map()?.get(handler).copied().unwrap_or(0))
    }

    /// Candidate list for both menus: enabled handlers in host order, then
    /// handlers still in use but no longer enabled.
    pub fn snapshot(&self) -> Result<Vec<Handler>, SwitchError> {
        let records = self.family_records()?;
        let usage = self.usage_map()?;

        let mut handlers = records
            .iter()
            .filter(|record| record.enabled)
            .map(|record| handler_from_record(record, &usage))
            .collect::<Vec<_>>();
        for (id, count) in &usage {
            if *count == 0 || handlers.iter().any(|handler| &handler.id == id) {
                continue;
            }
            let handler = match records.iter().find(|record| &record.id == id) {
                Some(record) => handler_from_record(record, &usage),
                None => Handler::new(id.clone(), false, *count),
            };
            handlers.push(handler);
        }
        Ok(handlers)
    }

    fn family_records(&self) -> Result<Vec<HandlerRecord>, SwitchError> {
        let records = self.panel.handler_records()?;
        Ok(records
            .into_iter()
            .filter(|record| is_family_handler(self.prefix, &record.id))
            .collect())
    }

    fn usage_map(&self) -> Result<BTreeMap<String, u64>, SwitchError> {
        let mut usage = BTreeMap::new();
        for (id, count) in self.panel.usage_counts(self.prefix)? {
            if is_family_handler(self.prefix, &id) {
                *usage.entry(id).or_insert(0) += count;
            }
        }
        Ok(usage)
    }
}

fn handler_from_record(record: &HandlerRecord, usage: &BTreeMap<String, u64>) -> Handler {
    Handler {
        id: record.id.clone(),
        display_name: record
            .display_name
            .clone()
            .or_else(|| record.full_version.clone()),
        available: record.enabled,
        usage: usage.get(&record.id).copied().unwrap_or(0),
    }
}
