//! Configuration store.
//!
//! [`ConfigStore`] is the seam a host implements over its relational store.
//! [`MemoryStore`] is the in-process implementation: one lock around all
//! tables, so every aggregate write is applied whole or not at all.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use parking_lot::RwLock;

use crate::config::CoreConfig;
use crate::error::{CoreError, EntityKind, Result};
use crate::model::{generate_domain_key, Domain, Event, ReturnMethod, TrackingRule};

pub trait ConfigStore: Send + Sync {
    fn create_domain(&self, url: &str, config: &CoreConfig) -> Result<Domain>;
    fn domain(&self, id: i64) -> Result<Domain>;
    fn domain_by_key(&self, key: &str) -> Result<Domain>;

    /// Insert a rule with its conditions and mappings; assigns the id.
    fn insert_rule(&self, rule: TrackingRule) -> Result<TrackingRule>;
    /// Replace a rule and all its child rows. The domain never changes.
    fn update_rule(&self, rule: TrackingRule) -> Result<TrackingRule>;
    fn delete_rule(&self, id: i64) -> Result<TrackingRule>;
    fn rule(&self, id: i64) -> Result<TrackingRule>;
    fn rules_for_domain(&self, domain_id: i64) -> Result<Vec<TrackingRule>>;

    /// Insert a return method; assigns the id.
    fn insert_return_method(&self, method: ReturnMethod) -> Result<ReturnMethod>;
    fn update_return_method(&self, method: ReturnMethod) -> Result<ReturnMethod>;
    fn delete_return_method(&self, id: i64) -> Result<ReturnMethod>;
    fn return_method(&self, id: i64) -> Result<ReturnMethod>;
    fn return_methods_for_domain(&self, domain_id: i64) -> Result<Vec<ReturnMethod>>;

    /// Whether search keyword config `id` exists and belongs to `domain_id`.
    fn search_keyword_config_exists(&self, domain_id: i64, id: i64) -> Result<bool>;

    /// Append events for a domain. Events are never updated.
    fn append_events(&self, domain_id: i64, events: &[Event]) -> Result<usize>;
    fn events_for_domain(&self, domain_id: i64) -> Result<Vec<Event>>;
    fn events_for_rule(&self, rule_id: i64) -> Result<Vec<Event>>;
}

#[derive(Debug, Default)]
struct Tables {
    next_id: i64,
    domains: BTreeMap<i64, Domain>,
    rules: BTreeMap<i64, TrackingRule>,
    return_methods: BTreeMap<i64, ReturnMethod>,
    /// (domain_id, config id)
    search_keyword_configs: BTreeSet<(i64, i64)>,
    events: Vec<(i64, Event)>,
}

impl Tables {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn require_domain(&self, id: i64) -> Result<&Domain> {
        self.domains
            .get(&id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Domain, id))
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a search keyword config for a domain and return its id.
    pub fn insert_search_keyword_config(&self, domain_id: i64) -> Result<i64> {
        let mut tables = self.tables.write();
        tables.require_domain(domain_id)?;
        let id = tables.allocate_id();
        tables.search_keyword_configs.insert((domain_id, id));
        Ok(id)
    }
}

impl ConfigStore for MemoryStore {
    fn create_domain(&self, url: &str, config: &CoreConfig) -> Result<Domain> {
        let mut tables = self.tables.write();
        let key = generate_domain_key(config, |candidate| {
            tables.domains.values().any(|d| &d.key == candidate)
        })?;
        let id = tables.allocate_id();
        let domain = Domain {
            id,
            key,
            url: url.to_string(),
            created_at: Utc::now(),
        };
        tables.domains.insert(id, domain.clone());
        log::info!("DOMAIN_CREATED id={} url={}", id, url);
        Ok(domain)
    }

    fn domain(&self, id: i64) -> Result<Domain> {
        self.tables.read().require_domain(id).cloned()
    }

    fn domain_by_key(&self, key: &str) -> Result<Domain> {
        self.tables
            .read()
            .domains
            .values()
            .find(|d| d.key.as_str() == key)
            .cloned()
            .ok_or_else(|| CoreError::not_found(EntityKind::Domain, key))
    }

    fn insert_rule(&self, mut rule: TrackingRule) -> Result<TrackingRule> {
        let mut tables = self.tables.write();
        tables.require_domain(rule.domain_id)?;
        rule.id = tables.allocate_id();
        tables.rules.insert(rule.id, rule.clone());
        Ok(rule)
    }

    fn update_rule(&self, mut rule: TrackingRule) -> Result<TrackingRule> {
        let mut tables = self.tables.write();
        let existing = tables
            .rules
            .get_mut(&rule.id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Rule, rule.id))?;
        rule.domain_id = existing.domain_id;
        *existing = rule.clone();
        Ok(rule)
    }

    fn delete_rule(&self, id: i64) -> Result<TrackingRule> {
        self.tables
            .write()
            .rules
            .remove(&id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Rule, id))
    }

    fn rule(&self, id: i64) -> Result<TrackingRule> {
        self.tables
            .read()
            .rules
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::not_found(EntityKind::Rule, id))
    }

    fn rules_for_domain(&self, domain_id: i64) -> Result<Vec<TrackingRule>> {
        let tables = self.tables.read();
        tables.require_domain(domain_id)?;
        Ok(tables
            .rules
            .values()
            .filter(|r| r.domain_id == domain_id)
            .cloned()
            .collect())
    }

    fn insert_return_method(&self, mut method: ReturnMethod) -> Result<ReturnMethod> {
        let mut tables = self.tables.write();
        tables.require_domain(method.domain_id)?;
        method.id = tables.allocate_id();
        tables.return_methods.insert(method.id, method.clone());
        Ok(method)
    }

    fn update_return_method(&self, mut method: ReturnMethod) -> Result<ReturnMethod> {
        let mut tables = self.tables.write();
        let existing = tables
            .return_methods
            .get_mut(&method.id)
            .ok_or_else(|| CoreError::not_found(EntityKind::ReturnMethod, method.id))?;
        method.domain_id = existing.domain_id;
        *existing = method.clone();
        Ok(method)
    }

    fn delete_return_method(&self, id: i64) -> Result<ReturnMethod> {
        self.tables
            .write()
            .return_methods
            .remove(&id)
            .ok_or_else(|| CoreError::not_found(EntityKind::ReturnMethod, id))
    }

    fn return_method(&self, id: i64) -> Result<ReturnMethod> {
        self.tables
            .read()
            .return_methods
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::not_found(EntityKind::ReturnMethod, id))
    }

    fn return_methods_for_domain(&self, domain_id: i64) -> Result<Vec<ReturnMethod>> {
        let tables = self.tables.read();
        tables.require_domain(domain_id)?;
        Ok(tables
            .return_methods
            .values()
            .filter(|m| m.domain_id == domain_id)
            .cloned()
            .collect())
    }

    fn search_keyword_config_exists(&self, domain_id: i64, id: i64) -> Result<bool> {
        Ok(self
            .tables
            .read()
            .search_keyword_configs
            .contains(&(domain_id, id)))
    }

    fn append_events(&self, domain_id: i64, events: &[Event]) -> Result<usize> {
        let mut tables = self.tables.write();
        tables.require_domain(domain_id)?;
        tables
            .events
            .extend(events.iter().map(|e| (domain_id, e.clone())));
        Ok(events.len())
    }

    fn events_for_domain(&self, domain_id: i64) -> Result<Vec<Event>> {
        Ok(self
            .tables
            .read()
            .events
            .iter()
            .filter(|(d, _)| *d == domain_id)
            .map(|(_, e)| e.clone())
            .collect())
    }

    fn events_for_rule(&self, rule_id: i64) -> Result<Vec<Event>> {
        Ok(self
            .tables
            .read()
            .events
            .iter()
            .filter(|(_, e)| e.tracking_rule_id == rule_id)
            .map(|(_, e)| e.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ReturnMethodDraft, TrackingTarget};
    use serde_json::json;

    fn rule(domain_id: i64) -> TrackingRule {
        TrackingRule {
            id: 0,
            name: "Click".to_string(),
            domain_id,
            event_type_id: 1,
            tracking_target: TrackingTarget {
                value: "button".to_string(),
                pattern_id: 2,
                operator_id: 4,
            },
            conditions: vec![],
            payload_mappings: vec![],
            action_type: None,
        }
    }

    fn event(rule_id: i64) -> Event {
        Event {
            event_type_id: 1,
            user_field: "anonymousId".to_string(),
            user_value: "a".to_string(),
            item_field: None,
            item_value: None,
            timestamp: Utc::now(),
            rating_value: None,
            review_value: None,
            tracking_rule_id: rule_id,
            extras: BTreeMap::new(),
        }
    }

    #[test]
    fn test_domain_keys_are_unique() {
        let store = MemoryStore::new();
        let config = CoreConfig::default();
        let a = store.create_domain("https://a.example.com", &config).unwrap();
        let b = store.create_domain("https://b.example.com", &config).unwrap();
        assert_ne!(a.key, b.key);
        assert_eq!(a.key.as_str().len(), 32);
        assert_eq!(store.domain_by_key(b.key.as_str()).unwrap().id, b.id);
        assert_eq!(store.domain_by_key("nope").unwrap_err().status(), 404);
    }

    #[test]
    fn test_rule_crud() {
        let store = MemoryStore::new();
        let domain = store.create_domain("https://a.com", &CoreConfig::default()).unwrap();
        let created = store.insert_rule(rule(domain.id)).unwrap();
        assert!(created.id > 0);

        let mut edited = created.clone();
        edited.name = "Renamed".to_string();
        edited.domain_id = 999;
        let updated = store.update_rule(edited).unwrap();
        assert_eq!(updated.domain_id, domain.id);
        assert_eq!(store.rule(created.id).unwrap().name, "Renamed");

        assert_eq!(store.rules_for_domain(domain.id).unwrap().len(), 1);
        store.delete_rule(created.id).unwrap();
        assert_eq!(store.rule(created.id).unwrap_err().status(), 404);
        assert_eq!(store.insert_rule(rule(12345)).unwrap_err().status(), 404);
    }

    #[test]
    fn test_return_method_documents_unchanged() {
        let store = MemoryStore::new();
        let domain = store.create_domain("https://a.com", &CoreConfig::default()).unwrap();
        let draft: ReturnMethodDraft = serde_json::from_value(json!({
            "configurationName": "Popup",
            "returnType": "POPUP",
            "operatorId": 1,
            "layout": {"b": 1, "a": 2},
        }))
        .unwrap();
        let created = store
            .insert_return_method(ReturnMethod::from_draft(0, domain.id, draft))
            .unwrap();
        let fetched = store.return_method(created.id).unwrap();
        assert_eq!(
            serde_json::to_string(&fetched.layout).unwrap(),
            r#"{"b":1,"a":2}"#
        );
    }

    #[test]
    fn test_event_log_queries() {
        let store = MemoryStore::new();
        let config = CoreConfig::default();
        let a = store.create_domain("https://a.com", &config).unwrap();
        let b = store.create_domain("https://b.com", &config).unwrap();
        store.append_events(a.id, &[event(1), event(2)]).unwrap();
        store.append_events(b.id, &[event(1)]).unwrap();

        assert_eq!(store.events_for_domain(a.id).unwrap().len(), 2);
        assert_eq!(store.events_for_rule(1).unwrap().len(), 2);
        assert_eq!(store.append_events(777, &[event(1)]).unwrap_err().status(), 404);
    }

    #[test]
    fn test_search_keyword_configs() {
        let store = MemoryStore::new();
        let domain = store.create_domain("https://a.com", &CoreConfig::default()).unwrap();
        let id = store.insert_search_keyword_config(domain.id).unwrap();
        assert!(store.search_keyword_config_exists(domain.id, id).unwrap());
        assert!(!store.search_keyword_config_exists(domain.id + 100, id).unwrap());
    }
}
