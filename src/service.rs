//! Dashboard and collector contract.
//!
//! Every mutation validates synchronously, persists the whole aggregate in
//! one store call and then drops the domain's cached list. Nothing is
//! written when validation fails.

use crate::cache::DomainListCache;
use crate::config::CoreConfig;
use crate::error::{CoreError, EntityKind, Result};
use crate::extraction::CapturedSignal;
use crate::logging::structured::LogContext;
use crate::model::{Domain, Event, ReturnMethod, ReturnMethodDraft, TrackingRule};
use crate::pipeline::{process_signals, BatchContext, BatchResult};
use crate::registry::get_registry;
use crate::storage::ConfigStore;
use crate::validation::{validate_return_method, validate_rule, ValidationMode};
use crate::{log_info, log_warn};

pub struct ConfigService<S: ConfigStore> {
    store: S,
    config: CoreConfig,
    rules: DomainListCache<TrackingRule>,
    return_methods: DomainListCache<ReturnMethod>,
}

impl<S: ConfigStore> ConfigService<S> {
    pub fn new(store: S, config: CoreConfig) -> Self {
        let ttl = config.list_cache_ttl();
        Self {
            store,
            config,
            rules: DomainListCache::new("rules", ttl),
            return_methods: DomainListCache::new("return_methods", ttl),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn create_domain(&self, url: &str) -> Result<Domain> {
        if url.trim().is_empty() {
            return Err(CoreError::bad_key("url", "domain url must not be empty"));
        }
        self.store.create_domain(url.trim(), &self.config)
    }

    pub fn domain_by_key(&self, key: &str) -> Result<Domain> {
        self.store.domain_by_key(key)
    }

    fn invalidate(&self, domain_id: i64) {
        if let Ok(domain) = self.store.domain(domain_id) {
            self.rules.invalidate(domain.key.as_str());
            self.return_methods.invalidate(domain.key.as_str());
        }
    }

    fn check_rule(&self, rule: &TrackingRule, ctx: &LogContext) -> Result<()> {
        let registry = get_registry();
        validate_rule(rule, &registry, &self.config.anon_id_storage_key).map_err(|e| {
            log_warn!(ctx, "RULE_REJECTED", status = e.status(), error = e.to_string());
            e
        })
    }

    pub fn create_rule(&self, rule: TrackingRule) -> Result<TrackingRule> {
        let domain = self.store.domain(rule.domain_id)?;
        let ctx = LogContext::for_domain(domain.key.as_str());
        self.check_rule(&rule, &ctx)?;

        let created = self.store.insert_rule(rule)?;
        self.invalidate(created.domain_id);
        log_info!(ctx.with_rule(created.id), "RULE_CREATED", name = created.name);
        Ok(created)
    }

    /// Replace rule `id`. Its domain is kept from the stored rule.
    pub fn update_rule(&self, id: i64, mut rule: TrackingRule) -> Result<TrackingRule> {
        let existing = self.store.rule(id)?;
        let domain = self.store.domain(existing.domain_id)?;
        let ctx = LogContext::for_domain(domain.key.as_str()).with_rule(id);
        rule.id = id;
        rule.domain_id = existing.domain_id;
        self.check_rule(&rule, &ctx)?;

        let updated = self.store.update_rule(rule)?;
        self.invalidate(updated.domain_id);
        log_info!(ctx, "RULE_UPDATED", mappings = updated.payload_mappings.len());
        Ok(updated)
    }

    pub fn delete_rule(&self, id: i64) -> Result<TrackingRule> {
        let deleted = self.store.delete_rule(id)?;
        self.invalidate(deleted.domain_id);
        log::info!("RULE_DELETED id={}", id);
        Ok(deleted)
    }

    pub fn get_rule(&self, id: i64) -> Result<TrackingRule> {
        self.store.rule(id)
    }

    /// Rules of a domain through the list cache.
    pub fn list_rules(&self, domain_key: &str) -> Result<Vec<TrackingRule>> {
        self.rules.get_or_load(domain_key, || {
            let domain = self.store.domain_by_key(domain_key)?;
            self.store.rules_for_domain(domain.id)
        })
    }

    fn check_return_method(
        &self,
        domain_id: i64,
        draft: &ReturnMethodDraft,
        mode: ValidationMode,
        ctx: &LogContext,
    ) -> Result<()> {
        let checked = {
            let registry = get_registry();
            validate_return_method(draft, &registry, mode).map(|_| ())
        };
        let checked = checked.and_then(|()| match draft.search_keyword_config_id {
            Some(config_id) => {
                if self.store.search_keyword_config_exists(domain_id, config_id)? {
                    Ok(())
                } else {
                    Err(CoreError::not_found(EntityKind::SearchKeywordConfig, config_id))
                }
            }
            None => Ok(()),
        });
        checked.map_err(|e| {
            log_warn!(
                ctx,
                "RETURN_METHOD_REJECTED",
                mode = mode.as_str(),
                status = e.status(),
                error = e.to_string()
            );
            e
        })
    }

    pub fn create_return_method(
        &self,
        domain_id: i64,
        draft: ReturnMethodDraft,
    ) -> Result<ReturnMethod> {
        let domain = self.store.domain(domain_id)?;
        let ctx = LogContext::for_domain(domain.key.as_str());
        self.check_return_method(domain_id, &draft, ValidationMode::Create, &ctx)?;

        let created = self
            .store
            .insert_return_method(ReturnMethod::from_draft(0, domain_id, draft))?;
        self.invalidate(domain_id);
        log_info!(ctx, "RETURN_METHOD_CREATED", id = created.id, name = created.configuration_name);
        Ok(created)
    }

    pub fn update_return_method(&self, id: i64, draft: ReturnMethodDraft) -> Result<ReturnMethod> {
        let existing = self.store.return_method(id)?;
        let domain = self.store.domain(existing.domain_id)?;
        let ctx = LogContext::for_domain(domain.key.as_str());
        self.check_return_method(existing.domain_id, &draft, ValidationMode::Update, &ctx)?;

        let updated = self
            .store
            .update_return_method(ReturnMethod::from_draft(id, existing.domain_id, draft))?;
        self.invalidate(existing.domain_id);
        log_info!(ctx, "RETURN_METHOD_UPDATED", id = id);
        Ok(updated)
    }

    pub fn delete_return_method(&self, id: i64) -> Result<ReturnMethod> {
        let deleted = self.store.delete_return_method(id)?;
        self.invalidate(deleted.domain_id);
        log::info!("RETURN_METHOD_DELETED id={}", id);
        Ok(deleted)
    }

    pub fn get_return_method(&self, id: i64) -> Result<ReturnMethod> {
        self.store.return_method(id)
    }

    pub fn list_return_methods(&self, domain_key: &str) -> Result<Vec<ReturnMethod>> {
        self.return_methods.get_or_load(domain_key, || {
            let domain = self.store.domain_by_key(domain_key)?;
            self.store.return_methods_for_domain(domain.id)
        })
    }

    /// Evaluate a batch of signals against the domain's rules and append the
    /// emitted events to the event log.
    pub fn collect(&self, domain_key: &str, signals: &[CapturedSignal]) -> Result<BatchResult> {
        let domain = self.store.domain_by_key(domain_key)?;
        let rules = self.list_rules(domain_key)?;
        let ctx = BatchContext::new(domain_key, self.config.clone());

        let result = process_signals(&ctx, &rules, signals);
        self.store.append_events(domain.id, &result.events)?;
        Ok(result)
    }

    pub fn events_for_domain(&self, domain_key: &str) -> Result<Vec<Event>> {
        let domain = self.store.domain_by_key(domain_key)?;
        self.store.events_for_domain(domain.id)
    }

    /// Events emitted by `rule_id`, including after the rule is deleted.
    pub fn events_for_rule(&self, rule_id: i64) -> Result<Vec<Event>> {
        self.store.events_for_rule(rule_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::PageContext;
    use crate::model::{fields, PayloadMapping, Source, TrackingTarget};
    use crate::storage::MemoryStore;
    use serde_json::json;

    fn service() -> (ConfigService<MemoryStore>, Domain) {
        let service = ConfigService::new(MemoryStore::new(), CoreConfig::default());
        let domain = service.create_domain("https://shop.example.com").unwrap();
        (service, domain)
    }

    fn rule(domain_id: i64) -> TrackingRule {
        TrackingRule {
            id: 0,
            name: "Page view".to_string(),
            domain_id,
            event_type_id: 4,
            tracking_target: TrackingTarget {
                value: "/products/".to_string(),
                pattern_id: 1,
                operator_id: 1,
            },
            conditions: vec![],
            payload_mappings: vec![
                PayloadMapping::anonymous_id("recsys_anon_id"),
                PayloadMapping::new(fields::ITEM_ID, Source::RequestUrl)
                    .with_request("/products/{id}", "GET")
                    .with_value("1"),
            ],
            action_type: None,
        }
    }

    fn draft(customizing: serde_json::Value) -> ReturnMethodDraft {
        serde_json::from_value(json!({
            "configurationName": "Popup",
            "returnType": "POPUP",
            "value": "/",
            "operatorId": 2,
            "customizing": customizing,
            "layout": {"contentMode": "list"},
            "style": {"theme": "light"},
            "delay": 0
        }))
        .unwrap()
    }

    #[test]
    fn test_rule_lifecycle_and_cache_invalidation() {
        let (service, domain) = service();
        let key = domain.key.as_str();
        assert!(service.list_rules(key).unwrap().is_empty());

        let created = service.create_rule(rule(domain.id)).unwrap();
        assert_eq!(service.list_rules(key).unwrap().len(), 1);

        let mut edit = created.clone();
        edit.name = "Product view".to_string();
        service.update_rule(created.id, edit).unwrap();
        assert_eq!(service.list_rules(key).unwrap()[0].name, "Product view");

        service.delete_rule(created.id).unwrap();
        assert!(service.list_rules(key).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_rule_is_not_persisted() {
        let (service, domain) = service();
        let mut bad = rule(domain.id);
        bad.tracking_target.operator_id = 99;
        assert_eq!(service.create_rule(bad).unwrap_err().status(), 404);
        assert!(service.store().rules_for_domain(domain.id).unwrap().is_empty());

        assert_eq!(service.create_rule(rule(domain.id + 50)).unwrap_err().status(), 404);
    }

    #[test]
    fn test_return_method_validation_modes() {
        let (service, domain) = service();
        let created = service
            .create_return_method(domain.id, draft(json!([{"key": "title", "position": 1}])))
            .unwrap();

        let err = service
            .update_return_method(created.id, draft(json!([{"key": "title", "position": 1}])))
            .unwrap_err();
        assert_eq!(err.offending_key(), Some("title"));
        assert_eq!(
            service.get_return_method(created.id).unwrap().customizing,
            json!([{"key": "title", "position": 1}])
        );

        let err = service
            .create_return_method(
                domain.id,
                draft(json!([
                    {"key": "a", "position": 2, "isEnabled": true},
                    {"key": "b", "position": 2, "isEnabled": true}
                ])),
            )
            .unwrap_err();
        assert_eq!(err.status(), 400);
        assert_eq!(service.list_return_methods(domain.key.as_str()).unwrap().len(), 1);
    }

    #[test]
    fn test_search_keyword_config_reference() {
        let (service, domain) = service();
        let mut d = draft(json!([]));
        d.search_keyword_config_id = Some(999);
        assert_eq!(service.create_return_method(domain.id, d.clone()).unwrap_err().status(), 404);

        let id = service.store().insert_search_keyword_config(domain.id).unwrap();
        d.search_keyword_config_id = Some(id);
        assert!(service.create_return_method(domain.id, d).is_ok());
    }

    #[test]
    fn test_collect_appends_events() {
        let (service, domain) = service();
        let created = service.create_rule(rule(domain.id)).unwrap();

        let mut page = PageContext::new("https://shop.example.com/products/42");
        page.local_storage
            .insert("recsys_anon_id".to_string(), "anon-9".to_string());
        let signal = CapturedSignal::new(4, page).with_exchange(
            crate::extraction::HttpExchange::new("https://shop.example.com/products/42", "GET"),
        );

        let result = service.collect(domain.key.as_str(), &[signal]).unwrap();
        assert_eq!(result.fired_count, 1);
        assert_eq!(result.events[0].item_value.as_deref(), Some("42"));

        assert_eq!(service.events_for_domain(domain.key.as_str()).unwrap().len(), 1);
        assert_eq!(service.events_for_rule(created.id).unwrap().len(), 1);
        assert!(service.events_for_rule(created.id + 100).unwrap().is_empty());

        service.delete_rule(created.id).unwrap();
        assert_eq!(service.events_for_rule(created.id).unwrap().len(), 1);
    }
}
